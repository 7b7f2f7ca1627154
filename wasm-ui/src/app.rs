//! Application shell component.
//!
//! Holds the `ShellGate`, wires browser events into it and mounts either the
//! intro loader or the content tree, never both.

use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::timers::callback::Timeout;
use portfolio_rs::{Connectivity, ShellEffect, ShellGate, ShellTimer, ShellTimings, View};
use yew::prelude::*;

use crate::components::ContentTree;
use crate::loader::IntroLoader;

/// What the shell renders.
#[derive(Clone, Copy, PartialEq, Debug)]
struct GateView {
    view: View,
    connectivity: Connectivity,
    initial_load: bool,
}

impl GateView {
    fn of(gate: &ShellGate) -> Self {
        Self {
            view: gate.view(),
            connectivity: gate.connectivity(),
            initial_load: gate.is_initial_load(),
        }
    }
}

type SharedGate = Rc<RefCell<ShellGate>>;
type ShellTimers = Rc<RefCell<Vec<Timeout>>>;

fn browser_connectivity() -> Connectivity {
    Connectivity::from_online(gloo::utils::window().navigator().on_line())
}

fn document_loaded() -> bool {
    gloo::utils::document().ready_state() == "complete"
}

/// Apply shell effects, then publish the new view.
///
/// Timeouts stay in `timers` until the shell unmounts; none is dropped from
/// inside its own callback.
fn apply_shell(
    gate: &SharedGate,
    timers: &ShellTimers,
    refresh: &Callback<()>,
    effects: Vec<ShellEffect>,
) {
    for effect in effects {
        match effect {
            ShellEffect::Schedule { timer, delay_ms } => {
                let gate_ref = Rc::downgrade(gate);
                let timers_ref = Rc::downgrade(timers);
                let refresh = refresh.clone();
                let timeout = Timeout::new(delay_ms, move || {
                    let (Some(gate), Some(timers)) = (gate_ref.upgrade(), timers_ref.upgrade())
                    else {
                        return;
                    };
                    let effects = {
                        let mut g = gate.borrow_mut();
                        match timer {
                            ShellTimer::Floor => g.floor_elapsed(),
                            ShellTimer::ReadyDelay => g.ready_delay_elapsed(),
                        }
                    };
                    apply_shell(&gate, &timers, &refresh, effects);
                });
                timers.borrow_mut().push(timeout);
            }
            ShellEffect::RevealContent => gloo::console::info!("revealing content"),
        }
    }
    refresh.emit(());
}

/// Main application component.
#[function_component(App)]
pub fn app() -> Html {
    let gate: SharedGate =
        use_mut_ref(|| ShellGate::new(ShellTimings::default(), browser_connectivity()));
    let timers: ShellTimers = use_mut_ref(Vec::new);
    let view = {
        let gate = gate.clone();
        use_state(move || GateView::of(&gate.borrow()))
    };

    let refresh = {
        let gate = gate.clone();
        let view = view.clone();
        Callback::from(move |()| view.set(GateView::of(&gate.borrow())))
    };

    // Connectivity changes, for the whole lifetime of the page
    {
        let gate = gate.clone();
        let refresh = refresh.clone();
        use_effect_with((), move |_| {
            let window = gloo::utils::window();
            let listeners = [
                ("online", Connectivity::Online),
                ("offline", Connectivity::Offline),
            ]
            .map(|(event, connectivity)| {
                let gate = gate.clone();
                let refresh = refresh.clone();
                EventListener::new(&window, event, move |_| {
                    gate.borrow_mut().on_network_change(connectivity);
                    refresh.emit(());
                })
            });
            move || drop(listeners)
        });
    }

    // Floor timer and resource readiness
    {
        let gate = gate.clone();
        let timers = timers.clone();
        let refresh = refresh.clone();
        use_effect_with((), move |_| {
            let effects = gate.borrow_mut().mount();
            apply_shell(&gate, &timers, &refresh, effects);

            let load_listener = if document_loaded() {
                let effects = gate.borrow_mut().on_resources_ready();
                apply_shell(&gate, &timers, &refresh, effects);
                None
            } else {
                let gate = gate.clone();
                let timers = timers.clone();
                let refresh = refresh.clone();
                Some(EventListener::once(
                    &gloo::utils::window(),
                    "load",
                    move |_| {
                        let effects = gate.borrow_mut().on_resources_ready();
                        apply_shell(&gate, &timers, &refresh, effects);
                    },
                ))
            };

            move || {
                drop(load_listener);
                timers.borrow_mut().clear();
            }
        });
    }

    let on_intro_complete = {
        let gate = gate.clone();
        let timers = timers.clone();
        let refresh = refresh.clone();
        Callback::from(move |()| {
            let effects = gate.borrow_mut().on_intro_complete();
            apply_shell(&gate, &timers, &refresh, effects);
        })
    };

    html! {
        <>
            if view.view == View::Loader {
                <IntroLoader
                    on_complete={on_intro_complete}
                    connectivity={view.connectivity}
                    initial_load={view.initial_load}
                />
            } else {
                <ContentTree connectivity={view.connectivity} />
            }
        </>
    }
}
