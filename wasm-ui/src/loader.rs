//! Intro loader component.
//!
//! Owns one `LoaderController` per mount and turns its effects into gloo
//! timers. Timer callbacks only hold a weak reference to the driver, so a
//! callback that races the unmount finds nothing to update.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gloo::timers::callback::{Interval, Timeout};
use portfolio_rs::{
    Connectivity, Effect, LoaderController, LoaderSnapshot, LoaderState, LoaderTimings, Timer,
    phases_for,
};
use yew::platform::spawn_local;
use yew::prelude::*;

use crate::components::ConnectivityBadge;

enum Scheduled {
    Repeating(Interval),
    Once(Timeout),
}

/// Controller plus the browser timers it asked for.
struct Driver {
    controller: LoaderController,
    timers: HashMap<Timer, Scheduled>,
    on_change: Callback<LoaderSnapshot>,
    on_complete: Callback<()>,
}

type SharedDriver = Rc<RefCell<Driver>>;

impl Driver {
    /// Install or remove the timer of the given kind.
    fn replace(&mut self, timer: Timer, next: Option<Scheduled>) {
        let previous = match next {
            Some(scheduled) => self.timers.insert(timer, scheduled),
            None => self.timers.remove(&timer),
        };
        if let Some(previous) = previous {
            retire(previous);
        }
    }
}

/// Drop a timer after the current callback returns; a gloo timer must not
/// be dropped from inside its own callback.
fn retire(scheduled: Scheduled) {
    spawn_local(async move {
        match scheduled {
            Scheduled::Repeating(interval) => drop(interval),
            Scheduled::Once(timeout) => drop(timeout),
        }
    });
}

fn apply(driver: &SharedDriver, effects: Vec<Effect>) {
    let mut completed = false;
    for effect in effects {
        match effect {
            Effect::Repeat { timer, interval_ms } => {
                let weak = Rc::downgrade(driver);
                let interval = Interval::new(interval_ms, move || fire(&weak, timer));
                driver
                    .borrow_mut()
                    .replace(timer, Some(Scheduled::Repeating(interval)));
            }
            Effect::Schedule { timer, delay_ms } => {
                let weak = Rc::downgrade(driver);
                let timeout = Timeout::new(delay_ms, move || fire(&weak, timer));
                driver
                    .borrow_mut()
                    .replace(timer, Some(Scheduled::Once(timeout)));
            }
            Effect::Cancel(timer) => driver.borrow_mut().replace(timer, None),
            Effect::Complete => completed = true,
            Effect::Reload => reload_page(),
        }
    }

    let (snapshot, on_change, on_complete) = {
        let d = driver.borrow();
        (
            d.controller.snapshot(),
            d.on_change.clone(),
            d.on_complete.clone(),
        )
    };
    on_change.emit(snapshot);
    if completed {
        on_complete.emit(());
    }
}

fn fire(weak: &Weak<RefCell<Driver>>, timer: Timer) {
    let Some(driver) = weak.upgrade() else {
        return;
    };
    let effects = {
        let mut d = driver.borrow_mut();
        if timer != Timer::Progress {
            d.replace(timer, None);
        }
        match timer {
            Timer::Progress => d.controller.tick(),
            Timer::RetryOffer => d.controller.retry_offer_elapsed(),
            Timer::Completion => d.controller.completion_elapsed(),
        }
    };
    apply(&driver, effects);
}

fn teardown(driver: &SharedDriver) {
    let mut d = driver.borrow_mut();
    for effect in d.controller.unmount() {
        if let Effect::Cancel(timer) = effect {
            d.replace(timer, None);
        }
    }
}

fn reload_page() {
    if let Err(e) = gloo::utils::window().location().reload() {
        gloo::console::error!("reload failed", e);
    }
}

/// Snapshot shown before the controller has mounted.
fn idle_snapshot(connectivity: Connectivity) -> LoaderSnapshot {
    LoaderSnapshot {
        state: LoaderState::Loading,
        progress: 0.0,
        phase_index: 0,
        phase_label: phases_for(connectivity)[0],
        connectivity,
        retry_offered: false,
    }
}

fn bar_style(snapshot: &LoaderSnapshot) -> String {
    format!("width: {}%", snapshot.progress)
}

fn percent_text(snapshot: &LoaderSnapshot) -> String {
    format!("{}%", snapshot.percent())
}

#[derive(Properties, PartialEq)]
pub struct IntroLoaderProps {
    pub on_complete: Callback<()>,
    pub connectivity: Connectivity,
    pub initial_load: bool,
}

/// Full-screen loader with progress, phase text and the offline choice.
#[function_component(IntroLoader)]
pub fn intro_loader(props: &IntroLoaderProps) -> Html {
    let snapshot = use_state(|| None::<LoaderSnapshot>);
    let slot = use_mut_ref(|| None::<SharedDriver>);

    {
        let slot = slot.clone();
        let snapshot = snapshot.clone();
        let on_complete = props.on_complete.clone();
        let connectivity = props.connectivity;
        let initial_load = props.initial_load;

        use_effect_with((), move |_| {
            let (controller, effects) =
                LoaderController::mount(LoaderTimings::default(), connectivity, initial_load);
            let driver = Rc::new(RefCell::new(Driver {
                controller,
                timers: HashMap::new(),
                on_change: Callback::from(move |s: LoaderSnapshot| snapshot.set(Some(s))),
                on_complete,
            }));
            *slot.borrow_mut() = Some(driver.clone());
            apply(&driver, effects);

            move || {
                teardown(&driver);
                slot.borrow_mut().take();
            }
        });
    }

    {
        let slot = slot.clone();
        use_effect_with(props.connectivity, move |connectivity| {
            let driver = slot.borrow().clone();
            if let Some(driver) = driver {
                let effects = driver.borrow_mut().controller.set_connectivity(*connectivity);
                apply(&driver, effects);
            }
            || ()
        });
    }

    {
        let slot = slot.clone();
        use_effect_with(props.initial_load, move |initial_load| {
            if let Some(driver) = slot.borrow().as_ref() {
                driver.borrow_mut().controller.set_initial_load(*initial_load);
            }
            || ()
        });
    }

    let on_retry = {
        let slot = slot.clone();
        Callback::from(move |_: MouseEvent| {
            let driver = slot.borrow().clone();
            if let Some(driver) = driver {
                let result = driver.borrow_mut().controller.retry();
                match result {
                    Ok(effects) => apply(&driver, effects),
                    Err(e) => gloo::console::warn!(e.to_string()),
                }
            }
        })
    };

    let on_continue = {
        let slot = slot.clone();
        Callback::from(move |_: MouseEvent| {
            let driver = slot.borrow().clone();
            if let Some(driver) = driver {
                let result = driver.borrow_mut().controller.continue_offline();
                match result {
                    Ok(effects) => apply(&driver, effects),
                    Err(e) => gloo::console::warn!(e.to_string()),
                }
            }
        })
    };

    let view = (*snapshot).unwrap_or_else(|| idle_snapshot(props.connectivity));

    html! {
        <div class="intro-loader">
            <div class="intro-content">
                <h1 class="intro-title">{ "Welcome" }</h1>
                <ConnectivityBadge connectivity={view.connectivity} />
                if view.shows_offline_choice() {
                    <div class="offline-choice">
                        <h3>{ "Connection Issue" }</h3>
                        <p>{ "Unable to establish internet connection. You can continue offline or retry." }</p>
                        <div class="offline-buttons">
                            <button class="retry-button" onclick={on_retry}>
                                { "Retry Connection" }
                            </button>
                            <button class="continue-button" onclick={on_continue}>
                                { "Continue Offline" }
                            </button>
                        </div>
                    </div>
                } else {
                    <div class="progress">
                        <div class="progress-track">
                            <div class="progress-bar" style={bar_style(&view)} />
                        </div>
                        <div class="progress-meta">
                            <span class="progress-percent">{ percent_text(&view) }</span>
                            <span class="progress-status">{ view.connectivity.status_label() }</span>
                        </div>
                        <p class="phase-label">{ view.phase_label }</p>
                    </div>
                }
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(target_arch = "wasm32")]
    use wasm_bindgen_test::*;

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), test)]
    fn test_idle_snapshot_uses_first_phase() {
        let online = idle_snapshot(Connectivity::Online);
        assert_eq!(online.phase_label, "Initializing Systems...");
        let offline = idle_snapshot(Connectivity::Offline);
        assert_eq!(offline.phase_label, "Checking Connection...");
        assert!(!offline.shows_offline_choice());
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), test)]
    fn test_bar_and_percent_text() {
        let mut snapshot = idle_snapshot(Connectivity::Online);
        snapshot.progress = 42.5;
        assert_eq!(bar_style(&snapshot), "width: 42.5%");
        assert_eq!(percent_text(&snapshot), "43%");
        snapshot.progress = 100.0;
        assert_eq!(bar_style(&snapshot), "width: 100%");
        assert_eq!(percent_text(&snapshot), "100%");
    }
}
