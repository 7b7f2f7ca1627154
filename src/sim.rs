//! Headless host for the shell and the loader.
//!
//! Runs both state machines on a [`VirtualClock`], feeds host signals
//! through [`Signal`] subscriptions and records a [`Timeline`]. Timer
//! effects become clock tasks; when the gate opens the loader is unmounted
//! and every task it owned is cancelled.
//!
//! ```
//! use portfolio_rs::{Config, Connectivity, Simulation, ScriptedEvent};
//!
//! let mut sim = Simulation::new(Config::default(), Connectivity::Online).unwrap();
//! sim.schedule(0, ScriptedEvent::ResourcesReady);
//! sim.start();
//! let revealed = sim.run_until_revealed(60_000).unwrap();
//! assert!(revealed >= 2000);
//! assert_eq!(sim.completions(), 1);
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use log::{debug, warn};

use crate::clock::{TaskHandle, VirtualClock};
use crate::config::Config;
use crate::connectivity::Connectivity;
use crate::error::LoaderError;
use crate::loader::{Effect, LoaderController, LoaderSnapshot, Timer};
use crate::shell::{ShellEffect, ShellGate, ShellTimer};
use crate::signal::{Signal, Subscription};
use crate::timeline::{Timeline, TimelineEvent};

/// Host or user input queued at an absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedEvent {
    Network(Connectivity),
    ResourcesReady,
    ContinueOffline,
    Retry,
}

#[derive(Debug, Clone, Copy)]
enum Task {
    Shell(ShellTimer),
    Loader(Timer),
    Script(ScriptedEvent),
}

#[derive(Debug, Clone, Copy)]
enum HostNotice {
    Network(Connectivity),
    Ready,
}

/// Signals the host environment publishes.
#[derive(Default)]
pub struct Host {
    pub connectivity: Signal<Connectivity>,
    pub ready: Signal<()>,
}

pub struct Simulation {
    config: Config,
    clock: VirtualClock<Task>,
    host: Host,
    inbox: Rc<RefCell<VecDeque<HostNotice>>>,
    subscriptions: Vec<Subscription>,
    shell: ShellGate,
    shell_timers: HashMap<ShellTimer, TaskHandle>,
    loader: Option<LoaderController>,
    loader_timers: HashMap<Timer, TaskHandle>,
    timeline: Timeline,
    completions: u32,
    revealed_at: Option<u64>,
    started: bool,
    reloaded: bool,
}

impl Simulation {
    pub fn new(config: Config, connectivity: Connectivity) -> Result<Self, LoaderError> {
        config.validate()?;

        let host = Host::default();
        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        let subscriptions = vec![
            {
                let inbox = inbox.clone();
                host.connectivity
                    .subscribe(move |c| inbox.borrow_mut().push_back(HostNotice::Network(*c)))
            },
            {
                let inbox = inbox.clone();
                host.ready
                    .subscribe(move |_| inbox.borrow_mut().push_back(HostNotice::Ready))
            },
        ];

        Ok(Self {
            config,
            clock: VirtualClock::new(),
            host,
            inbox,
            subscriptions,
            shell: ShellGate::new(config.shell, connectivity),
            shell_timers: HashMap::new(),
            loader: None,
            loader_timers: HashMap::new(),
            timeline: Timeline::new(),
            completions: 0,
            revealed_at: None,
            started: false,
            reloaded: false,
        })
    }

    /// Mount the shell and the loader at the current time.
    pub fn start(&mut self) {
        if self.started || self.reloaded {
            return;
        }
        self.started = true;
        self.record(TimelineEvent::ShellMounted);
        let effects = self.shell.mount();
        self.apply_shell(effects);
        if self.shell.should_show_loader() {
            self.mount_loader();
        }
    }

    /// Queue an event at an absolute time.
    pub fn schedule(&mut self, at_ms: u64, event: ScriptedEvent) {
        self.clock.schedule_at(at_ms, Task::Script(event));
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn shell(&self) -> &ShellGate {
        &self.shell
    }

    pub fn loader(&self) -> Option<&LoaderController> {
        self.loader.as_ref()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Times the completion callback reached the shell.
    pub fn completions(&self) -> u32 {
        self.completions
    }

    pub fn revealed_at(&self) -> Option<u64> {
        self.revealed_at
    }

    pub fn is_reloaded(&self) -> bool {
        self.reloaded
    }

    pub fn pending_tasks(&self) -> usize {
        self.clock.pending()
    }

    /// Tasks currently owned by the loader.
    pub fn loader_tasks(&self) -> usize {
        self.loader_timers.len()
    }

    pub fn host_observers(&self) -> usize {
        self.host.connectivity.observer_count() + self.host.ready.observer_count()
    }

    /// Publish a connectivity change now.
    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        self.host.connectivity.emit(&connectivity);
        self.drain_inbox();
    }

    /// Publish the resources-ready signal now.
    pub fn resources_ready(&mut self) {
        self.host.ready.emit(&());
        self.drain_inbox();
    }

    pub fn continue_offline(&mut self) -> Result<(), LoaderError> {
        let loader = self.loader.as_mut().ok_or(LoaderError::NotMounted)?;
        let before = loader.snapshot();
        let effects = loader.continue_offline()?;
        let after = loader.snapshot();
        self.observe(before, after);
        self.apply_loader(effects);
        Ok(())
    }

    pub fn retry(&mut self) -> Result<(), LoaderError> {
        let loader = self.loader.as_mut().ok_or(LoaderError::NotMounted)?;
        let effects = loader.retry()?;
        self.apply_loader(effects);
        Ok(())
    }

    /// Run every task due within the next `ms` milliseconds.
    pub fn advance_by(&mut self, ms: u64) {
        let until = self.clock.now() + ms;
        self.run_until(until);
    }

    /// Run every task due at or before `until_ms`.
    pub fn run_until(&mut self, until_ms: u64) {
        while !self.reloaded {
            match self.clock.pop_due(until_ms) {
                Some((handle, task)) => self.fire(handle, task),
                None => break,
            }
        }
        self.clock.set_now(until_ms);
    }

    /// Run until the content is revealed, giving up at `limit_ms`.
    pub fn run_until_revealed(&mut self, limit_ms: u64) -> Option<u64> {
        while self.revealed_at.is_none() && !self.reloaded {
            match self.clock.next_due() {
                Some(due) if due <= limit_ms => self.run_until(due),
                _ => break,
            }
        }
        self.revealed_at
    }

    /// Unmount the loader without opening the gate, as a host teardown.
    pub fn teardown_loader(&mut self) {
        if let Some(mut loader) = self.loader.take() {
            let effects = loader.unmount();
            self.apply_loader(effects);
            for (_, handle) in self.loader_timers.drain() {
                self.clock.cancel(handle);
            }
            self.record(TimelineEvent::LoaderUnmounted);
        }
    }

    fn mount_loader(&mut self) {
        let (loader, effects) = LoaderController::mount(
            self.config.loader,
            self.shell.connectivity(),
            self.shell.is_initial_load(),
        );
        self.record(TimelineEvent::LoaderMounted {
            connectivity: loader.connectivity(),
            initial_load: loader.initial_load(),
        });
        self.record(TimelineEvent::StateChanged(loader.state()));
        self.record(TimelineEvent::PhaseChanged {
            percent: 0,
            label: loader.phase_label(),
        });
        self.loader = Some(loader);
        self.apply_loader(effects);
    }

    fn fire(&mut self, handle: TaskHandle, task: Task) {
        match task {
            Task::Shell(timer) => {
                self.shell_timers.remove(&timer);
                let effects = match timer {
                    ShellTimer::Floor => self.shell.floor_elapsed(),
                    ShellTimer::ReadyDelay => self.shell.ready_delay_elapsed(),
                };
                if let Some(loader) = self.loader.as_mut() {
                    loader.set_initial_load(self.shell.is_initial_load());
                }
                self.apply_shell(effects);
            }
            Task::Loader(timer) => {
                if self.loader_timers.get(&timer) != Some(&handle) {
                    return;
                }
                if timer != Timer::Progress {
                    self.loader_timers.remove(&timer);
                }
                let Some(loader) = self.loader.as_mut() else {
                    return;
                };
                let before = loader.snapshot();
                let effects = match timer {
                    Timer::Progress => loader.tick(),
                    Timer::RetryOffer => loader.retry_offer_elapsed(),
                    Timer::Completion => loader.completion_elapsed(),
                };
                let after = loader.snapshot();
                self.observe(before, after);
                self.apply_loader(effects);
            }
            Task::Script(event) => self.run_script(event),
        }
    }

    fn run_script(&mut self, event: ScriptedEvent) {
        let result = match event {
            ScriptedEvent::Network(c) => {
                self.set_connectivity(c);
                Ok(())
            }
            ScriptedEvent::ResourcesReady => {
                self.resources_ready();
                Ok(())
            }
            ScriptedEvent::ContinueOffline => self.continue_offline(),
            ScriptedEvent::Retry => self.retry(),
        };
        if let Err(e) = result {
            warn!("{:?} at {}ms rejected: {}", event, self.now(), e);
            self.record(TimelineEvent::ActionRejected(e.to_string()));
        }
    }

    fn drain_inbox(&mut self) {
        loop {
            let notice = self.inbox.borrow_mut().pop_front();
            let Some(notice) = notice else {
                break;
            };
            match notice {
                HostNotice::Network(c) => {
                    if c != self.shell.connectivity() {
                        self.record(TimelineEvent::ConnectivityChanged(c));
                    }
                    self.shell.on_network_change(c);
                    if let Some(loader) = self.loader.as_mut() {
                        let before = loader.snapshot();
                        let effects = loader.set_connectivity(c);
                        let after = loader.snapshot();
                        self.observe(before, after);
                        self.apply_loader(effects);
                    }
                }
                HostNotice::Ready => {
                    self.record(TimelineEvent::ResourcesReady);
                    let effects = self.shell.on_resources_ready();
                    self.apply_shell(effects);
                }
            }
        }
    }

    fn apply_shell(&mut self, effects: Vec<ShellEffect>) {
        for effect in effects {
            match effect {
                ShellEffect::Schedule { timer, delay_ms } => {
                    let handle = self
                        .clock
                        .schedule_once(u64::from(delay_ms), Task::Shell(timer));
                    self.shell_timers.insert(timer, handle);
                }
                ShellEffect::RevealContent => {
                    self.teardown_loader();
                    self.revealed_at = Some(self.now());
                    self.record(TimelineEvent::ContentRevealed);
                }
            }
        }
    }

    fn apply_loader(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Repeat { timer, interval_ms } => {
                    self.cancel_loader_timer(timer);
                    let handle = self
                        .clock
                        .schedule_every(u64::from(interval_ms), Task::Loader(timer));
                    self.loader_timers.insert(timer, handle);
                }
                Effect::Schedule { timer, delay_ms } => {
                    self.cancel_loader_timer(timer);
                    let handle = self
                        .clock
                        .schedule_once(u64::from(delay_ms), Task::Loader(timer));
                    self.loader_timers.insert(timer, handle);
                }
                Effect::Cancel(timer) => self.cancel_loader_timer(timer),
                Effect::Complete => {
                    self.completions += 1;
                    self.record(TimelineEvent::IntroComplete);
                    let effects = self.shell.on_intro_complete();
                    self.apply_shell(effects);
                }
                Effect::Reload => {
                    self.record(TimelineEvent::ReloadRequested);
                    self.unload();
                }
            }
        }
    }

    fn cancel_loader_timer(&mut self, timer: Timer) {
        if let Some(handle) = self.loader_timers.remove(&timer) {
            self.clock.cancel(handle);
        }
    }

    /// Page is going away: drop every task and host subscription.
    fn unload(&mut self) {
        self.reloaded = true;
        self.loader = None;
        for (_, handle) in self.loader_timers.drain() {
            self.clock.cancel(handle);
        }
        for (_, handle) in self.shell_timers.drain() {
            self.clock.cancel(handle);
        }
        self.subscriptions.clear();
        debug!("session unloaded at {}ms", self.clock.now());
    }

    fn observe(&mut self, before: LoaderSnapshot, after: LoaderSnapshot) {
        if before.state != after.state {
            self.record(TimelineEvent::StateChanged(after.state));
        }
        if before.phase_label != after.phase_label {
            self.record(TimelineEvent::PhaseChanged {
                percent: after.percent(),
                label: after.phase_label,
            });
        }
    }

    fn record(&mut self, event: TimelineEvent) {
        self.timeline.push(self.clock.now(), event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoaderTimings, ShellTimings};
    use crate::loader::LoaderState;
    use crate::shell::View;

    fn config(floor_ms: u32, ready_delay_ms: u32) -> Config {
        Config {
            loader: LoaderTimings::default(),
            shell: ShellTimings {
                floor_ms,
                ready_delay_ms,
            },
        }
    }

    fn started(config: Config, connectivity: Connectivity) -> Simulation {
        let mut sim = Simulation::new(config, connectivity).unwrap();
        sim.start();
        sim
    }

    #[test]
    fn test_first_load_completes_at_expected_time() {
        // Floor held long enough that the small step applies throughout
        let mut sim = started(config(10_000, 0), Connectivity::Online);
        sim.resources_ready();
        sim.run_until(5_359);
        assert_eq!(sim.completions(), 0);
        assert!(sim.loader().unwrap().progress() < 100.0);

        sim.run_until(5_360);
        assert_eq!(sim.loader().unwrap().progress(), 100.0);
        assert_eq!(sim.completions(), 0);

        sim.run_until(5_860);
        assert_eq!(sim.completions(), 1);
        assert_eq!(sim.timeline().first(&TimelineEvent::IntroComplete), Some(5_860));
        assert_eq!(sim.shell().view(), View::Loader);

        assert_eq!(sim.run_until_revealed(60_000), Some(10_000));
        assert_eq!(sim.completions(), 1);
    }

    #[test]
    fn test_default_session_reveals_once() {
        let mut sim = started(Config::default(), Connectivity::Online);
        sim.resources_ready();
        let revealed = sim.run_until_revealed(60_000).unwrap();
        // Faster than the all-small-step run once the floor has passed
        assert!(revealed > 2_000);
        assert!(revealed < 5_860);
        assert_eq!(sim.completions(), 1);
        assert!(sim.loader().is_none());
        assert_eq!(sim.loader_tasks(), 0);
        assert_eq!(sim.pending_tasks(), 0);
        assert_eq!(sim.timeline().count(&TimelineEvent::ContentRevealed), 1);
    }

    #[test]
    fn test_progress_never_decreases_in_timeline() {
        let mut sim = started(Config::default(), Connectivity::Online);
        sim.resources_ready();
        sim.run_until_revealed(60_000);
        let phases: Vec<(u32, &str)> = sim
            .timeline()
            .entries()
            .iter()
            .filter_map(|e| match e.event {
                TimelineEvent::PhaseChanged { percent, label } => Some((percent, label)),
                _ => None,
            })
            .collect();
        assert_eq!(phases.len(), 5);
        assert!(phases.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(phases.last().map(|p| p.1), Some("Almost Ready..."));
    }

    #[test]
    fn test_offline_from_start_then_continue() {
        let mut sim = started(config(2_000, 0), Connectivity::Offline);
        sim.resources_ready();
        sim.run_until(2_999);
        let loader = sim.loader().unwrap();
        assert_eq!(loader.progress(), 0.0);
        assert!(!loader.retry_offered());
        assert_eq!(loader.state(), LoaderState::OfflineWaiting);

        sim.run_until(3_000);
        assert!(sim.loader().unwrap().retry_offered());
        assert_eq!(sim.loader().unwrap().state(), LoaderState::OfflineChoice);

        sim.continue_offline().unwrap();
        assert_eq!(sim.loader().unwrap().progress(), 100.0);
        sim.continue_offline().unwrap();

        assert_eq!(sim.run_until_revealed(60_000), Some(3_500));
        assert_eq!(sim.completions(), 1);
    }

    #[test]
    fn test_floor_governs_when_ready_is_immediate() {
        let mut cfg = config(5_000, 0);
        cfg.loader.offline_wait_ms = 100;
        let mut sim = started(cfg, Connectivity::Offline);
        sim.resources_ready();
        sim.schedule(100, ScriptedEvent::ContinueOffline);

        sim.run_until(600);
        assert_eq!(sim.completions(), 1);
        assert!(sim.shell().should_show_loader());

        sim.run_until(4_999);
        assert!(sim.shell().should_show_loader());
        sim.run_until(5_000);
        assert!(!sim.shell().should_show_loader());
        assert_eq!(sim.revealed_at(), Some(5_000));
    }

    #[test]
    fn test_no_progress_while_offline_until_restored() {
        let mut sim = started(config(10_000, 0), Connectivity::Offline);
        sim.run_until(1_000);
        assert_eq!(sim.loader().unwrap().progress(), 0.0);

        sim.set_connectivity(Connectivity::Online);
        assert_eq!(sim.loader().unwrap().state(), LoaderState::Loading);
        sim.run_until(1_800);
        // 10 ticks at the first-load step
        assert_eq!(sim.loader().unwrap().progress(), 15.0);
        // The retry offer was cancelled with the wait
        sim.run_until(5_000);
        assert!(!sim.loader().unwrap().retry_offered());
    }

    #[test]
    fn test_drop_mid_progress_waits_then_offers_choice() {
        let mut sim = started(config(10_000, 0), Connectivity::Online);
        sim.schedule(840, ScriptedEvent::Network(Connectivity::Offline));
        sim.run_until(840);
        let progress = sim.loader().unwrap().progress();
        assert_eq!(progress, 15.0);

        sim.run_until(3_839);
        assert_eq!(sim.loader().unwrap().progress(), progress);
        assert_eq!(sim.loader().unwrap().state(), LoaderState::OfflineWaiting);
        sim.run_until(3_840);
        assert_eq!(sim.loader().unwrap().state(), LoaderState::OfflineChoice);

        // Coming back online does not dismiss the choice
        sim.set_connectivity(Connectivity::Online);
        sim.run_until(6_000);
        assert_eq!(sim.loader().unwrap().state(), LoaderState::OfflineChoice);
        assert_eq!(sim.loader().unwrap().progress(), progress);
    }

    #[test]
    fn test_teardown_mid_progress_cancels_everything() {
        let mut sim = started(Config::default(), Connectivity::Online);
        sim.advance_by(1_000);
        assert_eq!(sim.now(), 1_000);
        assert_eq!(sim.loader_tasks(), 1);

        sim.teardown_loader();
        assert!(sim.loader().is_none());
        assert_eq!(sim.loader_tasks(), 0);
        let recorded = sim.timeline().entries().len();

        sim.run_until(20_000);
        assert_eq!(sim.completions(), 0);
        // Only the shell floor fired; nothing from the loader
        assert!(
            sim.timeline().entries()[recorded..]
                .iter()
                .all(|e| !matches!(e.event, TimelineEvent::PhaseChanged { .. }))
        );
    }

    #[test]
    fn test_network_after_reveal_is_informational() {
        let mut sim = started(Config::default(), Connectivity::Online);
        sim.resources_ready();
        sim.run_until_revealed(60_000).unwrap();

        sim.set_connectivity(Connectivity::Offline);
        assert_eq!(sim.shell().connectivity(), Connectivity::Offline);
        assert_eq!(sim.shell().view(), View::Content);
        assert!(sim.loader().is_none());
        assert_eq!(sim.pending_tasks(), 0);
    }

    #[test]
    fn test_retry_unloads_session() {
        let mut sim = started(Config::default(), Connectivity::Offline);
        sim.run_until(3_000);
        assert_eq!(sim.host_observers(), 2);

        sim.retry().unwrap();
        assert!(sim.is_reloaded());
        assert_eq!(sim.pending_tasks(), 0);
        assert_eq!(sim.host_observers(), 0);
        assert_eq!(sim.timeline().count(&TimelineEvent::ReloadRequested), 1);

        sim.run_until(60_000);
        assert_eq!(sim.completions(), 0);
        assert!(sim.revealed_at().is_none());
    }

    #[test]
    fn test_rejected_script_action_is_recorded() {
        let mut sim = started(Config::default(), Connectivity::Online);
        sim.schedule(100, ScriptedEvent::ContinueOffline);
        sim.run_until(100);
        assert!(
            sim.timeline()
                .entries()
                .iter()
                .any(|e| matches!(e.event, TimelineEvent::ActionRejected(_)))
        );
        assert_eq!(sim.loader().unwrap().state(), LoaderState::Loading);
    }

    #[test]
    fn test_actions_after_reveal_report_not_mounted() {
        let mut sim = started(Config::default(), Connectivity::Online);
        sim.resources_ready();
        sim.run_until_revealed(60_000).unwrap();
        assert!(matches!(sim.continue_offline(), Err(LoaderError::NotMounted)));
        assert!(matches!(sim.retry(), Err(LoaderError::NotMounted)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = Config::default();
        cfg.loader.tick_ms = 0;
        assert!(matches!(
            Simulation::new(cfg, Connectivity::Online),
            Err(LoaderError::InvalidConfig { .. })
        ));
    }
}
