//! Loading-sequence controller.
//!
//! Simulates a progress-driven intro, branches on connectivity and hands
//! control back to the shell exactly once. The controller never touches a
//! real timer: every operation returns the [`Effect`]s a host must apply
//! (start or cancel a timer, fire the completion callback, reload the page),
//! so the same state machine runs under gloo timers in the browser and under
//! the virtual clock in [`crate::sim`].
//!
//! ```
//! use portfolio_rs::{Connectivity, Effect, LoaderController, LoaderTimings, Timer};
//!
//! let (mut loader, effects) =
//!     LoaderController::mount(LoaderTimings::default(), Connectivity::Online, false);
//! assert_eq!(effects, vec![Effect::Repeat { timer: Timer::Progress, interval_ms: 80 }]);
//!
//! loader.tick();
//! assert_eq!(loader.progress(), 3.0);
//! ```

use std::fmt;

use log::{debug, info};

use crate::config::LoaderTimings;
use crate::connectivity::Connectivity;
use crate::error::LoaderError;
use crate::phase::{phase_index, phases_for};

/// Controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderState {
    /// Progress ticks while online.
    Loading,
    /// Offline, waiting before offering a choice.
    OfflineWaiting,
    /// Offline, retry and continue-offline offered.
    OfflineChoice,
    /// Completion signalled. Terminal.
    Completed,
}

impl fmt::Display for LoaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoaderState::Loading => "loading",
            LoaderState::OfflineWaiting => "waiting offline",
            LoaderState::OfflineChoice => "offering offline choice",
            LoaderState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Timers the controller asks its host to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Repeating progress tick.
    Progress,
    /// One-shot offline wait before the choice is offered.
    RetryOffer,
    /// One-shot delay between 100% and the completion callback.
    Completion,
}

/// Side effects requested by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Start a repeating timer, replacing any running one of the same kind.
    Repeat { timer: Timer, interval_ms: u32 },
    /// Start a one-shot timer.
    Schedule { timer: Timer, delay_ms: u32 },
    /// Cancel a timer if it is running.
    Cancel(Timer),
    /// Invoke the completion callback.
    Complete,
    /// Reload the page.
    Reload,
}

/// Render-facing view of the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoaderSnapshot {
    pub state: LoaderState,
    pub progress: f64,
    pub phase_index: usize,
    pub phase_label: &'static str,
    pub connectivity: Connectivity,
    pub retry_offered: bool,
}

impl LoaderSnapshot {
    /// Percentage as displayed, rounded to the nearest integer.
    pub fn percent(&self) -> u32 {
        self.progress.round().clamp(0.0, 100.0) as u32
    }

    /// Whether the retry / continue-offline panel replaces the progress bar.
    pub fn shows_offline_choice(&self) -> bool {
        self.retry_offered && self.state == LoaderState::OfflineChoice
    }
}

/// The loading-sequence state machine. One instance per mount.
#[derive(Debug, Clone)]
pub struct LoaderController {
    timings: LoaderTimings,
    state: LoaderState,
    progress: f64,
    phase_index: usize,
    connectivity: Connectivity,
    initial_load: bool,
    retry_offered: bool,
    /// Completion timer armed; waiting to enter `Completed`.
    finishing: bool,
    detached: bool,
}

impl LoaderController {
    /// Create a controller with progress at 0 and return the timers to start.
    pub fn mount(
        timings: LoaderTimings,
        connectivity: Connectivity,
        initial_load: bool,
    ) -> (Self, Vec<Effect>) {
        let mut controller = Self {
            timings,
            state: LoaderState::Loading,
            progress: 0.0,
            phase_index: 0,
            connectivity,
            initial_load,
            retry_offered: false,
            finishing: false,
            detached: false,
        };
        let effects = match connectivity {
            Connectivity::Online => vec![controller.start_ticker()],
            Connectivity::Offline => controller.enter_offline_wait(),
        };
        debug!(
            "loader mounted {} (initial load: {})",
            connectivity, initial_load
        );
        (controller, effects)
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    pub fn phase_label(&self) -> &'static str {
        phases_for(self.connectivity)
            .get(self.phase_index)
            .copied()
            .unwrap_or_default()
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn retry_offered(&self) -> bool {
        self.retry_offered
    }

    pub fn initial_load(&self) -> bool {
        self.initial_load
    }

    /// True once 100% was reached and the completion timer is armed.
    pub fn is_finishing(&self) -> bool {
        self.finishing
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn snapshot(&self) -> LoaderSnapshot {
        LoaderSnapshot {
            state: self.state,
            progress: self.progress,
            phase_index: self.phase_index,
            phase_label: self.phase_label(),
            connectivity: self.connectivity,
            retry_offered: self.retry_offered,
        }
    }

    /// Progress timer fired.
    ///
    /// Stale ticks (offline, finishing, detached) are ignored.
    pub fn tick(&mut self) -> Vec<Effect> {
        if self.detached
            || self.finishing
            || self.state != LoaderState::Loading
            || !self.connectivity.is_online()
        {
            return Vec::new();
        }

        self.progress += self.timings.step_for(self.initial_load);
        if self.progress >= 100.0 {
            self.progress = 100.0;
            self.refresh_phase();
            self.finishing = true;
            debug!("progress reached 100");
            return vec![
                Effect::Cancel(Timer::Progress),
                Effect::Schedule {
                    timer: Timer::Completion,
                    delay_ms: self.timings.completion_delay_ms,
                },
            ];
        }
        self.refresh_phase();
        Vec::new()
    }

    /// Host connectivity changed. Repeated identical signals are no-ops.
    pub fn set_connectivity(&mut self, connectivity: Connectivity) -> Vec<Effect> {
        if self.detached || connectivity == self.connectivity {
            return Vec::new();
        }
        self.connectivity = connectivity;
        self.refresh_phase();
        if self.finishing {
            return Vec::new();
        }

        match (self.state, connectivity) {
            (LoaderState::Loading, Connectivity::Offline) => {
                let mut effects = vec![Effect::Cancel(Timer::Progress)];
                effects.extend(self.enter_offline_wait());
                effects
            }
            (LoaderState::OfflineWaiting, Connectivity::Online) => {
                debug!("connectivity restored, resuming at {}", self.progress);
                self.state = LoaderState::Loading;
                vec![Effect::Cancel(Timer::RetryOffer), self.start_ticker()]
            }
            // OfflineChoice stays put until the user acts.
            _ => Vec::new(),
        }
    }

    /// Update the first-load flag; the next tick uses the matching step.
    pub fn set_initial_load(&mut self, initial_load: bool) {
        if !self.detached {
            self.initial_load = initial_load;
        }
    }

    /// Offline wait elapsed.
    pub fn retry_offer_elapsed(&mut self) -> Vec<Effect> {
        if self.detached || self.finishing || self.state != LoaderState::OfflineWaiting {
            return Vec::new();
        }
        self.state = LoaderState::OfflineChoice;
        self.retry_offered = true;
        debug!("offering retry / continue offline");
        Vec::new()
    }

    /// Skip the rest of the sequence and finish despite lost connectivity.
    pub fn continue_offline(&mut self) -> Result<Vec<Effect>, LoaderError> {
        if self.detached || self.finishing || self.state == LoaderState::Completed {
            return Ok(Vec::new());
        }
        if self.state != LoaderState::OfflineChoice {
            return Err(LoaderError::ActionUnavailable {
                action: "continue offline",
                state: self.state,
            });
        }
        self.progress = 100.0;
        self.refresh_phase();
        self.finishing = true;
        debug!("continuing offline");
        Ok(vec![Effect::Schedule {
            timer: Timer::Completion,
            delay_ms: self.timings.completion_delay_ms,
        }])
    }

    /// Ask the host for a full page reload. Available for as long as the
    /// offline choice is shown, including the completion delay.
    pub fn retry(&mut self) -> Result<Vec<Effect>, LoaderError> {
        if self.detached || self.state != LoaderState::OfflineChoice {
            return Err(LoaderError::ActionUnavailable {
                action: "retry",
                state: self.state,
            });
        }
        info!("reload requested");
        Ok(vec![Effect::Reload])
    }

    /// Completion delay elapsed. Emits `Complete` at most once.
    pub fn completion_elapsed(&mut self) -> Vec<Effect> {
        if self.detached || !self.finishing || self.state == LoaderState::Completed {
            return Vec::new();
        }
        self.state = LoaderState::Completed;
        info!("intro sequence complete");
        vec![Effect::Complete]
    }

    /// Tear down: cancel every timer and make all later calls inert.
    pub fn unmount(&mut self) -> Vec<Effect> {
        if self.detached {
            return Vec::new();
        }
        self.detached = true;
        debug!("loader unmounted in state {}", self.state);
        vec![
            Effect::Cancel(Timer::Progress),
            Effect::Cancel(Timer::RetryOffer),
            Effect::Cancel(Timer::Completion),
        ]
    }

    fn start_ticker(&self) -> Effect {
        Effect::Repeat {
            timer: Timer::Progress,
            interval_ms: self.timings.tick_ms,
        }
    }

    fn enter_offline_wait(&mut self) -> Vec<Effect> {
        self.state = LoaderState::OfflineWaiting;
        debug!("offline, waiting {}ms", self.timings.offline_wait_ms);
        vec![Effect::Schedule {
            timer: Timer::RetryOffer,
            delay_ms: self.timings.offline_wait_ms,
        }]
    }

    fn refresh_phase(&mut self) {
        self.phase_index = phase_index(self.progress, phases_for(self.connectivity).len());
    }
}
