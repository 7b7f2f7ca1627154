//! Timing configuration for the loader and the shell gate.

use crate::error::LoaderError;

/// Timings owned by the loading-sequence controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoaderTimings {
    /// Interval between progress ticks.
    pub tick_ms: u32,
    /// Progress added per tick on the first load of a session.
    pub initial_step: f64,
    /// Progress added per tick on later loads.
    pub step: f64,
    /// Delay between reaching 100% and signalling completion.
    pub completion_delay_ms: u32,
    /// Time spent offline before retry/continue is offered.
    pub offline_wait_ms: u32,
}

impl Default for LoaderTimings {
    fn default() -> Self {
        Self {
            tick_ms: 80,
            initial_step: 1.5,
            step: 3.0,
            completion_delay_ms: 500,
            offline_wait_ms: 3000,
        }
    }
}

impl LoaderTimings {
    pub fn step_for(&self, initial_load: bool) -> f64 {
        if initial_load {
            self.initial_step
        } else {
            self.step
        }
    }

    /// Ticks needed to go from 0 to 100.
    pub fn ticks_to_complete(&self, initial_load: bool) -> u32 {
        (100.0 / self.step_for(initial_load)).ceil() as u32
    }

    pub fn validate(&self) -> Result<(), LoaderError> {
        if self.tick_ms == 0 {
            return Err(LoaderError::InvalidConfig {
                field: "tick_ms",
                reason: "must be greater than zero",
            });
        }
        check_step("initial_step", self.initial_step)?;
        check_step("step", self.step)
    }
}

fn check_step(field: &'static str, step: f64) -> Result<(), LoaderError> {
    if !step.is_finite() || step <= 0.0 || step > 100.0 {
        return Err(LoaderError::InvalidConfig {
            field,
            reason: "must be in (0, 100]",
        });
    }
    Ok(())
}

/// Timings owned by the application shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellTimings {
    /// Minimum time the loader stays up, counted from mount.
    pub floor_ms: u32,
    /// Extra delay after the resources-ready signal.
    pub ready_delay_ms: u32,
}

impl Default for ShellTimings {
    fn default() -> Self {
        Self {
            floor_ms: 2000,
            ready_delay_ms: 2000,
        }
    }
}

/// Full configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Config {
    pub loader: LoaderTimings,
    pub shell: ShellTimings,
}

impl Config {
    pub fn validate(&self) -> Result<(), LoaderError> {
        self.loader.validate()
    }
}
