//! Application shell gate.
//!
//! Decides whether the loader overlay or the content tree is mounted. The
//! loader stays up until the intro reports completion and the minimum
//! duration has elapsed. The minimum duration is the later of the floor
//! timer (started once, at mount) and the resource-ready delay. Once the
//! content is revealed the gate never closes again; connectivity keeps
//! updating for status display only.

use log::{debug, info};

use crate::config::ShellTimings;
use crate::connectivity::Connectivity;

/// Timers the shell asks its host to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellTimer {
    /// Minimum loader duration, counted from mount.
    Floor,
    /// Extra delay after resources are ready.
    ReadyDelay,
}

/// Side effects requested by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEffect {
    Schedule { timer: ShellTimer, delay_ms: u32 },
    /// Unmount the loader and mount the content tree.
    RevealContent,
}

/// Which tree is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Loader,
    Content,
}

#[derive(Debug, Clone)]
pub struct ShellGate {
    timings: ShellTimings,
    connectivity: Connectivity,
    intro_visible: bool,
    floor_started: bool,
    floor_elapsed: bool,
    ready_seen: bool,
    ready_elapsed: bool,
    revealed: bool,
}

impl ShellGate {
    pub fn new(timings: ShellTimings, connectivity: Connectivity) -> Self {
        Self {
            timings,
            connectivity,
            intro_visible: true,
            floor_started: false,
            floor_elapsed: false,
            ready_seen: false,
            ready_elapsed: false,
            revealed: false,
        }
    }

    /// Start the floor timer. Only the first call has an effect.
    pub fn mount(&mut self) -> Vec<ShellEffect> {
        if self.floor_started {
            return Vec::new();
        }
        self.floor_started = true;
        vec![ShellEffect::Schedule {
            timer: ShellTimer::Floor,
            delay_ms: self.timings.floor_ms,
        }]
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Host connectivity changed. Never re-gates.
    pub fn on_network_change(&mut self, connectivity: Connectivity) {
        if self.connectivity != connectivity {
            debug!("network is now {}", connectivity);
            self.connectivity = connectivity;
        }
    }

    /// Document and assets finished loading. Later signals are ignored.
    pub fn on_resources_ready(&mut self) -> Vec<ShellEffect> {
        if self.ready_seen {
            return Vec::new();
        }
        self.ready_seen = true;
        debug!("resources ready");
        vec![ShellEffect::Schedule {
            timer: ShellTimer::ReadyDelay,
            delay_ms: self.timings.ready_delay_ms,
        }]
    }

    pub fn floor_elapsed(&mut self) -> Vec<ShellEffect> {
        self.floor_elapsed = true;
        self.check_reveal()
    }

    pub fn ready_delay_elapsed(&mut self) -> Vec<ShellEffect> {
        if self.ready_seen {
            self.ready_elapsed = true;
        }
        self.check_reveal()
    }

    /// Completion callback from the loader.
    pub fn on_intro_complete(&mut self) -> Vec<ShellEffect> {
        self.intro_visible = false;
        self.check_reveal()
    }

    pub fn intro_visible(&self) -> bool {
        self.intro_visible
    }

    pub fn min_load_elapsed(&self) -> bool {
        self.floor_elapsed && self.ready_elapsed
    }

    /// The first-load flag handed to the loader.
    pub fn is_initial_load(&self) -> bool {
        !self.min_load_elapsed()
    }

    pub fn should_show_loader(&self) -> bool {
        !self.revealed && (!self.min_load_elapsed() || self.intro_visible)
    }

    pub fn view(&self) -> View {
        if self.should_show_loader() {
            View::Loader
        } else {
            View::Content
        }
    }

    fn check_reveal(&mut self) -> Vec<ShellEffect> {
        if self.revealed || self.should_show_loader() {
            return Vec::new();
        }
        self.revealed = true;
        info!("revealing content ({})", self.connectivity);
        vec![ShellEffect::RevealContent]
    }
}
