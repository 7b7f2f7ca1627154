//! # portfolio-rs
//!
//! Intro loader and content gate for a single-page portfolio.
//!
//! The page shows a loading overlay until two things are true: a minimum
//! display time has passed, and the intro sequence has finished. The intro
//! animates a progress bar with phase labels, pauses when the network is
//! lost and, after a short wait, offers to reload or continue offline.
//!
//! ## Overview
//!
//! - [`ShellGate`]: decides whether the loader or the content is mounted
//! - [`LoaderController`]: progress, phases and the offline branch
//! - [`Signal`]: host notifications with scoped subscriptions
//! - [`Simulation`]: runs both on a virtual clock for tests and the CLI
//!
//! Both state machines are host-agnostic. Their operations return effects
//! (start a timer, cancel a timer, signal completion) and the host applies
//! them: gloo timers in the web UI, a [`VirtualClock`] here.
//!
//! ## Example
//!
//! ```
//! use portfolio_rs::{Connectivity, LoaderController, LoaderState, LoaderTimings};
//!
//! let (mut loader, _) =
//!     LoaderController::mount(LoaderTimings::default(), Connectivity::Offline, true);
//! assert_eq!(loader.state(), LoaderState::OfflineWaiting);
//!
//! loader.retry_offer_elapsed();
//! loader.continue_offline().unwrap();
//! assert_eq!(loader.progress(), 100.0);
//! ```

pub mod clock;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod loader;
pub mod phase;
pub mod shell;
pub mod signal;
pub mod sim;
pub mod timeline;

pub use clock::{TaskHandle, VirtualClock};
pub use config::{Config, LoaderTimings, ShellTimings};
pub use connectivity::Connectivity;
pub use error::LoaderError;
pub use loader::{Effect, LoaderController, LoaderSnapshot, LoaderState, Timer};
pub use phase::{OFFLINE_PHASES, ONLINE_PHASES, phase_index, phases_for};
pub use shell::{ShellEffect, ShellGate, ShellTimer, View};
pub use signal::{Signal, Subscription};
pub use sim::{Host, ScriptedEvent, Simulation};
pub use timeline::{Timeline, TimelineEntry, TimelineEvent};
