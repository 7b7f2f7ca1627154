//! Recorded history of a simulated session.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::connectivity::Connectivity;
use crate::error::LoaderError;
use crate::loader::LoaderState;

/// Observable events, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    ShellMounted,
    LoaderMounted {
        connectivity: Connectivity,
        initial_load: bool,
    },
    ConnectivityChanged(Connectivity),
    ResourcesReady,
    PhaseChanged {
        percent: u32,
        label: &'static str,
    },
    StateChanged(LoaderState),
    IntroComplete,
    ContentRevealed,
    LoaderUnmounted,
    ReloadRequested,
    ActionRejected(String),
}

impl fmt::Display for TimelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineEvent::ShellMounted => write!(f, "shell mounted"),
            TimelineEvent::LoaderMounted {
                connectivity,
                initial_load,
            } => {
                let load = if *initial_load { "first load" } else { "repeat load" };
                write!(f, "loader mounted ({connectivity}, {load})")
            }
            TimelineEvent::ConnectivityChanged(c) => write!(f, "network {c}"),
            TimelineEvent::ResourcesReady => write!(f, "resources ready"),
            TimelineEvent::PhaseChanged { percent, label } => write!(f, "{percent:>3}% {label}"),
            TimelineEvent::StateChanged(state) => write!(f, "loader {state}"),
            TimelineEvent::IntroComplete => write!(f, "intro complete"),
            TimelineEvent::ContentRevealed => write!(f, "content revealed"),
            TimelineEvent::LoaderUnmounted => write!(f, "loader unmounted"),
            TimelineEvent::ReloadRequested => write!(f, "reload requested"),
            TimelineEvent::ActionRejected(msg) => write!(f, "action rejected: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub at_ms: u64,
    pub event: TimelineEvent,
}

impl fmt::Display for TimelineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>7}ms  {}", self.at_ms, self.event)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, at_ms: u64, event: TimelineEvent) {
        self.entries.push(TimelineEntry { at_ms, event });
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Time of the first event equal to `event`.
    pub fn first(&self, event: &TimelineEvent) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| &e.event == event)
            .map(|e| e.at_ms)
    }

    pub fn count(&self, event: &TimelineEvent) -> usize {
        self.entries.iter().filter(|e| &e.event == event).count()
    }

    /// Write one line per entry, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> Result<(), LoaderError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_entry() {
        let entry = TimelineEntry {
            at_ms: 480,
            event: TimelineEvent::PhaseChanged {
                percent: 21,
                label: "Loading Technologies...",
            },
        };
        assert_eq!(entry.to_string(), "    480ms   21% Loading Technologies...");
    }

    #[test]
    fn test_first_and_count() {
        let mut t = Timeline::new();
        t.push(0, TimelineEvent::ShellMounted);
        t.push(10, TimelineEvent::ResourcesReady);
        t.push(20, TimelineEvent::ResourcesReady);
        assert_eq!(t.first(&TimelineEvent::ResourcesReady), Some(10));
        assert_eq!(t.count(&TimelineEvent::ResourcesReady), 2);
        assert_eq!(t.first(&TimelineEvent::ContentRevealed), None);
    }

    #[test]
    fn test_write_to_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("timeline.txt");
        let mut t = Timeline::new();
        t.push(0, TimelineEvent::ShellMounted);
        t.push(2000, TimelineEvent::ContentRevealed);
        t.write_to(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("content revealed"));
    }
}
