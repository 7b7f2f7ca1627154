//! Network connectivity as reported by the host environment.

use std::fmt;

/// Two-valued connectivity signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

impl Connectivity {
    /// Map a `navigator.onLine` style flag.
    pub fn from_online(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }

    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }

    /// Text shown under the progress bar.
    pub fn status_label(self) -> &'static str {
        match self {
            Connectivity::Online => "Loading Experience",
            Connectivity::Offline => "Offline Mode",
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => write!(f, "online"),
            Connectivity::Offline => write!(f, "offline"),
        }
    }
}
