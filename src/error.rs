//! Error type shared by the loader, shell and simulator.

use thiserror::Error;

use crate::loader::LoaderState;

/// Errors produced by the intro loader core.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// A timing value is out of range.
    #[error("invalid config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },

    /// A user action was invoked outside the offline choice.
    #[error("{action} is not available while {state}")]
    ActionUnavailable {
        action: &'static str,
        state: LoaderState,
    },

    /// No loader is mounted to receive a user action.
    #[error("no loader is mounted")]
    NotMounted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
