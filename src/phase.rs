//! Phase labels shown beneath the progress bar.
//!
//! The label is picked from an ordered list by progress fraction, rounding
//! down and clamping to the last entry so the final label covers the tail
//! of the range.

use crate::connectivity::Connectivity;

pub const ONLINE_PHASES: &[&str] = &[
    "Initializing Systems...",
    "Loading Technologies...",
    "Connecting Networks...",
    "Preparing Experience...",
    "Almost Ready...",
];

pub const OFFLINE_PHASES: &[&str] = &[
    "Checking Connection...",
    "Connection Lost...",
    "Working Offline...",
    "Ready to Continue...",
];

/// Phase list active for the given connectivity.
pub fn phases_for(connectivity: Connectivity) -> &'static [&'static str] {
    match connectivity {
        Connectivity::Online => ONLINE_PHASES,
        Connectivity::Offline => OFFLINE_PHASES,
    }
}

/// `min(floor(progress / 100 * count), count - 1)`.
///
/// Returns 0 for an empty list. Negative or NaN progress maps to 0.
pub fn phase_index(progress: f64, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let raw = (progress / 100.0 * count as f64).floor();
    if raw.is_nan() || raw <= 0.0 {
        return 0;
    }
    (raw as usize).min(count - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_index_rounds_down() {
        // 5 phases: each covers 20%
        assert_eq!(phase_index(0.0, 5), 0);
        assert_eq!(phase_index(19.5, 5), 0);
        assert_eq!(phase_index(20.0, 5), 1);
        assert_eq!(phase_index(79.5, 5), 3);
        assert_eq!(phase_index(80.0, 5), 4);
    }

    #[test]
    fn test_phase_index_clamps_to_last() {
        assert_eq!(phase_index(100.0, 5), 4);
        assert_eq!(phase_index(100.0, 4), 3);
        assert_eq!(phase_index(250.0, 4), 3);
    }

    #[test]
    fn test_phase_index_degenerate_inputs() {
        assert_eq!(phase_index(50.0, 0), 0);
        assert_eq!(phase_index(-10.0, 5), 0);
        assert_eq!(phase_index(f64::NAN, 5), 0);
    }

    #[test]
    fn test_phases_for_connectivity() {
        assert_eq!(phases_for(Connectivity::Online).len(), 5);
        assert_eq!(phases_for(Connectivity::Offline).len(), 4);
        assert_eq!(phases_for(Connectivity::Offline)[1], "Connection Lost...");
    }
}
