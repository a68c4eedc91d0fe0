//! Parameters structure for the Tracker

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for tracking.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackParams {
    /// Time between the start of one tick and the next.
    ///
    /// Units: seconds
    pub poll_interval_s: f64,

    /// Tracking ends after this many ticks in a row have failed.
    pub max_consecutive_faults: u32,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            poll_interval_s: 10.0,
            max_consecutive_faults: 5,
        }
    }
}
