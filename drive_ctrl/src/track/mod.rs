//! # Tracking module
//!
//! Keeps the drive pointed at a moving target. Each tick the target's hour angle is computed and
//! the drive slewed to it, or parked on the meridian while the target is outside the soft stops.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::{drive::DriveError, ephem::EphemError};

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Things that happen while tracking, reported to an optional listener.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEvent {
    /// The drive reached the target.
    Slewed {
        target_deg: f64,
        position_deg: f64
    },

    /// The target is outside the soft stops so the drive was parked.
    OutOfView {
        target_deg: f64
    },

    /// A tick failed, tracking continues on the next tick unless the fault limit is reached.
    Fault {
        error: String,
        consecutive: u32
    },
}

/// Possible errors that end tracking.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Could not compute the target position: {0}")]
    Ephem(#[from] EphemError),

    #[error("Drive error: {0}")]
    Drive(#[from] DriveError),

    #[error("The drive lock was poisoned by a panic on another thread")]
    Poisoned,
}
