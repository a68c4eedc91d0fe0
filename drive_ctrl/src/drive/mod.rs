//! # Drive control module
//!
//! Closed loop control of the hour angle axis. [`DriveCtrl`] owns the transport to the mount and
//! is the only thing which may command it.
//!
//! The drive fails safe: every fault raised while the drive may be moving disables the drive
//! before the fault is returned.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod monitor;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::netiom::TransportError;
use util::maths::wrap_180;

use crate::gray::GrayCodeError;

pub use monitor::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Output pin enabling the servo amplifier.
pub const ENABLE_PIN: u8 = 9;

/// Below this error magnitude the direction of travel is taken as positive.
const DIRECTION_DEADBAND_DEG: f64 = 1e-4;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Whether the servo amplifier output is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    Disabled,
    Enabled,
}

/// Reported state of the motor drive output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorStatus {
    On,
    Off,
}

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(GrayCodeError),

    #[error("Transport fault: {0}")]
    IoFault(TransportError),

    #[error("Sensor fault: {0}")]
    SensorFault(SensorFaultCause),

    #[error(
        "Target hour angle {target_deg:.2} deg is outside the soft stops \
        [{east_stop_deg:.1}, {west_stop_deg:.1}]"
    )]
    OutOfRange {
        target_deg: f64,
        east_stop_deg: f64,
        west_stop_deg: f64
    },

    #[error("Cannot command a non-zero speed while the drive is disabled")]
    NotEnabled,

    #[error("Slew cancelled by a stop request")]
    Cancelled,

    #[error("Slew did not converge within {0:.0} s")]
    SlewTimeout(f64),

    #[error("Invalid drive parameters: {0}")]
    InvalidParams(String),
}

/// Why a position or status read could not be trusted.
#[derive(Debug, thiserror::Error)]
pub enum SensorFaultCause {
    #[error("status read failed: {0}")]
    Transport(TransportError),

    #[error("status line could not be decoded: {0}")]
    Decode(GrayCodeError),

    #[error("status line {0:?} is malformed")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Speed demand for a signed position error.
///
/// The demand is `sign * (|diff| / 360) ^ exponent`. With an exponent below one this falls away
/// smoothly as the target is approached. An error inside the direction deadband drives in the
/// positive direction, although the slew loop stops before this matters.
pub fn speed_law(diff_deg: f64, exponent: f64) -> f64 {
    let sign = if diff_deg.abs() > DIRECTION_DEADBAND_DEG {
        diff_deg.signum()
    }
    else {
        1.0
    };

    sign * (diff_deg.abs() / 360.0).powf(exponent)
}

/// True if the hour angle lies strictly between the soft stops.
pub fn visible(hour_angle_deg: f64, east_stop_deg: f64, west_stop_deg: f64) -> bool {
    let ha = wrap_180(hour_angle_deg);

    east_stop_deg < ha && ha < west_stop_deg
}

impl From<GrayCodeError> for DriveError {
    fn from(e: GrayCodeError) -> Self {
        DriveError::InvalidEncoding(e)
    }
}

impl From<TransportError> for DriveError {
    fn from(e: TransportError) -> Self {
        DriveError::IoFault(e)
    }
}
