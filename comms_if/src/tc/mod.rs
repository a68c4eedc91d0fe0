//! # Telecommand module
//!
//! Telecommands are sent by the operator console to the drive executive as JSON over a zmq
//! REQ/REP pair. Every telecommand gets exactly one [`TcResponse`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the drive by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tc {
    /// Stop any motion immediately and disable the drive. Pre-empts slews and tracking.
    Stop,

    /// Slew to the meridian.
    Park,

    /// Slew to the given hour angle.
    Slew {
        /// Units: degrees
        hour_angle_deg: f64
    },

    /// Start tracking the configured target.
    Track,

    /// Request a status report.
    Status,
}

/// Response from the drive executive to a telecommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TcResponse {
    /// The telecommand was accepted.
    Ok,

    /// The drive is executing another motion, send `Stop` first.
    Busy,

    /// The telecommand was rejected for the given reason.
    Rejected(String),

    /// Reply to [`Tc::Status`].
    Status(DriveStatus),
}

/// What the drive executive is currently doing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Activity {
    Idle,
    Slewing {
        target_deg: f64
    },
    Tracking,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Snapshot of the drive's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveStatus {
    /// True if the drive output is enabled.
    pub enabled: bool,

    /// The activity of the executive.
    pub activity: Activity,

    /// Hour angle at the last successful encoder poll, if any.
    ///
    /// Units: degrees
    pub hour_angle_deg: Option<f64>,

    /// Right ascension the telescope pointed at during the last poll, if a sidereal clock is
    /// configured.
    ///
    /// Units: degrees
    pub ra_deg: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::InvalidJson)
    }
}

impl TcResponse {
    /// Parse a response from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the response into a JSON packet
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::InvalidJson)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tc_json() {
        assert_eq!(Tc::Stop.to_json().unwrap(), "\"Stop\"");
        assert_eq!(
            Tc::from_json("{\"Slew\":{\"hour_angle_deg\":-12.5}}").unwrap(),
            Tc::Slew { hour_angle_deg: -12.5 }
        );
        assert!(Tc::from_json("{\"Launch\":null}").is_err());
    }

    #[test]
    fn test_status_response() {
        let resp = TcResponse::Status(DriveStatus {
            enabled: true,
            activity: Activity::Slewing { target_deg: 10.0 },
            hour_angle_deg: Some(3.0),
            ra_deg: None,
        });

        let json = resp.to_json().unwrap();
        assert_eq!(TcResponse::from_json(&json).unwrap(), resp);
    }
}
