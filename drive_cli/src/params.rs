//! # Drive Console Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriveCliParams {

    /// Endpoint of the drive executable's telecommand server
    pub tc_endpoint: String,
}

impl Default for DriveCliParams {
    fn default() -> Self {
        Self {
            tc_endpoint: String::from("tcp://localhost:5030"),
        }
    }
}
