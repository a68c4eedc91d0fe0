//! # Drive Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use comms_if::netiom::NetiomParams;
use drive_lib::{
    drive::DriveParams,
    ephem::TargetParams,
    sim::SimParams,
    track::TrackParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveExecParams {

    /// Endpoint the telecommand socket binds to
    pub tc_endpoint: String,

    /// Drive the simulated mount instead of the Netiom card
    pub simulate: bool,

    /// Encoder calibration table, relative to the params directory. The reflected Gray code is
    /// used if this is not set.
    pub calibration_file: Option<String>,

    pub netiom: NetiomParams,

    pub drive: DriveParams,

    pub track: TrackParams,

    pub target: TargetParams,

    pub sim: SimParams,
}

impl Default for DriveExecParams {
    fn default() -> Self {
        Self {
            tc_endpoint: String::from("tcp://*:5030"),
            simulate: false,
            calibration_file: None,
            netiom: NetiomParams::default(),
            drive: DriveParams::default(),
            track: TrackParams::default(),
            target: TargetParams::default(),
            sim: SimParams::default(),
        }
    }
}
