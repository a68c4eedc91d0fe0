//! # Drive control library.
//!
//! Hour angle drive control for the telescope mount: decoding the absolute encoder, commanding the
//! servo amplifier's speed DAC, closed loop slewing and sidereal tracking.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Cancellation token - cooperative stop for slews and tracking
pub mod cancel;

/// Drive control - enable/disable, speed and position, the slew control loop
pub mod drive;

/// Ephemeris - target hour angles and sidereal time
pub mod ephem;

/// Gray codec - lookup between encoder code words and ordinal positions
pub mod gray;

/// Position encoder - turns encoder status lines into hour angles
pub mod position;

/// Simulated mount - a transport standing in for the real hardware
pub mod sim;

/// Speed command encoder - speed demands to DAC pin sequences
pub mod speed_cmd;

/// Tracking - keeps the drive on a moving target
pub mod track;
