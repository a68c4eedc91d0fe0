//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::netiom::{INPUTS_ENDPOINT, OUTPUTS_ENDPOINT, MAX_OUTPUT_PIN};
use serde::Deserialize;

use super::{DriveError, ENABLE_PIN};
use crate::{
    gray::MAX_BIT_WIDTH,
    speed_cmd::{DAC_BIT0_PIN, DAC_BITS, DAC_WRITE_PIN}
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveParams {

    // ---- CALIBRATION ----

    /// Raw encoder angle at which the hour angle is zero.
    ///
    /// Units: degrees
    pub offset_deg: f64,

    /// Number of bits in the absolute encoder word.
    pub bit_width: u32,

    // ---- LIMITS ----

    /// Eastern soft stop, must be negative.
    ///
    /// Units: degrees
    pub east_stop_deg: f64,

    /// Western soft stop, must be positive.
    ///
    /// Units: degrees
    pub west_stop_deg: f64,

    /// A slew ends once the position error is no larger than this.
    ///
    /// Units: degrees
    pub convergence_threshold_deg: f64,

    /// Exponent of the speed law.
    pub speed_exponent: f64,

    /// A slew which has not converged after this long is abandoned.
    ///
    /// Units: seconds
    pub max_slew_duration_s: f64,

    // ---- TIMING ----

    /// Period of the slew control loop.
    ///
    /// Units: seconds
    pub poll_interval_s: f64,

    /// Delay between powering the amplifier and enabling it.
    ///
    /// Units: seconds
    pub enable_settle_s: f64,

    // ---- WIRING ----

    /// Output pin switching the amplifier power relay, if one is fitted.
    pub power_relay_pin: Option<u8>,

    /// Invert the DAC data outputs, for inverting line drivers.
    pub invert_dac_outputs: bool,

    /// Status page serving the encoder word.
    pub inputs_endpoint: String,

    /// Status page serving the output states.
    pub outputs_endpoint: String,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriveParams {
    fn default() -> Self {
        Self {
            offset_deg: 0.0,
            bit_width: crate::gray::DEFAULT_BIT_WIDTH,
            east_stop_deg: -110.0,
            west_stop_deg: 110.0,
            convergence_threshold_deg: 0.2,
            speed_exponent: 0.25,
            max_slew_duration_s: 600.0,
            poll_interval_s: 0.5,
            enable_settle_s: 10.0,
            power_relay_pin: None,
            invert_dac_outputs: false,
            inputs_endpoint: String::from(INPUTS_ENDPOINT),
            outputs_endpoint: String::from(OUTPUTS_ENDPOINT),
        }
    }
}

impl DriveParams {
    /// Check the parameters describe a drive that can be operated safely.
    pub fn validate(&self) -> Result<(), DriveError> {
        let invalid = |msg: String| Err(DriveError::InvalidParams(msg));

        if !self.offset_deg.is_finite() {
            return invalid(format!("offset_deg must be finite, got {}", self.offset_deg))
        }

        if self.bit_width == 0 || self.bit_width > MAX_BIT_WIDTH {
            return invalid(format!(
                "bit_width must be between 1 and {}, got {}", MAX_BIT_WIDTH, self.bit_width
            ))
        }

        if !(self.east_stop_deg < 0.0 && self.east_stop_deg > -180.0) {
            return invalid(format!(
                "east_stop_deg must be in (-180, 0), got {}", self.east_stop_deg
            ))
        }

        if !(self.west_stop_deg > 0.0 && self.west_stop_deg < 180.0) {
            return invalid(format!(
                "west_stop_deg must be in (0, 180), got {}", self.west_stop_deg
            ))
        }

        if !(self.convergence_threshold_deg > 0.0 && self.convergence_threshold_deg.is_finite()) {
            return invalid(format!(
                "convergence_threshold_deg must be positive, got {}",
                self.convergence_threshold_deg
            ))
        }

        if !(self.speed_exponent > 0.0 && self.speed_exponent.is_finite()) {
            return invalid(format!(
                "speed_exponent must be positive, got {}", self.speed_exponent
            ))
        }

        for (name, value) in &[
            ("max_slew_duration_s", self.max_slew_duration_s),
            ("poll_interval_s", self.poll_interval_s),
        ] {
            if !(*value > 0.0 && value.is_finite()) {
                return invalid(format!("{} must be positive, got {}", name, value))
            }
        }

        if !(self.enable_settle_s >= 0.0 && self.enable_settle_s.is_finite()) {
            return invalid(format!(
                "enable_settle_s must not be negative, got {}", self.enable_settle_s
            ))
        }

        if let Some(pin) = self.power_relay_pin {
            let dac_pins = DAC_BIT0_PIN..(DAC_BIT0_PIN + DAC_BITS);
            if pin == 0
                || pin > MAX_OUTPUT_PIN
                || dac_pins.contains(&pin)
                || pin == ENABLE_PIN
                || pin == DAC_WRITE_PIN
            {
                return invalid(format!(
                    "power_relay_pin {} is not a free output pin", pin
                ))
            }
        }

        if self.inputs_endpoint.is_empty() || self.outputs_endpoint.is_empty() {
            return invalid(String::from("status endpoints must not be empty"))
        }

        Ok(())
    }
}
