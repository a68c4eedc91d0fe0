//! # Simulated mount
//!
//! A [`Transport`] which behaves like the Netiom card wired to the mount. The DAC follows its data
//! pins while the write pin is low and holds its value while it is high. Whenever the encoder is
//! read with the drive enabled the axis advances by the held speed times the maximum rate, so the
//! simulation runs at the speed of the control loop rather than wall clock time.
//!
//! Faults can be injected on reads and on command batches to exercise the fail safe paths.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;
use log::trace;
use serde::Deserialize;

use comms_if::netiom::{
    OutputCmd, Transport, TransportError,
    INPUTS_ENDPOINT, OUTPUTS_ENDPOINT, MAX_OUTPUT_PIN
};
use util::maths::wrap_360;

use crate::{
    drive::ENABLE_PIN,
    gray::GrayCodec,
    position::PositionEncoder,
    speed_cmd::{dac_code, dac_speed, DAC_BIT0_PIN, DAC_BITS, DAC_WRITE_PIN},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated mount.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Hour angle the axis starts at.
    ///
    /// Units: degrees
    pub initial_hour_angle_deg: f64,

    /// Encoder angle at zero hour angle.
    ///
    /// Units: degrees
    pub offset_deg: f64,

    /// Distance moved per encoder read at full speed.
    ///
    /// Units: degrees
    pub max_rate_deg_per_poll: f64,

    /// The DAC data pins are wired through inverting drivers.
    pub invert_dac_outputs: bool,

    /// Names of status pages, matching the drive's configuration.
    pub inputs_endpoint: String,
    pub outputs_endpoint: String,
}

/// The simulated mount.
pub struct SimMount {
    params: SimParams,
    encoder: PositionEncoder,

    /// Output pin states, index 0 unused.
    pins: [bool; MAX_OUTPUT_PIN as usize + 1],

    /// Value presented by the DAC.
    dac: u8,

    hour_angle_deg: f64,

    reads: u64,
    batches: u64,

    read_faults: FaultPlan,
    send_faults: FaultPlan,

    log: Vec<OutputCmd>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// When to inject a fault. Counts start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPlan {
    Never,

    /// Fail only the n-th operation.
    Nth(u64),

    /// Fail the n-th operation and every one after it.
    FromNth(u64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            initial_hour_angle_deg: 0.0,
            offset_deg: 0.0,
            max_rate_deg_per_poll: 2.0,
            invert_dac_outputs: false,
            inputs_endpoint: String::from(INPUTS_ENDPOINT),
            outputs_endpoint: String::from(OUTPUTS_ENDPOINT),
        }
    }
}

impl FaultPlan {
    fn hits(&self, count: u64) -> bool {
        match *self {
            FaultPlan::Never => false,
            FaultPlan::Nth(n) => count == n,
            FaultPlan::FromNth(n) => count >= n,
        }
    }
}

impl SimMount {
    pub fn new(params: SimParams, codec: Arc<GrayCodec>) -> Self {
        Self {
            hour_angle_deg: params.initial_hour_angle_deg,
            params,
            encoder: PositionEncoder::new(codec),
            pins: [false; MAX_OUTPUT_PIN as usize + 1],
            dac: dac_code(0.0),
            reads: 0,
            batches: 0,
            read_faults: FaultPlan::Never,
            send_faults: FaultPlan::Never,
            log: Vec::new(),
        }
    }

    pub fn set_read_faults(&mut self, plan: FaultPlan) {
        self.read_faults = plan;
    }

    pub fn set_send_faults(&mut self, plan: FaultPlan) {
        self.send_faults = plan;
    }

    /// True if the drive enable pin is high.
    pub fn enabled(&self) -> bool {
        self.pins[ENABLE_PIN as usize]
    }

    pub fn pin(&self, pin: u8) -> bool {
        self.pins.get(pin as usize).copied().unwrap_or(false)
    }

    pub fn dac(&self) -> u8 {
        self.dac
    }

    /// Speed the amplifier is currently being asked for.
    pub fn speed(&self) -> f64 {
        dac_speed(self.dac)
    }

    pub fn hour_angle_deg(&self) -> f64 {
        self.hour_angle_deg
    }

    /// Move the axis by hand.
    pub fn set_hour_angle_deg(&mut self, hour_angle_deg: f64) {
        self.hour_angle_deg = hour_angle_deg;
    }

    /// Number of encoder reads so far, including failed ones.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Every command applied so far, in order.
    pub fn log(&self) -> &[OutputCmd] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    fn apply(&mut self, cmd: OutputCmd) {
        self.pins[cmd.pin() as usize] = cmd.is_high();

        if !self.pins[DAC_WRITE_PIN as usize] {
            self.dac = self.dac_inputs();
        }

        self.log.push(cmd);
    }

    fn dac_inputs(&self) -> u8 {
        (0..DAC_BITS).fold(0u8, |acc, bit| {
            let set = self.pins[(DAC_BIT0_PIN + bit) as usize] != self.params.invert_dac_outputs;
            acc | ((set as u8) << bit)
        })
    }

    fn inputs_line(&mut self) -> Result<String, TransportError> {
        if self.enabled() {
            self.hour_angle_deg += self.speed() * self.params.max_rate_deg_per_poll;
        }

        let raw_deg = wrap_360(self.hour_angle_deg + self.params.offset_deg);
        let ordinal = self.encoder.deg_to_ordinal(raw_deg);

        trace!("Sim axis at {:.3} deg (ordinal {})", self.hour_angle_deg, ordinal);

        self.encoder
            .status_line(ordinal)
            .map_err(|e| TransportError::Simulated(e.to_string()))
    }

    fn outputs_lines(&self) -> Vec<String> {
        let bits = |pins: &[bool]| -> String {
            pins.iter().map(|&p| if p { '1' } else { '0' }).collect()
        };

        vec![bits(&self.pins[1..=8]), bits(&self.pins[9..])]
    }
}

impl Transport for SimMount {
    fn send(&mut self, cmds: &[OutputCmd]) -> Result<(), TransportError> {
        self.batches += 1;

        if self.send_faults.hits(self.batches) {
            return Err(TransportError::Simulated(format!(
                "injected fault on command batch {}", self.batches
            )))
        }

        for cmd in cmds {
            self.apply(*cmd);
        }

        Ok(())
    }

    fn read_lines(&mut self, endpoint: &str) -> Result<Vec<String>, TransportError> {
        if endpoint == self.params.inputs_endpoint {
            self.reads += 1;

            if self.read_faults.hits(self.reads) {
                return Err(TransportError::Simulated(format!(
                    "injected fault on read {}", self.reads
                )))
            }

            Ok(vec![self.inputs_line()?])
        }
        else if endpoint == self.params.outputs_endpoint {
            Ok(self.outputs_lines())
        }
        else {
            Err(TransportError::Status {
                url: endpoint.to_string(),
                status: 404
            })
        }
    }
}
