//! # Speed command encoder
//!
//! The servo amplifier's speed demand comes from an 8-bit DAC whose data inputs are wired to
//! Netiom outputs 1 to 8 (output `i + 1` carries bit `i`). Output 10 drives the DAC's write pin:
//! while it is low the DAC reads its inputs, while it is high the analogue voltage is held.
//!
//! A speed of `+1` is full speed clockwise (DAC code 0), `-1` full speed backwards (DAC code 255).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::netiom::OutputCmd;
use log::warn;
use util::maths::{lin_map, saturate};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Output pin carrying DAC bit 0. Bit `i` is on pin `DAC_BIT0_PIN + i`.
pub const DAC_BIT0_PIN: u8 = 1;

/// Number of DAC data bits.
pub const DAC_BITS: u8 = 8;

/// Output pin connected to the DAC's write pin.
pub const DAC_WRITE_PIN: u8 = 10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Turns speed demands into DAC write sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedEncoder {
    /// Set a pin low for a 1 bit instead of high, for inverting output drivers.
    invert_outputs: bool,
}

/// An encoded speed demand.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedCommand {
    /// Speed actually encoded after saturation.
    pub speed: f64,

    /// DAC code.
    pub dac: u8,

    /// Output commands to send, in order.
    pub cmds: Vec<OutputCmd>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SpeedEncoder {
    pub fn new(invert_outputs: bool) -> Self {
        Self { invert_outputs }
    }

    /// Encode a speed in [-1, 1].
    ///
    /// Out of range speeds saturate at the nearest limit with a warning, matching what the DAC
    /// does physically. `NaN` is treated as a zero speed demand.
    pub fn encode(&self, speed: f64) -> SpeedCommand {
        let speed = if speed.is_nan() {
            warn!("Speed demand is NaN, commanding zero speed");
            0.0
        }
        else {
            let (s, saturated) = saturate(speed, -1.0, 1.0);
            if saturated {
                warn!("Speed demand {} is out of range, saturated to {}", speed, s);
            }
            s
        };

        let dac = dac_code(speed);

        // Open the DAC, present the bits most significant first, then latch
        let mut cmds = Vec::with_capacity(DAC_BITS as usize + 3);
        cmds.push(OutputCmd::Low(DAC_WRITE_PIN));
        for bit in (0..DAC_BITS).rev() {
            let set = dac & (1 << bit) != 0;
            cmds.push(OutputCmd::set(DAC_BIT0_PIN + bit, set != self.invert_outputs));
        }
        cmds.push(OutputCmd::High(DAC_WRITE_PIN));
        cmds.push(OutputCmd::Low(DAC_WRITE_PIN));

        SpeedCommand { speed, dac, cmds }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// DAC code for a speed already within [-1, 1].
pub fn dac_code(speed: f64) -> u8 {
    lin_map((1.0, -1.0), (0.0, 255.0), speed).round() as u8
}

/// Speed produced by a DAC code, the inverse of [`dac_code`] up to quantisation.
pub fn dac_speed(dac: u8) -> f64 {
    lin_map((0.0, 255.0), (1.0, -1.0), dac as f64)
}
