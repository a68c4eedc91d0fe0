//! # Position encoder
//!
//! Converts the raw digital input line served by the Netiom card into an hour angle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;
use serde::Serialize;
use util::maths::wrap_180;

use crate::gray::{GrayCodec, GrayCodeError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Decodes encoder status lines using a shared [`GrayCodec`].
#[derive(Debug, Clone)]
pub struct PositionEncoder {
    codec: Arc<GrayCodec>,
}

/// A single decoded encoder reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EncoderReading {
    /// Ordinal position reported by the encoder.
    pub ordinal: u32,

    /// Angle of the encoder shaft, in the range [0, 360).
    ///
    /// Units: degrees
    pub raw_deg: f64,

    /// Hour angle after removing the calibration offset, in the range (-180, 180].
    ///
    /// Units: degrees
    pub hour_angle_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PositionEncoder {
    pub fn new(codec: Arc<GrayCodec>) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &GrayCodec {
        &self.codec
    }

    /// Decode a raw status line.
    ///
    /// The card reports the lowest bit first, so the line is reversed before decoding. Trailing
    /// whitespace (the HTTP line ending) is ignored.
    pub fn read(&self, raw_status_line: &str, offset_deg: f64) -> Result<EncoderReading, GrayCodeError> {
        let msb_first: String = raw_status_line.trim_end().chars().rev().collect();

        let ordinal = self.codec.decode(&msb_first)?;
        let raw_deg = self.ordinal_to_deg(ordinal);

        Ok(EncoderReading {
            ordinal,
            raw_deg,
            hour_angle_deg: wrap_180(raw_deg - offset_deg)
        })
    }

    /// Shaft angle of an ordinal position.
    pub fn ordinal_to_deg(&self, ordinal: u32) -> f64 {
        ordinal as f64 * 360.0 / self.codec.positions() as f64
    }

    /// Nearest ordinal position to a shaft angle.
    pub fn deg_to_ordinal(&self, raw_deg: f64) -> u32 {
        let n = self.codec.positions() as f64;
        let ordinal = (util::maths::wrap_360(raw_deg) / 360.0 * n).round();

        // Rounding up from just below 360 lands on n, which is position 0
        (ordinal as u64 % self.codec.positions() as u64) as u32
    }

    /// Build the status line the card would serve for an ordinal, lowest bit first.
    pub fn status_line(&self, ordinal: u32) -> Result<String, GrayCodeError> {
        Ok(self.codec.encode(ordinal)?.chars().rev().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn encoder() -> PositionEncoder {
        PositionEncoder::new(Arc::new(GrayCodec::new(13).unwrap()))
    }

    #[test]
    fn test_all_zero_line() {
        let r = encoder().read("0000000000000", 0.0).unwrap();

        assert_eq!(r.ordinal, 0);
        assert_abs_diff_eq!(r.raw_deg, 0.0);
        assert_abs_diff_eq!(r.hour_angle_deg, 0.0);
    }

    #[test]
    fn test_line_is_lsb_first() {
        let enc = encoder();

        // Ordinal 1 has code word ...0001, which the card sends as 1000...
        let r = enc.read("1000000000000\r\n", 0.0).unwrap();
        assert_eq!(r.ordinal, 1);
        assert_abs_diff_eq!(r.raw_deg, 360.0 / 8192.0);

        assert_eq!(enc.status_line(1).unwrap(), "1000000000000");
    }

    #[test]
    fn test_normalisation_and_offset() {
        let enc = encoder();

        // Three quarters of a turn is 270 deg raw, -90 deg hour angle
        let line = enc.status_line(6144).unwrap();
        let r = enc.read(&line, 0.0).unwrap();
        assert_abs_diff_eq!(r.raw_deg, 270.0);
        assert_abs_diff_eq!(r.hour_angle_deg, -90.0);

        // Exactly half a turn stays at +180
        let line = enc.status_line(4096).unwrap();
        assert_abs_diff_eq!(enc.read(&line, 0.0).unwrap().hour_angle_deg, 180.0);

        // The offset is subtracted before normalising
        let line = enc.status_line(1024).unwrap();
        assert_abs_diff_eq!(enc.read(&line, 5.0).unwrap().hour_angle_deg, 40.0);
        assert_abs_diff_eq!(enc.read(&line, 300.0).unwrap().hour_angle_deg, 105.0);
    }

    #[test]
    fn test_bad_lines() {
        let enc = encoder();

        assert!(matches!(
            enc.read("000000000000", 0.0),
            Err(GrayCodeError::WrongLength { expected: 13, found: 12 })
        ));
        assert!(matches!(
            enc.read("00000000000020", 0.0),
            Err(GrayCodeError::WrongLength { .. })
        ));
        assert!(matches!(
            enc.read("0000000000002", 0.0),
            Err(GrayCodeError::NonBinaryChar('2'))
        ));
    }

    #[test]
    fn test_deg_to_ordinal() {
        let enc = encoder();

        assert_eq!(enc.deg_to_ordinal(0.0), 0);
        assert_eq!(enc.deg_to_ordinal(90.0), 2048);
        assert_eq!(enc.deg_to_ordinal(-90.0), 6144);
        assert_eq!(enc.deg_to_ordinal(359.99), 0);
    }

    proptest! {
        #[test]
        fn hour_angle_is_normalised(ordinal in 0u32..8192, offset_deg in -720.0f64..720.0) {
            let enc = PositionEncoder::new(Arc::new(GrayCodec::new(13).unwrap()));
            let line: String = enc.codec().encode(ordinal).unwrap().chars().rev().collect();

            let reading = enc.read(&line, offset_deg).unwrap();

            prop_assert!(reading.hour_angle_deg > -180.0 && reading.hour_angle_deg <= 180.0);
            prop_assert!(reading.raw_deg >= 0.0 && reading.raw_deg < 360.0);

            // Same direction as the raw angle minus the offset, modulo a whole turn
            let turns = (reading.raw_deg - offset_deg - reading.hour_angle_deg) / 360.0;
            prop_assert!((turns - turns.round()).abs() < 1e-9);
        }
    }
}
