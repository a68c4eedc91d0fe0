//! # Gray code module
//!
//! The absolute encoder on the hour angle axis outputs a reflected binary Gray code. Reading the
//! encoder bits as a plain binary integer gives a "wire word", and the [`GrayCodec`] maps wire
//! words to ordinal positions around the axis (and back).
//!
//! The codec is table driven. The tables are generated once, either from the reflect-and-append
//! sequence or from a calibration file, and are read only afterwards so a single codec can be
//! shared between threads behind an `Arc`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
};
use log::{debug, warn};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Bit width of the encoder fitted to the telescope.
pub const DEFAULT_BIT_WIDTH: u32 = 13;

/// Largest supported bit width. Tables are `2^N` entries per direction.
pub const MAX_BIT_WIDTH: u32 = 24;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Bidirectional lookup between Gray code words and ordinal positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayCodec {
    bit_width: u32,

    /// Wire word of each ordinal position.
    codes: Vec<u32>,

    /// Ordinal position of each wire word.
    ordinals: Vec<u32>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Malformed Gray code input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GrayCodeError {
    #[error("Bit width {0} is not supported, expected 1 to 24")]
    UnsupportedWidth(u32),

    #[error("Ordinal {ordinal} is out of range for a {bit_width} bit code")]
    OrdinalOutOfRange {
        ordinal: u32,
        bit_width: u32
    },

    #[error("Word {word:#x} is out of range for a {bit_width} bit code")]
    WordOutOfRange {
        word: u32,
        bit_width: u32
    },

    #[error("Expected a {expected} bit code word, found {found} characters")]
    WrongLength {
        expected: usize,
        found: usize
    },

    #[error("Code word contains the non-binary character {0:?}")]
    NonBinaryChar(char),
}

/// Errors raised while loading a calibration table.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("Could not read the calibration table: {0}")]
    Io(std::io::Error),

    #[error("Invalid calibration width: {0}")]
    Width(GrayCodeError),

    #[error("Expected {expected} calibration lines, found {found}")]
    WrongLineCount {
        expected: usize,
        found: usize
    },

    #[error("Line {line} of the calibration table is not an ordinal: {content:?}")]
    InvalidLine {
        line: usize,
        content: String
    },

    #[error("Line {line} holds ordinal {ordinal} which is out of range")]
    OrdinalOutOfRange {
        line: usize,
        ordinal: u32
    },

    #[error("Line {line} repeats ordinal {ordinal}")]
    DuplicateOrdinal {
        line: usize,
        ordinal: u32
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GrayCodec {
    /// Generate the codec for an `bit_width` bit reflected binary Gray code.
    ///
    /// The sequence starts at the all-zero word. Every even term flips the least significant bit,
    /// every odd term flips the bit immediately to the left of the least significant set bit.
    pub fn new(bit_width: u32) -> Result<Self, GrayCodeError> {
        check_width(bit_width)?;

        let size = 1usize << bit_width;
        let mut codes = Vec::with_capacity(size);

        let mut word = 0u32;
        codes.push(word);

        for term in 2..=size {
            if term % 2 == 1 {
                let lowest = word.trailing_zeros();
                if lowest + 1 < bit_width {
                    word ^= 1 << (lowest + 1);
                }
            }
            else {
                word ^= 1;
            }

            codes.push(word);
        }

        Ok(Self::from_codes(bit_width, codes))
    }

    /// Load a calibration table.
    ///
    /// Line `i` holds the ordinal whose code word, read as a plain binary integer, is `i`.
    /// Surrounding whitespace and the legacy `.0` suffix are ignored. The table must hold exactly
    /// `2^bit_width` lines and be a permutation of the ordinals. Blank lines are only accepted at
    /// the end of the table. Line numbers in errors count from 1.
    pub fn from_calibration<R: BufRead>(
        reader: R,
        bit_width: u32
    ) -> Result<Self, CalibrationError> {
        check_width(bit_width).map_err(CalibrationError::Width)?;

        let size = 1usize << bit_width;
        let mut ordinals = Vec::with_capacity(size);

        // File line number of each ordinal, counted from 1
        let mut lines = Vec::with_capacity(size);
        let mut first_blank = None;

        for (idx, content) in reader.lines().enumerate() {
            let line = idx + 1;
            let content = content.map_err(CalibrationError::Io)?;
            let trimmed = content.trim();

            // Blank lines may only trail the table
            if trimmed.is_empty() {
                first_blank.get_or_insert(line);
                continue
            }
            if let Some(blank) = first_blank {
                return Err(CalibrationError::InvalidLine {
                    line: blank,
                    content: String::new()
                })
            }

            let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
            let ordinal: u32 = digits.parse().map_err(|_| CalibrationError::InvalidLine {
                line,
                content: content.clone()
            })?;

            if ordinal as usize >= size {
                return Err(CalibrationError::OrdinalOutOfRange { line, ordinal })
            }

            ordinals.push(ordinal);
            lines.push(line);
        }

        if ordinals.len() != size {
            return Err(CalibrationError::WrongLineCount {
                expected: size,
                found: ordinals.len()
            })
        }

        // Invert the table, rejecting repeated ordinals
        let mut codes = vec![u32::MAX; size];
        for (word, &ordinal) in ordinals.iter().enumerate() {
            if codes[ordinal as usize] != u32::MAX {
                return Err(CalibrationError::DuplicateOrdinal { line: lines[word], ordinal })
            }
            codes[ordinal as usize] = word as u32;
        }

        let codec = Self { bit_width, codes, ordinals };

        if !codec.is_single_step() {
            warn!(
                "Calibration table is not a single-step code, adjacent positions differ by more \
                than one bit"
            );
        }

        debug!("Loaded {} bit calibration table", bit_width);

        Ok(codec)
    }

    /// Load a calibration table from a file.
    pub fn from_calibration_file<P: AsRef<Path>>(
        path: P,
        bit_width: u32
    ) -> Result<Self, CalibrationError> {
        let file = File::open(path).map_err(CalibrationError::Io)?;

        Self::from_calibration(BufReader::new(file), bit_width)
    }

    /// Write the table in the calibration file format.
    pub fn write_calibration<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for ordinal in &self.ordinals {
            writeln!(writer, "{}.0", ordinal)?;
        }

        writer.flush()
    }

    /// Number of bits in a code word.
    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Number of distinct positions, `2^bit_width`.
    pub fn positions(&self) -> usize {
        self.codes.len()
    }

    /// Get the code word of an ordinal as a string, most significant bit first.
    pub fn encode(&self, ordinal: u32) -> Result<String, GrayCodeError> {
        let word = self.encode_word(ordinal)?;

        Ok(format!("{:0width$b}", word, width = self.bit_width as usize))
    }

    /// Get the ordinal of a code word given as a string, most significant bit first.
    pub fn decode(&self, bits: &str) -> Result<u32, GrayCodeError> {
        let expected = self.bit_width as usize;
        let found = bits.chars().count();
        if found != expected {
            return Err(GrayCodeError::WrongLength { expected, found })
        }

        let mut word = 0u32;
        for c in bits.chars() {
            word <<= 1;
            match c {
                '0' => (),
                '1' => word |= 1,
                _ => return Err(GrayCodeError::NonBinaryChar(c))
            }
        }

        self.decode_word(word)
    }

    /// Get the wire word of an ordinal.
    pub fn encode_word(&self, ordinal: u32) -> Result<u32, GrayCodeError> {
        self.codes
            .get(ordinal as usize)
            .copied()
            .ok_or(GrayCodeError::OrdinalOutOfRange { ordinal, bit_width: self.bit_width })
    }

    /// Get the ordinal of a wire word.
    pub fn decode_word(&self, word: u32) -> Result<u32, GrayCodeError> {
        self.ordinals
            .get(word as usize)
            .copied()
            .ok_or(GrayCodeError::WordOutOfRange { word, bit_width: self.bit_width })
    }

    /// True if consecutive positions (including the wrap from the last back to the first) differ
    /// by exactly one bit.
    pub fn is_single_step(&self) -> bool {
        let n = self.codes.len();

        (0..n).all(|i| (self.codes[i] ^ self.codes[(i + 1) % n]).count_ones() == 1)
    }

    fn from_codes(bit_width: u32, codes: Vec<u32>) -> Self {
        let mut ordinals = vec![0u32; codes.len()];
        for (ordinal, &word) in codes.iter().enumerate() {
            ordinals[word as usize] = ordinal as u32;
        }

        Self { bit_width, codes, ordinals }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn check_width(bit_width: u32) -> Result<(), GrayCodeError> {
    if bit_width == 0 || bit_width > MAX_BIT_WIDTH {
        Err(GrayCodeError::UnsupportedWidth(bit_width))
    }
    else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sequence_start() {
        let codec = GrayCodec::new(3).unwrap();
        let seq: Vec<String> = (0..8).map(|o| codec.encode(o).unwrap()).collect();

        assert_eq!(
            seq,
            vec!["000", "001", "011", "010", "110", "111", "101", "100"]
        );
    }

    #[test]
    fn test_matches_xor_form() {
        // The table must agree with the closed form g = o ^ (o >> 1)
        for bits in &[1, 2, 5, 13, 16] {
            let codec = GrayCodec::new(*bits).unwrap();
            for o in 0..codec.positions() as u32 {
                assert_eq!(codec.encode_word(o).unwrap(), o ^ (o >> 1));
            }
        }
    }

    #[test]
    fn test_round_trip_and_single_step() {
        for bits in 1..=16 {
            let codec = GrayCodec::new(bits).unwrap();
            assert!(codec.is_single_step(), "{} bit code is not single step", bits);

            for o in 0..codec.positions() as u32 {
                let word = codec.encode_word(o).unwrap();
                assert_eq!(codec.decode_word(word).unwrap(), o);
            }
        }

        let codec = GrayCodec::new(DEFAULT_BIT_WIDTH).unwrap();
        for o in (0..8192).step_by(97) {
            assert_eq!(codec.decode(&codec.encode(o).unwrap()).unwrap(), o);
        }
    }

    #[test]
    fn test_invalid_input() {
        let codec = GrayCodec::new(13).unwrap();

        assert_eq!(
            codec.encode(8192),
            Err(GrayCodeError::OrdinalOutOfRange { ordinal: 8192, bit_width: 13 })
        );
        assert_eq!(
            codec.decode("000"),
            Err(GrayCodeError::WrongLength { expected: 13, found: 3 })
        );
        assert_eq!(
            codec.decode("00000000000x0"),
            Err(GrayCodeError::NonBinaryChar('x'))
        );
        assert_eq!(
            codec.decode_word(1 << 13),
            Err(GrayCodeError::WordOutOfRange { word: 8192, bit_width: 13 })
        );

        assert_eq!(GrayCodec::new(0), Err(GrayCodeError::UnsupportedWidth(0)));
        assert_eq!(GrayCodec::new(25), Err(GrayCodeError::UnsupportedWidth(25)));
    }

    #[test]
    fn test_calibration_round_trip() {
        let codec = GrayCodec::new(13).unwrap();

        let mut buf = Vec::new();
        codec.write_calibration(&mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 8192);
        assert_eq!(text.lines().nth(3), Some("2.0"));

        let loaded = GrayCodec::from_calibration(text.as_bytes(), 13).unwrap();
        assert_eq!(loaded, codec);
    }

    #[test]
    fn test_calibration_accepts_plain_integers() {
        let table = "0\n1\n3\n2\n\n";
        let codec = GrayCodec::from_calibration(table.as_bytes(), 2).unwrap();

        assert_eq!(codec, GrayCodec::new(2).unwrap());
    }

    #[test]
    fn test_calibration_rejects_bad_tables() {
        assert!(matches!(
            GrayCodec::from_calibration("0.0\n1.0\n".as_bytes(), 2),
            Err(CalibrationError::WrongLineCount { expected: 4, found: 2 })
        ));
        assert!(matches!(
            GrayCodec::from_calibration("0.0\n1.0\nthree\n2.0\n".as_bytes(), 2),
            Err(CalibrationError::InvalidLine { line: 3, .. })
        ));
        assert!(matches!(
            GrayCodec::from_calibration("0.0\n1.0\n4.0\n2.0\n".as_bytes(), 2),
            Err(CalibrationError::OrdinalOutOfRange { line: 3, ordinal: 4 })
        ));
        assert!(matches!(
            GrayCodec::from_calibration("0.0\n1.0\n1.0\n2.0\n".as_bytes(), 2),
            Err(CalibrationError::DuplicateOrdinal { line: 3, ordinal: 1 })
        ));
    }

    #[test]
    fn test_calibration_blank_lines() {
        // Only trailing blank lines are accepted
        assert!(GrayCodec::from_calibration("0.0\n1.0\n3.0\n2.0\n\n  \n".as_bytes(), 2).is_ok());
        assert!(matches!(
            GrayCodec::from_calibration("0.0\n\n1.0\n3.0\n2.0\n".as_bytes(), 2),
            Err(CalibrationError::InvalidLine { line: 2, .. })
        ));
    }
}
