//! # Netiom Transport
//!
//! The telescope mount is driven through a Netiom digital I/O card which serves a tiny HTTP
//! interface:
//!
//! - `GET <base>?A05` sets output pin 5 high, `GET <base>?B05` sets it low.
//! - `GET <base>digitalinputs.cgi` returns the state of the digital inputs as a line of `0`/`1`
//!   characters, lowest pin first. The absolute encoder is wired to these inputs.
//! - `GET <base>digitaloutputs.cgi` returns the state of the outputs, the first character of the
//!   second line is the drive enable pin.
//!
//! The [`Transport`] trait abstracts over this so that the drive can be run against a simulated
//! mount.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod client;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fmt, str::FromStr};
use serde::{Serialize, Deserialize};

pub use client::NetiomClient;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Highest output pin number the card exposes.
pub const MAX_OUTPUT_PIN: u8 = 16;

/// Status page serving the digital inputs.
pub const INPUTS_ENDPOINT: &str = "digitalinputs.cgi";

/// Status page serving the digital outputs.
pub const OUTPUTS_ENDPOINT: &str = "digitaloutputs.cgi";

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A command channel to the mount's digital I/O.
///
/// Implementations perform blocking I/O with a bounded timeout and never retry internally, retry
/// policy belongs to the caller.
pub trait Transport {

    /// Send an ordered batch of output commands.
    ///
    /// Commands are issued in order. On the first failure the remaining commands are not sent and
    /// the error is returned.
    fn send(&mut self, cmds: &[OutputCmd]) -> Result<(), TransportError>;

    /// Read every line served by the given status endpoint.
    fn read_lines(&mut self, endpoint: &str) -> Result<Vec<String>, TransportError>;

    /// Read the first line served by the given status endpoint.
    fn read_line(&mut self, endpoint: &str) -> Result<String, TransportError> {
        self.read_lines(endpoint)?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::EmptyResponse(endpoint.to_string()))
    }
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Connection parameters for the Netiom card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetiomParams {
    /// Base URL of the card, including the trailing slash.
    pub base_url: String,

    /// Timeout applied to every HTTP request.
    ///
    /// Units: milliseconds
    pub timeout_ms: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A single digital output command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputCmd {
    /// Set the given pin high (`A` prefix on the wire).
    High(u8),

    /// Set the given pin low (`B` prefix on the wire).
    Low(u8),
}

/// Faults raised by a transport.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("Could not build the HTTP client: {0}")]
    ClientBuild(reqwest::Error),

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        source: reqwest::Error
    },

    #[error("Request to {url} returned status {status}")]
    Status {
        url: String,
        status: u16
    },

    #[error("Endpoint {0} returned no data")]
    EmptyResponse(String),

    #[error("Invalid output command token \"{0}\"")]
    InvalidToken(String),

    #[error("Simulated fault: {0}")]
    Simulated(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OutputCmd {
    /// Build a command setting `pin` to the given level.
    pub fn set(pin: u8, high: bool) -> Self {
        if high { OutputCmd::High(pin) } else { OutputCmd::Low(pin) }
    }

    /// The pin this command addresses.
    pub fn pin(&self) -> u8 {
        match self {
            OutputCmd::High(p) | OutputCmd::Low(p) => *p
        }
    }

    /// The level this command sets.
    pub fn is_high(&self) -> bool {
        matches!(self, OutputCmd::High(_))
    }
}

impl fmt::Display for OutputCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputCmd::High(p) => write!(f, "A{:02}", p),
            OutputCmd::Low(p) => write!(f, "B{:02}", p),
        }
    }
}

impl FromStr for OutputCmd {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TransportError::InvalidToken(s.to_string());

        if s.len() != 3 || !s.is_ascii() {
            return Err(invalid())
        }

        let pin: u8 = s[1..].parse().map_err(|_| invalid())?;
        if pin == 0 || pin > MAX_OUTPUT_PIN {
            return Err(invalid())
        }

        match &s[..1] {
            "A" => Ok(OutputCmd::High(pin)),
            "B" => Ok(OutputCmd::Low(pin)),
            _ => Err(invalid())
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, cmds: &[OutputCmd]) -> Result<(), TransportError> {
        (**self).send(cmds)
    }

    fn read_lines(&mut self, endpoint: &str) -> Result<Vec<String>, TransportError> {
        (**self).read_lines(endpoint)
    }

    fn read_line(&mut self, endpoint: &str) -> Result<String, TransportError> {
        (**self).read_line(endpoint)
    }
}

impl Default for NetiomParams {
    fn default() -> Self {
        Self {
            base_url: String::from("http://192.168.0.6/"),
            timeout_ms: 2000,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_token_format() {
        assert_eq!(OutputCmd::High(9).to_string(), "A09");
        assert_eq!(OutputCmd::Low(9).to_string(), "B09");
        assert_eq!(OutputCmd::High(10).to_string(), "A10");
        assert_eq!(OutputCmd::Low(1).to_string(), "B01");
    }

    #[test]
    fn test_token_parse() {
        assert_eq!("A01".parse::<OutputCmd>().unwrap(), OutputCmd::High(1));
        assert_eq!("B10".parse::<OutputCmd>().unwrap(), OutputCmd::Low(10));

        for bad in &["", "A1", "C01", "A00", "A17", "Axx", "A010"] {
            assert!(bad.parse::<OutputCmd>().is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_read_line_takes_first() {
        struct Lines(Vec<String>);

        impl Transport for Lines {
            fn send(&mut self, _: &[OutputCmd]) -> Result<(), TransportError> {
                Ok(())
            }

            fn read_lines(&mut self, _: &str) -> Result<Vec<String>, TransportError> {
                Ok(self.0.clone())
            }
        }

        let mut t = Lines(vec!["0101".into(), "1".into()]);
        assert_eq!(t.read_line("x").unwrap(), "0101");

        let mut t: Box<dyn Transport> = Box::new(Lines(vec![]));
        assert!(matches!(t.read_line("x"), Err(TransportError::EmptyResponse(_))));
    }
}
