//! HTTP client for the Netiom card

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;
use log::trace;
use reqwest::blocking::Client;

use super::{NetiomParams, OutputCmd, Transport, TransportError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// [`Transport`] implementation talking to a real Netiom card over HTTP.
pub struct NetiomClient {
    client: Client,

    base_url: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NetiomClient {
    /// Create a new client. No request is made until the first command.
    pub fn new(params: &NetiomParams) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(params.timeout_ms))
            .build()
            .map_err(TransportError::ClientBuild)?;

        Ok(Self {
            client,
            base_url: params.base_url.clone()
        })
    }

    /// Perform a GET and return the body.
    fn get(&self, url: &str) -> Result<String, TransportError> {
        trace!("GET {}", url);

        let response = self.client
            .get(url)
            .send()
            .map_err(|source| TransportError::Http { url: url.to_string(), source })?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: response.status().as_u16()
            })
        }

        response
            .text()
            .map_err(|source| TransportError::Http { url: url.to_string(), source })
    }
}

impl Transport for NetiomClient {
    fn send(&mut self, cmds: &[OutputCmd]) -> Result<(), TransportError> {
        for cmd in cmds {
            self.get(&format!("{}?{}", self.base_url, cmd))?;
        }

        Ok(())
    }

    fn read_lines(&mut self, endpoint: &str) -> Result<Vec<String>, TransportError> {
        let body = self.get(&format!("{}{}", self.base_url, endpoint))?;

        Ok(body.lines().map(|l| l.trim_end().to_string()).collect())
    }
}
