//! # Telecommand Server Module
//!
//! This module abstracts over the networking side of the drive executable. The server accepts
//! connections from the operator console, receiving telecommands and replying with exactly one
//! response per telecommand.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions, MonitoredSocketError},
    tc::{Tc, TcParseError, TcResponse},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// REP server for operator telecommands.
pub struct TcServer {
    tc_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`TcServer`]
#[derive(thiserror::Error, Debug)]
pub enum TcServerError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error("Could not serialise the response: {0}")]
    SerialiseError(TcParseError),

    #[error("Could not send the response to the client: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TcServer {

    /// Create a new telecommand server bound to the endpoint.
    ///
    /// This function will not wait for a connection from the client before returning.
    pub fn new(endpoint: &str) -> Result<Self, TcServerError> {
        let ctx = zmq::Context::new();

        let tc_socket = MonitoredSocket::new(
            &ctx,
            zmq::REP,
            SocketOptions::tc_server(),
            endpoint
        )?;

        Ok(Self { tc_socket })
    }

    /// Wait up to the receive timeout for a telecommand.
    ///
    /// Returns `None` if nothing arrived. Any `Some` MUST be answered with [`send_response`]
    /// before the next call, including a telecommand which failed to parse.
    ///
    /// [`send_response`]: TcServer::send_response
    pub fn recv_tc(&mut self) -> Option<Result<Tc, TcParseError>> {
        let msg = self.tc_socket.recv_msg(0).ok()?;

        Some(Tc::from_json(msg.as_str().unwrap_or("")))
    }

    /// Send the response to the last telecommand.
    pub fn send_response(&mut self, response: &TcResponse) -> Result<(), TcServerError> {
        let resp_str = response.to_json()
            .map_err(TcServerError::SerialiseError)?;

        self.tc_socket.send(&resp_str, 0)
            .map_err(TcServerError::SendError)
    }
}
