//! # Telecommand Client
//!
//! This module provides networking abstractions to connect to the drive executable's telecommand
//! server.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions, MonitoredSocketError},
    tc::{Tc, TcParseError, TcResponse}
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct TcClient {
    tc_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum TcClientError {

    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error("Could not send the telecommand to the server: {0}")]
    SendError(zmq::Error),

    #[error("No response from the server: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the telecommand: {0}")]
    SerializationError(TcParseError),

    #[error("Could not deserialize the response from the server: {0}")]
    DeserializeError(TcParseError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TcClient {
    /// Create a new telecommand client connected to the endpoint.
    pub fn new(endpoint: &str) -> Result<Self, TcClientError> {
        let ctx = zmq::Context::new();

        let tc_socket = MonitoredSocket::new(
            &ctx,
            zmq::REQ,
            SocketOptions::tc_client(),
            endpoint
        )?;

        Ok(Self { tc_socket })
    }

    /// Return true if the server is connected.
    pub fn connected(&self) -> bool {
        self.tc_socket.connected()
    }

    /// Send a telecommand and wait for the server's response.
    pub fn send(&mut self, tc: &Tc) -> Result<TcResponse, TcClientError> {
        let tc_str = tc.to_json()
            .map_err(TcClientError::SerializationError)?;

        self.tc_socket.send(&tc_str, 0)
            .map_err(TcClientError::SendError)?;

        let msg = self.tc_socket.recv_msg(0)
            .map_err(TcClientError::RecvError)?;

        TcResponse::from_json(msg.as_str().unwrap_or(""))
            .map_err(TcClientError::DeserializeError)
    }
}
