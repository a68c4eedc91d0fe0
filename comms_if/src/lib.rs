//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the drive software:
//! - The zmq socket abstraction used between the operator console and the drive executive
//! - The HTTP transport to the Netiom I/O card on the telescope mount
//! - Telecommand and response definitions

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommands sent by the operator console to the drive executive.
pub mod tc;

/// Netiom digital I/O card transport.
pub mod netiom;

/// Network module
pub mod net;
