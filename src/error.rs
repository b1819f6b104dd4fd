//! Canonical error and result types for the crate.
//!
//! Nothing in this taxonomy is fatal to the driver: every variant degrades a
//! single operation or a single message. Framing overflow and reassembly
//! timeouts are deliberately absent; the former is a counter on the framer
//! and the latter is a forced-completion path, not a failure.

use thiserror::Error;

use crate::{correlation::CommandError, pdu::DecodeError, reassembly::ReassemblyError};

/// Top-level error type exposed by `modemline`.
#[derive(Debug, Error)]
pub enum ModemError {
    /// A failure in the underlying transport.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    /// A command timed out or was rejected.
    #[error("command failed: {0}")]
    Command(#[from] CommandError),
    /// The payload decoder collaborator rejected a PDU.
    #[error("payload decode failed: {0}")]
    Decode(#[from] DecodeError),
    /// A fragment violated the reassembly protocol bounds.
    #[error("fragment rejected: {0}")]
    Reassembly(#[from] ReassemblyError),
}

/// Canonical result alias used by `modemline` public APIs.
pub type Result<T> = std::result::Result<T, ModemError>;
