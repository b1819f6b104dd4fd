//! Contract for the PDU payload decoder collaborator.
//!
//! Incoming messages arrive as hex-encoded PDU lines. Full GSM-7/UCS-2
//! decoding is outside this crate; the driver validates that a payload line
//! is plausible hex and then hands it to whatever implements [`PduDecoder`],
//! consuming the structured [`DecodedFragment`] it returns.

use thiserror::Error;

/// Structured result of decoding one hex-encoded PDU payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedFragment {
    /// Concatenation reference number. Reused by the network over time, so
    /// it only identifies a message together with the sender.
    pub reference: u16,
    /// Originating address as presented by the modem.
    pub sender: String,
    /// Declared number of parts; `1` for a non-concatenated message.
    pub total_parts: u8,
    /// 1-based position of this fragment within the message.
    pub part_index: u8,
    /// Decoded text segment carried by this fragment.
    pub text: String,
    /// Service-centre timestamp, already formatted for display.
    pub timestamp: String,
}

/// Errors produced by a [`PduDecoder`] implementation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload is too short to carry a PDU header.
    #[error("payload too short: {len} hex digits")]
    TooShort {
        /// Number of hex digits received.
        len: usize,
    },
    /// The payload did not parse as a deliverable message.
    #[error("malformed PDU: {reason}")]
    Malformed {
        /// Decoder-specific diagnostic.
        reason: String,
    },
}

/// Decoder for hex-encoded PDU payload lines.
///
/// The driver treats this as a black box: any line that passes
/// [`is_hex_payload`] is offered to the decoder, and decode failures drop the
/// payload without touching reassembly state.
pub trait PduDecoder {
    /// Decode one hex payload line into a structured fragment.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the payload cannot be interpreted.
    fn decode(&self, hex: &str) -> Result<DecodedFragment, DecodeError>;
}

/// Whether `line` consists solely of hexadecimal digit characters.
///
/// An empty line is not a payload.
#[must_use]
pub fn is_hex_payload(line: &str) -> bool {
    !line.is_empty() && line.bytes().all(|byte| byte.is_ascii_hexdigit())
}
