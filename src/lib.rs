//! Public API for the `modemline` library.
//!
//! This crate drives a cellular modem over an asynchronous character stream
//! using the AT command protocol. It frames the raw byte stream into logical
//! lines, correlates commands with their terminal `OK`/`ERROR` responses
//! under timeout, classifies unsolicited notifications, and reassembles
//! concatenated SMS messages from out-of-order, duplicate-prone fragments
//! with bounded memory and time.
//!
//! The physical transport, the PDU payload decoder, and the telemetry
//! consumer are collaborators supplied by the integration; see
//! [`transport::ModemPort`], [`pdu::PduDecoder`], and
//! [`telemetry::TelemetrySink`].

pub mod config;
pub mod correlation;
pub mod dispatch;
pub mod error;
pub mod framer;
pub mod pdu;
pub mod reassembly;
pub mod session;
pub mod telemetry;
pub mod test_helpers;
pub mod transport;

pub use config::ModemConfig;
pub use correlation::{CommandError, Correlator};
pub use dispatch::{LineDispatcher, ReceiverState};
pub use error::{ModemError, Result};
pub use framer::LineFramer;
pub use pdu::{DecodeError, DecodedFragment, PduDecoder};
pub use reassembly::{AssembledSms, ReassemblyCache, ReassemblyError, SlotId};
pub use session::ModemSession;
pub use telemetry::{NullSink, TelemetrySink};
pub use transport::ModemPort;
