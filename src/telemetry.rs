//! Fire-and-forget telemetry sink for driver events.
//!
//! The driver reports what it observes and never waits on the consumer; no
//! return value is inspected. All methods default to no-ops so integrations
//! implement only the events they care about.

use crate::reassembly::AssembledSms;

/// Downstream consumer of modem events.
pub trait TelemetrySink {
    /// A signal-strength reading, in dBm.
    fn signal_sample(&mut self, _dbm: i32) {}

    /// An observed network-attach status.
    fn attach_status(&mut self, _attached: bool) {}

    /// A complete (or timeout-flushed) incoming message.
    fn message_received(&mut self, _message: &AssembledSms) {}

    /// Outcome of an outgoing message submission.
    fn message_sent(&mut self, _success: bool) {}
}

/// Sink that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {}
