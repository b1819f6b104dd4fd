//! Unsolicited-line classification and the two-stage payload receiver.
//!
//! When no command is outstanding, every framed line lands here. Incoming
//! messages use a two-stage protocol: a `+CMT:` header line announces that
//! the very next line is the hex-encoded PDU payload. [`LineDispatcher`]
//! tracks that state, recognises the other unsolicited notifications by
//! their fixed prefixes, and feeds decoded fragments into the reassembly
//! cache.
//!
//! Unrecognised lines while idle are not errors; command echoes and blank
//! diagnostic text are simply ignored content.

use std::time::Instant;

use crate::{
    pdu::{self, DecodedFragment, PduDecoder},
    reassembly::{AssembledSms, ReassemblyCache},
    telemetry::TelemetrySink,
};

/// Header notification announcing that the next line is a message payload.
const MESSAGE_HEADER_PREFIX: &str = "+CMT:";
/// Signal-quality notification, `+CSQ: <rssi>,<ber>`.
const SIGNAL_QUALITY_PREFIX: &str = "+CSQ:";
/// Network-attach status notification.
const ATTACH_STATUS_PREFIX: &str = "+CGATT:";

/// `rssi` value meaning the signal strength is unknown.
const RSSI_UNKNOWN: u8 = 99;

/// Two-stage receive state for the header-then-payload message protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReceiverState {
    /// No payload pending; lines are classified by prefix.
    #[default]
    Idle,
    /// A `+CMT:` header arrived; the next line is consumed as the payload
    /// unconditionally, valid or not.
    AwaitingPayload,
}

/// Routes completed lines to notification handlers and the reassembly cache.
///
/// One dispatcher exists per modem session; its state is only ever touched
/// from the session's poll loop, so mutation is inherently serialised.
#[derive(Debug)]
pub struct LineDispatcher {
    state: ReceiverState,
    cache: ReassemblyCache,
}

impl LineDispatcher {
    /// Create a dispatcher around the given reassembly cache.
    #[must_use]
    pub fn new(cache: ReassemblyCache) -> Self {
        Self {
            state: ReceiverState::Idle,
            cache,
        }
    }

    /// Current receive state.
    #[must_use]
    pub const fn state(&self) -> ReceiverState { self.state }

    /// Process one completed line using the current time.
    pub fn dispatch<D: PduDecoder, S: TelemetrySink>(
        &mut self,
        line: &str,
        decoder: &D,
        sink: &mut S,
    ) {
        self.dispatch_at(line, decoder, sink, Instant::now());
    }

    /// Process one completed line using an explicit clock reading.
    pub fn dispatch_at<D: PduDecoder, S: TelemetrySink>(
        &mut self,
        line: &str,
        decoder: &D,
        sink: &mut S,
        now: Instant,
    ) {
        match self.state {
            ReceiverState::AwaitingPayload => {
                // The pending payload is consumed regardless of validity.
                self.state = ReceiverState::Idle;
                self.consume_payload(line, decoder, sink, now);
            }
            ReceiverState::Idle => self.classify(line, sink),
        }
    }

    /// Force-flush expired assemblies, emitting them downstream.
    pub fn sweep<S: TelemetrySink>(&mut self, sink: &mut S) {
        self.sweep_at(sink, Instant::now());
    }

    /// Force-flush expired assemblies using an explicit clock reading.
    pub fn sweep_at<S: TelemetrySink>(&mut self, sink: &mut S, now: Instant) {
        for message in self.cache.sweep_at(now) {
            sink.message_received(&message);
        }
    }

    fn classify<S: TelemetrySink>(&mut self, line: &str, sink: &mut S) {
        if line.starts_with(MESSAGE_HEADER_PREFIX) {
            tracing::debug!("message header received, awaiting payload");
            self.state = ReceiverState::AwaitingPayload;
        } else if let Some(fields) = line.strip_prefix(SIGNAL_QUALITY_PREFIX) {
            emit_signal_sample(fields, sink);
        } else if line.starts_with(ATTACH_STATUS_PREFIX) {
            // Containment test rather than a field-positional parse:
            // `+CGATT: 0,1` reads as attached. See DESIGN.md.
            sink.attach_status(line.contains('1'));
        } else {
            tracing::trace!(line, "ignoring unrecognised line");
        }
    }

    fn consume_payload<D: PduDecoder, S: TelemetrySink>(
        &mut self,
        line: &str,
        decoder: &D,
        sink: &mut S,
        now: Instant,
    ) {
        if !pdu::is_hex_payload(line) {
            tracing::warn!(line, "expected hex payload, dropping line");
            return;
        }
        let fragment = match decoder.decode(line) {
            Ok(fragment) => fragment,
            Err(error) => {
                tracing::warn!(error = %error, "dropping undecodable payload");
                return;
            }
        };

        if fragment.total_parts == 1 {
            // Not concatenated; the cache is bypassed entirely.
            sink.message_received(&single_part_message(fragment));
            return;
        }

        match self.cache.insert_fragment_at(&fragment, now) {
            Ok(slot) => {
                if let Some(message) = self.cache.take_complete(slot) {
                    sink.message_received(&message);
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "rejected protocol-violating fragment");
            }
        }
    }
}

fn single_part_message(fragment: DecodedFragment) -> AssembledSms {
    AssembledSms {
        sender: fragment.sender,
        text: fragment.text,
        timestamp: fragment.timestamp,
    }
}

/// Parse the `rssi` field and emit a dBm sample; `99` means unknown and
/// emits nothing, as does an unparsable field.
fn emit_signal_sample<S: TelemetrySink>(fields: &str, sink: &mut S) {
    let rssi = fields
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .parse::<u8>();
    match rssi {
        Ok(rssi) if rssi < RSSI_UNKNOWN => {
            let dbm = i32::from(rssi) * 2 - 113;
            sink.signal_sample(dbm);
        }
        Ok(rssi) => tracing::debug!(rssi, "signal strength unknown"),
        Err(_) => tracing::debug!(fields, "unparsable signal-quality field"),
    }
}
