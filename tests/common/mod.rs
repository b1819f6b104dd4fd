//! Shared scaffolding for the integration tests: a scripted port, a
//! recording telemetry sink, and a stub payload decoder.

// Each test binary uses its own subset of this module.
#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::{Arc, Mutex, MutexGuard, Once},
};

use async_trait::async_trait;

use modemline::{
    AssembledSms, DecodeError, DecodedFragment, ModemPort, PduDecoder, TelemetrySink,
};

/// Install a test subscriber once per binary so `RUST_LOG` works in tests.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

#[derive(Debug, Default)]
struct PortState {
    rx: VecDeque<u8>,
    responses: VecDeque<Vec<u8>>,
    written: Vec<u8>,
}

/// Scripted in-memory modem port.
///
/// Each command write (terminated by CR/LF or the submit control byte)
/// releases the next scripted response into the read buffer. Cloning yields
/// a handle onto the same state, so a test can keep injecting unsolicited
/// input after handing the port to a session. Reading from an empty buffer
/// parks forever, which under a paused Tokio clock lets timeouts fire
/// deterministically.
#[derive(Clone, Debug, Default)]
pub struct ScriptedPort {
    state: Arc<Mutex<PortState>>,
}

impl ScriptedPort {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Queue the reply for the next command write.
    pub fn push_response(&self, bytes: &[u8]) { self.lock().responses.push_back(bytes.to_vec()); }

    /// Queue a command that gets no reply at all.
    pub fn push_silence(&self) { self.lock().responses.push_back(Vec::new()); }

    /// Inject unsolicited bytes as if the modem sent them.
    pub fn push_rx(&self, bytes: &[u8]) { self.lock().rx.extend(bytes.iter().copied()); }

    /// Everything written to the modem so far, lossily decoded.
    #[must_use]
    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.lock().written).into_owned()
    }

    fn lock(&self) -> MutexGuard<'_, PortState> { self.state.lock().expect("port lock poisoned") }
}

#[async_trait]
impl ModemPort for ScriptedPort {
    fn available(&self) -> usize { self.lock().rx.len() }

    async fn read_byte(&mut self) -> io::Result<u8> {
        if let Some(byte) = self.lock().rx.pop_front() {
            return Ok(byte);
        }
        std::future::pending().await
    }

    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        state.written.extend_from_slice(bytes);
        if bytes.ends_with(b"\r\n") || bytes == [0x1a].as_slice() {
            if let Some(response) = state.responses.pop_front() {
                state.rx.extend(response);
            }
        }
        Ok(())
    }
}

/// One event observed by a [`RecordingSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelemetryEvent {
    Signal(i32),
    Attach(bool),
    Received(AssembledSms),
    Sent(bool),
}

/// Sink that records every event in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<TelemetryEvent>,
}

impl TelemetrySink for RecordingSink {
    fn signal_sample(&mut self, dbm: i32) { self.events.push(TelemetryEvent::Signal(dbm)); }

    fn attach_status(&mut self, attached: bool) {
        self.events.push(TelemetryEvent::Attach(attached));
    }

    fn message_received(&mut self, message: &AssembledSms) {
        self.events.push(TelemetryEvent::Received(message.clone()));
    }

    fn message_sent(&mut self, success: bool) { self.events.push(TelemetryEvent::Sent(success)); }
}

/// Decoder that maps scripted hex payloads to prepared fragments.
#[derive(Debug, Default)]
pub struct StubDecoder {
    fragments: HashMap<String, DecodedFragment>,
}

impl StubDecoder {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Script `hex` to decode into `fragment`.
    #[must_use]
    pub fn with_fragment(mut self, hex: &str, fragment: DecodedFragment) -> Self {
        self.fragments.insert(hex.to_owned(), fragment);
        self
    }
}

impl PduDecoder for StubDecoder {
    fn decode(&self, hex: &str) -> Result<DecodedFragment, DecodeError> {
        self.fragments
            .get(hex)
            .cloned()
            .ok_or_else(|| DecodeError::Malformed {
                reason: "payload not scripted".to_owned(),
            })
    }
}

/// Build a fragment with the given geometry and a fixed timestamp.
#[must_use]
pub fn fragment(
    reference: u16,
    sender: &str,
    total_parts: u8,
    part_index: u8,
    text: &str,
) -> DecodedFragment {
    DecodedFragment {
        reference,
        sender: sender.to_owned(),
        total_parts,
        part_index,
        text: text.to_owned(),
        timestamp: "2026-08-29 12:00:00".to_owned(),
    }
}
