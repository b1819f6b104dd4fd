//! Line framing for the raw modem byte stream.
//!
//! [`LineFramer`] converts an unbounded byte stream into discrete logical
//! lines: content up to a line feed, with one immediately preceding carriage
//! return stripped. Lines consisting solely of a terminator are dropped. The
//! framer is restartable across arbitrarily chunked input, so feeding a
//! stream byte by byte produces the same lines as feeding it whole.
//!
//! Buffered-but-unterminated input is bounded by a hard cap. When the cap is
//! exceeded the accumulator is discarded entirely and the rest of that line
//! is suppressed up to its terminator. This is silent data loss, not an
//! error: it is surfaced through a warning and the
//! [`overflow_count`](LineFramer::overflow_count) counter rather than a
//! failure return.

use std::io;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Default cap on an unterminated line, matching the protocol's longest
/// legitimate response with comfortable slack.
pub const DEFAULT_LINE_CAP: usize = 500;

/// Stateful splitter of a raw byte stream into logical lines.
#[derive(Debug)]
pub struct LineFramer {
    buffer: BytesMut,
    line_cap: usize,
    discarding: bool,
    overflow_count: u64,
}

impl Default for LineFramer {
    fn default() -> Self { Self::new(DEFAULT_LINE_CAP) }
}

impl LineFramer {
    /// Create a framer with the given unterminated-line cap.
    #[must_use]
    pub fn new(line_cap: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            line_cap,
            discarding: false,
            overflow_count: 0,
        }
    }

    /// Number of times the accumulator was discarded for exceeding the cap.
    #[must_use]
    pub fn overflow_count(&self) -> u64 { self.overflow_count }

    /// Bytes currently buffered without a terminator.
    #[must_use]
    pub fn pending_len(&self) -> usize { self.buffer.len() }

    /// Append raw bytes without extracting lines.
    pub fn push_bytes(&mut self, bytes: &[u8]) { self.buffer.extend_from_slice(bytes); }

    /// Append raw bytes and iterate the complete lines now available.
    ///
    /// The iterator is lazy and finite; lines it does not consume remain
    /// buffered for [`pop_line`](Self::pop_line) or the next `feed`.
    pub fn feed<'a>(&'a mut self, bytes: &[u8]) -> Lines<'a> {
        self.push_bytes(bytes);
        Lines { framer: self }
    }

    /// Extract the next complete line from already-buffered input.
    pub fn pop_line(&mut self) -> Option<String> {
        loop {
            let Some(pos) = self.buffer.iter().position(|&byte| byte == b'\n') else {
                self.enforce_cap();
                return None;
            };

            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }

            if self.discarding {
                // Tail of a line whose head already overflowed.
                self.discarding = false;
                continue;
            }
            if line.len() > self.line_cap {
                self.overflow_count += 1;
                tracing::warn!(len = line.len(), cap = self.line_cap, "discarding oversized line");
                continue;
            }
            if line.is_empty() {
                continue;
            }
            return Some(String::from_utf8_lossy(&line).into_owned());
        }
    }

    /// Discard the accumulator if it has outgrown the cap without a
    /// terminator. A single trailing carriage return is not counted: it may
    /// yet be consumed by the line feed that follows it.
    fn enforce_cap(&mut self) {
        let mut effective = self.buffer.len();
        if self.buffer.last() == Some(&b'\r') {
            effective -= 1;
        }
        if effective > self.line_cap {
            self.buffer.clear();
            if !self.discarding {
                self.discarding = true;
                self.overflow_count += 1;
                tracing::warn!(cap = self.line_cap, "discarding oversized unterminated input");
            }
        }
    }
}

/// Iterator over the complete lines currently held by a [`LineFramer`].
#[derive(Debug)]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> { self.framer.pop_line() }
}

/// The framer doubles as a Tokio codec so it can be mounted on any
/// `AsyncRead` via `FramedRead`. The cap and counter semantics are shared
/// with the push/pop interface.
impl Decoder for LineFramer {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        self.push_bytes(src);
        src.clear();
        Ok(self.pop_line())
    }
}
