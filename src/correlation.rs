//! Command/response correlation for the AT dialogue.
//!
//! An AT command resolves when the response stream contains one of the
//! terminal markers `OK` or `ERROR`, or when its timeout elapses. Responses
//! are append-only, so the marker with the smaller byte offset in the
//! accumulated text is authoritative when both appear.
//!
//! Only one command may be in flight at a time. [`Correlator::send`] borrows
//! the port mutably for the whole exchange, so the type system enforces the
//! invariant; the pending-command state lives only for the duration of the
//! call.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, timeout_at};

use crate::transport::ModemPort;

/// Marker substring signalling command acceptance.
const OK_MARKER: &str = "OK";
/// Marker substring signalling command rejection.
const ERROR_MARKER: &str = "ERROR";

/// Byte the modem prompts with before accepting an interactive payload.
pub const PROMPT_BYTE: u8 = b'>';
/// Control byte that submits an interactive payload (Ctrl+Z).
pub const SUBMIT_BYTE: u8 = 0x1a;

/// Failure modes of a correlated command.
///
/// None of these is fatal to the driver; the caller may retry the command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No terminal marker arrived before the deadline.
    #[error("no terminal response to `{command}` within {timeout:?}")]
    Timeout {
        /// The command that went unanswered.
        command: String,
        /// The bound that elapsed.
        timeout: Duration,
    },
    /// The modem answered with `ERROR`.
    #[error("modem rejected `{command}`")]
    Rejected {
        /// The rejected command.
        command: String,
    },
    /// The interactive prompt never arrived.
    #[error("no `>` prompt for `{command}` within {timeout:?}")]
    PromptTimeout {
        /// The interactive command awaiting its prompt.
        command: String,
        /// The bound that elapsed.
        timeout: Duration,
    },
    /// The underlying transport failed.
    #[error("transport failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of scanning an accumulated response for terminal markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Accepted,
    Rejected,
}

/// Accumulated response text for the single in-flight command.
#[derive(Debug)]
struct PendingCommand {
    command: String,
    response: String,
}

impl PendingCommand {
    fn new(command: &str) -> Self {
        Self {
            command: command.to_owned(),
            response: String::new(),
        }
    }

    /// Append one response byte and report a terminal outcome if either
    /// marker has now completed. Left-to-right scan order: once a marker
    /// completes, no other marker can later complete at a smaller offset,
    /// so the first completion decides.
    fn accept(&mut self, byte: u8) -> Option<Outcome> {
        self.response.push(char::from(byte));
        match (self.response.find(OK_MARKER), self.response.find(ERROR_MARKER)) {
            (None, None) => None,
            (Some(_), None) => Some(Outcome::Accepted),
            (None, Some(_)) => Some(Outcome::Rejected),
            (Some(ok), Some(err)) => Some(if err < ok {
                Outcome::Rejected
            } else {
                Outcome::Accepted
            }),
        }
    }
}

/// Sends commands and blocks the caller until their terminal response.
#[derive(Debug, Default)]
pub struct Correlator;

impl Correlator {
    /// Create a correlator.
    #[must_use]
    pub fn new() -> Self { Self }

    /// Send `command` and wait for its terminal response.
    ///
    /// Any stale unread input is discarded before transmission so a leftover
    /// unsolicited line cannot be misread as this command's response. The
    /// line terminator is appended automatically.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Timeout`] when no marker arrives in time,
    /// [`CommandError::Rejected`] on an `ERROR` response, and
    /// [`CommandError::Io`] on transport failure.
    pub async fn send<P: ModemPort + ?Sized>(
        &mut self,
        port: &mut P,
        command: &str,
        timeout: Duration,
    ) -> Result<(), CommandError> {
        flush_stale(port).await?;
        port.write_all(command.as_bytes()).await?;
        port.write_all(b"\r\n").await?;
        tracing::debug!(command, "sent command");
        self.await_terminal(port, command, timeout).await
    }

    /// Send an interactive command (message submission).
    ///
    /// Waits for the `>` prompt within `prompt_timeout`, writes `payload`
    /// followed by the submit control byte, then resumes normal terminal
    /// accumulation with the longer `submit_timeout` appropriate to network
    /// transmission.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::PromptTimeout`] when the prompt never
    /// arrives, otherwise the same failures as [`send`](Self::send).
    pub async fn send_interactive<P: ModemPort + ?Sized>(
        &mut self,
        port: &mut P,
        command: &str,
        payload: &[u8],
        prompt_timeout: Duration,
        submit_timeout: Duration,
    ) -> Result<(), CommandError> {
        flush_stale(port).await?;
        port.write_all(command.as_bytes()).await?;
        port.write_all(b"\r\n").await?;
        tracing::debug!(command, "sent interactive command");

        self.await_prompt(port, command, prompt_timeout).await?;

        port.write_all(payload).await?;
        port.write_all(&[SUBMIT_BYTE]).await?;
        self.await_terminal(port, command, submit_timeout).await
    }

    async fn await_terminal<P: ModemPort + ?Sized>(
        &mut self,
        port: &mut P,
        command: &str,
        timeout: Duration,
    ) -> Result<(), CommandError> {
        let deadline = Instant::now() + timeout;
        let mut pending = PendingCommand::new(command);
        loop {
            let byte = match timeout_at(deadline, port.read_byte()).await {
                Ok(read) => read?,
                Err(_) => {
                    tracing::warn!(command, ?timeout, "command timed out");
                    return Err(CommandError::Timeout {
                        command: command.to_owned(),
                        timeout,
                    });
                }
            };
            match pending.accept(byte) {
                Some(Outcome::Accepted) => return Ok(()),
                Some(Outcome::Rejected) => {
                    tracing::warn!(command, "command rejected");
                    return Err(CommandError::Rejected {
                        command: command.to_owned(),
                    });
                }
                None => {}
            }
        }
    }

    async fn await_prompt<P: ModemPort + ?Sized>(
        &mut self,
        port: &mut P,
        command: &str,
        timeout: Duration,
    ) -> Result<(), CommandError> {
        let deadline = Instant::now() + timeout;
        loop {
            match timeout_at(deadline, port.read_byte()).await {
                // Echoes and blank bytes may precede the prompt.
                Ok(Ok(byte)) if byte != PROMPT_BYTE => {}
                Ok(Ok(_)) => return Ok(()),
                Ok(Err(error)) => return Err(error.into()),
                Err(_) => {
                    tracing::warn!(command, ?timeout, "prompt never arrived");
                    return Err(CommandError::PromptTimeout {
                        command: command.to_owned(),
                        timeout,
                    });
                }
            }
        }
    }
}

/// Drain whatever the port has already buffered.
async fn flush_stale<P: ModemPort + ?Sized>(port: &mut P) -> Result<(), CommandError> {
    let mut drained = 0usize;
    while port.available() > 0 {
        port.read_byte().await?;
        drained += 1;
    }
    if drained > 0 {
        tracing::debug!(drained, "discarded stale input before command");
    }
    Ok(())
}
