//! Poll-driven modem session: bring-up, message submission, and the
//! read/classify/sweep cycle.
//!
//! One [`ModemSession`] exists per modem connection and owns all mutable
//! protocol state (framer accumulator, receive state, reassembly cache), so
//! every mutation happens from the caller's single control flow. The only
//! blocking operations are the correlated sends, each bounded by its
//! timeout; [`tick`](ModemSession::tick) reads only what the port already
//! holds and returns.

use tokio::time::{Instant, sleep};

use crate::{
    config::ModemConfig,
    correlation::Correlator,
    dispatch::LineDispatcher,
    error::Result,
    framer::LineFramer,
    pdu::PduDecoder,
    reassembly::ReassemblyCache,
    telemetry::TelemetrySink,
    transport::ModemPort,
};

/// Fire-and-forget query whose response arrives as a classified line.
const SIGNAL_QUERY: &[u8] = b"AT+CSQ\r\n";
/// Attach poll; the reply is matched against [`ATTACHED_TOKEN`].
const ATTACH_QUERY: &[u8] = b"AT+CGATT?\r\n";
/// Reply token confirming network attach during bring-up.
const ATTACHED_TOKEN: &str = "+CGATT: 1";

/// Driver for one modem connection.
pub struct ModemSession<P, D, S> {
    port: P,
    decoder: D,
    sink: S,
    config: ModemConfig,
    framer: LineFramer,
    correlator: Correlator,
    dispatcher: LineDispatcher,
    last_status_query: Instant,
    initialized: bool,
}

impl<P: ModemPort, D: PduDecoder, S: TelemetrySink> ModemSession<P, D, S> {
    /// Create a session over the given collaborators.
    pub fn new(port: P, decoder: D, sink: S, config: ModemConfig) -> Self {
        Self {
            port,
            decoder,
            sink,
            config,
            framer: LineFramer::new(config.line_cap),
            correlator: Correlator::new(),
            dispatcher: LineDispatcher::new(ReassemblyCache::new(config.concat_timeout)),
            last_status_query: Instant::now(),
            initialized: false,
        }
    }

    /// Borrow the telemetry sink.
    pub fn sink(&self) -> &S { &self.sink }

    /// Times the framer discarded oversized unterminated input.
    #[must_use]
    pub fn framing_overflows(&self) -> u64 { self.framer.overflow_count() }

    /// Bring the modem to a ready state.
    ///
    /// Probes with `AT` until answered, resets the APN, enables message
    /// auto-report and PDU mode, then polls for network attach. Setup
    /// commands that the modem rejects are logged and skipped; only a dead
    /// link or an unanswered probe fails bring-up.
    ///
    /// # Errors
    ///
    /// Returns the probe's final [`CommandError`] when the modem never
    /// answers `AT`, or the transport error that interrupted bring-up.
    pub async fn initialize(&mut self) -> Result<()> {
        self.probe().await?;

        // APN reset to automatic; rejection is tolerated.
        self.setup_command("AT+CGDCONT=1,\"IP\",\"\"").await;
        self.setup_command("AT+CNMI=2,2,0,0,0").await;
        self.setup_command("AT+CMGF=0").await;

        let attached = self.poll_attach().await?;
        if attached {
            tracing::info!("network attached");
        } else {
            tracing::warn!("network attach timed out");
        }
        self.sink.attach_status(attached);

        self.initialized = true;
        tracing::info!("modem session initialized");
        Ok(())
    }

    /// Submit a message through the interactive command flow.
    ///
    /// Switches to text mode, sends `AT+CMGS` and the payload behind the
    /// `>` prompt, then restores PDU mode whatever the outcome. The result
    /// is also reported through the telemetry sink as `message_sent`.
    ///
    /// # Errors
    ///
    /// Returns the [`CommandError`] of whichever stage failed.
    pub async fn send_message(&mut self, recipient: &str, text: &str) -> Result<()> {
        tracing::info!(recipient, "submitting message");

        if let Err(error) = self
            .correlator
            .send(&mut self.port, "AT+CMGF=1", self.config.command_timeout)
            .await
        {
            tracing::error!(error = %error, "could not enter text mode");
            self.sink.message_sent(false);
            return Err(error.into());
        }

        let command = format!("AT+CMGS=\"{recipient}\"");
        let outcome = self
            .correlator
            .send_interactive(
                &mut self.port,
                &command,
                text.as_bytes(),
                self.config.prompt_timeout,
                self.config.submit_timeout,
            )
            .await;

        // Restore PDU mode regardless of the submission outcome.
        if let Err(error) = self
            .correlator
            .send(&mut self.port, "AT+CMGF=0", self.config.command_timeout)
            .await
        {
            tracing::warn!(error = %error, "failed to restore PDU mode");
        }

        self.sink.message_sent(outcome.is_ok());
        match outcome {
            Ok(()) => {
                tracing::info!(recipient, "message submitted");
                Ok(())
            }
            Err(error) => {
                tracing::error!(recipient, error = %error, "message submission failed");
                Err(error.into())
            }
        }
    }

    /// Issue an on-demand network-attach query.
    ///
    /// Fire and forget, like the periodic signal query: the `+CGATT:` reply
    /// arrives as a classified line on a later poll.
    ///
    /// # Errors
    ///
    /// Returns a transport error only.
    pub async fn query_network_status(&mut self) -> Result<()> {
        self.port.write_all(ATTACH_QUERY).await?;
        tracing::debug!("issued network-status query");
        Ok(())
    }

    /// Connectivity diagnostic: activate the PDP context, ping `host`, then
    /// deactivate the context.
    ///
    /// The ping itself is fire and forget; whatever it reports within the
    /// ping window is drained as stale input by the deactivation command.
    /// Deactivation is attempted even when the window elapses silently, and
    /// its failure is logged rather than returned.
    ///
    /// # Errors
    ///
    /// Returns the [`CommandError`] of the context activation, or the
    /// transport error that interrupted the diagnostic.
    pub async fn ping(&mut self, host: &str) -> Result<()> {
        tracing::info!(host, "running ping diagnostic");
        self.correlator
            .send(
                &mut self.port,
                "AT+CGACT=1,1",
                self.config.pdp_activate_timeout,
            )
            .await?;

        let command = format!("AT+MPING=1,\"{host}\",4,32,255");
        self.port.write_all(command.as_bytes()).await?;
        self.port.write_all(b"\r\n").await?;
        sleep(self.config.ping_wait).await;

        if let Err(error) = self
            .correlator
            .send(
                &mut self.port,
                "AT+CGACT=0,1",
                self.config.pdp_deactivate_timeout,
            )
            .await
        {
            tracing::warn!(error = %error, "failed to deactivate PDP context");
        }
        Ok(())
    }

    /// One iteration of the poll loop.
    ///
    /// Drains the bytes the port already holds, dispatches every completed
    /// line, sweeps the reassembly cache, and issues the periodic
    /// signal-quality query once per status interval.
    ///
    /// # Errors
    ///
    /// Returns a transport error; protocol-level problems never fail a tick.
    pub async fn tick(&mut self) -> Result<()> {
        while self.port.available() > 0 {
            let byte = self.port.read_byte().await?;
            self.framer.push_bytes(&[byte]);
        }

        let now = Instant::now();
        while let Some(line) = self.framer.pop_line() {
            self.dispatcher
                .dispatch_at(&line, &self.decoder, &mut self.sink, now.into_std());
        }
        self.dispatcher.sweep_at(&mut self.sink, now.into_std());

        if self.initialized
            && now.saturating_duration_since(self.last_status_query) >= self.config.status_interval
        {
            self.last_status_query = now;
            self.port.write_all(SIGNAL_QUERY).await?;
            tracing::debug!("issued periodic signal-quality query");
        }
        Ok(())
    }

    /// `AT` probe with bounded retries.
    async fn probe(&mut self) -> Result<()> {
        let mut attempts = 0u32;
        loop {
            match self
                .correlator
                .send(&mut self.port, "AT", self.config.command_timeout)
                .await
            {
                Ok(()) => return Ok(()),
                Err(error) => {
                    attempts += 1;
                    if attempts >= self.config.probe_retries {
                        tracing::error!(attempts, "modem did not answer AT probe");
                        return Err(error.into());
                    }
                    tracing::warn!(attempts, "AT probe unanswered, retrying");
                    sleep(self.config.probe_backoff).await;
                }
            }
        }
    }

    /// Send a bring-up command, tolerating rejection.
    async fn setup_command(&mut self, command: &str) {
        if let Err(error) = self
            .correlator
            .send(&mut self.port, command, self.config.setup_timeout)
            .await
        {
            tracing::warn!(command, error = %error, "setup command failed");
        }
    }

    /// Poll `AT+CGATT?` until attached or retries are exhausted.
    async fn poll_attach(&mut self) -> Result<bool> {
        for _ in 0..self.config.attach_retries {
            self.port.write_all(ATTACH_QUERY).await?;
            let mut line = self.read_line_within(self.config.attach_poll_timeout).await?;
            while let Some(text) = line {
                if text.contains(ATTACHED_TOKEN) {
                    return Ok(true);
                }
                // The reply's trailing lines (the `OK`) are buffered too.
                line = self.framer.pop_line();
            }
            sleep(self.config.attach_poll_timeout).await;
        }
        Ok(false)
    }

    /// Read one framed line, waiting at most `timeout` for it.
    ///
    /// Surplus lines accumulated while waiting stay buffered and reach the
    /// dispatcher on the next tick.
    async fn read_line_within(&mut self, timeout: std::time::Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = self.framer.pop_line() {
                return Ok(Some(line));
            }
            match tokio::time::timeout_at(deadline, self.port.read_byte()).await {
                Ok(byte) => self.framer.push_bytes(&[byte?]),
                Err(_) => return Ok(None),
            }
        }
    }
}
