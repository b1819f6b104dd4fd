//! Driver configuration and protocol bounds.
//!
//! All timing and retry behaviour of the session driver is collected here so
//! integrations can tune it without touching the protocol logic. Defaults
//! follow the ML307R-class modem timings the driver was written against.

use std::time::Duration;

/// Settings that bound buffering, timeouts, and polling for one modem session.
#[derive(Clone, Copy, Debug)]
pub struct ModemConfig {
    /// Hard cap on an unterminated line accumulated by the framer. Input
    /// beyond this without a terminator is discarded, not buffered.
    pub line_cap: usize,
    /// Age at which an incomplete concatenated message is force-flushed.
    pub concat_timeout: Duration,
    /// Terminal-response timeout for ordinary commands (the `AT` probe).
    pub command_timeout: Duration,
    /// Terminal-response timeout for the bring-up configuration commands.
    pub setup_timeout: Duration,
    /// How long to wait for the `>` prompt of an interactive command.
    pub prompt_timeout: Duration,
    /// Terminal-response timeout after submitting an interactive payload.
    /// Network transmission is slow, so this is much longer than
    /// [`command_timeout`](Self::command_timeout).
    pub submit_timeout: Duration,
    /// Interval between periodic signal-quality queries issued by `tick`.
    pub status_interval: Duration,
    /// Attempts before giving up on the initial `AT` probe.
    pub probe_retries: u32,
    /// Pause between unanswered `AT` probes.
    pub probe_backoff: Duration,
    /// Attempts before giving up on the network-attach poll.
    pub attach_retries: u32,
    /// How long to wait for each `AT+CGATT?` poll response.
    pub attach_poll_timeout: Duration,
    /// Timeout for activating the PDP context before a ping diagnostic.
    pub pdp_activate_timeout: Duration,
    /// Timeout for deactivating the PDP context after a ping diagnostic.
    pub pdp_deactivate_timeout: Duration,
    /// How long ping replies are given before the context is torn down.
    pub ping_wait: Duration,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            line_cap: 500,
            concat_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(1),
            setup_timeout: Duration::from_secs(2),
            prompt_timeout: Duration::from_secs(5),
            submit_timeout: Duration::from_secs(30),
            status_interval: Duration::from_secs(60),
            probe_retries: 10,
            probe_backoff: Duration::from_millis(500),
            attach_retries: 30,
            attach_poll_timeout: Duration::from_secs(1),
            pdp_activate_timeout: Duration::from_secs(10),
            pdp_deactivate_timeout: Duration::from_secs(5),
            ping_wait: Duration::from_secs(5),
        }
    }
}
