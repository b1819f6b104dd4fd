//! Byte-level transport contract for the modem serial link.
//!
//! The driver core never touches hardware directly; it drives whatever
//! implements [`ModemPort`]. Implementations typically wrap a UART handle or,
//! in tests, a scripted buffer.

use std::io;

use async_trait::async_trait;

/// Character port connected to the modem.
///
/// `read_byte` suspends until a byte arrives; `available` reports how many
/// bytes can be read without suspending. The driver never assumes buffered
/// input beyond what `available` reports, so a poll-driven caller can drain
/// exactly the bytes already received and return.
#[async_trait]
pub trait ModemPort: Send {
    /// Number of bytes that can be read without waiting.
    fn available(&self) -> usize;

    /// Read the next byte, waiting for it if none is buffered.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the underlying link.
    async fn read_byte(&mut self) -> io::Result<u8>;

    /// Write all bytes to the modem.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the underlying link.
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
}
