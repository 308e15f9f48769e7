//! AtPort trait for module communication.
//!
//! The [`AtPort`] trait abstracts over the physical link to an AT-command
//! module. Implementations exist for serial ports (`atlink-transport`) and
//! mock ports for testing (`atlink-test-harness`).
//!
//! The command runner in `atlink-runner` operates on an `AtPort` rather than
//! directly on a serial port, enabling both real hardware control and
//! deterministic unit testing with `MockPort`.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous line-oriented port to an AT-command module.
///
/// The wire format is always newline-delimited ASCII: commands go out as
/// whole lines, responses come back as a sequence of decoded lines.
/// Implementations handle framing and buffering; protocol-level concerns
/// (validation, error tokens, timeouts) belong to the command runner.
#[async_trait]
pub trait AtPort: Send {
    /// Open the port. Calling `open` on an already-open port is a no-op.
    async fn open(&mut self) -> Result<()>;

    /// Close the port. Calling `close` on an already-closed port is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// Whether the port is currently open. Synchronous.
    fn is_open(&self) -> bool;

    /// Write raw bytes to the module.
    ///
    /// Returns the number of bytes accepted. Fails with
    /// [`Error::NotOpen`](crate::error::Error::NotOpen) if the port is
    /// closed.
    async fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read the next decoded line from the module.
    ///
    /// Waits up to `timeout` for a complete line to arrive. Returns
    /// `Ok(None)` when no line arrived within the deadline; that is the
    /// quiet-device case, not a failure. A genuine hardware read error
    /// is returned as `Err`.
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>>;
}
