//! Serial port implementation of the AT port contract.
//!
//! This module provides [`SerialAtPort`], which implements the
//! [`AtPort`] trait for USB virtual COM ports and physical UART
//! connections.
//!
//! Typical module baud rates:
//! - RAK811 / RAK11300: 115200 baud
//! - Telecom Design TD1208: 9600 baud
//! - SIM800C: 115200 baud
//!
//! # Example
//!
//! ```no_run
//! use atlink_transport::SerialAtPort;
//! use atlink_core::AtPort;
//! use std::time::Duration;
//!
//! # async fn example() -> atlink_core::Result<()> {
//! let mut port = SerialAtPort::new("/dev/ttyUSB0", 115200);
//! port.open().await?;
//! port.write(b"at+version\r\n").await?;
//! let line = port.read_line(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use atlink_core::{AtPort, Error, Result};

/// Serial port configuration.
///
/// AT-command modules universally use 8 data bits, 1 stop bit, no
/// parity, so only the settings that actually vary between modules are
/// exposed.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (e.g. 9600 for TD1208, 115200 for RAK and SIM modules).
    pub baud_rate: u32,
    /// RTS/CTS hardware flow control. Off for every supported module.
    pub hardware_flow_control: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            hardware_flow_control: false,
        }
    }
}

/// List the serial ports visible to the OS, by path.
pub fn available_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| Error::Transport(format!("failed to enumerate serial ports: {}", e)))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Pull the next complete line out of the accumulation buffer.
///
/// Splits on `\n`, strips a trailing `\r`, and discards blank lines so
/// callers only ever see meaningful response lines. Returns `None` when
/// no complete non-blank line is buffered yet.
fn take_line(buf: &mut Vec<u8>) -> Option<String> {
    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buf.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&raw[..pos]);
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            return Some(line.to_string());
        }
    }
    None
}

/// Serial port implementation of [`AtPort`].
///
/// Constructed closed; [`open`](AtPort::open) acquires the device. Bytes
/// are accumulated internally and handed out one line at a time, so a
/// response split across several reads still comes back whole.
pub struct SerialAtPort {
    /// Serial port path (e.g. "/dev/ttyUSB0" on Linux, "COM3" on Windows).
    path: String,
    config: SerialConfig,
    /// The underlying stream, present only while the port is open.
    stream: Option<SerialStream>,
    /// Bytes received but not yet assembled into a complete line.
    line_buf: Vec<u8>,
}

impl SerialAtPort {
    /// A closed port with the given path and baud rate and default
    /// settings otherwise.
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self::with_config(
            path,
            SerialConfig {
                baud_rate,
                ..Default::default()
            },
        )
    }

    /// A closed port with full configuration control.
    pub fn with_config(path: impl Into<String>, config: SerialConfig) -> Self {
        SerialAtPort {
            path: path.into(),
            config,
            stream: None,
            line_buf: Vec::new(),
        }
    }

    /// The serial port path this port was configured with.
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl AtPort for SerialAtPort {
    async fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        tracing::debug!(
            port = %self.path,
            baud_rate = self.config.baud_rate,
            "Opening serial port"
        );

        let stream = tokio_serial::new(&self.path, self.config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(if self.config.hardware_flow_control {
                tokio_serial::FlowControl::Hardware
            } else {
                tokio_serial::FlowControl::None
            })
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %self.path, error = %e, "Failed to open serial port");
                Error::Transport(format!("failed to open serial port {}: {}", self.path, e))
            })?;

        // Stale bytes from a previous session must not leak into this one.
        self.line_buf.clear();
        self.stream = Some(stream);

        tracing::info!(port = %self.path, baud_rate = self.config.baud_rate, "Serial port opened");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            tracing::debug!(port = %self.path, "Closing serial port");
            if let Err(e) = stream.flush().await {
                tracing::warn!(port = %self.path, error = %e, "Failed to flush before closing");
            }
            // Dropping the stream closes the port.
            self.line_buf.clear();
            tracing::info!(port = %self.path, "Serial port closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotOpen)?;
        tracing::trace!(port = %self.path, bytes = data.len(), "Sending data");
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(data.len())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        if self.stream.is_none() {
            return Err(Error::NotOpen);
        }
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = take_line(&mut self.line_buf) {
                tracing::trace!(port = %self.path, line = %line, "Received line");
                return Ok(Some(line));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let stream = self.stream.as_mut().ok_or(Error::NotOpen)?;
            let mut chunk = [0u8; 256];
            match tokio::time::timeout(remaining, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => {
                    return Err(Error::Transport(format!(
                        "serial port {} closed unexpectedly",
                        self.path
                    )));
                }
                Ok(Ok(n)) => self.line_buf.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => {
                    tracing::error!(port = %self.path, error = %e, "Failed to read from serial port");
                    return Err(Error::Io(e));
                }
                Err(_) => return Ok(None),
            }
        }
    }
}

impl Drop for SerialAtPort {
    fn drop(&mut self) {
        if self.stream.is_some() {
            tracing::debug!(port = %self.path, "SerialAtPort dropped, closing port");
            // The stream closes when dropped.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_default() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115200);
        assert!(!config.hardware_flow_control);
    }

    #[test]
    fn test_take_line_splits_crlf() {
        let mut buf = b"OK V3.0.0.14.H\r\npartial".to_vec();
        assert_eq!(take_line(&mut buf), Some("OK V3.0.0.14.H".to_string()));
        assert_eq!(take_line(&mut buf), None);
        assert_eq!(buf, b"partial");
    }

    #[test]
    fn test_take_line_skips_blank_lines() {
        let mut buf = b"\r\n\r\nOK\r\n".to_vec();
        assert_eq!(take_line(&mut buf), Some("OK".to_string()));
        assert_eq!(take_line(&mut buf), None);
    }

    #[test]
    fn test_take_line_handles_bare_lf() {
        let mut buf = b"line one\nline two\n".to_vec();
        assert_eq!(take_line(&mut buf), Some("line one".to_string()));
        assert_eq!(take_line(&mut buf), Some("line two".to_string()));
    }

    #[test]
    fn test_take_line_incomplete() {
        let mut buf = b"no newline yet".to_vec();
        assert_eq!(take_line(&mut buf), None);
        assert_eq!(buf, b"no newline yet");
    }

    #[test]
    fn test_closed_port_state() {
        let port = SerialAtPort::new("/dev/ttyUSB0", 9600);
        assert!(!port.is_open());
        assert_eq!(port.path(), "/dev/ttyUSB0");
    }
}
