//! Mock AT port for deterministic testing of the command runner and the
//! dialect drivers.
//!
//! [`MockPort`] implements the [`AtPort`] trait with pre-loaded response
//! batches. This lets you test command sequencing, validators, and
//! response parsing without real module hardware.
//!
//! # Example
//!
//! ```
//! use atlink_test_harness::MockPort;
//!
//! let mut mock = MockPort::new();
//! // Each write releases the next queued batch, one line per read.
//! mock.queue_lines_once(&["OK V3.0.0.14.H"]);
//! mock.queue_lines_once(&["OK Join Success"]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use atlink_core::{AtPort, Error, Result};

/// Cloneable view onto a [`MockPort`]'s sent-data log.
///
/// Obtained via [`MockPort::sent_log`] before the port moves into a
/// runner or driver, so tests can still assert on what was written.
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<Vec<u8>>>>);

impl SentLog {
    /// All data written so far, one element per `write()` call.
    pub fn data(&self) -> Vec<Vec<u8>> {
        self.0.lock().unwrap().clone()
    }

    /// The written commands as text, with line terminators stripped.
    pub fn commands(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .trim_end_matches(['\r', '\n'])
                    .to_string()
            })
            .collect()
    }

    fn push(&self, data: &[u8]) {
        self.0.lock().unwrap().push(data.to_vec());
    }
}

/// A mock [`AtPort`] for testing without hardware.
///
/// Responses are organized as batches of lines. Each `write()` call
/// records the sent bytes and releases the next batch: the head of the
/// once-queue if one is waiting, otherwise a fresh copy of the repeating
/// batch. Released lines are then returned one per `read_line()` call.
///
/// When no released line is pending, `read_line()` returns `Ok(None)`
/// immediately, which the runner treats as an expired read window. This
/// makes timeout scenarios instantaneous in tests.
#[derive(Debug, Default)]
pub struct MockPort {
    /// Whether the port is "open".
    open: bool,
    /// Batches consumed one per `write()`, in order.
    once_batches: VecDeque<Vec<String>>,
    /// Fallback batch released by every `write()` once the once-queue is
    /// exhausted.
    repeat_batch: Option<Vec<String>>,
    /// Lines released but not yet read.
    pending: VecDeque<String>,
    /// Log of all bytes sent through this port.
    sent_log: SentLog,
    /// When set, the next `open()` call fails with this message.
    open_error: Option<String>,
}

impl MockPort {
    /// Create a new mock port in the closed state with no responses queued.
    pub fn new() -> Self {
        MockPort::default()
    }

    /// Queue a batch of response lines released by the next unconsumed
    /// `write()` call. Batches are consumed in queue order.
    pub fn queue_lines_once(&mut self, lines: &[&str]) {
        self.once_batches
            .push_back(lines.iter().map(|s| s.to_string()).collect());
    }

    /// Set the batch of response lines released by every `write()` call
    /// after the once-queue is exhausted.
    pub fn queue_lines(&mut self, lines: &[&str]) {
        self.repeat_batch = Some(lines.iter().map(|s| s.to_string()).collect());
    }

    /// Make the next `open()` call fail with a transport error.
    pub fn fail_on_open(&mut self, message: &str) {
        self.open_error = Some(message.to_string());
    }

    /// A handle onto the sent-data log that survives moving this port
    /// into a runner.
    pub fn sent_log(&self) -> SentLog {
        self.sent_log.clone()
    }

    /// All data that has been sent through this port, one element per
    /// `write()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.sent_log.data()
    }

    /// The sent commands as text, with line terminators stripped.
    pub fn sent_commands(&self) -> Vec<String> {
        self.sent_log.commands()
    }
}

#[async_trait]
impl AtPort for MockPort {
    async fn open(&mut self) -> Result<()> {
        if let Some(message) = self.open_error.take() {
            return Err(Error::Transport(message));
        }
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        if !self.open {
            return Err(Error::NotOpen);
        }
        self.sent_log.push(data);

        let batch = match self.once_batches.pop_front() {
            Some(batch) => Some(batch),
            None => self.repeat_batch.clone(),
        };
        if let Some(batch) = batch {
            self.pending.extend(batch);
        }
        Ok(data.len())
    }

    async fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>> {
        if !self.open {
            return Err(Error::NotOpen);
        }
        Ok(self.pending.pop_front())
    }
}
