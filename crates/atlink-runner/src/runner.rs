//! The command/response correlation loop.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use atlink_core::{AtPort, Error, Result};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::command::{Command, CommandResult};

/// Boxed future returned by a scoped operation closure.
///
/// The lifetime ties the future to the `&mut CommandRunner` borrow, so an
/// operation can issue any number of exchanges but can never outlive the
/// open/close bracket that [`CommandRunner::run_command`] wraps around it.
pub type ScopedFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Drives a single AT port: one command in flight at a time, response
/// lines accumulated and re-validated after every arrival.
///
/// The `&mut self` receiver on [`execute`](CommandRunner::execute) is the
/// concurrency discipline: overlapping commands on one port are rejected
/// at compile time, so a response line can never be attributed to the
/// wrong command.
pub struct CommandRunner {
    port: Box<dyn AtPort>,
}

impl CommandRunner {
    pub fn new(port: Box<dyn AtPort>) -> Self {
        CommandRunner { port }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_open()
    }

    /// Open the underlying port. Opening an already-open port is a no-op.
    pub async fn open(&mut self) -> Result<()> {
        if self.port.is_open() {
            return Ok(());
        }
        debug!("opening port");
        self.port.open().await
    }

    /// Close the underlying port. Closing an already-closed port is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if !self.port.is_open() {
            return Ok(());
        }
        debug!("closing port");
        self.port.close().await
    }

    /// Write one command and accumulate response lines until the command's
    /// validation accepts the buffer or the timeout expires.
    ///
    /// The full buffer is re-validated after every line, so validators see
    /// every line that arrived, in order. A timeout carries the partial
    /// buffer in the error for diagnostics.
    ///
    /// Lines still buffered from an earlier exchange are discarded before
    /// the write: a response that arrives after its command timed out is
    /// noise, and must never satisfy the next command's validator.
    pub async fn execute(&mut self, command: &Command) -> Result<CommandResult> {
        if !self.port.is_open() {
            return Err(Error::NotOpen);
        }
        while let Some(line) = self.port.read_line(Duration::ZERO).await? {
            trace!(line = %line, "discarding stale line");
        }
        debug!(command = %command.text, "executing command");
        self.port
            .write(format!("{}\r\n", command.text).as_bytes())
            .await?;

        let deadline = Instant::now() + command.options.timeout;
        let mut lines: Vec<String> = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout {
                    command: command.text.clone(),
                    lines,
                });
            }
            match self.port.read_line(remaining).await? {
                Some(line) => {
                    trace!(line = %line, "received line");
                    lines.push(line);
                    if command.options.validation.evaluate(&lines)? {
                        debug!(command = %command.text, lines = lines.len(), "command complete");
                        return Ok(CommandResult {
                            command: command.text.clone(),
                            lines,
                        });
                    }
                }
                None => {
                    return Err(Error::Timeout {
                        command: command.text.clone(),
                        lines,
                    });
                }
            }
        }
    }

    /// Run one scoped operation: open the port, run the closure, close the
    /// port, and fold the close outcome into the result.
    ///
    /// The closure receives the runner itself and may issue any sequence of
    /// [`execute`](CommandRunner::execute) calls. The port is closed whether
    /// the operation succeeds or fails.
    pub async fn run_command<T, F>(&mut self, op: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut CommandRunner) -> ScopedFuture<'a, T>,
    {
        self.open().await?;
        let result = op(self).await;
        self.finish(result).await
    }

    /// Run a fixed command sequence in order, stopping at the first
    /// failure. The port is opened before the first command and closed
    /// afterwards regardless of outcome.
    pub async fn run_commands(&mut self, commands: &[Command]) -> Result<Vec<CommandResult>> {
        self.open().await?;
        let mut results = Vec::with_capacity(commands.len());
        let mut outcome = Ok(());
        for command in commands {
            match self.execute(command).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        self.finish(outcome.map(|_| results)).await
    }

    /// Close the port and fold the close outcome into an operation result.
    ///
    /// A failed close turns a successful operation into an error; an
    /// already-failed operation keeps its original error and the close
    /// failure is only logged.
    pub async fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match (result, self.close().await) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "close failed after command error");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use atlink_core::Error;
    use atlink_test_harness::MockPort;

    use super::*;
    use crate::command::Validation;

    fn runner_with(port: MockPort) -> CommandRunner {
        CommandRunner::new(Box::new(port))
    }

    #[tokio::test]
    async fn execute_resolves_on_ok() {
        let mut port = MockPort::new();
        port.queue_lines(&["OK V3.0.0.14.H"]);
        let mut runner = runner_with(port);
        runner.open().await.unwrap();

        let result = runner.execute(&Command::new("at+version")).await.unwrap();
        assert_eq!(result.command, "at+version");
        assert_eq!(result.lines, vec!["OK V3.0.0.14.H"]);
    }

    #[tokio::test]
    async fn execute_requires_open_port() {
        let mut runner = runner_with(MockPort::new());
        let err = runner.execute(&Command::new("at")).await.unwrap_err();
        assert!(matches!(err, Error::NotOpen));
    }

    #[tokio::test]
    async fn error_line_surfaces_as_device_response() {
        let mut port = MockPort::new();
        port.queue_lines(&["Error: 2"]);
        let mut runner = runner_with(port);
        runner.open().await.unwrap();

        let err = runner.execute(&Command::new("at+join")).await.unwrap_err();
        match err {
            Error::DeviceResponse { code, .. } => assert_eq!(code, "2"),
            other => panic!("expected DeviceResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_carries_partial_lines() {
        let mut port = MockPort::new();
        port.queue_lines(&["Initialization OK"]);
        let mut runner = runner_with(port);
        runner.open().await.unwrap();

        let command = Command::new("at+join").timeout(Duration::from_millis(50));
        let err = runner.execute(&command).await.unwrap_err();
        match err {
            Error::Timeout { command, lines } => {
                assert_eq!(command, "at+join");
                assert_eq!(lines, vec!["Initialization OK"]);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn line_count_waits_for_full_dump() {
        let mut port = MockPort::new();
        port.queue_lines(&["OK", "line two", "line three"]);
        let mut runner = runner_with(port);
        runner.open().await.unwrap();

        let command = Command::new("dump").validation(Validation::LineCount(3));
        let result = runner.execute(&command).await.unwrap();
        assert_eq!(result.lines.len(), 3);
    }

    #[tokio::test]
    async fn marker_validation_resolves_on_marker() {
        let mut port = MockPort::new();
        port.queue_lines(&["OK", "+RX=aa bb", "+RX END"]);
        let mut runner = runner_with(port);
        runner.open().await.unwrap();

        let command = Command::new("AT$SF=aa,2,1").validation(Validation::Marker("+rx end"));
        let result = runner.execute(&command).await.unwrap();
        assert_eq!(result.lines.len(), 3);
    }

    #[tokio::test]
    async fn custom_validation_errors_abort_the_exchange() {
        let mut port = MockPort::new();
        port.queue_lines(&["garbage"]);
        let mut runner = runner_with(port);
        runner.open().await.unwrap();

        let validation = Validation::custom(|_lines: &[String]| {
            Err(Error::Parse("unexpected response".to_string()))
        });
        let command = Command::new("at").validation(validation);
        let err = runner.execute(&command).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn run_commands_executes_in_order_and_closes() {
        let mut port = MockPort::new();
        port.queue_lines_once(&["OK first"]);
        port.queue_lines_once(&["OK second"]);
        let mut runner = runner_with(port);

        let results = runner
            .run_commands(&[Command::new("at+one"), Command::new("at+two")])
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].lines, vec!["OK first"]);
        assert_eq!(results[1].lines, vec!["OK second"]);
        assert!(!runner.is_open());
    }

    #[tokio::test]
    async fn run_commands_short_circuits_on_failure() {
        let mut port = MockPort::new();
        port.queue_lines_once(&["Error: 2"]);
        let mut runner = runner_with(port);

        let err = runner
            .run_commands(&[Command::new("at+one"), Command::new("at+two")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeviceResponse { .. }));
        assert!(!runner.is_open());
    }

    #[tokio::test]
    async fn run_command_closes_port_on_success_and_failure() {
        let mut port = MockPort::new();
        port.queue_lines(&["OK"]);
        let mut runner = runner_with(port);

        let value = runner
            .run_command(|r| {
                Box::pin(async move {
                    let result = r.execute(&Command::new("at")).await?;
                    Ok(result.lines.len())
                })
            })
            .await
            .unwrap();
        assert_eq!(value, 1);
        assert!(!runner.is_open());

        let err = runner
            .run_command(|_r| Box::pin(async move { Err::<(), _>(Error::Parse("boom".to_string())) }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(!runner.is_open());
    }

    #[tokio::test]
    async fn late_lines_from_timed_out_command_are_discarded() {
        let mut port = MockPort::new();
        // The join answer lands after the join's read window has already
        // expired, so it sits buffered in the port.
        port.queue_lines_once(&["OK Join Success"]);
        port.queue_lines_once(&["OK"]);
        let mut runner = runner_with(port);
        runner.open().await.unwrap();

        let join = Command::new("at+join").timeout(Duration::ZERO);
        let err = runner.execute(&join).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));

        // The next exchange must see only its own answer, not the stale
        // join line.
        let result = runner
            .execute(&Command::new("at+set_config=device:restart"))
            .await
            .unwrap();
        assert_eq!(result.lines, vec!["OK"]);
    }

    #[tokio::test]
    async fn open_and_close_are_idempotent() {
        let mut runner = runner_with(MockPort::new());
        runner.open().await.unwrap();
        runner.open().await.unwrap();
        assert!(runner.is_open());
        runner.close().await.unwrap();
        runner.close().await.unwrap();
        assert!(!runner.is_open());
    }

    #[tokio::test]
    async fn shared_custom_validator_is_reusable() {
        let validator: Arc<dyn Fn(&[String]) -> atlink_core::Result<bool> + Send + Sync> =
            Arc::new(|lines: &[String]| Ok(lines.len() >= 2));

        let mut port = MockPort::new();
        port.queue_lines(&["one", "two"]);
        let mut runner = runner_with(port);
        runner.open().await.unwrap();

        let command = Command::new("at").validation(Validation::Custom(validator.clone()));
        let result = runner.execute(&command).await.unwrap();
        assert_eq!(result.lines.len(), 2);
    }
}
