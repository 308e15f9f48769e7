//! Command descriptors and validation strategies.
//!
//! A [`Command`] is an immutable record of one request: the text to send,
//! how to decide the response is complete, and how long to wait. The
//! [`Validation`] enum is the closed set of completion strategies the
//! dialects select from; the `Custom` variant is the escape hatch for
//! dialect-specific predicates that also raise typed device errors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use atlink_core::Result;

use crate::validate;

/// Default per-command timeout. Device-independent; dialects override it
/// per call (Sigfox radio round trips can take tens of seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Error token assumed by [`Validation::Default`] and
/// [`Validation::Marker`] when the dialect has not supplied its own
/// validator.
const DEFAULT_ERROR_TOKEN: &str = "error";

/// A dialect-supplied completion predicate over the accumulated lines.
///
/// Returns `Ok(true)` when the response is complete and successful,
/// `Ok(false)` when more lines are needed, and `Err` when an
/// error-marker line was detected. Invoked against the whole buffer
/// after every newly arrived line.
pub type Validator = Arc<dyn Fn(&[String]) -> Result<bool> + Send + Sync>;

/// Strategy for deciding when an accumulated response is complete.
///
/// Dialects vary in whether success is signalled by token, by line count,
/// or by a terminal marker line; this enum keeps the common cases
/// enumerable while `Custom` covers everything else.
pub enum Validation {
    /// Complete once any line case-insensitively starts with `ok`.
    /// A line starting with `error` raises first, so an error can never
    /// be mistaken for success.
    Default,
    /// Complete once exactly this many lines have arrived. Used for
    /// firmware that always emits a fixed-size status dump.
    LineCount(usize),
    /// Complete once any line case-insensitively starts with the marker.
    /// The default `error` token still raises first.
    Marker(&'static str),
    /// Dialect-supplied predicate with its own error detection.
    Custom(Validator),
}

impl Validation {
    /// Wrap a closure as a [`Validation::Custom`] strategy.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> Result<bool> + Send + Sync + 'static,
    {
        Validation::Custom(Arc::new(f))
    }

    /// Evaluate the accumulated lines.
    ///
    /// Error detection always precedes the success check: a buffer
    /// containing both an error-marker line and a satisfying line
    /// rejects rather than resolves.
    pub fn evaluate(&self, lines: &[String]) -> Result<bool> {
        match self {
            Validation::Default => {
                validate::check_error_lines(lines, &[DEFAULT_ERROR_TOKEN], "device", |_| None)?;
                Ok(validate::any_line_starts_with(lines, "ok"))
            }
            Validation::LineCount(count) => Ok(lines.len() == *count),
            Validation::Marker(marker) => {
                validate::check_error_lines(lines, &[DEFAULT_ERROR_TOKEN], "device", |_| None)?;
                Ok(validate::any_line_starts_with(lines, marker))
            }
            Validation::Custom(validator) => validator(lines),
        }
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Default => write!(f, "Validation::Default"),
            Validation::LineCount(n) => write!(f, "Validation::LineCount({n})"),
            Validation::Marker(m) => write!(f, "Validation::Marker({m:?})"),
            Validation::Custom(_) => write!(f, "Validation::Custom(..)"),
        }
    }
}

impl Default for Validation {
    fn default() -> Self {
        Validation::Default
    }
}

/// Per-call execution options: completion strategy and timeout.
#[derive(Debug)]
pub struct ExecutionOptions {
    /// How to decide the response is complete (or in error).
    pub validation: Validation,
    /// How long to wait for a satisfying response after the write.
    pub timeout: Duration,
}

impl ExecutionOptions {
    /// Default validation with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        ExecutionOptions {
            validation: Validation::Default,
            timeout,
        }
    }

    /// Explicit validation strategy and timeout.
    pub fn new(validation: Validation, timeout: Duration) -> Self {
        ExecutionOptions {
            validation,
            timeout,
        }
    }
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        ExecutionOptions {
            validation: Validation::Default,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// An immutable command record: text plus execution options.
///
/// Created per call, never mutated, discarded after resolution.
#[derive(Debug)]
pub struct Command {
    /// The command text, without the line terminator.
    pub text: String,
    /// Completion strategy and timeout for this command.
    pub options: ExecutionOptions,
}

impl Command {
    /// A command with default options.
    pub fn new(text: impl Into<String>) -> Self {
        Command {
            text: text.into(),
            options: ExecutionOptions::default(),
        }
    }

    /// Override the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Override the validation strategy.
    pub fn validation(mut self, validation: Validation) -> Self {
        self.options.validation = validation;
        self
    }
}

/// The resolved outcome of one command: the text that was sent and the
/// response lines in arrival order, up to and including the line that
/// satisfied the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// The command text this result belongs to.
    pub command: String,
    /// Received lines, insertion order = arrival order.
    pub lines: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlink_core::Error;

    #[test]
    fn default_validation_matches_ok_case_insensitive() {
        let lines = vec!["OK V3.0.0.14.H".to_string()];
        assert!(Validation::Default.evaluate(&lines).unwrap());

        let lines = vec!["ok".to_string()];
        assert!(Validation::Default.evaluate(&lines).unwrap());
    }

    #[test]
    fn default_validation_pending_without_ok() {
        let lines = vec!["something else".to_string()];
        assert!(!Validation::Default.evaluate(&lines).unwrap());
        assert!(!Validation::Default.evaluate(&[]).unwrap());
    }

    #[test]
    fn default_validation_error_precedes_ok() {
        // Both an error line and an ok line: the error must win.
        let lines = vec!["Error: 2".to_string(), "OK".to_string()];
        let err = Validation::Default.evaluate(&lines).unwrap_err();
        match err {
            Error::DeviceResponse { code, .. } => assert_eq!(code, "2"),
            other => panic!("expected DeviceResponse, got {other:?}"),
        }
    }

    #[test]
    fn line_count_validation() {
        let v = Validation::LineCount(3);
        let lines: Vec<String> = vec!["a".into(), "b".into()];
        assert!(!v.evaluate(&lines).unwrap());
        let lines: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        assert!(v.evaluate(&lines).unwrap());
    }

    #[test]
    fn marker_validation() {
        let v = Validation::Marker("+rx end");
        let lines: Vec<String> = vec!["OK".into(), "+RX BEGIN".into()];
        assert!(!v.evaluate(&lines).unwrap());
        let lines: Vec<String> = vec!["OK".into(), "+RX END".into()];
        assert!(v.evaluate(&lines).unwrap());
    }

    #[test]
    fn custom_validation_runs_closure() {
        let v = Validation::custom(|lines| Ok(lines.len() >= 2));
        let lines: Vec<String> = vec!["one".into()];
        assert!(!v.evaluate(&lines).unwrap());
        let lines: Vec<String> = vec!["one".into(), "two".into()];
        assert!(v.evaluate(&lines).unwrap());
    }

    #[test]
    fn command_builder_chain() {
        let cmd = Command::new("AT$I=4")
            .timeout(Duration::from_millis(250))
            .validation(Validation::LineCount(1));
        assert_eq!(cmd.text, "AT$I=4");
        assert_eq!(cmd.options.timeout, Duration::from_millis(250));
        assert!(matches!(cmd.options.validation, Validation::LineCount(1)));
    }
}
