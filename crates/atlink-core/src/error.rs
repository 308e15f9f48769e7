//! Error types for atlink.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! parse-layer errors are all captured here so calling code can match on
//! tagged variants instead of probing message strings.

/// The error type for all atlink operations.
///
/// Variants cover the full range of failure modes encountered when
/// talking AT commands to radio modules: transport failures, response
/// timeouts, device-reported error codes, invalid payload frames, and
/// response parse failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open/write/close failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// No validator-satisfying response arrived within the allotted time.
    ///
    /// Carries the command text and every line that did arrive, in
    /// arrival order, so the failure can be diagnosed without re-running.
    #[error("timeout after {} lines received for command: {command}", lines.len())]
    Timeout {
        /// The command that was awaiting a response.
        command: String,
        /// All lines received before the deadline passed.
        lines: Vec<String>,
    },

    /// The device itself reported a failure via an error-marker line.
    ///
    /// `code` is kept as the raw token from the wire so non-numeric codes
    /// survive; `description` comes from the per-model lookup table, or
    /// "Unknown error code" when the code is not in the table.
    #[error("{model} error code {code}: {description}")]
    DeviceResponse {
        /// The device model that produced the error.
        model: &'static str,
        /// Raw error code as received (usually numeric).
        code: String,
        /// Human-readable description from the model's error table.
        description: String,
    },

    /// The caller supplied a payload that cannot be legally transmitted.
    ///
    /// Raised before any I/O: an invalid frame never touches the port.
    #[error("invalid frame {frame:?}: {reason}")]
    Frame {
        /// The offending payload as supplied.
        frame: String,
        /// Why it was rejected (empty, size, parity, non-hex).
        reason: String,
    },

    /// A response satisfied its validator but a required field could not
    /// be extracted afterwards.
    #[error("parse error: {0}")]
    Parse(String),

    /// An operation was attempted on a port that is not open.
    #[error("port is not open")]
    NotOpen,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The numeric form of a [`DeviceResponse`](Error::DeviceResponse)
    /// code, when it parses as one. `None` for other variants and for
    /// non-numeric codes.
    pub fn device_code(&self) -> Option<i64> {
        match self {
            Error::DeviceResponse { code, .. } => code.parse().ok(),
            _ => None,
        }
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("port busy".into());
        assert_eq!(e.to_string(), "transport error: port busy");
    }

    #[test]
    fn error_display_timeout_counts_lines() {
        let e = Error::Timeout {
            command: "at+version".into(),
            lines: vec!["noise".into()],
        };
        assert_eq!(
            e.to_string(),
            "timeout after 1 lines received for command: at+version"
        );
    }

    #[test]
    fn error_display_device_response() {
        let e = Error::DeviceResponse {
            model: "RAK811",
            code: "2".into(),
            description: "Invalid parameter in the AT command".into(),
        };
        assert_eq!(
            e.to_string(),
            "RAK811 error code 2: Invalid parameter in the AT command"
        );
    }

    #[test]
    fn error_display_frame() {
        let e = Error::Frame {
            frame: "1122334".into(),
            reason: "odd number of hex characters (7)".into(),
        };
        assert_eq!(
            e.to_string(),
            "invalid frame \"1122334\": odd number of hex characters (7)"
        );
    }

    #[test]
    fn error_display_not_open() {
        assert_eq!(Error::NotOpen.to_string(), "port is not open");
    }

    #[test]
    fn device_code_parses_numeric() {
        let e = Error::DeviceResponse {
            model: "RAK11300",
            code: "5".into(),
            description: "Invalid parameter in the AT command".into(),
        };
        assert_eq!(e.device_code(), Some(5));
    }

    #[test]
    fn device_code_none_for_non_numeric() {
        let e = Error::DeviceResponse {
            model: "ERIC",
            code: "ATCMD_NOT_SUPPORTED".into(),
            description: "Unknown error code".into(),
        };
        assert_eq!(e.device_code(), None);
        assert_eq!(Error::NotOpen.device_code(), None);
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }
}
