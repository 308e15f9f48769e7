//! SIM800 command builders and parsers.
//!
//! The GSM dialect frames answers with the classic `OK`/`ERROR` trailer.
//! The diagnostics sweep deliberately accepts `ERROR` as a completion
//! token too: a probe that the network rejects still produced a useful
//! answer, and the sweep must keep going.

use atlink_core::{Error, Result};
use atlink_runner::validate;
use atlink_runner::{Command, Validation};

/// Model name carried in device errors.
pub const MODEL: &str = "SIM800";

pub fn ok_validation() -> Validation {
    Validation::custom(|lines| {
        validate::check_error_lines(lines, &["error"], MODEL, |_| None)?;
        Ok(validate::any_line_starts_with(lines, "ok"))
    })
}

/// Completes on either trailer without raising. Used by the diagnostics
/// sweep, where a rejected probe is a finding rather than a failure.
fn probe_validation() -> Validation {
    Validation::custom(|lines| {
        Ok(validate::any_line_starts_with(lines, "ok")
            || validate::any_line_starts_with(lines, "error"))
    })
}

pub fn version() -> Command {
    Command::new("ATI").validation(ok_validation())
}

fn probe(command: &str) -> Command {
    Command::new(command).validation(probe_validation())
}

/// SIM, registration, operator, signal, and GPRS attach probes, in the
/// order a field technician would walk them.
pub fn network_probes() -> Vec<Command> {
    vec![
        probe("AT+CPIN?"),
        probe("AT+CGREG=1"),
        probe("AT+CGREG?"),
        probe("AT+COPS?"),
        probe("AT+CSQ"),
        probe("AT+CGDCONT?"),
        probe("AT+CGATT=1"),
        probe("AT+CGATT?"),
        probe("AT+CGPADDR=1"),
        probe("AT+CIPPING=\"142.250.200.142\""),
    ]
}

/// The `ATI` answer echoes the command on the first line and carries the
/// product identification on the second.
pub fn parse_version(lines: &[String]) -> Result<String> {
    lines
        .get(1)
        .filter(|line| !line.is_empty())
        .cloned()
        .ok_or_else(|| Error::Parse("cannot get version".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn version_takes_second_line() {
        let answer = lines(&["ATI", "SIM800 R14.18", "OK"]);
        assert_eq!(parse_version(&answer).unwrap(), "SIM800 R14.18");
    }

    #[test]
    fn version_rejects_truncated_answer() {
        let answer = lines(&["ATI"]);
        assert_eq!(
            parse_version(&answer).unwrap_err().to_string(),
            "parse error: cannot get version"
        );
    }

    #[test]
    fn ok_validation_raises_on_error_trailer() {
        let answer = lines(&["ATI", "ERROR"]);
        assert!(ok_validation().evaluate(&answer).is_err());
    }

    #[test]
    fn probe_validation_accepts_error_trailer() {
        let answer = lines(&["AT+CPIN?", "ERROR"]);
        assert!(probe_validation().evaluate(&answer).unwrap());
    }

    #[test]
    fn probe_validation_waits_for_a_trailer() {
        let answer = lines(&["+CSQ: 21,0"]);
        assert!(!probe_validation().evaluate(&answer).unwrap());
    }
}
