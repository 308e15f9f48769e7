//! ERIC command builders, validators, and response parsers.
//!
//! The ERIC firmware answers identity probes (`AT$I=n`, `AT$IF?`) with a
//! single bare line, so version and information are aggregations of
//! several one-line exchanges rather than one dump. Errors are symbolic
//! (`ERR_...`, `ATCMD_NOT_SUPPORTED`) with no numeric table.

use atlink_core::{Error, Result};
use atlink_runner::validate;
use atlink_runner::{Command, CommandResult, Validation};

/// Model name carried in device errors.
pub const MODEL: &str = "ERIC";

/// Symbolic error prefixes the firmware can emit.
const ERROR_TOKENS: [&str; 2] = ["err", "atcmd_not_supported"];

fn check_errors(lines: &[String]) -> Result<()> {
    validate::check_error_lines(lines, &ERROR_TOKENS, MODEL, |_| None)
}

/// Identity probes answer with exactly one line and no `OK` trailer.
fn single_line_validation() -> Validation {
    Validation::custom(|lines| {
        check_errors(lines)?;
        Ok(lines.len() == 1)
    })
}

pub fn ok_validation() -> Validation {
    Validation::custom(|lines| {
        check_errors(lines)?;
        Ok(validate::any_line_starts_with(lines, "ok"))
    })
}

/// Completes on the `rx=` line that carries the downlink payload.
fn downlink_validation() -> Validation {
    Validation::custom(|lines| {
        check_errors(lines)?;
        Ok(validate::any_line_starts_with(lines, "rx="))
    })
}

pub fn probe(command: &str) -> Command {
    Command::new(command).validation(single_line_validation())
}

pub fn version_probes() -> Vec<Command> {
    vec![probe("AT$I=4"), probe("AT$I=5"), probe("AT$I=8")]
}

pub fn information_probes() -> Vec<Command> {
    vec![
        probe("AT$I=0"),
        probe("AT$I=10"),
        probe("AT$I=11"),
        probe("AT$IF?"),
    ]
}

pub fn send(frame: &str) -> Command {
    Command::new(format!("AT$SF={frame},0")).validation(ok_validation())
}

pub fn send_and_wait(frame: &str) -> Command {
    Command::new(format!("AT$SF={frame},1")).validation(downlink_validation())
}

/// Join the three identity fragments (`AT$I=4`, `5`, `8`) with dots.
pub fn parse_version(results: &[CommandResult]) -> Result<String> {
    if results.len() != 3 {
        return Err(Error::Parse("cannot get version".to_string()));
    }
    let fragments: Vec<&str> = results
        .iter()
        .filter_map(|result| result.lines.first().map(String::as_str))
        .collect();
    if fragments.len() != 3 {
        return Err(Error::Parse("cannot get version".to_string()));
    }
    Ok(fragments.join("."))
}

/// Device identity aggregated from the identity probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EricInformation {
    pub model: String,
    pub software_version: String,
    pub hardware_version: String,
    pub device_id: String,
    pub serial_number: String,
    pub region: String,
}

fn first_line_for<'a>(results: &'a [CommandResult], command: &str) -> Option<&'a str> {
    results
        .iter()
        .find(|result| result.command == command)
        .and_then(|result| result.lines.first())
        .map(String::as_str)
        .filter(|line| !line.is_empty())
}

/// Aggregate the probe results into an [`EricInformation`]. Missing or
/// empty answers degrade to the `"unknown"` sentinel; the region is
/// derived from the radio frequency reported by `AT$IF?`.
pub fn parse_information(results: &[CommandResult]) -> Result<EricInformation> {
    let mut info = EricInformation {
        model: "unknown".to_string(),
        software_version: "unknown".to_string(),
        hardware_version: "unknown".to_string(),
        device_id: "unknown".to_string(),
        serial_number: "unknown".to_string(),
        region: "unknown".to_string(),
    };

    if let Some(line) = first_line_for(results, "AT$I=0") {
        let mut parts = line.split_whitespace();
        if let Some(model) = parts.next() {
            info.model = model.to_string();
        }
        if let Some(version) = parts.next() {
            info.software_version = version.to_string();
        }
    }
    if let Some(line) = first_line_for(results, "AT$I=10") {
        info.device_id = line.to_string();
    }
    if let Some(line) = first_line_for(results, "AT$I=11") {
        info.serial_number = line.to_string();
    }
    if let Some(frequency) = first_line_for(results, "AT$IF?")
        .and_then(|line| line.trim().parse::<u64>().ok())
    {
        if frequency < 900_000_000 {
            info.region = "EU868".to_string();
        } else if frequency > 900_000_000 {
            info.region = "US915".to_string();
        }
    }

    Ok(info)
}

/// Extract the downlink payload from an `rx=aa bb cc` line. The uplink
/// must have been acknowledged with `OK` first.
pub fn parse_downlink(lines: &[String]) -> Result<Vec<u8>> {
    let acknowledged = lines
        .first()
        .is_some_and(|line| validate::starts_with_ignore_case(line, "ok"));
    if !acknowledged {
        return Err(Error::Parse(format!(
            "uplink was not acknowledged: {:?}",
            lines.first()
        )));
    }
    let Some(line) = lines
        .iter()
        .find(|line| validate::starts_with_ignore_case(line, "rx="))
    else {
        return Ok(Vec::new());
    };
    let malformed = || Error::Parse(format!("malformed downlink line: {line}"));

    let payload = line.split_once('=').map(|(_, rest)| rest.trim()).ok_or_else(malformed)?;
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    payload
        .split_whitespace()
        .map(|byte| u8::from_str_radix(byte, 16).map_err(|_| malformed()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(command: &str, lines: &[&str]) -> CommandResult {
        CommandResult {
            command: command.to_string(),
            lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn version_joins_fragments_with_dots() {
        let results = vec![
            result("AT$I=4", &["1"]),
            result("AT$I=5", &["0"]),
            result("AT$I=8", &["12"]),
        ];
        assert_eq!(parse_version(&results).unwrap(), "1.0.12");
    }

    #[test]
    fn version_rejects_incomplete_aggregation() {
        let results = vec![result("AT$I=4", &["1"])];
        assert_eq!(
            parse_version(&results).unwrap_err().to_string(),
            "parse error: cannot get version"
        );
    }

    #[test]
    fn symbolic_error_raises_device_response() {
        let lines = vec!["ERR_SEND_FRAME_DATA_PTR_INVALID".to_string()];
        let err = ok_validation().evaluate(&lines).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERIC error code ERR_SEND_FRAME_DATA_PTR_INVALID: Unknown error code"
        );
    }

    #[test]
    fn unsupported_command_raises_device_response() {
        let lines = vec!["ATCMD_NOT_SUPPORTED".to_string()];
        assert!(ok_validation().evaluate(&lines).is_err());
    }

    #[test]
    fn information_aggregates_probe_results() {
        let results = vec![
            result("AT$I=0", &["ERIC-SIGFOX 1.4.2"]),
            result("AT$I=10", &["0020451D"]),
            result("AT$I=11", &["140558105258"]),
            result("AT$IF?", &["868130000"]),
        ];
        let info = parse_information(&results).unwrap();
        assert_eq!(info.model, "ERIC-SIGFOX");
        assert_eq!(info.software_version, "1.4.2");
        assert_eq!(info.hardware_version, "unknown");
        assert_eq!(info.device_id, "0020451D");
        assert_eq!(info.serial_number, "140558105258");
        assert_eq!(info.region, "EU868");
    }

    #[test]
    fn information_defaults_when_probes_are_missing() {
        let info = parse_information(&[]).unwrap();
        assert_eq!(info.model, "unknown");
        assert_eq!(info.region, "unknown");
    }

    #[test]
    fn information_detects_us_region() {
        let results = vec![result("AT$IF?", &["902200000"])];
        let info = parse_information(&results).unwrap();
        assert_eq!(info.region, "US915");
    }

    #[test]
    fn downlink_requires_acknowledgement() {
        let lines = vec!["rx=01 02".to_string()];
        assert!(parse_downlink(&lines).is_err());
    }

    #[test]
    fn downlink_parses_acknowledged_payload() {
        let lines = vec!["OK".to_string(), "rx=01 02 ff".to_string()];
        assert_eq!(parse_downlink(&lines).unwrap(), vec![0x01, 0x02, 0xFF]);
    }

    #[test]
    fn downlink_without_payload_is_empty() {
        let lines = vec!["OK".to_string()];
        assert!(parse_downlink(&lines).unwrap().is_empty());
    }
}
