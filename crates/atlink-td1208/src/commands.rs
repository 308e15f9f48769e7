//! TD1208 command builders, validators, and response parsers.
//!
//! The TD1208 speaks classic Hayes-style commands (`ati5`, `AT&V`,
//! `AT$SF=`). Errors are plain `ERROR` lines with no code table; the
//! status dump from `AT&V` has fixed row offsets including the S-register
//! line that reveals the radio region.

use atlink_core::{Error, Result};
use atlink_runner::validate;
use atlink_runner::{Command, Validation};

/// Model name carried in device errors.
pub const MODEL: &str = "TD1208";

const ERROR_TOKEN: &str = "error";

pub fn ok_validation() -> Validation {
    Validation::custom(|lines| {
        validate::check_error_lines(lines, &[ERROR_TOKEN], MODEL, |_| None)?;
        Ok(validate::any_line_starts_with(lines, "ok"))
    })
}

/// Completes on the `+RX END` marker that closes a downlink window.
fn downlink_validation() -> Validation {
    Validation::custom(|lines| {
        validate::check_error_lines(lines, &[ERROR_TOKEN], MODEL, |_| None)?;
        Ok(validate::any_line_starts_with(lines, "+rx end"))
    })
}

pub fn version() -> Command {
    Command::new("ati5").validation(ok_validation())
}

pub fn information() -> Command {
    Command::new("AT&V").validation(ok_validation())
}

pub fn send(frame: &str) -> Command {
    Command::new(format!("AT$SF={frame}")).validation(ok_validation())
}

pub fn send_and_wait(frame: &str) -> Command {
    Command::new(format!("AT$SF={frame},2,1")).validation(downlink_validation())
}

/// The `ati5` response echoes the command; the version is the second
/// line, e.g. `M10+2015`.
pub fn parse_version(lines: &[String]) -> Result<String> {
    lines
        .get(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .ok_or_else(|| Error::Parse("cannot get version".to_string()))
}

/// Device identity read from the 9-line `AT&V` dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Td1208Information {
    pub model: String,
    pub hardware_version: String,
    pub software_version: String,
    pub device_id: String,
    pub serial_number: String,
    pub region: String,
}

fn column(lines: &[String], index: usize) -> Option<String> {
    let value = lines.get(index)?.split(':').nth(1)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Positional parse of the `AT&V` dump. Row offsets are fixed by the
/// firmware; a missing required field raises rather than guessing.
///
/// The region comes from the `S403` register in the active-profile row:
/// an 8xx MHz carrier means EU868, anything else US915. A dump without
/// the register keeps the generic `EU` default.
pub fn parse_information(lines: &[String]) -> Result<Td1208Information> {
    let required = || Error::Parse("cannot get information".to_string());

    let model = lines
        .get(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .ok_or_else(required)?;
    let hardware_version = column(lines, 2).ok_or_else(required)?;
    let software_version = column(lines, 3).ok_or_else(required)?;
    let device_id = column(lines, 4).ok_or_else(required)?;
    let serial_number = column(lines, 5).ok_or_else(required)?;

    let mut region = "EU".to_string();
    if let Some(profile) = lines.get(7) {
        if let Some(value) = profile
            .split_whitespace()
            .find(|token| token.starts_with("S403"))
            .and_then(|token| token.split(':').nth(1))
        {
            region = if value.starts_with('8') {
                "EU868".to_string()
            } else {
                "US915".to_string()
            };
        }
    }

    Ok(Td1208Information {
        model,
        hardware_version,
        software_version,
        device_id,
        serial_number,
        region,
    })
}

/// Extract the downlink payload from a `+RX=aa bb cc` line. A response
/// without a `+RX=` line carried no downlink and yields an empty payload.
pub fn parse_downlink(lines: &[String]) -> Result<Vec<u8>> {
    let Some(line) = lines
        .iter()
        .find(|line| validate::starts_with_ignore_case(line, "+rx="))
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
