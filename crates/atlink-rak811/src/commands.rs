//! RAK811 command builders, validators, and response parsers.
//!
//! The v3 AT firmware answers with `OK ...` lines on success and
//! `Error: <code>` on failure. The status dump from
//! `at+get_config=lora:status` is always exactly 25 lines, so its
//! validator requires the full count before parsing positionally.

use atlink_core::{Downlink, Error, Result};
use atlink_runner::validate;
use atlink_runner::{Command, Validation};

/// Model name carried in device errors.
pub const MODEL: &str = "RAK811";

/// Error-marker prefix emitted by the v3 firmware.
const ERROR_TOKEN: &str = "error";

/// Number of lines in the `at+get_config=lora:status` dump.
const STATUS_LINE_COUNT: usize = 25;

/// v3 firmware error codes.
pub fn describe_error(code: &str) -> Option<&'static str> {
    match code {
        "1" => Some("Unsupported AT command"),
        "2" => Some("Invalid parameter in the AT command"),
        "3" => Some("Reading or writing flash error"),
        "5" => Some("UART error"),
        "80" => Some("LoRa transceiver is busy"),
        "81" => Some("LoRa service is unknown"),
        "82" => Some("LoRa parameter is invalid"),
        "83" => Some("LoRa frequency is invalid"),
        "84" => Some("LoRa datarate is invalid"),
        "86" => Some("Device is not joined to a network"),
        "87" => Some("Packet is too long"),
        "95" => Some("Duty cycle is restricted"),
        "96" => Some("No valid channel can be found"),
        "99" => Some("Join procedure failed"),
        _ => None,
    }
}

/// Standard RAK811 completion check: error lines raise through the model
/// table, any `ok` line completes.
pub fn ok_validation() -> Validation {
    Validation::custom(|lines| {
        validate::check_error_lines(lines, &[ERROR_TOKEN], MODEL, describe_error)?;
        Ok(validate::any_line_starts_with(lines, "ok"))
    })
}

/// Completion check for `send_data_and_wait`: the firmware first
/// acknowledges the uplink with `OK`, then emits an `at+recv=` line when
/// the downlink arrives.
fn downlink_validation() -> Validation {
    Validation::custom(|lines| {
        validate::check_error_lines(lines, &[ERROR_TOKEN], MODEL, describe_error)?;
        let acknowledged = lines
            .first()
            .is_some_and(|line| validate::starts_with_ignore_case(line, "ok"));
        Ok(acknowledged && validate::any_line_starts_with(lines, "at+recv="))
    })
}

pub fn version() -> Command {
    Command::new("at+version").validation(ok_validation())
}

pub fn information() -> Command {
    Command::new("at+get_config=lora:status").validation(Validation::custom(|lines| {
        validate::check_error_lines(lines, &[ERROR_TOKEN], MODEL, describe_error)?;
        Ok(lines.len() == STATUS_LINE_COUNT)
    }))
}

pub fn set_config(field: &str, value: &str) -> Command {
    Command::new(format!("at+set_config=lora:{field}:{value}")).validation(ok_validation())
}

pub fn restart() -> Command {
    Command::new("at+set_config=device:restart").validation(ok_validation())
}

pub fn join() -> Command {
    Command::new("at+join").validation(ok_validation())
}

pub fn send(fport: u8, frame: &str) -> Command {
    Command::new(format!("at+send=lora:{fport}:{frame}")).validation(ok_validation())
}

pub fn send_and_wait(fport: u8, frame: &str) -> Command {
    Command::new(format!("at+send=lora:{fport}:{frame}")).validation(downlink_validation())
}

/// Parse `OK V3.0.0.14.H` into `V3.0.0.14.H`.
pub fn parse_version(lines: &[String]) -> Result<String> {
    lines
        .first()
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|version| version.to_string())
        .ok_or_else(|| Error::Parse("cannot get version".to_string()))
}

/// Device configuration read from the 25-line status dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rak811Information {
    pub region: String,
    pub join_mode: String,
    pub dev_eui: String,
    pub app_eui: String,
    pub app_key: String,
    pub class_type: String,
    pub is_joined: bool,
    pub is_confirm: bool,
    pub is_duty_cycle: bool,
}

fn row(lines: &[String], index: usize) -> String {
    lines
        .get(index)
        .map(|line| validate::trim_value(line))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Positional parse of the status dump. Row offsets are fixed by the v3
/// firmware; missing or empty values degrade to the `"unknown"` sentinel.
pub fn parse_information(lines: &[String]) -> Result<Rak811Information> {
    if lines.len() != STATUS_LINE_COUNT {
        return Err(Error::Parse("cannot get information".to_string()));
    }
    Ok(Rak811Information {
        region: row(lines, 1),
        join_mode: row(lines, 5),
        dev_eui: row(lines, 6),
        app_eui: row(lines, 7),
        app_key: row(lines, 8),
        class_type: row(lines, 9),
        is_joined: row(lines, 10) == "true",
        is_confirm: row(lines, 11) == "confirm",
        is_duty_cycle: row(lines, 3) == "true",
    })
}

/// Parse an `at+recv=<fport>,<rssi>,<snr>,<size>:<hexpairs>` line into a
/// [`Downlink`]. An empty hex section yields an empty payload.
pub fn parse_downlink(lines: &[String]) -> Result<Downlink> {
    let line = lines
        .iter()
        .find(|line| validate::starts_with_ignore_case(line, "at+recv="))
        .ok_or_else(|| Error::Parse("no downlink line in response".to_string()))?;
    let malformed = || Error::Parse(format!("malformed downlink line: {line}"));

    let payload = &line["at+recv=".len()..];
    let (head, data_hex) = payload.split_once(':').ok_or_else(malformed)?;
    let mut fields = head.split(',');
    let fport = fields
        .next()
        .and_then(|v| v.parse::<u8>().ok())
        .ok_or_else(malformed)?;
    let rssi = fields
        .next()
        .and_then(|v| v.parse::<i32>().ok())
        .ok_or_else(malformed)?;
    let snr = fields
        .next()
        .and_then(|v| v.parse::<i32>().ok())
        .ok_or_else(malformed)?;
    let data_size = fields
        .next()
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(malformed)?;
    let data = if data_hex.is_empty() {
        Vec::new()
    } else {
        hex::decode(data_hex).map_err(|_| malformed())?
    };

    Ok(Downlink {
        fport,
        rssi,
        snr,
        data_size,
        data,
    })
}
