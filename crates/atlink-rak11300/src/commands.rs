//! RAK11300 command builders, validators, and response parsers.
//!
//! The RUI firmware uses uppercase `AT+...` commands, reports failures
//! as `+CME ERROR:<code>`, and describes its configuration in a
//! free-text `AT+STATUS=?` block. The status parser runs a schema check
//! (both section headers must be present) before extracting fields by
//! key prefix, so firmware output drift fails loudly instead of
//! corrupting neighbouring fields.

use atlink_core::{Downlink, Error, Result};
use atlink_runner::validate;
use atlink_runner::{Command, Validation};

/// Model name carried in device errors.
pub const MODEL: &str = "RAK11300";

/// Error-marker prefix emitted by the RUI firmware.
const ERROR_TOKEN: &str = "+cme error";

/// RUI firmware error codes.
pub fn describe_error(code: &str) -> Option<&'static str> {
    match code {
        "1" => Some("Generic error"),
        "2" => Some("AT command not found"),
        "3" => Some("Operation not allowed"),
        "4" => Some("Device is busy"),
        "5" => Some("Invalid parameter in the AT command"),
        "6" => Some("Command timeout"),
        "8" => Some("Device is not joined to a network"),
        _ => None,
    }
}

pub fn ok_validation() -> Validation {
    Validation::custom(|lines| {
        validate::check_error_lines(lines, &[ERROR_TOKEN], MODEL, describe_error)?;
        Ok(validate::any_line_starts_with(lines, "ok"))
    })
}

/// Completes on the `+EVT:JOINED` event the firmware emits once the
/// network accepts the device.
fn joined_validation() -> Validation {
    Validation::custom(|lines| {
        validate::check_error_lines(lines, &[ERROR_TOKEN], MODEL, describe_error)?;
        Ok(validate::any_line_starts_with(lines, "+evt:joined"))
    })
}

/// Completes on the `+EVT:RX_...` downlink event.
fn downlink_validation() -> Validation {
    Validation::custom(|lines| {
        validate::check_error_lines(lines, &[ERROR_TOKEN], MODEL, describe_error)?;
        Ok(validate::any_line_starts_with(lines, "+evt:rx"))
    })
}

pub fn version() -> Command {
    Command::new("AT+VER=?").validation(ok_validation())
}

pub fn information() -> Command {
    Command::new("AT+STATUS=?").validation(ok_validation())
}

pub fn set_field(field: &str, value: &str) -> Command {
    Command::new(format!("AT+{field}={value}")).validation(ok_validation())
}

pub fn set_auto_join(enabled: bool) -> Command {
    let flag = if enabled { 1 } else { 0 };
    Command::new(format!("AT+JOIN=0:{flag}:7:8")).validation(ok_validation())
}

pub fn join() -> Command {
    Command::new("AT+JOIN=1:0:7:8").validation(joined_validation())
}

pub fn leave() -> Command {
    Command::new("AT+JOIN=0:0:7:8").validation(ok_validation())
}

pub fn reset() -> Command {
    // The device reboots without replying; callers treat a timeout as
    // success.
    Command::new("ATZ").validation(ok_validation())
}

pub fn send(fport: u8, frame: &str) -> Command {
    Command::new(format!("AT+SEND={fport}:{frame}")).validation(ok_validation())
}

pub fn send_and_wait(fport: u8, frame: &str) -> Command {
    Command::new(format!("AT+SEND={fport}:{frame}")).validation(downlink_validation())
}

/// Parse the `AT+VER:1.0.0 Apr 23 2021 00:27:18` banner into `1.0.0`.
/// The firmware echoes the command, so the banner is the second line.
pub fn parse_version(lines: &[String]) -> Result<String> {
    lines
        .get(1)
        .and_then(|line| line.split_whitespace().next())
        .and_then(|token| token.split(':').nth(1))
        .filter(|version| !version.is_empty())
        .map(|version| version.to_string())
        .ok_or_else(|| Error::Parse("cannot get version".to_string()))
}

/// Device configuration read from the `AT+STATUS=?` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rak11300Information {
    pub region: String,
    pub join_mode: String,
    pub dev_eui: String,
    pub app_eui: String,
    pub app_key: String,
    pub apps_key: String,
    pub nwks_key: String,
    pub dev_address: String,
    pub class_type: String,
    pub is_joined: bool,
    pub is_auto_joined: bool,
    pub is_confirm: bool,
    pub is_duty_cycle: bool,
}

fn field_value(line: &str, key: &str) -> Option<String> {
    let rest = line.strip_prefix(key)?;
    let value = rest.trim_start_matches(':').trim();
    if value.is_empty() {
        Some("unknown".to_string())
    } else {
        Some(value.to_string())
    }
}

/// Key-prefix parse of the status block, after a schema check for the
/// `Device status` and `LPWAN status` section headers.
pub fn parse_information(lines: &[String]) -> Result<Rak11300Information> {
    let trimmed: Vec<&str> = lines.iter().map(|line| line.trim()).collect();
    let has_header = |header: &str| trimmed.iter().any(|line| line.starts_with(header));
    if !has_header("Device status") || !has_header("LPWAN status") {
        return Err(Error::Parse("cannot get information".to_string()));
    }

    let mut info = Rak11300Information {
        region: "unknown".to_string(),
        join_mode: "unknown".to_string(),
        dev_eui: "unknown".to_string(),
        app_eui: "unknown".to_string(),
        app_key: "unknown".to_string(),
        apps_key: "unknown".to_string(),
        nwks_key: "unknown".to_string(),
        dev_address: "unknown".to_string(),
        class_type: "unknown".to_string(),
        is_joined: false,
        is_auto_joined: false,
        is_confirm: false,
        is_duty_cycle: false,
    };

    for line in &trimmed {
        if let Some(value) = field_value(line, "Dev EUI") {
            info.dev_eui = value;
        } else if let Some(value) = field_value(line, "App EUI") {
            info.app_eui = value;
        } else if let Some(value) = field_value(line, "Apps Key") {
            info.apps_key = value;
        } else if let Some(value) = field_value(line, "App Key") {
            info.app_key = value;
        } else if let Some(value) = field_value(line, "NWS Key") {
            info.nwks_key = value;
        } else if let Some(value) = field_value(line, "Dev Addr") {
            info.dev_address = value;
        } else if let Some(value) = field_value(line, "Region") {
            info.region = value;
        } else if let Some(value) = field_value(line, "Class") {
            info.class_type = value;
        } else if line.starts_with("OTAA") {
            info.join_mode = "OTAA".to_string();
        } else if line.starts_with("ABP") {
            info.join_mode = "ABP".to_string();
        } else if line.starts_with("Auto join") {
            info.is_auto_joined = line.ends_with("enabled");
        } else if *line == "Network joined" {
            info.is_joined = true;
        } else if *line == "Network not joined" {
            info.is_joined = false;
        } else if line.starts_with("Confirmed Message") {
            info.is_confirm = true;
        } else if line.starts_with("Unconfirmed Message") {
            info.is_confirm = false;
        } else if line.starts_with("Duty cycle") {
            info.is_duty_cycle = line.ends_with("ON");
        }
    }

    Ok(info)
}

/// Parse a `+EVT:RX_<window>:<rssi>:<snr>:UNICAST:<fport>:<hexpairs>`
/// event into a [`Downlink`]. A missing hex section yields an empty
/// payload.
pub fn parse_downlink(lines: &[String]) -> Result<Downlink> {
    let line = lines
        .iter()
        .find(|line| validate::starts_with_ignore_case(line, "+evt:rx"))
        .ok_or_else(|| Error::Parse("no downlink event in response".to_string()))?;
    let malformed = || Error::Parse(format!("malformed downlink event: {line}"));

    let parts: Vec<&str> = line.split(':').collect();
    if parts.len() < 6 || !parts[4].eq_ignore_ascii_case("UNICAST") {
        return Err(malformed());
    }
    let rssi = parts[2].parse::<i32>().map_err(|_| malformed())?;
    let snr = parts[3].parse::<i32>().map_err(|_| malformed())?;
    let fport = parts[5].parse::<u8>().map_err(|_| malformed())?;
    let data = match parts.get(6) {
        Some(hex_data) if !hex_data.is_empty() => {
            hex::decode(hex_data).map_err(|_| malformed())?
        }
        _ => Vec::new(),
    };

    Ok(Downlink {
        fport,
        rssi,
        snr,
        data_size: data.len(),
        data,
    })
}
