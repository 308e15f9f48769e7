//! Shared token helpers for dialect validators.
//!
//! Every dialect detects device errors the same way: scan the accumulated
//! lines for a model-specific error token, extract the code after the
//! colon, and look it up in the model's table. These helpers keep that
//! logic in one place; the dialect crates supply the tokens, model name,
//! and lookup table.

use atlink_core::{Error, Result};

/// Case-insensitive prefix test that never panics on multi-byte input.
pub fn starts_with_ignore_case(line: &str, token: &str) -> bool {
    line.get(..token.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(token))
}

/// Whether any line case-insensitively starts with the token.
pub fn any_line_starts_with(lines: &[String], token: &str) -> bool {
    lines.iter().any(|line| starts_with_ignore_case(line, token))
}

/// Extract the error code from an error-marker line.
///
/// `"Error: 2"` and `"+CME ERROR:5"` both yield `"2"` / `"5"`. A line
/// with no colon (or nothing after it) yields the trimmed line itself so
/// the raw token is never lost.
pub fn error_code(line: &str) -> String {
    match line.split_once(':') {
        Some((_, value)) if !value.trim().is_empty() => value.trim().to_string(),
        _ => line.trim().to_string(),
    }
}

/// Scan the lines for any of the error tokens; raise a typed
/// [`Error::DeviceResponse`] on the first hit.
///
/// The code is looked up via `lookup`; unrecognized codes still produce a
/// well-formed error carrying the raw code and a generic description.
pub fn check_error_lines(
    lines: &[String],
    tokens: &[&str],
    model: &'static str,
    lookup: fn(&str) -> Option<&'static str>,
) -> Result<()> {
    for line in lines {
        for token in tokens {
            if starts_with_ignore_case(line, token) {
                let code = error_code(line);
                let description = lookup(&code).unwrap_or("Unknown error code").to_string();
                return Err(Error::DeviceResponse {
                    model,
                    code,
                    description,
                });
            }
        }
    }
    Ok(())
}

/// Split a `Key: value` line and return the trimmed value, or the
/// `"unknown"` sentinel when the value is missing or empty.
///
/// A drifted or truncated status field degrades to the sentinel instead
/// of corrupting its neighbours.
pub fn trim_value(line: &str) -> String {
    match line.split_once(':') {
        Some((_, value)) if !value.trim().is_empty() => value.trim().to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_test_is_case_insensitive() {
        assert!(starts_with_ignore_case("OK Join Success", "ok"));
        assert!(starts_with_ignore_case("Error: 2", "error"));
        assert!(!starts_with_ignore_case("o", "ok"));
        // Multi-byte input must not panic mid-codepoint.
        assert!(!starts_with_ignore_case("déjà", "ok"));
    }

    #[test]
    fn error_code_extraction() {
        assert_eq!(error_code("Error: 2"), "2");
        assert_eq!(error_code("+CME ERROR:5"), "5");
        assert_eq!(error_code("ERR_SEND_FRAME_DATA_PTR_INVALID"), "ERR_SEND_FRAME_DATA_PTR_INVALID");
        assert_eq!(error_code("Error: "), "Error:");
    }

    #[test]
    fn check_error_lines_raises_with_lookup() {
        let lines = vec!["Error: 2".to_string()];
        let err = check_error_lines(&lines, &["error"], "RAK811", |code| match code {
            "2" => Some("Invalid parameter in the AT command"),
            _ => None,
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "RAK811 error code 2: Invalid parameter in the AT command"
        );
    }

    #[test]
    fn check_error_lines_unknown_code() {
        let lines = vec!["Error: 999".to_string()];
        let err = check_error_lines(&lines, &["error"], "RAK811", |_| None).unwrap_err();
        assert_eq!(err.to_string(), "RAK811 error code 999: Unknown error code");
    }

    #[test]
    fn check_error_lines_clean_buffer() {
        let lines = vec!["OK".to_string(), "data".to_string()];
        assert!(check_error_lines(&lines, &["error", "+cme error"], "RAK811", |_| None).is_ok());
    }

    #[test]
    fn trim_value_sentinel() {
        assert_eq!(trim_value("Region: EU868"), "EU868");
        assert_eq!(trim_value("AppEui: "), "unknown");
        assert_eq!(trim_value("no colon here"), "unknown");
        assert_eq!(trim_value("Joined Network:false"), "false");
    }
}
