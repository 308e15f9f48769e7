//! Uplink frame validation.
//!
//! Frames travel over the wire as hex strings. Every send path validates
//! the frame before any I/O so a malformed payload never reaches the
//! device.

use atlink_core::{Error, Result};

/// Maximum frame length in hex characters (12 bytes).
pub const MAX_FRAME_CHARS: usize = 24;

/// Validate a hex-encoded uplink frame.
///
/// The frame must be non-empty, at most 12 bytes (24 hex characters),
/// an even number of characters, and pure hexadecimal.
pub fn validate_hex_frame(frame: &str) -> Result<()> {
    if frame.is_empty() {
        return Err(frame_error(frame, "empty frame".to_string()));
    }
    if frame.len() > MAX_FRAME_CHARS {
        return Err(frame_error(frame, "frame exceeds 12 bytes".to_string()));
    }
    if frame.len() % 2 != 0 {
        return Err(frame_error(
            frame,
            format!("odd number of hex characters ({})", frame.len()),
        ));
    }
    if !frame.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(frame_error(frame, "frame must be hexadecimal".to_string()));
    }
    Ok(())
}

fn frame_error(frame: &str, reason: String) -> Error {
    Error::Frame {
        frame: frame.to_string(),
        reason,
    }
}
