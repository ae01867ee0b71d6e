//! Loader for textual hex-dump files.
//!
//! A dump line carries an address, ASCII-hex byte columns, and a fixed-width
//! trailing annotation (the dump tool's ASCII gutter). Payload bytes from all
//! matching lines are concatenated in file order into a single raw image.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::GraftError;

/// Width of the trailing annotation the dump tool appends to every payload:
/// two separator spaces plus a 16-character ASCII gutter.
pub const ANNOTATION_WIDTH: usize = 18;

static DUMP_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[0-9a-z]+\s(.+)$").unwrap());

/// Parse a hex-dump text into its concatenated payload bytes.
///
/// Non-matching lines (headers, blanks) are ignored. A matching line whose
/// payload is shorter than `annotation_width`, or whose remaining hex column
/// does not decode cleanly, is fatal: silently truncating would desynchronize
/// every later offset in the image.
pub fn load_hex_dump(text: &str, annotation_width: usize) -> Result<Vec<u8>, GraftError> {
    let mut image = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let Some(caps) = DUMP_LINE.captures(line) else {
            continue;
        };
        let payload = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if payload.len() < annotation_width {
            return Err(GraftError::MalformedDump {
                line: idx + 1,
                reason: format!(
                    "payload is {} chars, shorter than the {}-char trailing annotation",
                    payload.len(),
                    annotation_width
                ),
            });
        }
        // Non-ASCII gutters can land the cut inside a multi-byte character.
        let hex_part = payload.get(..payload.len() - annotation_width).ok_or_else(|| {
            GraftError::MalformedDump {
                line: idx + 1,
                reason: "trailing annotation is not ASCII-aligned".to_string(),
            }
        })?;
        decode_hex_into(hex_part, idx + 1, &mut image)?;
    }
    Ok(image)
}

/// Decode a run of space-separated hex columns, appending to `image`.
fn decode_hex_into(hex_part: &str, line: usize, image: &mut Vec<u8>) -> Result<(), GraftError> {
    let compact: String = hex_part.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.len() % 2 != 0 {
        return Err(GraftError::MalformedDump {
            line,
            reason: format!("odd number of hex digits ({})", compact.len()),
        });
    }
    for i in (0..compact.len()).step_by(2) {
        let byte = u8::from_str_radix(&compact[i..i + 2], 16).map_err(|_| {
            GraftError::MalformedDump {
                line,
                reason: format!("invalid hex digits `{}`", &compact[i..i + 2]),
            }
        })?;
        image.push(byte);
    }
    Ok(())
}
