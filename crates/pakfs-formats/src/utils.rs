//! Helpers shared by every format parser

use crate::error::ParseError;
use crate::source::ByteSource;

/// Separator used for normalized entry paths.
pub const SEPARATOR: char = '/';

/// Decode a fixed-width name field.
///
/// The field ends at the first NUL. Bytes are mapped one-to-one onto
/// Latin-1 code points so that no stored name is ever lossy.
pub fn decode_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    raw[..end].iter().map(|&b| char::from(b)).collect()
}

/// Normalize a stored entry name into a `/`-separated relative path.
///
/// Empty segments collapse. `.` and `..` segments are rejected: an archive
/// must never name anything outside itself.
pub fn normalize_entry_path(name: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(name.len());
    for segment in name.split(SEPARATOR) {
        match segment {
            "" => {}
            "." | ".." => {
                return Err(ParseError::InvalidName {
                    name: name.to_string(),
                    reason: "relative path segment",
                });
            }
            _ => {
                if !out.is_empty() {
                    out.push(SEPARATOR);
                }
                out.push_str(segment);
            }
        }
    }

    if out.is_empty() {
        return Err(ParseError::InvalidName {
            name: name.to_string(),
            reason: "empty name",
        });
    }
    Ok(out)
}

/// Read a directory region of `count` fixed-size records at `offset`.
///
/// The region is bounds-checked against the source before anything
/// count-sized is allocated.
pub fn read_directory(
    source: &ByteSource,
    offset: u64,
    count: u32,
    record_size: u64,
) -> Result<Vec<u8>, ParseError> {
    let len = u64::from(count) * record_size;
    let truncated = || ParseError::TruncatedDirectory {
        offset,
        len,
        available: source.len(),
    };

    match offset.checked_add(len) {
        Some(end) if end <= source.len() => {}
        _ => return Err(truncated()),
    }

    let mut buf = vec![0u8; usize::try_from(len).map_err(|_| truncated())?];
    source.read_at(offset, &mut buf)?;
    Ok(buf)
}
