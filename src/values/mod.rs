//! Caller-owned domain values for video-analytics metadata.
//!
//! Each type carries a canonical text form (`Display` + `parse_*`) used by the
//! embedded backend, which stores composites as text, and by the raw string
//! getters on result sets.

mod enums;
mod event;
mod matrix;
mod point;
mod process;

pub use enums::{InOutType, ProcessStatus, SeqType};
pub use event::IntervalEvent;
pub use matrix::{Matrix, MatrixElem};
pub use point::{BoundingBox, Point};
pub use process::ProcessState;

use crate::error::VidmetaDbError;

/// Split a composite/array literal body on top-level commas, ignoring commas
/// nested inside parentheses or brackets.
pub(crate) fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in body.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

/// Strip one pair of enclosing delimiters, failing loudly on malformed input.
pub(crate) fn strip_delimited<'a>(
    literal: &'a str,
    open: char,
    close: char,
    what: &str,
) -> Result<&'a str, VidmetaDbError> {
    let trimmed = literal.trim();
    let inner = trimmed
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
        .ok_or_else(|| {
            VidmetaDbError::ParameterError(format!("malformed {what} literal: {literal:?}"))
        })?;
    Ok(inner)
}

/// Render binary payloads as `\x`-prefixed lowercase hex.
pub(crate) fn hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(2 + data.len() * 2);
    out.push_str("\\x");
    for byte in data {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

pub(crate) fn hex_decode(literal: &str) -> Result<Vec<u8>, VidmetaDbError> {
    let digits = literal.trim().strip_prefix("\\x").ok_or_else(|| {
        VidmetaDbError::ParameterError(format!("malformed hex literal: {literal:?}"))
    })?;
    if !digits.len().is_multiple_of(2) {
        return Err(VidmetaDbError::ParameterError(format!(
            "odd-length hex literal: {literal:?}"
        )));
    }
    let mut out = Vec::with_capacity(digits.len() / 2);
    for pair in digits.as_bytes().chunks(2) {
        let pair = std::str::from_utf8(pair)
            .map_err(|_| VidmetaDbError::ParameterError(format!("bad hex byte in {literal:?}")))?;
        let byte = u8::from_str_radix(pair, 16)
            .map_err(|_| VidmetaDbError::ParameterError(format!("bad hex byte in {literal:?}")))?;
        out.push(byte);
    }
    Ok(out)
}

/// Render a slice as the `[a,b,c]` array literal; an empty slice renders `[]`.
///
/// Elements are rendered verbatim. A string element containing `,`, `[` or
/// `]` is not escaped and will not survive a text round trip; callers needing
/// such strings should store them as separate text columns.
pub(crate) fn array_literal<T: std::fmt::Display>(items: &[T]) -> String {
    let mut out = String::from("[");
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        use std::fmt::Write;
        let _ = write!(out, "{item}");
    }
    out.push(']');
    out
}

/// Parse a `[a,b,c]` literal into elements via the supplied element parser.
/// `[]` yields an empty vector.
pub(crate) fn parse_array_literal<T>(
    literal: &str,
    what: &str,
    mut parse_elem: impl FnMut(&str) -> Result<T, VidmetaDbError>,
) -> Result<Vec<T>, VidmetaDbError> {
    let body = strip_delimited(literal, '[', ']', what)?;
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(body)
        .into_iter()
        .map(|elem| parse_elem(elem.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_ignores_nested_commas() {
        let parts = split_top_level("1,5,t,(10,20,0,0),0.85,\\xab");
        assert_eq!(parts, vec!["1", "5", "t", "(10,20,0,0)", "0.85", "\\xab"]);
    }

    #[test]
    fn hex_round_trip() {
        let data = vec![0xde, 0xad, 0xbe, 0xef];
        let text = hex_encode(&data);
        assert_eq!(text, "\\xdeadbeef");
        assert_eq!(hex_decode(&text).unwrap(), data);
    }

    #[test]
    fn empty_hex_is_empty_payload() {
        assert_eq!(hex_decode("\\x").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn empty_array_literal_parses_to_empty_vec() {
        let parsed = parse_array_literal("[]", "int array", |s| {
            s.parse::<i32>()
                .map_err(|e| VidmetaDbError::ParameterError(e.to_string()))
        })
        .unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn array_literal_round_trip() {
        let rendered = array_literal(&[3, 1, 4]);
        assert_eq!(rendered, "[3,1,4]");
        let parsed = parse_array_literal(&rendered, "int array", |s| {
            s.parse::<i32>()
                .map_err(|e| VidmetaDbError::ParameterError(e.to_string()))
        })
        .unwrap();
        assert_eq!(parsed, vec![3, 1, 4]);
    }
}
