//! Placeholder rewriting for the embedded backend.
//!
//! The builder always renders `$N` placeholders; the SQLite connection
//! rewrites them to `?N` just before binding. The scanner skips string
//! literals, quoted and bracketed identifiers, and both comment styles.

use std::borrow::Cow;

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Bracketed,
    LineComment,
    BlockComment(u32),
}

fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}

fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Rewrite `$N` placeholders to `?N`. Returns a borrowed `Cow` when the
/// statement contains none.
#[must_use]
pub fn to_sqlite_placeholders(sql: &str) -> Cow<'_, str> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    // Start of the span not yet copied into `out`.
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'[' => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => state = State::BlockComment(1),
                b'$' => {
                    if let Some((digits_end, digits)) = scan_digits(bytes, idx + 1) {
                        let buf = out.get_or_insert_with(String::new);
                        buf.push_str(&sql[copied..idx]);
                        buf.push('?');
                        buf.push_str(digits);
                        idx = digits_end;
                        copied = idx;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                } else if is_block_comment_end(bytes, idx) {
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_numbered_placeholders() {
        let sql = "INSERT INTO t VALUES ($1, $2, $3);";
        assert_eq!(
            to_sqlite_placeholders(sql),
            "INSERT INTO t VALUES (?1, ?2, ?3);"
        );
    }

    #[test]
    fn skips_literals_identifiers_and_comments() {
        let sql = "select '$1', \"$2\", [$3] -- $4\n/* $5 */ from t where a = $1";
        assert_eq!(
            to_sqlite_placeholders(sql),
            "select '$1', \"$2\", [$3] -- $4\n/* $5 */ from t where a = ?1"
        );
    }

    #[test]
    fn escaped_quotes_stay_inside_literal() {
        let sql = "select 'it''s $1' where a = $2";
        assert_eq!(to_sqlite_placeholders(sql), "select 'it''s $1' where a = ?2");
    }

    #[test]
    fn borrows_when_no_placeholders() {
        let sql = "select * from t";
        assert!(matches!(to_sqlite_placeholders(sql), Cow::Borrowed(_)));
    }

    #[test]
    fn bare_dollar_is_untouched() {
        let sql = "select cost$ from t where a = $12";
        assert_eq!(to_sqlite_placeholders(sql), "select cost$ from t where a = ?12");
    }
}
