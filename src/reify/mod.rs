//! Debug rendering of a compiled statement with its binds substituted.
//!
//! The output is for logs and error messages only. Statements sent to the
//! server always travel as the original `(sql, binds)` pair.

mod scanner;

use std::fmt::Write as _;

use scanner::{State, step};

use crate::types::RowValues;

/// Slash-escape a string the way MySQL's `addslashes`-style quoting expects.
#[must_use]
pub fn add_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    for ch in input.chars() {
        match ch {
            '\\' | '\'' | '"' => {
                out.push('\\');
                out.push(ch);
            }
            '\0' => out.push_str("\\0"),
            _ => out.push(ch),
        }
    }
    out
}

/// Literal SQL text for one bind value.
#[must_use]
pub fn literal(value: &RowValues) -> String {
    match value {
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) => f.to_string(),
        RowValues::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        RowValues::Null => "NULL".to_string(),
        RowValues::Text(s) => format!("'{}'", add_slashes(s)),
        RowValues::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        RowValues::JSON(json) => format!("'{}'", add_slashes(&json.to_string())),
        RowValues::Blob(bytes) => {
            let mut hex = String::with_capacity(bytes.len() * 2 + 3);
            hex.push_str("X'");
            for b in bytes {
                let _ = write!(hex, "{b:02X}");
            }
            hex.push('\'');
            hex
        }
    }
}

/// Walk `sql` left to right replacing each `?` outside literals and comments
/// with the next bind. Placeholders without a matching bind stay as `?`.
///
/// ```rust
/// use mysql_middleware::prelude::*;
///
/// let text = reify("SELECT * FROM t WHERE a = ? AND b = ?", &[1.into(), "x'y".into()]);
/// assert_eq!(text, "SELECT * FROM t WHERE a = 1 AND b = 'x\\'y'");
/// ```
#[must_use]
pub fn reify(sql: &str, binds: &[RowValues]) -> String {
    if binds.is_empty() {
        return sql.to_string();
    }
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + binds.len() * 8);
    let mut state = State::Normal;
    let mut next_bind = binds.iter();
    let mut copied_to = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        if state == State::Normal && bytes[idx] == b'?' {
            if let Some(value) = next_bind.next() {
                out.push_str(&sql[copied_to..idx]);
                out.push_str(&literal(value));
                copied_to = idx + 1;
            }
            idx += 1;
            continue;
        }
        idx += 1 + step(&mut state, bytes, idx);
    }
    out.push_str(&sql[copied_to..]);
    out
}

/// Count placeholders the way [`reify`] sees them.
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut state = State::Normal;
    let mut count = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        if state == State::Normal && bytes[idx] == b'?' {
            count += 1;
            idx += 1;
            continue;
        }
        idx += 1 + step(&mut state, bytes, idx);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_text_and_leaves_numbers_bare() {
        let binds = vec![
            RowValues::Int(7),
            RowValues::Text("O'Brien".into()),
            RowValues::Null,
            RowValues::Bool(true),
        ];
        let out = reify("UPDATE t SET a = ?, b = ?, c = ? WHERE d = ?", &binds);
        assert_eq!(out, "UPDATE t SET a = 7, b = 'O\\'Brien', c = NULL WHERE d = 1");
    }

    #[test]
    fn skips_placeholders_inside_literals_and_comments() {
        let sql = "SELECT '?', `a?b`, \"it\\\"s ?\" /* ? */ FROM t WHERE x = ? -- ?\n AND y = ?";
        let out = reify(sql, &[1.into(), 2.into()]);
        assert_eq!(
            out,
            "SELECT '?', `a?b`, \"it\\\"s ?\" /* ? */ FROM t WHERE x = 1 -- ?\n AND y = 2"
        );
        assert_eq!(count_placeholders(sql), 2);
    }

    #[test]
    fn missing_binds_leave_placeholder() {
        assert_eq!(reify("a = ? AND b = ?", &[1.into()]), "a = 1 AND b = ?");
    }

    #[test]
    fn repeated_calls_are_identical_and_leave_binds_untouched() {
        let binds = vec![RowValues::Text("ü?".into()), RowValues::Blob(vec![0xde, 0xad])];
        let sql = "INSERT INTO t (a, b) VALUES (?, ?)";
        let first = reify(sql, &binds);
        let second = reify(sql, &binds);
        assert_eq!(first, second);
        assert_eq!(first, "INSERT INTO t (a, b) VALUES ('ü?', X'DEAD')");
        assert_eq!(binds.len(), 2);
    }
}
