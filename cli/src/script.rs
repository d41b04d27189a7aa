//! SQL script runner.
//!
//! Splits a script into statements and executes them one at a time. A
//! failing statement is logged with its 1-based index and the run moves on,
//! unless the caller asked to stop at the first failure.

use sqlx::PgPool;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("could not read script: {0}")]
    Io(#[from] std::io::Error),
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("statement {index} failed: {source}")]
    Statement {
        index: usize,
        #[source]
        source: sqlx::Error,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScriptReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl ScriptReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

// =============================================================================
// SPLITTING
// =============================================================================

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Length of a `$tag$` opener at the start of `s`, if there is one.
fn dollar_tag_len(s: &[u8]) -> Option<usize> {
    if s.first() != Some(&b'$') {
        return None;
    }
    match s.get(1) {
        Some(b'$') => return Some(2),
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return None,
    }
    let mut j = 2;
    while s.get(j).is_some_and(|b| is_ident_byte(*b)) {
        j += 1;
    }
    (s.get(j) == Some(&b'$')).then_some(j + 1)
}

/// Index just past the closing quote. Doubled quotes are escapes, and so is
/// any backslash pair when `backslash_escapes` is set (`E'...'` strings).
fn skip_quoted(bytes: &[u8], mut i: usize, quote: u8, backslash_escapes: bool) -> usize {
    while i < bytes.len() {
        if backslash_escapes && bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Whether the `'` at `i` opens an escape string: `E'...'` or `e'...'` where
/// the `E` is not the tail of a longer identifier.
fn is_escape_string(bytes: &[u8], i: usize) -> bool {
    i >= 1 && matches!(bytes[i - 1], b'E' | b'e') && (i == 1 || !is_ident_byte(bytes[i - 2]))
}

/// Index just past the matching `*/`. Block comments nest.
fn skip_block_comment(bytes: &[u8], mut i: usize) -> usize {
    let mut depth = 1;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"/*") {
            depth += 1;
            i += 2;
        } else if bytes[i..].starts_with(b"*/") {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}

fn skip_dollar_body(bytes: &[u8], body_start: usize, tag: &[u8]) -> usize {
    bytes[body_start..]
        .windows(tag.len())
        .position(|window| window == tag)
        .map_or(bytes.len(), |p| body_start + p + tag.len())
}

/// Split `sql` on top-level semicolons.
///
/// Semicolons inside quoted strings, quoted identifiers, comments and
/// dollar-quoted bodies do not end a statement. Statements with nothing but
/// whitespace or comments are dropped.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut has_code = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                has_code = true;
                let backslash_escapes = quote == b'\'' && is_escape_string(bytes, i);
                i = skip_quoted(bytes, i + 1, quote, backslash_escapes);
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |p| i + p + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_block_comment(bytes, i + 2);
            }
            b'$' if i == 0 || !is_ident_byte(bytes[i - 1]) => {
                has_code = true;
                match dollar_tag_len(&bytes[i..]) {
                    Some(len) => i = skip_dollar_body(bytes, i + len, &bytes[i..i + len]),
                    None => i += 1,
                }
            }
            b';' => {
                if has_code {
                    statements.push(sql[start..i].trim().to_owned());
                }
                start = i + 1;
                has_code = false;
                i += 1;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                has_code = true;
                i += 1;
            }
        }
    }

    if has_code {
        statements.push(sql[start..].trim().to_owned());
    }
    statements
}

// =============================================================================
// EXECUTION
// =============================================================================

fn preview(statement: &str) -> String {
    let first_line = statement.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    first_line.chars().take(80).collect()
}

/// Run each statement of `sql` in order.
///
/// # Errors
///
/// Only with `stop_on_error`: the first failing statement aborts the run.
/// Otherwise failures are counted in the report.
pub async fn apply_script(pool: &PgPool, sql: &str, stop_on_error: bool) -> Result<ScriptReport, ScriptError> {
    let mut report = ScriptReport::default();

    for (offset, statement) in split_statements(sql).iter().enumerate() {
        let index = offset + 1;
        match sqlx::raw_sql(statement).execute(pool).await {
            Ok(result) => {
                report.succeeded += 1;
                debug!(index, rows = result.rows_affected(), statement = %preview(statement), "statement ok");
            }
            Err(source) => {
                warn!(index, error = %source, statement = %preview(statement), "statement failed");
                if stop_on_error {
                    return Err(ScriptError::Statement { index, source });
                }
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;
