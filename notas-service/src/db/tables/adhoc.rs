//! Ad-hoc read-only SQL for admins

use notas_types::QueryTable;
use rusqlite::types::ValueRef;
use serde_json::Value;

use super::super::Database;
use crate::error::{NotasError, NotasResult};
use crate::models::Person;

/// Leading keywords a query may start with
const ALLOWED_KEYWORDS: [&str; 3] = ["SELECT", "WITH", "VALUES"];

impl Database {
    /// Run a single read-only statement on behalf of `requester`.
    ///
    /// Only admins may call this. The statement must be a lone `SELECT`,
    /// `WITH` or `VALUES` that SQLite reports as read-only. Transaction
    /// control, pragmas and attach are refused before execution, and the
    /// connection must still be in auto-commit mode with foreign keys on
    /// afterwards. At most `row_limit` rows are returned.
    pub fn run_adhoc_query(
        &self,
        requester: &Person,
        sql: &str,
        row_limit: usize,
    ) -> NotasResult<QueryTable> {
        if !requester.is_admin() {
            log::warn!("[DB] Ad-hoc query refused for non-admin {}", requester.ra);
            return Err(NotasError::Forbidden(
                "ad-hoc queries require the admin role".to_string(),
            ));
        }

        let sql = sql.trim();
        if sql.is_empty() {
            return Err(NotasError::InvalidInput("query is empty".to_string()));
        }
        check_statement_text(sql)?;

        let conn = self.conn();
        let result = {
            let mut stmt = conn.prepare(sql).map_err(|e| NotasError::QueryRejected(e.to_string()))?;
            if !stmt.readonly() {
                return Err(NotasError::QueryRejected(
                    "only read-only statements are allowed".to_string(),
                ));
            }

            let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
            let column_count = columns.len();

            let mut rows = stmt.query([]).map_err(|e| NotasError::QueryRejected(e.to_string()))?;
            let mut out = Vec::new();
            let mut truncated = false;
            while let Some(row) = rows.next().map_err(|e| NotasError::QueryRejected(e.to_string()))? {
                if out.len() >= row_limit {
                    truncated = true;
                    break;
                }
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    values.push(value_to_json(row.get_ref(i)?));
                }
                out.push(values);
            }

            QueryTable {
                columns,
                rows: out,
                truncated,
            }
        };

        // The connection is shared by every session: it must come back unchanged.
        if !conn.is_autocommit() {
            log::error!("[DB] Ad-hoc query by {} left a transaction open, rolling back", requester.ra);
            conn.execute_batch("ROLLBACK")?;
            return Err(NotasError::QueryRejected(
                "transaction control is not allowed".to_string(),
            ));
        }
        let foreign_keys: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            log::error!("[DB] Ad-hoc query by {} disabled foreign keys, restoring", requester.ra);
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            return Err(NotasError::QueryRejected(
                "connection settings cannot be changed".to_string(),
            ));
        }

        log::info!(
            "[DB] Ad-hoc query by {} returned {} row(s){}",
            requester.ra,
            result.rows.len(),
            if result.truncated { " (truncated)" } else { "" }
        );

        Ok(result)
    }
}

/// Reject anything but one statement starting with an allowed keyword.
fn check_statement_text(sql: &str) -> NotasResult<()> {
    let keyword = leading_keyword(sql).to_ascii_uppercase();
    if !ALLOWED_KEYWORDS.contains(&keyword.as_str()) {
        return Err(NotasError::QueryRejected(format!(
            "only SELECT, WITH or VALUES queries are allowed (got {:?})",
            keyword
        )));
    }
    if has_second_statement(sql) {
        return Err(NotasError::QueryRejected(
            "only a single statement is allowed".to_string(),
        ));
    }
    Ok(())
}

/// Byte offset of the first character that is neither whitespace nor comment.
fn skip_trivia(sql: &str, mut i: usize) -> usize {
    let bytes = sql.as_bytes();
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes[i..].starts_with(b"--") {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
        } else if bytes[i..].starts_with(b"/*") {
            match sql[i + 2..].find("*/") {
                Some(end) => i += 2 + end + 2,
                None => return bytes.len(),
            }
        } else {
            return i;
        }
    }
}

fn leading_keyword(sql: &str) -> &str {
    let start = skip_trivia(sql, 0);
    let rest = &sql[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    &rest[..end]
}

/// True when something other than whitespace or comments follows a `;`
/// outside of quotes and comments.
fn has_second_statement(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            b'[' => {
                while i < bytes.len() && bytes[i] != b']' {
                    i += 1;
                }
                i += 1;
            }
            b'-' if bytes[i..].starts_with(b"--") => i = skip_trivia(sql, i),
            b'/' if bytes[i..].starts_with(b"/*") => i = skip_trivia(sql, i),
            b';' => return !only_semicolons(&sql[i + 1..]),
            _ => i += 1,
        }
    }
    false
}

/// Trailing `;;` runs are harmless empty statements.
fn only_semicolons(rest: &str) -> bool {
    let mut i = skip_trivia(rest, 0);
    while i < rest.len() {
        if rest.as_bytes()[i] != b';' {
            return false;
        }
        i = skip_trivia(rest, i + 1);
    }
    true
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}
