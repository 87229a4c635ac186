//! Statement logging.
//!
//! Every statement run through [`Statement`](crate::Statement) reports one
//! [`LogEntry`] to the session's [`QueryLogger`]. Sessions without their own
//! logger fall back to the process-wide hook managed by [`set_logger`] and
//! [`clear_logger`]. With neither, logging is a no-op.
//!
//! ```ignore
//! xlsql::logger::set_logger(PlainLogger::new());
//! xlsql::logger::set_logger(|e: &LogEntry<'_>| println!("{} {:?}", e.sql, e.duration));
//! ```

mod loggers;
#[cfg(feature = "tracing")]
mod tracing_logger;

pub use loggers::{CaptureLogger, CapturedEntry, ColorLogger, PlainLogger};
#[cfg(feature = "tracing")]
pub use tracing_logger::TracingLogger;

use crate::error::XlError;
use crate::param::Param;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// `rows` value for statements where an affected-row count does not apply
/// (fetches, failed executions).
pub const ROWS_NOT_APPLICABLE: i64 = -1;

const MAX_PARAM_LEN: usize = 100;

/// One executed statement.
#[derive(Debug, Clone, Copy)]
pub struct LogEntry<'a> {
    pub sql: &'a str,
    pub params: &'a [Param],
    pub duration: Duration,
    /// Affected rows, or [`ROWS_NOT_APPLICABLE`].
    pub rows: i64,
    pub error: Option<&'a XlError>,
}

impl LogEntry<'_> {
    pub fn rows_affected(&self) -> Option<u64> {
        u64::try_from(self.rows).ok()
    }

    pub fn kind(&self) -> StatementKind {
        StatementKind::from_sql(self.sql)
    }
}

/// Leading keyword of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl StatementKind {
    pub fn from_sql(sql: &str) -> Self {
        let word = sql
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or("");
        if word.eq_ignore_ascii_case("SELECT") {
            StatementKind::Select
        } else if word.eq_ignore_ascii_case("INSERT") {
            StatementKind::Insert
        } else if word.eq_ignore_ascii_case("UPDATE") {
            StatementKind::Update
        } else if word.eq_ignore_ascii_case("DELETE") {
            StatementKind::Delete
        } else {
            StatementKind::Other
        }
    }
}

/// Receives one call per executed statement.
pub trait QueryLogger: Send + Sync {
    fn log(&self, entry: &LogEntry<'_>);
}

impl<F> QueryLogger for F
where
    F: Fn(&LogEntry<'_>) + Send + Sync,
{
    fn log(&self, entry: &LogEntry<'_>) {
        self(entry)
    }
}

static GLOBAL: RwLock<Option<Arc<dyn QueryLogger>>> = RwLock::new(None);

/// Install the process-wide logger.
pub fn set_logger(logger: impl QueryLogger + 'static) {
    set_logger_arc(Arc::new(logger));
}

pub fn set_logger_arc(logger: Arc<dyn QueryLogger>) {
    let mut slot = GLOBAL.write().unwrap_or_else(|e| e.into_inner());
    *slot = Some(logger);
}

/// Remove the process-wide logger.
pub fn clear_logger() {
    let mut slot = GLOBAL.write().unwrap_or_else(|e| e.into_inner());
    *slot = None;
}

/// The process-wide logger, if one is installed.
pub fn global() -> Option<Arc<dyn QueryLogger>> {
    GLOBAL.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Render parameters as `[a b c]` using each value's `Debug` form. Values
/// longer than 100 characters are cut and suffixed with `...`.
pub fn pretty_params(params: &[Param]) -> String {
    let mut out = String::from("[");
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let s = format!("{p:?}");
        match s.char_indices().nth(MAX_PARAM_LEN) {
            Some((cut, _)) => {
                out.push_str(&s[..cut]);
                out.push_str("...");
            }
            None => out.push_str(&s),
        }
    }
    out.push(']');
    out
}

/// The `query[ params][ dur][ N rows][ => err]` line shared by the
/// text loggers.
pub(crate) fn format_line(sql: &str, entry: &LogEntry<'_>) -> String {
    let mut line = sql.to_string();
    if !entry.params.is_empty() {
        line.push(' ');
        line.push_str(&pretty_params(entry.params));
    }
    if !entry.duration.is_zero() {
        line.push_str(&format!(" {:?}", entry.duration));
    }
    if let Some(rows) = entry.rows_affected() {
        line.push_str(&format!(" {rows} rows"));
    }
    if let Some(err) = entry.error {
        line.push_str(&format!(" => {err}"));
    }
    line
}

pub(crate) fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
