use super::{LogEntry, QueryLogger, StatementKind, format_line, pretty_params, truncate_str};
use colored::{Color, Colorize};
use std::sync::Mutex;
use std::time::Duration;

/// Prints one line per statement to stderr.
#[derive(Debug, Clone)]
pub struct PlainLogger {
    /// Prefix for log lines.
    pub prefix: String,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for PlainLogger {
    fn default() -> Self {
        Self {
            prefix: "[xlsql]".to_string(),
            max_sql_length: None,
        }
    }
}

impl PlainLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub(crate) fn sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_str(sql, max)).into(),
            _ => sql.into(),
        }
    }

    pub(crate) fn line(&self, entry: &LogEntry<'_>) -> String {
        let body = format_line(&self.sql(entry.sql), entry);
        if self.prefix.is_empty() {
            body
        } else {
            format!("{} {}", self.prefix, body)
        }
    }
}

impl QueryLogger for PlainLogger {
    fn log(&self, entry: &LogEntry<'_>) {
        eprintln!("{}", self.line(entry));
    }
}

/// Like [`PlainLogger`] but colors the SQL by statement kind: INSERT yellow,
/// UPDATE cyan, DELETE magenta, failures red.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorLogger;

impl ColorLogger {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn color(entry: &LogEntry<'_>) -> Color {
        if entry.error.is_some() {
            return Color::Red;
        }
        match entry.kind() {
            StatementKind::Insert => Color::Yellow,
            StatementKind::Update => Color::Cyan,
            StatementKind::Delete => Color::Magenta,
            StatementKind::Select | StatementKind::Other => Color::BrightBlack,
        }
    }
}

impl QueryLogger for ColorLogger {
    fn log(&self, entry: &LogEntry<'_>) {
        let sql = entry.sql.color(Self::color(entry)).to_string();
        eprintln!("{}", format_line(&sql, entry));
    }
}

/// A statement recorded by [`CaptureLogger`].
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedEntry {
    pub sql: String,
    /// `pretty_params` rendering of the parameters
    pub params: String,
    pub duration: Duration,
    pub rows: i64,
    pub error: Option<String>,
}

/// Keeps every entry in memory, for assertions in tests.
#[derive(Debug, Default)]
pub struct CaptureLogger {
    entries: Mutex<Vec<CapturedEntry>>,
}

impl CaptureLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the entries logged so far.
    pub fn entries(&self) -> Vec<CapturedEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Logged SQL strings, in order.
    pub fn sql(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.sql).collect()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl QueryLogger for CaptureLogger {
    fn log(&self, entry: &LogEntry<'_>) {
        let captured = CapturedEntry {
            sql: entry.sql.to_string(),
            params: pretty_params(entry.params),
            duration: entry.duration,
            rows: entry.rows,
            error: entry.error.map(|e| e.to_string()),
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(captured);
    }
}
