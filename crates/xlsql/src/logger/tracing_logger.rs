use super::{LogEntry, QueryLogger, pretty_params, truncate_str};
use tracing::Level;

/// Emits one `tracing` event per statement on target `xlsql.sql`.
///
/// Failed statements are always emitted at `ERROR`.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    /// Tracing event level for successful statements.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }
}

impl QueryLogger for TracingLogger {
    fn log(&self, entry: &LogEntry<'_>) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = match self.max_sql_length {
            Some(max) => truncate_str(entry.sql, max),
            None => entry.sql,
        };
        let params = pretty_params(entry.params);
        let kind = entry.kind();

        match entry.error {
            Some(err) => tracing::error!(
                target: "xlsql.sql",
                kind = ?kind,
                sql = %sql,
                params = %params,
                duration = ?entry.duration,
                error = %err,
            ),
            None => emit_at_level!(
                self.level,
                target: "xlsql.sql",
                kind = ?kind,
                sql = %sql,
                params = %params,
                duration = ?entry.duration,
                rows = entry.rows,
            ),
        }
    }
}
