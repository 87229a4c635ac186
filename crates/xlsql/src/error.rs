//! Error types for xlsql

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Result type alias for xlsql operations
pub type XlResult<T> = Result<T, XlError>;

/// Errors raised while compiling or executing statements.
#[derive(Debug, Error)]
pub enum XlError {
    /// SELECT compiled with an empty projection
    #[error("no columns")]
    NoColumns,

    /// INSERT/UPDATE compiled without any value
    #[error("no values")]
    NoValues,

    /// `exec_one` matched zero rows
    #[error("no rows affected")]
    NoRowsAffected,

    /// `exec_one` matched more than one row
    #[error("multiple rows affected ({0})")]
    MultipleRowsAffected(u64),

    /// A joined query has nothing in its FROM list to join against
    #[error("join target has no FROM table")]
    JoinWithoutTable,

    /// Error reported by the database driver
    #[error("Query error: {0}")]
    Driver(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// The physical transaction was already committed or rolled back
    #[error("transaction has already been committed or rolled back")]
    TxDone,

    /// An inner scope went away without commit or rollback, so the whole
    /// physical transaction was rolled back
    #[error("transaction aborted: inner scope released without commit")]
    TxAborted,

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl XlError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error came from the row-count guard of `exec_one`
    pub fn is_row_count_mismatch(&self) -> bool {
        matches!(self, Self::NoRowsAffected | Self::MultipleRowsAffected(_))
    }

    /// SQLSTATE of a driver error, if the server reported one.
    pub fn sql_state(&self) -> Option<&SqlState> {
        match self {
            Self::Driver(err) => err.code(),
            _ => None,
        }
    }

    /// Check if this is a unique violation reported by the server
    pub fn is_unique_violation(&self) -> bool {
        self.sql_state() == Some(&SqlState::UNIQUE_VIOLATION)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for XlError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
