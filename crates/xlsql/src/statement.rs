//! Compiled statements and their execution.

use crate::client::{Executor, Queryer, Session};
use crate::error::{XlError, XlResult};
use crate::logger::{LogEntry, ROWS_NOT_APPLICABLE};
use crate::param::{Param, params_ref};
use crate::row::FromRow;
use std::time::{Duration, Instant};
use tokio_postgres::Row;

/// SQL text bound to a dialect plus its parameters in placeholder order.
///
/// Built by the query compilers, or by hand with [`Statement::new`] for
/// SQL that already uses the target's placeholder spelling.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

/// Outcome of a statement run through [`Statement::exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    rows_affected: u64,
}

impl ExecResult {
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    fn report<S: Session + ?Sized>(
        &self,
        session: &S,
        duration: Duration,
        rows: i64,
        error: Option<&XlError>,
    ) {
        if let Some(logger) = session.logger() {
            logger.log(&LogEntry {
                sql: &self.sql,
                params: &self.params,
                duration,
                rows,
                error,
            });
        }
    }

    fn report_fetch<S: Session + ?Sized, T>(&self, session: &S, start: Instant, result: &XlResult<T>) {
        self.report(session, start.elapsed(), ROWS_NOT_APPLICABLE, result.as_ref().err());
    }

    /// Execute and return the affected row count.
    pub async fn exec<E: Executor + ?Sized>(&self, e: &E) -> XlResult<ExecResult> {
        let start = Instant::now();
        let result = e.execute(&self.sql, &params_ref(&self.params)).await;
        let elapsed = start.elapsed();
        match result {
            Ok(n) => {
                self.report(e, elapsed, i64::try_from(n).unwrap_or(i64::MAX), None);
                Ok(ExecResult { rows_affected: n })
            }
            Err(err) => {
                self.report(e, elapsed, ROWS_NOT_APPLICABLE, Some(&err));
                Err(err)
            }
        }
    }

    pub async fn exec_count<E: Executor + ?Sized>(&self, e: &E) -> XlResult<u64> {
        Ok(self.exec(e).await?.rows_affected)
    }

    /// Execute and require that exactly one row was affected.
    pub async fn exec_one<E: Executor + ?Sized>(&self, e: &E) -> XlResult<()> {
        match self.exec_count(e).await? {
            0 => Err(XlError::NoRowsAffected),
            1 => Ok(()),
            n => Err(XlError::MultipleRowsAffected(n)),
        }
    }

    /// Fetch all raw rows.
    pub async fn query<Q: Queryer + ?Sized>(&self, q: &Q) -> XlResult<Vec<Row>> {
        let start = Instant::now();
        let result = q.query(&self.sql, &params_ref(&self.params)).await;
        self.report_fetch(q, start, &result);
        result
    }

    /// Fetch the first raw row, if any.
    pub async fn query_row<Q: Queryer + ?Sized>(&self, q: &Q) -> XlResult<Option<Row>> {
        let start = Instant::now();
        let result = q.query_opt(&self.sql, &params_ref(&self.params)).await;
        self.report_fetch(q, start, &result);
        result
    }

    /// Fetch the first row and map it, `NotFound` if there is none.
    pub async fn first<T: FromRow, Q: Queryer + ?Sized>(&self, q: &Q) -> XlResult<T> {
        let start = Instant::now();
        let result = match q.query_opt(&self.sql, &params_ref(&self.params)).await {
            Ok(Some(row)) => T::from_row(&row),
            Ok(None) => Err(XlError::not_found("Expected one row, got none")),
            Err(err) => Err(err),
        };
        self.report_fetch(q, start, &result);
        result
    }

    /// Fetch and map all rows.
    pub async fn all<T: FromRow, Q: Queryer + ?Sized>(&self, q: &Q) -> XlResult<Vec<T>> {
        let start = Instant::now();
        let result = match q.query(&self.sql, &params_ref(&self.params)).await {
            Ok(rows) => rows.iter().map(T::from_row).collect(),
            Err(err) => Err(err),
        };
        self.report_fetch(q, start, &result);
        result
    }
}

#[cfg(test)]
mod tests;
