//! Executor/Queryer traits that unify connections, pools and transactions.

use crate::dialect::Dialect;
use crate::error::{XlError, XlResult};
use crate::logger::{self, QueryLogger};
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Something statements can run against: it knows its dialect and where its
/// statement log goes.
pub trait Session: Send + Sync {
    /// Placeholder dialect the server understands.
    fn dialect(&self) -> Dialect;

    /// Logger for statements run through this session.
    ///
    /// The default is the process-wide hook installed with
    /// [`set_logger`](crate::logger::set_logger).
    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        logger::global()
    }
}

/// A session that can execute statements.
pub trait Executor: Session {
    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = XlResult<u64>> + Send;
}

/// A session that can fetch rows.
pub trait Queryer: Session {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = XlResult<Vec<Row>>> + Send;

    /// Execute a query and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = XlResult<Option<Row>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// Execute a query and return the first row.
    ///
    /// Returns `XlError::NotFound` if no rows are returned.
    fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = XlResult<Row>> + Send {
        async move {
            self.query_opt(sql, params)
                .await?
                .ok_or_else(|| XlError::not_found("Expected one row, got none"))
        }
    }
}

impl Session for tokio_postgres::Client {
    fn dialect(&self) -> Dialect {
        Dialect::POSTGRES
    }
}

impl Executor for tokio_postgres::Client {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<u64> {
        Ok(tokio_postgres::Client::execute(self, sql, params).await?)
    }
}

impl Queryer for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }
}

impl Session for tokio_postgres::Transaction<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::POSTGRES
    }
}

impl Executor for tokio_postgres::Transaction<'_> {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<u64> {
        Ok(tokio_postgres::Transaction::execute(self, sql, params).await?)
    }
}

impl Queryer for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl Session for deadpool_postgres::Client {
    fn dialect(&self) -> Dialect {
        Dialect::POSTGRES
    }
}

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::Client {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<u64> {
        // Delegate to the deref target (tokio_postgres::Client).
        let client: &tokio_postgres::Client = self;
        Executor::execute(client, sql, params).await
    }
}

#[cfg(feature = "pool")]
impl Queryer for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<Vec<Row>> {
        let client: &tokio_postgres::Client = self;
        Queryer::query(client, sql, params).await
    }
}
