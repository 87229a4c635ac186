//! Nested transactions on a single physical transaction.
//!
//! [`Tx`] gives callers begin/commit/rollback scopes that nest without
//! savepoints. The outermost scope owns a real transaction; every nested
//! scope shares it:
//!
//! - committing an inner scope only marks it done, the outer commit is the
//!   one that reaches the server;
//! - rolling back any scope rolls back the whole physical transaction right
//!   away, after which the outer commit fails with [`XlError::TxDone`];
//! - an inner scope dropped while still active poisons the transaction, so
//!   the outer commit rolls back and fails with [`XlError::TxAborted`].
//!
//! ```ignore
//! let mut tx = db.begin().await?;
//! update_salary(&tx).await?;
//! {
//!     let mut inner = tx.begin().await?;
//!     audit(&inner).await?;
//!     inner.commit().await?; // no COMMIT sent yet
//! }
//! tx.commit().await?; // COMMIT
//! ```
//!
//! For guaranteed release use [`transaction!`](crate::transaction!).

use crate::client::{Executor, Queryer, Session};
use crate::dialect::Dialect;
use crate::error::{XlError, XlResult};
use crate::logger::QueryLogger;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A real, server-side transaction.
pub trait PhysicalTx: Executor + Queryer + 'static {
    /// Send `COMMIT`.
    fn commit(&self) -> impl std::future::Future<Output = XlResult<()>> + Send;

    /// Send `ROLLBACK`.
    fn rollback(&self) -> impl std::future::Future<Output = XlResult<()>> + Send;

    /// Best-effort `ROLLBACK` from a synchronous context (used on drop).
    fn rollback_in_background(&self);
}

/// A database handle that can open physical transactions.
pub trait Database: Executor + Queryer + Clone + 'static {
    type Physical: PhysicalTx;

    /// Open a physical transaction (`BEGIN`).
    fn begin_physical(&self) -> impl std::future::Future<Output = XlResult<Self::Physical>> + Send;

    /// Open a physical transaction and return the outer scope owning it.
    fn begin(&self) -> impl std::future::Future<Output = XlResult<Tx<Self>>> + Send {
        async move { Tx::unbound(self.clone()).begin().await }
    }
}

struct Shared<P> {
    physical: P,
    finished: AtomicBool,
    poisoned: AtomicBool,
}

impl<P> Shared<P> {
    fn new(physical: P) -> Self {
        Self {
            physical,
            finished: AtomicBool::new(false),
            poisoned: AtomicBool::new(false),
        }
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Mark the physical transaction finished. Returns `true` for the caller
    /// that flipped the flag, which is the one that must talk to the server.
    fn finish(&self) -> bool {
        !self.finished.swap(true, Ordering::SeqCst)
    }
}

/// Lifecycle state of a [`Tx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// No physical transaction; statements run directly on the database.
    Unbound,
    OuterActive,
    InnerActive,
    /// Inner scope committed, waiting for the outer commit.
    InnerCommitted,
    /// Committed or rolled back; nothing more to do.
    Terminal,
}

/// A transaction scope. See the [module docs](self).
pub struct Tx<D: Database> {
    db: D,
    shared: Option<Arc<Shared<D::Physical>>>,
    inner: bool,
    inner_ok: bool,
    done: bool,
}

impl<D: Database> Tx<D> {
    /// A scope without a physical transaction. Statements run directly on
    /// `db` and `begin()` opens a real transaction.
    pub fn unbound(db: D) -> Self {
        Self {
            db,
            shared: None,
            inner: false,
            inner_ok: false,
            done: false,
        }
    }

    pub fn state(&self) -> TxState {
        match &self.shared {
            None => TxState::Unbound,
            Some(_) if self.done => TxState::Terminal,
            Some(_) if self.inner && self.inner_ok => TxState::InnerCommitted,
            Some(_) if self.inner => TxState::InnerActive,
            Some(shared) if shared.is_finished() => TxState::Terminal,
            Some(_) => TxState::OuterActive,
        }
    }

    pub fn is_inner(&self) -> bool {
        self.inner
    }

    /// The database this scope was started from.
    pub fn db(&self) -> &D {
        &self.db
    }

    /// Start a nested scope.
    ///
    /// On an unbound scope this opens a physical transaction and returns the
    /// outer scope owning it. Otherwise the returned inner scope shares this
    /// scope's physical transaction and nothing is sent to the server.
    pub async fn begin(&self) -> XlResult<Tx<D>> {
        match &self.shared {
            Some(shared) => {
                if self.done || shared.is_finished() {
                    return Err(XlError::TxDone);
                }
                Ok(Tx {
                    db: self.db.clone(),
                    shared: Some(Arc::clone(shared)),
                    inner: true,
                    inner_ok: false,
                    done: false,
                })
            }
            None => {
                let physical = self.db.begin_physical().await?;
                Ok(Tx {
                    db: self.db.clone(),
                    shared: Some(Arc::new(Shared::new(physical))),
                    inner: false,
                    inner_ok: false,
                    done: false,
                })
            }
        }
    }

    /// Commit this scope.
    ///
    /// Inner scopes are only marked committed. The outer scope sends
    /// `COMMIT`, unless the transaction was already rolled back
    /// ([`XlError::TxDone`]) or poisoned by a dropped inner scope
    /// ([`XlError::TxAborted`], after rolling back).
    pub async fn commit(&mut self) -> XlResult<()> {
        let Some(shared) = &self.shared else {
            return Ok(());
        };

        if self.inner {
            if self.inner_ok {
                return Ok(());
            }
            if self.done || shared.is_finished() {
                return Err(XlError::TxDone);
            }
            self.inner_ok = true;
            return Ok(());
        }

        if self.done || !shared.finish() {
            self.done = true;
            return Err(XlError::TxDone);
        }
        self.done = true;

        if shared.poisoned.load(Ordering::SeqCst) {
            shared.physical.rollback().await?;
            return Err(XlError::TxAborted);
        }

        shared.physical.commit().await
    }

    /// Roll back the whole physical transaction.
    ///
    /// A no-op on unbound scopes, on inner scopes that already committed and
    /// on finished scopes, so it is safe to call unconditionally on the way
    /// out.
    pub async fn rollback(&mut self) -> XlResult<()> {
        let Some(shared) = &self.shared else {
            return Ok(());
        };
        if self.inner_ok || self.done {
            return Ok(());
        }
        self.done = true;
        if shared.finish() {
            shared.physical.rollback().await
        } else {
            Ok(())
        }
    }

    fn physical(&self) -> XlResult<Option<&D::Physical>> {
        match &self.shared {
            None => Ok(None),
            Some(shared) if shared.is_finished() => Err(XlError::TxDone),
            Some(shared) => Ok(Some(&shared.physical)),
        }
    }
}

impl<D: Database> Drop for Tx<D> {
    fn drop(&mut self) {
        let Some(shared) = &self.shared else {
            return;
        };
        if self.done || shared.is_finished() {
            return;
        }

        if self.inner {
            if !self.inner_ok {
                shared.poisoned.store(true, Ordering::SeqCst);
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    target: "xlsql.tx",
                    "inner transaction dropped without commit or rollback; outer commit will roll back"
                );
            }
        } else if shared.finish() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                target: "xlsql.tx",
                "transaction dropped without commit or rollback; rolling back"
            );
            shared.physical.rollback_in_background();
        }
    }
}

impl<D: Database> std::fmt::Debug for Tx<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<D: Database> Session for Tx<D> {
    fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        self.db.logger()
    }
}

impl<D: Database> Executor for Tx<D> {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<u64> {
        match self.physical()? {
            Some(p) => p.execute(sql, params).await,
            None => self.db.execute(sql, params).await,
        }
    }
}

impl<D: Database> Queryer for Tx<D> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<Vec<Row>> {
        match self.physical()? {
            Some(p) => p.query(sql, params).await,
            None => self.db.query(sql, params).await,
        }
    }
}

/// Runs the given block inside a transaction scope.
///
/// - Begins a scope via `$parent.begin().await` (a `Db` or an existing `Tx`).
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `xlsql::XlResult<T>`. Nested uses share one
/// physical transaction.
///
/// ```ignore
/// xlsql::transaction!(db, tx, {
///     update("employee").set("salary", 9000).where_("id=?", params![2]).exec_one(&tx).await?;
///     xlsql::transaction!(tx, inner, {
///         delete("bonus").where_("employee_id=?", params![2]).exec(&inner).await?;
///         Ok(())
///     })?;
///     Ok(())
/// })?;
/// ```
#[macro_export]
macro_rules! transaction {
    ($parent:expr, $tx:ident, $body:block) => {{
        let mut $tx = ($parent).begin().await?;
        let __xlsql_tx_body_result: $crate::XlResult<_> = async { $body }.await;
        match __xlsql_tx_body_result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::XlError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}

#[cfg(test)]
mod tests;
