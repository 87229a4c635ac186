//! # xlsql
//!
//! Composable SQL statements for PostgreSQL, with nested transactions.
//!
//! ## Features
//!
//! - **Fragments, not strings**: queries are assembled from column lists,
//!   FROM/JOIN targets and WHERE/ORDER BY fragments, each carrying its own
//!   parameters
//! - **Joins merge whole queries**: a joined query contributes its table,
//!   columns and predicates, with parameters kept in placeholder order
//! - **Dialect binding**: statements are written with `?` and rebound to
//!   `$1..$n` for PostgreSQL
//! - **Nested transactions**: inner begin/commit/rollback scopes share one
//!   physical transaction, all-or-nothing
//! - **Statement logging**: every execution reports SQL, parameters, timing
//!   and row counts to a pluggable logger
//!
//! ## Example
//!
//! ```ignore
//! use xlsql::{Db, params, select_from_as, update};
//!
//! let db = Db::connect("postgres://localhost/app").await?;
//!
//! let names: Vec<String> = select_from_as("employee", "e")
//!     .columns("e.name")
//!     .where_("e.salary>?", params![10000_i32])
//!     .order_by("e.name", params![])
//!     .all(&db)
//!     .await?;
//!
//! xlsql::transaction!(db, tx, {
//!     update("employee")
//!         .set_raw("updated", "current_timestamp")
//!         .set("salary", 12345_i32)
//!         .where_("id=?", params![1_i32])
//!         .exec_one(&tx)
//!         .await?;
//!     Ok(())
//! })?;
//! ```

pub mod clause;
pub mod client;
pub mod db;
pub mod dialect;
pub mod error;
pub mod logger;
pub mod param;
pub mod query;
pub mod row;
pub mod statement;
pub mod transaction;
pub mod util;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use clause::{ExprParams, JoinType, LimitOffset, NamedValue, TableAlias, TableJoin, TableSource};
pub use client::{Executor, Queryer, Session};
pub use db::{Db, DbConfig, PgTx};
pub use dialect::{BindType, Dialect};
pub use error::{XlError, XlResult};
pub use logger::{LogEntry, QueryLogger, clear_logger, set_logger};
pub use param::Param;
pub use query::{
    DeleteQuery, InsertQuery, SelectQuery, Statementer, UpdateQuery, delete, insert, select,
    select_alias, select_from, select_from_as, update,
};
pub use row::{FromRow, RowExt};
pub use statement::{ExecResult, Statement};
pub use transaction::{Database, PhysicalTx, Tx, TxState};
pub use util::{multi_exec, next_int64};

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};
