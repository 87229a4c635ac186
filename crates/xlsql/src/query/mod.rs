//! Query trees and the statement compiler.
//!
//! Queries are built with consuming `mut self -> Self` methods, compiled with
//! `statement(dialect)` and executed either through the resulting
//! [`Statement`] or through the shortcut methods on each query, which compile
//! against the executor's own dialect.
//!
//! ```ignore
//! use xlsql::{params, query::*};
//!
//! let q = select_from_as("employee", "e")
//!     .columns("e.id")
//!     .inner_join(
//!         select_from_as("department", "d").where_("d.city=?", params!["Stockholm"]),
//!         "d.id=e.department_id",
//!         params![],
//!     )
//!     .where_("e.salary>?", params![10000_i32])
//!     .order_by("e.id", params![]);
//!
//! let ids: Vec<i32> = q.all(&db).await?;
//! let n = q.total(&db).await?;
//! ```

mod delete;
mod insert;
mod select;
mod update;
mod writer;

pub use delete::{DeleteQuery, delete};
pub use insert::{InsertQuery, insert};
pub use select::{SelectQuery, select, select_alias, select_from, select_from_as};
pub use update::{UpdateQuery, update};

use crate::dialect::Dialect;
use crate::error::XlResult;
use crate::statement::Statement;

/// Anything that compiles to a [`Statement`].
pub trait Statementer {
    fn statement(&self, dialect: Dialect) -> XlResult<Statement>;
}

impl Statementer for SelectQuery {
    fn statement(&self, dialect: Dialect) -> XlResult<Statement> {
        SelectQuery::statement(self, dialect)
    }
}

impl Statementer for InsertQuery {
    fn statement(&self, dialect: Dialect) -> XlResult<Statement> {
        InsertQuery::statement(self, dialect)
    }
}

impl Statementer for UpdateQuery {
    fn statement(&self, dialect: Dialect) -> XlResult<Statement> {
        UpdateQuery::statement(self, dialect)
    }
}

impl Statementer for DeleteQuery {
    fn statement(&self, dialect: Dialect) -> XlResult<Statement> {
        DeleteQuery::statement(self, dialect)
    }
}

impl Statementer for Statement {
    /// A pre-built statement is already bound; it is returned unchanged.
    fn statement(&self, _dialect: Dialect) -> XlResult<Statement> {
        Ok(self.clone())
    }
}
