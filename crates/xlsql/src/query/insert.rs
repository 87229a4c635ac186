use super::writer::SqlWriter;
use crate::clause::NamedValue;
use crate::client::{Executor, Queryer};
use crate::dialect::Dialect;
use crate::error::{XlError, XlResult};
use crate::param::Param;
use crate::row::FromRow;
use crate::statement::{ExecResult, Statement};
use tokio_postgres::types::ToSql;

/// INSERT query: `INSERT INTO t (names) VALUES (values) [RETURNING expr]`.
#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: String,
    values: Vec<NamedValue>,
    returning: Option<String>,
}

/// Start an INSERT into `table`.
pub fn insert(table: &str) -> InsertQuery {
    InsertQuery {
        table: table.to_string(),
        values: Vec::new(),
        returning: None,
    }
}

impl InsertQuery {
    /// Set a column to a bound parameter.
    pub fn set<T: ToSql + Send + Sync + 'static>(mut self, name: &str, value: T) -> Self {
        self.values.push(NamedValue::Bound {
            name: name.to_string(),
            param: Param::new(value),
        });
        self
    }

    /// Set a column to an unescaped SQL expression, e.g. `current_timestamp`.
    /// Never pass untrusted input here; use [`set`](Self::set) instead.
    pub fn set_raw(mut self, name: &str, expr: &str) -> Self {
        self.values.push(NamedValue::Raw {
            name: name.to_string(),
            expr: expr.to_string(),
        });
        self
    }

    /// Shorthand for `set_raw(name, "NULL")`.
    pub fn set_null(self, name: &str) -> Self {
        self.set_raw(name, "NULL")
    }

    pub fn returning(mut self, expr: &str) -> Self {
        self.returning = Some(expr.to_string());
        self
    }

    pub fn statement(&self, dialect: Dialect) -> XlResult<Statement> {
        if self.values.is_empty() {
            return Err(XlError::NoValues);
        }

        let mut w = SqlWriter::new();
        w.push("INSERT INTO ");
        w.push(&self.table);
        w.push(" (");
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push(v.name());
        }
        w.push(") VALUES (");
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            match v {
                NamedValue::Raw { expr, .. } => w.push(expr),
                NamedValue::Bound { param, .. } => w.push_param(param),
            }
        }
        w.push(")");
        w.write_returning(self.returning.as_deref());

        Ok(w.finish(dialect))
    }

    pub async fn exec<E: Executor + ?Sized>(&self, e: &E) -> XlResult<ExecResult> {
        self.statement(e.dialect())?.exec(e).await
    }

    pub async fn exec_count<E: Executor + ?Sized>(&self, e: &E) -> XlResult<u64> {
        self.statement(e.dialect())?.exec_count(e).await
    }

    /// Execute and require exactly one inserted row.
    pub async fn exec_one<E: Executor + ?Sized>(&self, e: &E) -> XlResult<()> {
        self.statement(e.dialect())?.exec_one(e).await
    }

    /// Execute and map the first `RETURNING` row.
    pub async fn first<T, Q>(&self, q: &Q) -> XlResult<T>
    where
        T: FromRow,
        Q: Queryer + ?Sized,
    {
        self.statement(q.dialect())?.first(q).await
    }
}
