use super::writer::SqlWriter;
use crate::clause::{ExprParams, NamedValue};
use crate::client::{Executor, Queryer};
use crate::dialect::Dialect;
use crate::error::{XlError, XlResult};
use crate::param::Param;
use crate::row::FromRow;
use crate::statement::{ExecResult, Statement};
use tokio_postgres::types::ToSql;

/// UPDATE query: `UPDATE t SET c=v, ... [WHERE ...] [RETURNING ...]`.
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    table: String,
    values: Vec<NamedValue>,
    where_: Vec<ExprParams>,
    returning: Option<String>,
}

/// Start an UPDATE of `table`.
pub fn update(table: &str) -> UpdateQuery {
    UpdateQuery {
        table: table.to_string(),
        values: Vec::new(),
        where_: Vec::new(),
        returning: None,
    }
}

impl UpdateQuery {
    /// Set a column to a bound parameter.
    pub fn set<T: ToSql + Send + Sync + 'static>(mut self, name: &str, value: T) -> Self {
        self.values.push(NamedValue::Bound {
            name: name.to_string(),
            param: Param::new(value),
        });
        self
    }

    /// Set a column to an unescaped SQL expression.
    ///
    /// ```ignore
    /// q.set_raw("updated", "current_timestamp")
    /// ```
    pub fn set_raw(mut self, name: &str, expr: &str) -> Self {
        self.values.push(NamedValue::Raw {
            name: name.to_string(),
            expr: expr.to_string(),
        });
        self
    }

    pub fn set_null(self, name: &str) -> Self {
        self.set_raw(name, "NULL")
    }

    /// Add a predicate. Predicates are ANDed in call order, without
    /// parentheses.
    pub fn where_(mut self, expr: &str, params: Vec<Param>) -> Self {
        self.where_.push(ExprParams::new(expr, params));
        self
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
        w.push("UPDATE ");
        w.push(&self.table);
        w.push(" SET ");
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push(v.name());
            w.push("=");
            match v {
                NamedValue::Raw { expr, .. } => w.push(expr),
                NamedValue::Bound { param, .. } => w.push_param(param),
            }
        }
        w.write_where(&self.where_, 0);
        w.write_returning(self.returning.as_deref());

        Ok(w.finish(dialect))
    }

    pub async fn exec<E: Executor + ?Sized>(&self, e: &E) -> XlResult<ExecResult> {
        self.statement(e.dialect())?.exec(e).await
    }

    pub async fn exec_count<E: Executor + ?Sized>(&self, e: &E) -> XlResult<u64> {
        self.statement(e.dialect())?.exec_count(e).await
    }

    /// Execute and require exactly one updated row.
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
