use super::writer::SqlWriter;
use crate::clause::ExprParams;
use crate::client::Executor;
use crate::dialect::Dialect;
use crate::error::XlResult;
use crate::param::Param;
use crate::statement::{ExecResult, Statement};

/// DELETE query: `DELETE FROM t [WHERE ...] [RETURNING ...]`.
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    table: String,
    where_: Vec<ExprParams>,
    returning: Option<String>,
}

/// Start a DELETE from `table`.
pub fn delete(table: &str) -> DeleteQuery {
    DeleteQuery {
        table: table.to_string(),
        where_: Vec::new(),
        returning: None,
    }
}

impl DeleteQuery {
    pub fn where_(mut self, expr: &str, params: Vec<Param>) -> Self {
        self.where_.push(ExprParams::new(expr, params));
        self
    }

    pub fn returning(mut self, expr: &str) -> Self {
        self.returning = Some(expr.to_string());
        self
    }

    /// Compile. A DELETE without predicates is allowed and removes every row.
    pub fn statement(&self, dialect: Dialect) -> XlResult<Statement> {
        let mut w = SqlWriter::new();
        w.push("DELETE FROM ");
        w.push(&self.table);
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

    /// Execute and require exactly one deleted row.
    pub async fn exec_one<E: Executor + ?Sized>(&self, e: &E) -> XlResult<()> {
        self.statement(e.dialect())?.exec_one(e).await
    }
}
