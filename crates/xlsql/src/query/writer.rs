use crate::clause::ExprParams;
use crate::dialect::Dialect;
use crate::param::Param;
use crate::statement::Statement;

/// Accumulates `?`-placeholder SQL and the parameters in textual order.
///
/// Every compiler in this module writes through a single `SqlWriter`, which
/// is what keeps nested sub-queries and join conditions aligned with their
/// placeholders.
#[derive(Debug, Default)]
pub(crate) struct SqlWriter {
    sql: String,
    params: Vec<Param>,
}

impl SqlWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    pub(crate) fn push_param(&mut self, param: &Param) {
        self.sql.push('?');
        self.params.push(param.clone());
    }

    /// Append a fragment followed by its parameters.
    pub(crate) fn push_expr(&mut self, expr: &ExprParams) {
        self.sql.push_str(&expr.expr);
        self.params.extend(expr.params.iter().cloned());
    }

    /// Write WHERE predicates: the first is prefixed ` WHERE `, later ones
    /// ` AND `. `written` is the number of predicates already emitted for this
    /// statement; the updated count is returned.
    pub(crate) fn write_where<'a>(
        &mut self,
        predicates: impl IntoIterator<Item = &'a ExprParams>,
        mut written: usize,
    ) -> usize {
        for pred in predicates {
            self.push(if written == 0 { " WHERE " } else { " AND " });
            self.push_expr(pred);
            written += 1;
        }
        written
    }

    pub(crate) fn write_returning(&mut self, returning: Option<&str>) {
        if let Some(expr) = returning {
            self.push(" RETURNING ");
            self.push(expr);
        }
    }

    pub(crate) fn finish(self, dialect: Dialect) -> Statement {
        Statement::new(dialect.rebind(&self.sql), self.params)
    }
}
