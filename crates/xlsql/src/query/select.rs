use super::writer::SqlWriter;
use crate::clause::{ExprParams, JoinType, LimitOffset, TableAlias, TableJoin, TableSource};
use crate::client::Queryer;
use crate::dialect::Dialect;
use crate::error::{XlError, XlResult};
use crate::param::Param;
use crate::row::FromRow;
use crate::statement::Statement;

/// SELECT query tree.
///
/// Joins and FROM sub-queries are owned child nodes, so `clone()` yields an
/// independent copy of the whole tree.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    /// Raw projected expressions, emitted verbatim
    pub(crate) columns: Vec<String>,
    /// Column names qualified with the first FROM alias when rendered
    pub(crate) alias_columns: Vec<String>,
    pub(crate) from: Vec<TableAlias>,
    pub(crate) joins: Vec<TableJoin>,
    pub(crate) where_: Vec<ExprParams>,
    pub(crate) group_by: Option<String>,
    pub(crate) order_by: Option<ExprParams>,
    pub(crate) limit: Option<LimitOffset>,
}

/// Start a SELECT with a raw projection, e.g. `select("id, name")`.
pub fn select(cols: &str) -> SelectQuery {
    SelectQuery::new().columns(cols)
}

/// Start a SELECT whose comma-separated columns are rendered as
/// `alias.col "alias.col"` once the query has an aliased FROM entry.
pub fn select_alias(cols: &str) -> SelectQuery {
    SelectQuery::new().column_alias(cols)
}

/// Start a SELECT reading from `table`; columns are added afterwards.
pub fn select_from(table: &str) -> SelectQuery {
    SelectQuery::new().from(table)
}

/// Start a SELECT reading from `table alias`.
pub fn select_from_as(table: &str, alias: &str) -> SelectQuery {
    SelectQuery::new().from_as(table, alias)
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Projection ====================

    /// Append a raw projection expression.
    pub fn columns(mut self, cols: &str) -> Self {
        self.columns.push(cols.to_string());
        self
    }

    /// Append comma-separated aliased columns.
    pub fn column_alias(mut self, cols: &str) -> Self {
        self.alias_columns.extend(
            cols.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        );
        self
    }

    // ==================== FROM ====================

    pub fn from(mut self, table: &str) -> Self {
        self.from.push(TableAlias::table(table, None));
        self
    }

    pub fn from_as(mut self, table: &str, alias: &str) -> Self {
        self.from.push(TableAlias::table(table, Some(alias.to_string())));
        self
    }

    /// Read from a parenthesized sub-query.
    pub fn from_subselect(mut self, sub: SelectQuery) -> Self {
        self.from.push(TableAlias::subquery(sub, None));
        self
    }

    pub fn from_subselect_as(mut self, sub: SelectQuery, alias: &str) -> Self {
        self.from.push(TableAlias::subquery(sub, Some(alias.to_string())));
        self
    }

    /// Read from `LATERAL (sub) alias`.
    pub fn from_lateral_as(mut self, sub: SelectQuery, alias: &str) -> Self {
        let mut entry = TableAlias::subquery(sub, Some(alias.to_string()));
        entry.lateral = true;
        self.from.push(entry);
        self
    }

    // ==================== Joins ====================

    /// `INNER JOIN <first FROM entry of jq> ON cond`. The joined query's
    /// columns and WHERE predicates are merged into this one.
    pub fn inner_join(self, jq: SelectQuery, cond: &str, params: Vec<Param>) -> Self {
        self.join(JoinType::Inner, jq, cond, params)
    }

    /// `LEFT JOIN <first FROM entry of jq> ON cond`.
    pub fn left_join(self, jq: SelectQuery, cond: &str, params: Vec<Param>) -> Self {
        self.join(JoinType::Left, jq, cond, params)
    }

    fn join(mut self, join_type: JoinType, query: SelectQuery, cond: &str, params: Vec<Param>) -> Self {
        self.joins.push(TableJoin {
            query,
            join_type,
            on: ExprParams::new(cond, params),
        });
        self
    }

    // ==================== Filtering & ordering ====================

    /// Add a predicate. Predicates are ANDed in call order.
    pub fn where_(mut self, expr: &str, params: Vec<Param>) -> Self {
        self.where_.push(ExprParams::new(expr, params));
        self
    }

    pub fn group_by(mut self, expr: &str) -> Self {
        self.group_by = Some(expr.to_string());
        self
    }

    /// Set ORDER BY, replacing any earlier one.
    pub fn order_by(mut self, expr: &str, params: Vec<Param>) -> Self {
        self.order_by = Some(ExprParams::new(expr, params));
        self
    }

    /// Set LIMIT/OFFSET, replacing any earlier pair.
    pub fn limit_offset(mut self, limit: u64, offset: u64) -> Self {
        self.limit = Some(LimitOffset { limit, offset });
        self
    }

    // ==================== Compilation ====================

    /// Compile into a statement for `dialect`.
    pub fn statement(&self, dialect: Dialect) -> XlResult<Statement> {
        let mut w = SqlWriter::new();
        self.write_select(&mut w)?;
        Ok(w.finish(dialect))
    }

    /// The row-count variant of this query: same FROM/JOIN/WHERE, no
    /// ORDER BY or LIMIT. Grouped queries are wrapped so that the count is the
    /// number of groups.
    pub fn total_query(&self) -> SelectQuery {
        let mut base = self.clone();
        base.order_by = None;
        base.limit = None;

        if base.group_by.is_some() {
            return select("COUNT(*)").from_subselect_as(base, "t");
        }

        base.columns = vec!["COUNT(*)".to_string()];
        base.alias_columns.clear();
        for join in &mut base.joins {
            join.query.columns.clear();
            join.query.alias_columns.clear();
        }
        base
    }

    fn first_alias(&self) -> Option<&str> {
        self.from.first().and_then(|t| t.alias.as_deref())
    }

    fn has_columns(&self) -> bool {
        !self.columns.is_empty() || !self.alias_columns.is_empty()
    }

    fn write_columns(&self, w: &mut SqlWriter, mut count: usize) -> usize {
        for col in &self.columns {
            if count > 0 {
                w.push(", ");
            }
            w.push(col);
            count += 1;
        }

        let alias = self.first_alias();
        for col in &self.alias_columns {
            if count > 0 {
                w.push(", ");
            }
            match alias {
                Some(a) => w.push(&format!("{a}.{col} \"{a}.{col}\"")),
                None => w.push(col),
            }
            count += 1;
        }
        count
    }

    pub(crate) fn write_select(&self, w: &mut SqlWriter) -> XlResult<()> {
        if !self.has_columns() && !self.joins.iter().any(|j| j.query.has_columns()) {
            return Err(XlError::NoColumns);
        }

        w.push("SELECT ");
        let mut count = self.write_columns(w, 0);
        for join in &self.joins {
            count = join.query.write_columns(w, count);
        }

        for (i, entry) in self.from.iter().enumerate() {
            w.push(if i == 0 { " FROM " } else { ", " });
            write_table(w, entry)?;
        }

        for join in &self.joins {
            let target = join.query.from.first().ok_or(XlError::JoinWithoutTable)?;
            w.push(" ");
            w.push(join.join_type.as_sql());
            w.push(" ");
            write_table(w, target)?;
            w.push(" ON ");
            w.push_expr(&join.on);
        }

        let mut written = w.write_where(&self.where_, 0);
        for join in &self.joins {
            written = w.write_where(&join.query.where_, written);
        }

        if let Some(group) = &self.group_by {
            w.push(" GROUP BY ");
            w.push(group);
        }

        if let Some(order) = &self.order_by {
            w.push(" ORDER BY ");
            w.push_expr(order);
        }

        if let Some(lo) = &self.limit {
            w.push(&format!(" LIMIT {} OFFSET {}", lo.limit, lo.offset));
        }

        Ok(())
    }

    // ==================== Execution ====================

    /// Fetch the first row, `NotFound` if there is none.
    pub async fn first<T, Q>(&self, q: &Q) -> XlResult<T>
    where
        T: FromRow,
        Q: Queryer + ?Sized,
    {
        self.statement(q.dialect())?.first(q).await
    }

    /// Fetch all rows.
    pub async fn all<T, Q>(&self, q: &Q) -> XlResult<Vec<T>>
    where
        T: FromRow,
        Q: Queryer + ?Sized,
    {
        self.statement(q.dialect())?.all(q).await
    }

    /// Count the rows (or groups) this query would return, ignoring
    /// ORDER BY and LIMIT.
    pub async fn total<Q>(&self, q: &Q) -> XlResult<i64>
    where
        Q: Queryer + ?Sized,
    {
        self.total_query().statement(q.dialect())?.first::<i64, _>(q).await
    }
}

fn write_table(w: &mut SqlWriter, entry: &TableAlias) -> XlResult<()> {
    match &entry.source {
        TableSource::Name(name) => {
            w.push(name);
            if let Some(alias) = &entry.alias {
                w.push(" ");
                w.push(alias);
            }
        }
        TableSource::Subquery(sub) => {
            if entry.lateral {
                w.push("LATERAL ");
            }
            w.push("(");
            sub.write_select(w)?;
            w.push(")");
            if let Some(alias) = &entry.alias {
                w.push(" AS ");
                w.push(alias);
            }
        }
    }
    Ok(())
}
