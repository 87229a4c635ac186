//! Clause fragments that make up a query tree.

use crate::param::Param;
use crate::query::SelectQuery;

/// A column assignment for INSERT/UPDATE.
#[derive(Debug, Clone)]
pub enum NamedValue {
    /// Unescaped SQL expression, e.g. `current_timestamp`.
    Raw { name: String, expr: String },
    /// Value sent as a bound parameter.
    Bound { name: String, param: Param },
}

impl NamedValue {
    pub fn name(&self) -> &str {
        match self {
            NamedValue::Raw { name, .. } | NamedValue::Bound { name, .. } => name,
        }
    }
}

/// A SQL fragment with its positional parameters, in left-to-right order.
#[derive(Debug, Clone, Default)]
pub struct ExprParams {
    pub expr: String,
    pub params: Vec<Param>,
}

impl ExprParams {
    pub fn new(expr: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            expr: expr.into(),
            params,
        }
    }
}

/// What a FROM entry reads from.
#[derive(Debug, Clone)]
pub enum TableSource {
    Name(String),
    Subquery(Box<SelectQuery>),
}

/// One entry of a FROM list.
#[derive(Debug, Clone)]
pub struct TableAlias {
    pub source: TableSource,
    pub alias: Option<String>,
    /// Render a sub-query source as `LATERAL (...)`.
    pub lateral: bool,
}

impl TableAlias {
    pub fn table(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            source: TableSource::Name(name.into()),
            alias,
            lateral: false,
        }
    }

    pub fn subquery(query: SelectQuery, alias: Option<String>) -> Self {
        Self {
            source: TableSource::Subquery(Box::new(query)),
            alias,
            lateral: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

/// A joined query. Only its first FROM entry, its columns and its WHERE
/// predicates contribute to the parent statement.
#[derive(Debug, Clone)]
pub struct TableJoin {
    pub query: SelectQuery,
    pub join_type: JoinType,
    pub on: ExprParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitOffset {
    pub limit: u64,
    pub offset: u64,
}
