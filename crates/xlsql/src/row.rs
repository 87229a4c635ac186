//! Row mapping traits and utilities

use crate::error::{XlError, XlResult};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Trait for converting a database row into a Rust value.
///
/// Scalars, `Option`s and tuples of up to four values are provided and read
/// positional columns. Structs implement it by hand:
///
/// ```ignore
/// use xlsql::{FromRow, RowExt, XlResult};
///
/// struct Employee {
///     id: i32,
///     name: String,
///     department: String,
/// }
///
/// impl FromRow for Employee {
///     fn from_row(row: &tokio_postgres::Row) -> XlResult<Self> {
///         Ok(Self {
///             id: row.try_get_column("id")?,
///             name: row.try_get_column("e.name")?,
///             department: row.try_get_column("d.name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> XlResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Get a column by name, returning `XlError::Decode` on failure.
    ///
    /// Column labels produced by aliased projections (`e.name "e.name"`)
    /// are looked up verbatim, dot included.
    fn try_get_column<T>(&self, column: &str) -> XlResult<T>
    where
        T: for<'a> FromSql<'a>;

    /// Get a column by position, returning `XlError::Decode` on failure.
    fn try_get_index<T>(&self, idx: usize) -> XlResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> XlResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| XlError::decode(column, e.to_string()))
    }

    fn try_get_index<T>(&self, idx: usize) -> XlResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(idx).map_err(|e| {
            let name = self
                .columns()
                .get(idx)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| format!("#{idx}"));
            XlError::decode(name, e.to_string())
        })
    }
}

macro_rules! impl_scalar_from_row {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &Row) -> XlResult<Self> {
                    row.try_get_index(0)
                }
            }
        )*
    };
}

impl_scalar_from_row!(
    i16,
    i32,
    i64,
    f32,
    f64,
    bool,
    String,
    Vec<u8>,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
);

impl<T> FromRow for Option<T>
where
    T: for<'a> FromSql<'a>,
{
    fn from_row(row: &Row) -> XlResult<Self> {
        row.try_get_index(0)
    }
}

macro_rules! impl_tuple_from_row {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name),+> FromRow for ($($name,)+)
        where
            $($name: for<'a> FromSql<'a>),+
        {
            fn from_row(row: &Row) -> XlResult<Self> {
                Ok(($(row.try_get_index::<$name>($idx)?,)+))
            }
        }
    };
}

impl_tuple_from_row!(A: 0, B: 1);
impl_tuple_from_row!(A: 0, B: 1, C: 2);
impl_tuple_from_row!(A: 0, B: 1, C: 2, D: 3);
