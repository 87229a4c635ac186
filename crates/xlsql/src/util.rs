//! Script and sequence helpers.

use crate::client::{Executor, Queryer};
use crate::error::XlResult;
use crate::statement::Statement;

/// Split a script into statements on `";\n"`, dropping a trailing blank
/// statement.
pub fn split_script(script: &str) -> Vec<&str> {
    let mut stmts: Vec<&str> = script.split(";\n").collect();
    if stmts
        .last()
        .is_some_and(|s| s.trim_matches([' ', '\n', '\t', '\r']).is_empty())
    {
        stmts.pop();
    }
    stmts
}

/// Execute a multi-statement script one statement at a time, stopping at the
/// first error.
///
/// ```ignore
/// xlsql::multi_exec(&db, "CREATE TABLE a (id int);\nINSERT INTO a VALUES (1);\n").await?;
/// ```
pub async fn multi_exec<E: Executor + ?Sized>(e: &E, script: &str) -> XlResult<()> {
    for sql in split_script(script) {
        Statement::new(sql, Vec::new()).exec(e).await?;
    }
    Ok(())
}

/// Advance a sequence: `SELECT NEXTVAL('<seq>')`.
///
/// `seq` is spliced into the SQL text; never pass untrusted input.
pub async fn next_int64<Q: Queryer + ?Sized>(q: &Q, seq: &str) -> XlResult<i64> {
    Statement::new(format!("SELECT NEXTVAL('{seq}')"), Vec::new())
        .first::<i64, _>(q)
        .await
}
