use super::*;
use crate::logger::CaptureLogger;
use crate::params;
use crate::testing::FakeDb;
use crate::util::{multi_exec, next_int64};
use std::sync::Arc;

fn captured() -> (FakeDb, Arc<CaptureLogger>) {
    let capture = Arc::new(CaptureLogger::new());
    let db = FakeDb::new().with_logger(capture.clone());
    (db, capture)
}

#[tokio::test]
async fn exec_reports_affected_rows() {
    let (db, capture) = captured();
    db.script_affected(&[3]);

    let st = Statement::new("UPDATE employee SET salary=$1", params![9000_i32]);
    let res = st.exec(&db).await.unwrap();
    assert_eq!(res.rows_affected(), 3);

    let entries = capture.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].sql, "UPDATE employee SET salary=$1");
    assert_eq!(entries[0].params, "[9000]");
    assert_eq!(entries[0].rows, 3);
    assert!(entries[0].error.is_none());
}

#[tokio::test]
async fn exec_one_checks_the_count() {
    let db = FakeDb::new();
    db.script_affected(&[0, 2, 1]);
    let st = Statement::new("DELETE FROM employee WHERE id=$1", params![1_i32]);

    let err = st.exec_one(&db).await.unwrap_err();
    assert!(matches!(err, XlError::NoRowsAffected));
    assert!(err.is_row_count_mismatch());

    let err = st.exec_one(&db).await.unwrap_err();
    assert!(matches!(err, XlError::MultipleRowsAffected(2)));
    assert!(err.is_row_count_mismatch());

    st.exec_one(&db).await.unwrap();
}

#[tokio::test]
async fn exec_count_returns_raw_count() {
    let db = FakeDb::new();
    db.script_affected(&[0]);
    let n = Statement::new("DELETE FROM employee", vec![])
        .exec_count(&db)
        .await
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn failed_exec_is_logged_with_error() {
    let (db, capture) = captured();
    db.fail_next("connection reset");

    let err = Statement::new("INSERT INTO employee (name) VALUES ($1)", params!["Eve"])
        .exec(&db)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "connection reset");

    let entries = capture.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].rows, ROWS_NOT_APPLICABLE);
    assert_eq!(entries[0].error.as_deref(), Some("connection reset"));
}

#[tokio::test]
async fn fetches_log_without_row_count() {
    let (db, capture) = captured();
    let st = Statement::new("SELECT name FROM employee WHERE id=$1", params![1_i32]);

    let rows = st.query(&db).await.unwrap();
    assert!(rows.is_empty());
    assert!(st.query_row(&db).await.unwrap().is_none());
    let names: Vec<String> = st.all(&db).await.unwrap();
    assert!(names.is_empty());

    let entries = capture.entries();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.rows == ROWS_NOT_APPLICABLE));
    assert!(entries.iter().all(|e| e.error.is_none()));
}

#[tokio::test]
async fn first_without_rows_is_not_found() {
    let (db, capture) = captured();
    let err = Statement::new("SELECT 1", vec![])
        .first::<i32, _>(&db)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // The miss is reported to the logger as an error.
    let entries = capture.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].error.is_some());
}

#[tokio::test]
async fn no_logger_is_silent() {
    let db = FakeDb::new();
    Statement::new("SELECT 1", vec![]).exec(&db).await.unwrap();
    assert_eq!(db.committed(), vec!["SELECT 1"]);
}

#[tokio::test]
async fn multi_exec_runs_each_statement() {
    let (db, capture) = captured();
    multi_exec(
        &db,
        "CREATE TABLE a (id int);\nINSERT INTO a VALUES (1);\nINSERT INTO a VALUES (2);\n",
    )
    .await
    .unwrap();

    assert_eq!(
        db.committed(),
        vec![
            "CREATE TABLE a (id int)",
            "INSERT INTO a VALUES (1)",
            "INSERT INTO a VALUES (2)",
        ]
    );
    assert_eq!(capture.sql().len(), 3);
}

#[tokio::test]
async fn multi_exec_stops_at_first_error() {
    let db = FakeDb::new();
    db.fail_next("boom");
    let err = multi_exec(&db, "INSERT INTO b VALUES (1);\nINSERT INTO b VALUES (2);\n")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "boom");
    assert_eq!(db.events(), vec!["INSERT INTO b VALUES (1)"]);
    assert!(db.committed().is_empty());
}

#[tokio::test]
async fn next_int64_queries_the_sequence() {
    let db = FakeDb::new();
    let err = next_int64(&db, "employee_id_seq").await.unwrap_err();
    // The fake has no rows to return.
    assert!(err.is_not_found());
    assert_eq!(db.events(), vec!["SELECT NEXTVAL('employee_id_seq')"]);
}
