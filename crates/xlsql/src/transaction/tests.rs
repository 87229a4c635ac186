use super::*;
use crate::params;
use crate::query::{insert, update};
use crate::statement::Statement;
use crate::testing::FakeDb;

async fn run(e: &impl Executor, sql: &str) {
    Statement::new(sql, vec![]).exec(e).await.unwrap();
}

// ==================== State machine ====================

#[tokio::test]
async fn unbound_scope_runs_on_the_database() {
    let db = FakeDb::new();
    let mut tx = Tx::unbound(db.clone());
    assert_eq!(tx.state(), TxState::Unbound);

    run(&tx, "DELETE FROM employee").await;
    tx.commit().await.unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(db.events(), vec!["DELETE FROM employee"]);
    assert_eq!(db.committed(), vec!["DELETE FROM employee"]);
}

#[tokio::test]
async fn outer_commit_sends_begin_and_commit() {
    let db = FakeDb::new();
    let mut tx = db.begin().await.unwrap();
    assert_eq!(tx.state(), TxState::OuterActive);
    assert!(!tx.is_inner());

    run(&tx, "INSERT INTO employee (name) VALUES ('a')").await;
    assert!(db.committed().is_empty());

    tx.commit().await.unwrap();
    assert_eq!(tx.state(), TxState::Terminal);
    assert_eq!(
        db.events(),
        vec!["BEGIN", "INSERT INTO employee (name) VALUES ('a')", "COMMIT"]
    );
    assert_eq!(db.committed(), vec!["INSERT INTO employee (name) VALUES ('a')"]);
}

#[tokio::test]
async fn inner_commit_waits_for_outer() {
    let db = FakeDb::new();
    let mut outer = db.begin().await.unwrap();
    let mut inner = outer.begin().await.unwrap();
    assert!(inner.is_inner());
    assert_eq!(inner.state(), TxState::InnerActive);

    run(&inner, "UPDATE employee SET salary=1").await;
    inner.commit().await.unwrap();
    assert_eq!(inner.state(), TxState::InnerCommitted);
    // A second inner commit is a no-op.
    inner.commit().await.unwrap();
    drop(inner);

    assert_eq!(db.events(), vec!["BEGIN", "UPDATE employee SET salary=1"]);
    assert_eq!(db.pending(), vec!["UPDATE employee SET salary=1"]);

    outer.commit().await.unwrap();
    assert_eq!(
        db.events(),
        vec!["BEGIN", "UPDATE employee SET salary=1", "COMMIT"]
    );
    assert_eq!(db.committed(), vec!["UPDATE employee SET salary=1"]);
}

#[tokio::test]
async fn nested_scopes_share_one_physical_transaction() {
    let db = FakeDb::new();
    let mut outer = db.begin().await.unwrap();
    let mut a = outer.begin().await.unwrap();
    let mut b = a.begin().await.unwrap();

    run(&b, "INSERT INTO t VALUES (1)").await;
    b.commit().await.unwrap();
    a.commit().await.unwrap();
    outer.commit().await.unwrap();

    let events = db.events();
    assert_eq!(events.iter().filter(|e| *e == "BEGIN").count(), 1);
    assert_eq!(events.iter().filter(|e| *e == "COMMIT").count(), 1);
}

// ==================== All-or-nothing ====================

#[tokio::test]
async fn inner_rollback_discards_everything() {
    let db = FakeDb::new();
    let mut outer = db.begin().await.unwrap();
    update("employee")
        .set("salary", 9000_i32)
        .where_("id=?", params![2_i32])
        .exec_one(&outer)
        .await
        .unwrap();

    let mut inner = outer.begin().await.unwrap();
    run(&inner, "DELETE FROM bonus").await;
    inner.rollback().await.unwrap();
    assert_eq!(inner.state(), TxState::Terminal);
    assert!(db.pending().is_empty());

    // The outer scope sees the transaction as finished.
    assert_eq!(outer.state(), TxState::Terminal);
    assert!(matches!(outer.commit().await, Err(XlError::TxDone)));
    assert!(matches!(
        Statement::new("SELECT 1", vec![]).exec(&outer).await,
        Err(XlError::TxDone)
    ));

    let events = db.events();
    assert_eq!(events.last().map(String::as_str), Some("ROLLBACK"));
    assert!(!events.iter().any(|e| e == "COMMIT"));
    assert!(db.committed().is_empty());
}

#[tokio::test]
async fn outer_rollback_discards_committed_inner_work() {
    let db = FakeDb::new();
    let mut outer = db.begin().await.unwrap();
    let mut inner = outer.begin().await.unwrap();
    insert("audit")
        .set("note", "x")
        .exec(&inner)
        .await
        .unwrap();
    inner.commit().await.unwrap();

    outer.rollback().await.unwrap();
    assert_eq!(db.events().last().map(String::as_str), Some("ROLLBACK"));
    assert!(db.committed().is_empty());
    // The committed inner scope ignores a rollback.
    inner.rollback().await.unwrap();
    assert_eq!(
        db.events().iter().filter(|e| *e == "ROLLBACK").count(),
        1
    );
}

#[tokio::test]
async fn dropped_inner_scope_aborts_the_outer_commit() {
    let db = FakeDb::new();
    let mut outer = db.begin().await.unwrap();
    run(&outer, "INSERT INTO t VALUES (1)").await;
    {
        let inner = outer.begin().await.unwrap();
        run(&inner, "INSERT INTO t VALUES (2)").await;
    }

    assert!(matches!(outer.commit().await, Err(XlError::TxAborted)));
    let events = db.events();
    assert_eq!(events.last().map(String::as_str), Some("ROLLBACK"));
    assert!(!events.iter().any(|e| e == "COMMIT"));
    assert!(db.committed().is_empty());
}

#[tokio::test]
async fn dropped_outer_scope_rolls_back_in_background() {
    let db = FakeDb::new();
    {
        let tx = db.begin().await.unwrap();
        run(&tx, "INSERT INTO t VALUES (1)").await;
    }
    assert_eq!(
        db.events(),
        vec!["BEGIN", "INSERT INTO t VALUES (1)", "ROLLBACK (background)"]
    );
    assert!(db.committed().is_empty());
}

#[tokio::test]
async fn finished_scope_drops_quietly() {
    let db = FakeDb::new();
    {
        let mut tx = db.begin().await.unwrap();
        tx.commit().await.unwrap();
    }
    assert_eq!(db.events(), vec!["BEGIN", "COMMIT"]);
}

// ==================== Idempotence ====================

#[tokio::test]
async fn rollback_after_commit_is_a_no_op() {
    let db = FakeDb::new();
    let mut tx = db.begin().await.unwrap();
    tx.commit().await.unwrap();
    tx.rollback().await.unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(db.events(), vec!["BEGIN", "COMMIT"]);
}

#[tokio::test]
async fn second_outer_commit_fails() {
    let db = FakeDb::new();
    let mut tx = db.begin().await.unwrap();
    tx.commit().await.unwrap();
    assert!(matches!(tx.commit().await, Err(XlError::TxDone)));
}

#[tokio::test]
async fn begin_on_finished_scope_fails() {
    let db = FakeDb::new();
    let mut tx = db.begin().await.unwrap();
    tx.rollback().await.unwrap();
    assert!(matches!(tx.begin().await, Err(XlError::TxDone)));
}

#[tokio::test]
async fn inner_commit_after_rollback_fails() {
    let db = FakeDb::new();
    let mut outer = db.begin().await.unwrap();
    let mut a = outer.begin().await.unwrap();
    let mut b = outer.begin().await.unwrap();

    a.rollback().await.unwrap();
    assert!(matches!(b.commit().await, Err(XlError::TxDone)));
    assert!(matches!(outer.commit().await, Err(XlError::TxDone)));
}

// ==================== transaction! ====================

async fn transfer(db: &FakeDb, fail: bool) -> XlResult<i32> {
    crate::transaction!(db, tx, {
        run(&tx, "UPDATE account SET balance=balance-1 WHERE id=1").await;
        crate::transaction!(tx, inner, {
            run(&inner, "UPDATE account SET balance=balance+1 WHERE id=2").await;
            if fail {
                return Err(XlError::Other("insufficient funds".to_string()));
            }
            Ok(())
        })?;
        Ok(7)
    })
}

#[tokio::test]
async fn transaction_macro_commits_on_ok() {
    let db = FakeDb::new();
    assert_eq!(transfer(&db, false).await.unwrap(), 7);
    assert_eq!(
        db.events(),
        vec![
            "BEGIN",
            "UPDATE account SET balance=balance-1 WHERE id=1",
            "UPDATE account SET balance=balance+1 WHERE id=2",
            "COMMIT",
        ]
    );
    assert_eq!(db.committed().len(), 2);
}

#[tokio::test]
async fn transaction_macro_rolls_back_on_err() {
    let db = FakeDb::new();
    let err = transfer(&db, true).await.unwrap_err();
    // The inner rollback ends the transaction; the outer scope then rolls
    // back as a no-op and reports the original error.
    assert_eq!(err.to_string(), "insufficient funds");

    let events = db.events();
    assert_eq!(events.iter().filter(|e| *e == "ROLLBACK").count(), 1);
    assert!(!events.iter().any(|e| e == "COMMIT"));
    assert!(db.committed().is_empty());
}
