//! In-memory fakes for unit tests.
//!
//! `FakeDb` records every statement it is given. Statements executed inside
//! a fake transaction stay pending until `COMMIT` and are discarded on
//! `ROLLBACK`, which is enough to observe all-or-nothing behavior.

use crate::client::{Executor, Queryer, Session};
use crate::dialect::Dialect;
use crate::error::{XlError, XlResult};
use crate::logger::QueryLogger;
use crate::transaction::{Database, PhysicalTx};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    /// Everything sent to the "server", in order.
    pub events: Vec<String>,
    /// Statements that survived (autocommit or committed).
    pub committed: Vec<String>,
    /// Statements of the open transaction.
    pub pending: Vec<String>,
    /// Scripted affected-row counts; 1 once exhausted.
    pub affected: VecDeque<u64>,
    /// Fail the next statement with this message.
    pub fail_next: Option<String>,
}

#[derive(Clone)]
pub(crate) struct FakeDb {
    state: Arc<Mutex<FakeState>>,
    dialect: Dialect,
    logger: Option<Arc<dyn QueryLogger>>,
}

impl FakeDb {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            dialect: Dialect::POSTGRES,
            logger: None,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn script_affected(&self, counts: &[u64]) {
        self.lock().affected.extend(counts.iter().copied());
    }

    pub fn fail_next(&self, message: &str) {
        self.lock().fail_next = Some(message.to_string());
    }

    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    pub fn committed(&self) -> Vec<String> {
        self.lock().committed.clone()
    }

    pub fn pending(&self) -> Vec<String> {
        self.lock().pending.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

fn run(state: &Mutex<FakeState>, sql: &str, in_tx: bool) -> XlResult<u64> {
    let mut st = state.lock().unwrap();
    st.events.push(sql.to_string());
    if let Some(message) = st.fail_next.take() {
        return Err(XlError::Other(message));
    }
    if in_tx {
        st.pending.push(sql.to_string());
    } else {
        st.committed.push(sql.to_string());
    }
    Ok(st.affected.pop_front().unwrap_or(1))
}

impl Session for FakeDb {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        self.logger.clone()
    }
}

impl Executor for FakeDb {
    async fn execute(&self, sql: &str, _: &[&(dyn ToSql + Sync)]) -> XlResult<u64> {
        run(&self.state, sql, false)
    }
}

impl Queryer for FakeDb {
    async fn query(&self, sql: &str, _: &[&(dyn ToSql + Sync)]) -> XlResult<Vec<Row>> {
        run(&self.state, sql, false).map(|_| Vec::new())
    }
}

impl Database for FakeDb {
    type Physical = FakeTx;

    async fn begin_physical(&self) -> XlResult<FakeTx> {
        let mut st = self.lock();
        st.events.push("BEGIN".to_string());
        st.pending.clear();
        Ok(FakeTx {
            state: Arc::clone(&self.state),
            dialect: self.dialect,
            logger: self.logger.clone(),
        })
    }
}

pub(crate) struct FakeTx {
    state: Arc<Mutex<FakeState>>,
    dialect: Dialect,
    logger: Option<Arc<dyn QueryLogger>>,
}

impl Session for FakeTx {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        self.logger.clone()
    }
}

impl Executor for FakeTx {
    async fn execute(&self, sql: &str, _: &[&(dyn ToSql + Sync)]) -> XlResult<u64> {
        run(&self.state, sql, true)
    }
}

impl Queryer for FakeTx {
    async fn query(&self, sql: &str, _: &[&(dyn ToSql + Sync)]) -> XlResult<Vec<Row>> {
        run(&self.state, sql, true).map(|_| Vec::new())
    }
}

impl PhysicalTx for FakeTx {
    async fn commit(&self) -> XlResult<()> {
        let mut st = self.state.lock().unwrap();
        st.events.push("COMMIT".to_string());
        let pending = std::mem::take(&mut st.pending);
        st.committed.extend(pending);
        Ok(())
    }

    async fn rollback(&self) -> XlResult<()> {
        let mut st = self.state.lock().unwrap();
        st.events.push("ROLLBACK".to_string());
        st.pending.clear();
        Ok(())
    }

    fn rollback_in_background(&self) {
        let mut st = self.state.lock().unwrap();
        st.events.push("ROLLBACK (background)".to_string());
        st.pending.clear();
    }
}
