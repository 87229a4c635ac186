//! PostgreSQL database handle.

use crate::client::{Executor, Queryer, Session};
use crate::dialect::Dialect;
use crate::error::{XlError, XlResult};
use crate::logger::{self, QueryLogger};
use crate::transaction::{Database, PhysicalTx, Tx};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::OwnedMutexGuard;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};

/// Connection settings for [`Db::open`].
#[derive(Clone, Default)]
pub struct DbConfig {
    pub url: String,
    /// Pool size. `None` opens a single connection.
    pub pool_max_size: Option<usize>,
    /// Logger for this handle, overriding the global hook.
    pub logger: Option<Arc<dyn QueryLogger>>,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Build from the `DATABASE_URL` environment variable.
    pub fn from_env() -> XlResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| XlError::Connection("DATABASE_URL is not set".to_string()))?;
        Ok(Self::new(url))
    }

    pub fn pool_max_size(mut self, size: usize) -> Self {
        self.pool_max_size = Some(size);
        self
    }

    pub fn logger(mut self, logger: impl QueryLogger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("pool_max_size", &self.pool_max_size)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

/// One connection shared by every clone of a handle. `gate` is held for the
/// whole lifetime of a physical transaction, including a background
/// `ROLLBACK`, so nothing else reaches the connection until it is idle.
#[derive(Clone)]
struct SharedClient {
    client: Arc<Client>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Clone)]
enum Backend {
    Client(SharedClient),
    #[cfg(feature = "pool")]
    Pool(deadpool_postgres::Pool),
}

/// A PostgreSQL handle: one shared connection or a pool.
///
/// Cheap to clone. Statements run through it directly are in autocommit
/// mode; [`Db::begin`] opens a transaction scope.
#[derive(Clone)]
pub struct Db {
    backend: Backend,
    logger: Option<Arc<dyn QueryLogger>>,
}

impl Db {
    /// Wrap an established client.
    ///
    /// A single-client handle runs one transaction at a time. `begin()` and
    /// statements run directly on the handle wait until the active
    /// transaction has committed or rolled back, so running them from the
    /// task that holds an open [`Tx`] blocks forever. Use the `Tx` instead.
    pub fn from_client(client: Client) -> Self {
        Self {
            backend: Backend::Client(SharedClient {
                client: Arc::new(client),
                gate: Arc::new(tokio::sync::Mutex::new(())),
            }),
            logger: None,
        }
    }

    /// Wrap a pool. Pools built with [`create_pool`](crate::pool::create_pool)
    /// roll back any transaction left open on a connection before reusing it;
    /// pools built elsewhere should recycle the same way.
    #[cfg(feature = "pool")]
    pub fn from_pool(pool: deadpool_postgres::Pool) -> Self {
        Self {
            backend: Backend::Pool(pool),
            logger: None,
        }
    }

    /// Connect a single client and drive its connection on the current
    /// tokio runtime.
    pub async fn connect(url: &str) -> XlResult<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| XlError::Connection(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(_e) = connection.await {
                #[cfg(feature = "tracing")]
                tracing::error!(target: "xlsql.db", error = %_e, "postgres connection error");
            }
        });
        Ok(Self::from_client(client))
    }

    /// Open a handle from configuration.
    pub async fn open(config: DbConfig) -> XlResult<Self> {
        let db = match config.pool_max_size {
            #[cfg(feature = "pool")]
            Some(size) => Self::from_pool(crate::pool::create_pool_with_config(&config.url, size)?),
            _ => Self::connect(&config.url).await?,
        };
        Ok(match config.logger {
            Some(logger) => db.with_logger_arc(logger),
            None => db,
        })
    }

    /// Use `logger` for this handle (and its transactions) instead of the
    /// global hook.
    pub fn with_logger(self, logger: impl QueryLogger + 'static) -> Self {
        self.with_logger_arc(Arc::new(logger))
    }

    pub fn with_logger_arc(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Open a transaction. See [`Tx`].
    pub async fn begin(&self) -> XlResult<Tx<Db>> {
        Database::begin(self).await
    }
}

impl Session for Db {
    fn dialect(&self) -> Dialect {
        Dialect::POSTGRES
    }

    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        self.logger.clone().or_else(logger::global)
    }
}

impl Executor for Db {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<u64> {
        match &self.backend {
            Backend::Client(shared) => {
                let _idle = shared.gate.lock().await;
                Executor::execute(shared.client.as_ref(), sql, params).await
            }
            #[cfg(feature = "pool")]
            Backend::Pool(pool) => {
                let client = pool.get().await?;
                Executor::execute(&client, sql, params).await
            }
        }
    }
}

impl Queryer for Db {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<Vec<Row>> {
        match &self.backend {
            Backend::Client(shared) => {
                let _idle = shared.gate.lock().await;
                Queryer::query(shared.client.as_ref(), sql, params).await
            }
            #[cfg(feature = "pool")]
            Backend::Pool(pool) => {
                let client = pool.get().await?;
                Queryer::query(&client, sql, params).await
            }
        }
    }
}

impl Database for Db {
    type Physical = PgTx;

    async fn begin_physical(&self) -> XlResult<PgTx> {
        let (conn, gate) = match &self.backend {
            Backend::Client(shared) => {
                let gate = Arc::clone(&shared.gate).lock_owned().await;
                (PgConn::Shared(Arc::clone(&shared.client)), Some(gate))
            }
            #[cfg(feature = "pool")]
            Backend::Pool(pool) => (PgConn::Pooled(pool.get().await?), None),
        };
        // On failure the gate is dropped here and the connection freed.
        conn.client().batch_execute("BEGIN").await?;
        Ok(PgTx {
            conn: Arc::new(conn),
            gate: Mutex::new(gate),
            runtime: Handle::try_current().ok(),
            logger: self.logger.clone(),
        })
    }
}

enum PgConn {
    Shared(Arc<Client>),
    #[cfg(feature = "pool")]
    Pooled(deadpool_postgres::Object),
}

impl PgConn {
    fn client(&self) -> &Client {
        match self {
            PgConn::Shared(client) => client.as_ref(),
            #[cfg(feature = "pool")]
            PgConn::Pooled(object) => &***object,
        }
    }
}

/// A physical PostgreSQL transaction opened with `BEGIN`.
///
/// For pooled handles the connection stays checked out until the
/// transaction ends. On a single-client handle the connection is reserved
/// until `COMMIT` or `ROLLBACK` has completed.
pub struct PgTx {
    conn: Arc<PgConn>,
    gate: Mutex<Option<OwnedMutexGuard<()>>>,
    /// Runtime the transaction was opened on, for rollback on drop.
    runtime: Option<Handle>,
    logger: Option<Arc<dyn QueryLogger>>,
}

impl PgTx {
    /// Take the connection reservation; dropping it frees the connection.
    fn release(&self) -> Option<OwnedMutexGuard<()>> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    async fn finish(&self, sql: &str) -> XlResult<()> {
        let result = self.conn.client().batch_execute(sql).await;
        drop(self.release());
        Ok(result?)
    }
}

impl Session for PgTx {
    fn dialect(&self) -> Dialect {
        Dialect::POSTGRES
    }

    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        self.logger.clone().or_else(logger::global)
    }
}

impl Executor for PgTx {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<u64> {
        Executor::execute(self.conn.client(), sql, params).await
    }
}

impl Queryer for PgTx {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> XlResult<Vec<Row>> {
        Queryer::query(self.conn.client(), sql, params).await
    }
}

impl PhysicalTx for PgTx {
    async fn commit(&self) -> XlResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(&self) -> XlResult<()> {
        self.finish("ROLLBACK").await
    }

    fn rollback_in_background(&self) {
        let conn = Arc::clone(&self.conn);
        let gate = self.release();
        match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(handle) => {
                handle.spawn(async move {
                    if let Err(_e) = conn.client().batch_execute("ROLLBACK").await {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(target: "xlsql.tx", error = %_e, "background rollback failed");
                    }
                    drop(gate);
                });
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    target: "xlsql.tx",
                    "no tokio runtime available; transaction left open on its connection"
                );
                // Pooled connections are reset by the pool's recycling query.
                drop(gate);
            }
        }
    }
}
