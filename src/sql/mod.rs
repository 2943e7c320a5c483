//! Process-wide native driver table and a thin SQL front-end.
//!
//! Drivers are registered by name once per process and looked up by
//! [`open`]. The front-end types drive a connection the way a generic SQL
//! layer would: context-aware capabilities first, then the legacy ones,
//! and on [`DriverError::Skip`] a prepare-then-execute round trip.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use opentelemetry::Context;
use tracing::{debug, warn};

use crate::driver::{
    Conn, Connector, Driver, DriverError, ExecResult, NamedValue, Rows, Stmt, Tx, TxOptions, Value,
};

/// Errors from the native driver table and the front-end.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SqlError {
    #[error("sql: register called twice for driver {0}")]
    DuplicateDriver(String),

    #[error("sql: unknown driver {0:?} (forgotten registration?)")]
    UnknownDriver(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

pub type Result<T> = std::result::Result<T, SqlError>;

static DRIVERS: LazyLock<RwLock<HashMap<String, Arc<dyn Driver>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Make a driver available under `name`.
pub fn register(name: &str, driver: Arc<dyn Driver>) -> Result<()> {
    let mut drivers = DRIVERS.write().unwrap_or_else(PoisonError::into_inner);
    if drivers.contains_key(name) {
        return Err(SqlError::DuplicateDriver(name.to_string()));
    }
    debug!(driver = %name, "Registered native driver");
    drivers.insert(name.to_string(), driver);
    Ok(())
}

/// Sorted names of the registered drivers.
pub fn drivers() -> Vec<String> {
    let drivers = DRIVERS.read().unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<String> = drivers.keys().cloned().collect();
    names.sort();
    names
}

fn lookup(name: &str) -> Result<Arc<dyn Driver>> {
    DRIVERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
        .ok_or_else(|| SqlError::UnknownDriver(name.to_string()))
}

/// Resolve a registered driver and prepare to connect to `dsn`.
///
/// No connection is made yet. Drivers offering a connector parse the DSN
/// here, so a malformed DSN fails early.
pub fn open(name: &str, dsn: &str) -> Result<Db> {
    let driver = lookup(name)?;
    let connector = driver
        .as_driver_context()
        .map(|driver| driver.open_connector(dsn))
        .transpose()?;

    Ok(Db {
        driver,
        connector,
        dsn: dsn.to_string(),
    })
}

/// Handle to a database reachable through one driver and DSN.
pub struct Db {
    driver: Arc<dyn Driver>,
    connector: Option<Arc<dyn Connector>>,
    dsn: String,
}

impl Db {
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Open a fresh connection.
    pub async fn conn(&self, ctx: &Context) -> Result<Connection> {
        let conn = match &self.connector {
            Some(connector) => connector.connect(ctx).await?,
            None => self.driver.open(&self.dsn).await?,
        };
        Ok(Connection { conn })
    }
}

/// A single connection driven through the driver capabilities.
pub struct Connection {
    conn: Box<dyn Conn>,
}

impl Connection {
    /// The driver connection underneath.
    pub fn raw(&self) -> &dyn Conn {
        self.conn.as_ref()
    }

    pub async fn exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<Box<dyn ExecResult>> {
        let named = NamedValue::from_values(args);

        let direct = if let Some(execer) = self.conn.as_execer_context() {
            execer.exec_context(ctx, query, &named).await
        } else if let Some(execer) = self.conn.as_execer() {
            execer.exec(query, args).await
        } else {
            Err(DriverError::Skip)
        };
        match direct {
            Err(DriverError::Skip) => {}
            other => return Ok(other?),
        }

        let stmt = self.prepare(ctx, query).await?;
        let result = stmt.exec(ctx, args).await;
        stmt.close_quietly().await;
        result
    }

    pub async fn query(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<Box<dyn Rows>> {
        let named = NamedValue::from_values(args);

        let direct = if let Some(queryer) = self.conn.as_queryer_context() {
            queryer.query_context(ctx, query, &named).await
        } else if let Some(queryer) = self.conn.as_queryer() {
            queryer.query(query, args).await
        } else {
            Err(DriverError::Skip)
        };
        match direct {
            Err(DriverError::Skip) => {}
            other => return Ok(other?),
        }

        let stmt = self.prepare(ctx, query).await?;
        let result = stmt.query(ctx, args).await;
        stmt.close_quietly().await;
        result
    }

    pub async fn prepare(&self, ctx: &Context, query: &str) -> Result<Statement> {
        let stmt = match self.conn.as_prepare_context() {
            Some(preparer) => preparer.prepare_context(ctx, query).await?,
            None => self.conn.prepare(query).await?,
        };
        Ok(Statement { stmt })
    }

    pub async fn begin(&self, ctx: &Context, opts: TxOptions) -> Result<Transaction> {
        let tx = match self.conn.as_begin_tx() {
            Some(beginner) => beginner.begin_tx(ctx, opts).await?,
            None => {
                opts.ensure_legacy_compatible()?;
                self.conn.begin().await?
            }
        };
        Ok(Transaction { tx })
    }

    /// Check the connection is alive. Drivers without a pinger are assumed
    /// healthy.
    pub async fn ping(&self, ctx: &Context) -> Result<()> {
        if let Some(pinger) = self.conn.as_pinger() {
            pinger.ping(ctx).await?;
        }
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        Ok(self.conn.close().await?)
    }
}

/// Prepared statement handle.
pub struct Statement {
    stmt: Box<dyn Stmt>,
}

impl Statement {
    pub fn raw(&self) -> &dyn Stmt {
        self.stmt.as_ref()
    }

    pub fn num_input(&self) -> Option<usize> {
        self.stmt.num_input()
    }

    pub async fn exec(&self, ctx: &Context, args: &[Value]) -> Result<Box<dyn ExecResult>> {
        let result = match self.stmt.as_exec_context() {
            Some(execer) => {
                execer
                    .exec_context(ctx, &NamedValue::from_values(args))
                    .await
            }
            None => self.stmt.exec(args).await,
        };
        Ok(result?)
    }

    pub async fn query(&self, ctx: &Context, args: &[Value]) -> Result<Box<dyn Rows>> {
        let result = match self.stmt.as_query_context() {
            Some(queryer) => {
                queryer
                    .query_context(ctx, &NamedValue::from_values(args))
                    .await
            }
            None => self.stmt.query(args).await,
        };
        Ok(result?)
    }

    pub async fn close(&self) -> Result<()> {
        Ok(self.stmt.close().await?)
    }

    async fn close_quietly(&self) {
        if let Err(e) = self.stmt.close().await {
            warn!(error = %e, "Failed to close statement");
        }
    }
}

/// Open transaction handle.
pub struct Transaction {
    tx: Box<dyn Tx>,
}

impl Transaction {
    pub async fn commit(&self) -> Result<()> {
        Ok(self.tx.commit().await?)
    }

    pub async fn rollback(&self) -> Result<()> {
        Ok(self.tx.rollback().await?)
    }
}
