//! Native driver capability set.
//!
//! The mandatory baseline every base driver implements, plus the optional
//! capabilities a driver may or may not offer. Optional capabilities are
//! probed through `as_*` accessors whose default body returns `None`:
//!
//! ```ignore
//! match conn.as_execer_context() {
//!     Some(execer) => execer.exec_context(&ctx, query, &args).await,
//!     None => fallback(),
//! }
//! ```
//!
//! Instrumented wrappers in [`crate::advice`] implement the full set, so
//! they are drop-in replacements for any base driver.

mod error;
mod rows;
mod value;

use std::sync::Arc;

use async_trait::async_trait;
use opentelemetry::Context;

pub use error::{DriverError, Result};
pub use rows::{BufferedRows, ExecSummary};
pub use value::{named_values_to_values, Arguments, IsolationLevel, NamedValue, TxOptions, Value};

// ============================================================================
// Driver / Connector
// ============================================================================

/// Entry point of a database driver.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a new connection using a driver-specific data source name.
    async fn open(&self, dsn: &str) -> Result<Box<dyn Conn>>;

    fn as_driver_context(&self) -> Option<&dyn DriverContext> {
        None
    }
}

/// Driver able to parse a DSN once and hand out a reusable connector.
pub trait DriverContext: Send + Sync {
    fn open_connector(&self, dsn: &str) -> Result<Arc<dyn Connector>>;
}

/// Produces connections for a fixed DSN.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Conn>>;

    /// The driver that owns this connector.
    fn driver(&self) -> Arc<dyn Driver>;
}

// ============================================================================
// Connection
// ============================================================================

/// A single database connection.
#[async_trait]
pub trait Conn: Send + Sync {
    async fn prepare(&self, query: &str) -> Result<Box<dyn Stmt>>;

    async fn close(&self) -> Result<()>;

    async fn begin(&self) -> Result<Box<dyn Tx>>;

    fn as_execer(&self) -> Option<&dyn Execer> {
        None
    }

    fn as_execer_context(&self) -> Option<&dyn ExecerContext> {
        None
    }

    fn as_queryer(&self) -> Option<&dyn Queryer> {
        None
    }

    fn as_queryer_context(&self) -> Option<&dyn QueryerContext> {
        None
    }

    fn as_prepare_context(&self) -> Option<&dyn ConnPrepareContext> {
        None
    }

    fn as_begin_tx(&self) -> Option<&dyn ConnBeginTx> {
        None
    }

    fn as_pinger(&self) -> Option<&dyn Pinger> {
        None
    }

    fn as_session_resetter(&self) -> Option<&dyn SessionResetter> {
        None
    }
}

/// Direct execution without preparing a statement.
#[async_trait]
pub trait Execer: Send + Sync {
    async fn exec(&self, query: &str, args: &[Value]) -> Result<Box<dyn ExecResult>>;
}

#[async_trait]
pub trait ExecerContext: Send + Sync {
    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>>;
}

/// Direct querying without preparing a statement.
#[async_trait]
pub trait Queryer: Send + Sync {
    async fn query(&self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>>;
}

#[async_trait]
pub trait QueryerContext: Send + Sync {
    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>>;
}

#[async_trait]
pub trait ConnPrepareContext: Send + Sync {
    async fn prepare_context(&self, ctx: &Context, query: &str) -> Result<Box<dyn Stmt>>;
}

#[async_trait]
pub trait ConnBeginTx: Send + Sync {
    async fn begin_tx(&self, ctx: &Context, opts: TxOptions) -> Result<Box<dyn Tx>>;
}

#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, ctx: &Context) -> Result<()>;
}

/// Called before a pooled connection is reused.
#[async_trait]
pub trait SessionResetter: Send + Sync {
    async fn reset_session(&self, ctx: &Context) -> Result<()>;
}

// ============================================================================
// Statement
// ============================================================================

/// A prepared statement bound to one connection.
///
/// Not safe to drive from several tasks at once.
#[async_trait]
pub trait Stmt: Send + Sync {
    async fn close(&self) -> Result<()>;

    /// Number of placeholders, `None` when the driver cannot tell.
    fn num_input(&self) -> Option<usize>;

    async fn exec(&self, args: &[Value]) -> Result<Box<dyn ExecResult>>;

    async fn query(&self, args: &[Value]) -> Result<Box<dyn Rows>>;

    fn as_exec_context(&self) -> Option<&dyn StmtExecContext> {
        None
    }

    fn as_query_context(&self) -> Option<&dyn StmtQueryContext> {
        None
    }
}

#[async_trait]
pub trait StmtExecContext: Send + Sync {
    async fn exec_context(&self, ctx: &Context, args: &[NamedValue])
        -> Result<Box<dyn ExecResult>>;
}

#[async_trait]
pub trait StmtQueryContext: Send + Sync {
    async fn query_context(&self, ctx: &Context, args: &[NamedValue]) -> Result<Box<dyn Rows>>;
}

// ============================================================================
// Transaction / results
// ============================================================================

#[async_trait]
pub trait Tx: Send + Sync {
    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;
}

/// Outcome of an exec call. Either figure may be unsupported by a driver.
pub trait ExecResult: Send + Sync {
    fn last_insert_id(&self) -> Result<i64>;

    fn rows_affected(&self) -> Result<i64>;
}

/// Row cursor returned by queries.
#[async_trait]
pub trait Rows: Send {
    fn columns(&self) -> &[String];

    /// Advance to the next row, `None` once exhausted.
    async fn next(&mut self) -> Result<Option<Vec<Value>>>;

    async fn close(&mut self) -> Result<()>;
}
