//! Mock base driver for testing.
//!
//! Every optional capability can be switched off individually, so the
//! fallback paths of the instrumented wrappers can be exercised without a
//! database. Calls are recorded in order.

use std::sync::Arc;

use async_trait::async_trait;
use opentelemetry::Context;
use tokio::sync::RwLock;

use crate::driver::{
    BufferedRows, Conn, ConnBeginTx, ConnPrepareContext, Connector, Driver, DriverContext,
    DriverError, ExecResult, ExecSummary, Execer, ExecerContext, NamedValue, Pinger, Queryer,
    QueryerContext, Result, Rows, SessionResetter, Stmt, StmtExecContext, StmtQueryContext, Tx,
    TxOptions, Value,
};

/// Optional capabilities the mock advertises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub driver_context: bool,
    pub execer: bool,
    pub execer_context: bool,
    pub queryer: bool,
    pub queryer_context: bool,
    pub prepare_context: bool,
    pub begin_tx: bool,
    pub pinger: bool,
    pub session_resetter: bool,
    pub stmt_exec_context: bool,
    pub stmt_query_context: bool,
}

impl Capabilities {
    /// Everything supported.
    pub fn all() -> Self {
        Self {
            driver_context: true,
            execer: true,
            execer_context: true,
            queryer: true,
            queryer_context: true,
            prepare_context: true,
            begin_tx: true,
            pinger: true,
            session_resetter: true,
            stmt_exec_context: true,
            stmt_query_context: true,
        }
    }

    /// Only the pre-context direct exec and query.
    pub fn legacy() -> Self {
        Self {
            execer: true,
            queryer: true,
            ..Self::default()
        }
    }

    /// Mandatory baseline only.
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct MockState {
    capabilities: Capabilities,
    calls: RwLock<Vec<String>>,
    fail_with: RwLock<Option<DriverError>>,
}

impl MockState {
    async fn call(&self, name: &str) -> Result<()> {
        self.calls.write().await.push(name.to_string());
        match &*self.fail_with.read().await {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn exec_result() -> Box<dyn ExecResult> {
    Box::new(ExecSummary::new(Some(1), Some(1)))
}

fn rows() -> Box<dyn Rows> {
    Box::new(BufferedRows::new(
        vec!["bar".to_string()],
        vec![vec![Value::from("test")]],
    ))
}

/// Mock driver handing out in-memory connections.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl MockDriver {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            state: Arc::new(MockState {
                capabilities,
                ..MockState::default()
            }),
        }
    }

    /// Make every subsequent base call fail with `err`.
    pub async fn set_fail_with(&self, err: Option<DriverError>) {
        *self.state.fail_with.write().await = err;
    }

    /// Base calls recorded so far, e.g. `"conn.exec_context"`.
    pub async fn calls(&self) -> Vec<String> {
        self.state.calls.read().await.clone()
    }

    pub async fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut *self.state.calls.write().await)
    }

    fn conn(&self) -> Box<dyn Conn> {
        Box::new(MockConn {
            state: self.state.clone(),
        })
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn open(&self, _dsn: &str) -> Result<Box<dyn Conn>> {
        self.state.call("driver.open").await?;
        Ok(self.conn())
    }

    fn as_driver_context(&self) -> Option<&dyn DriverContext> {
        self.state
            .capabilities
            .driver_context
            .then_some(self as &dyn DriverContext)
    }
}

impl DriverContext for MockDriver {
    fn open_connector(&self, _dsn: &str) -> Result<Arc<dyn Connector>> {
        Ok(Arc::new(MockConnector {
            driver: self.clone(),
        }))
    }
}

struct MockConnector {
    driver: MockDriver,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _ctx: &Context) -> Result<Box<dyn Conn>> {
        self.driver.state.call("connector.connect").await?;
        Ok(self.driver.conn())
    }

    fn driver(&self) -> Arc<dyn Driver> {
        Arc::new(self.driver.clone())
    }
}

struct MockConn {
    state: Arc<MockState>,
}

impl MockConn {
    fn stmt(&self) -> Box<dyn Stmt> {
        Box::new(MockStmt {
            state: self.state.clone(),
        })
    }

    fn tx(&self) -> Box<dyn Tx> {
        Box::new(MockTx {
            state: self.state.clone(),
        })
    }
}

#[async_trait]
impl Conn for MockConn {
    async fn prepare(&self, _query: &str) -> Result<Box<dyn Stmt>> {
        self.state.call("conn.prepare").await?;
        Ok(self.stmt())
    }

    async fn close(&self) -> Result<()> {
        self.state.call("conn.close").await
    }

    async fn begin(&self) -> Result<Box<dyn Tx>> {
        self.state.call("conn.begin").await?;
        Ok(self.tx())
    }

    fn as_execer(&self) -> Option<&dyn Execer> {
        self.state.capabilities.execer.then_some(self as &dyn Execer)
    }

    fn as_execer_context(&self) -> Option<&dyn ExecerContext> {
        self.state
            .capabilities
            .execer_context
            .then_some(self as &dyn ExecerContext)
    }

    fn as_queryer(&self) -> Option<&dyn Queryer> {
        self.state.capabilities.queryer.then_some(self as &dyn Queryer)
    }

    fn as_queryer_context(&self) -> Option<&dyn QueryerContext> {
        self.state
            .capabilities
            .queryer_context
            .then_some(self as &dyn QueryerContext)
    }

    fn as_prepare_context(&self) -> Option<&dyn ConnPrepareContext> {
        self.state
            .capabilities
            .prepare_context
            .then_some(self as &dyn ConnPrepareContext)
    }

    fn as_begin_tx(&self) -> Option<&dyn ConnBeginTx> {
        self.state
            .capabilities
            .begin_tx
            .then_some(self as &dyn ConnBeginTx)
    }

    fn as_pinger(&self) -> Option<&dyn Pinger> {
        self.state.capabilities.pinger.then_some(self as &dyn Pinger)
    }

    fn as_session_resetter(&self) -> Option<&dyn SessionResetter> {
        self.state
            .capabilities
            .session_resetter
            .then_some(self as &dyn SessionResetter)
    }
}

#[async_trait]
impl Execer for MockConn {
    async fn exec(&self, _query: &str, _args: &[Value]) -> Result<Box<dyn ExecResult>> {
        self.state.call("conn.exec").await?;
        Ok(exec_result())
    }
}

#[async_trait]
impl ExecerContext for MockConn {
    async fn exec_context(
        &self,
        _ctx: &Context,
        _query: &str,
        _args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        self.state.call("conn.exec_context").await?;
        Ok(exec_result())
    }
}

#[async_trait]
impl Queryer for MockConn {
    async fn query(&self, _query: &str, _args: &[Value]) -> Result<Box<dyn Rows>> {
        self.state.call("conn.query").await?;
        Ok(rows())
    }
}

#[async_trait]
impl QueryerContext for MockConn {
    async fn query_context(
        &self,
        _ctx: &Context,
        _query: &str,
        _args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        self.state.call("conn.query_context").await?;
        Ok(rows())
    }
}

#[async_trait]
impl ConnPrepareContext for MockConn {
    async fn prepare_context(&self, _ctx: &Context, _query: &str) -> Result<Box<dyn Stmt>> {
        self.state.call("conn.prepare_context").await?;
        Ok(self.stmt())
    }
}

#[async_trait]
impl ConnBeginTx for MockConn {
    async fn begin_tx(&self, _ctx: &Context, _opts: TxOptions) -> Result<Box<dyn Tx>> {
        self.state.call("conn.begin_tx").await?;
        Ok(self.tx())
    }
}

#[async_trait]
impl Pinger for MockConn {
    async fn ping(&self, _ctx: &Context) -> Result<()> {
        self.state.call("conn.ping").await
    }
}

#[async_trait]
impl SessionResetter for MockConn {
    async fn reset_session(&self, _ctx: &Context) -> Result<()> {
        self.state.call("conn.reset_session").await
    }
}

struct MockStmt {
    state: Arc<MockState>,
}

#[async_trait]
impl Stmt for MockStmt {
    async fn close(&self) -> Result<()> {
        self.state.call("stmt.close").await
    }

    fn num_input(&self) -> Option<usize> {
        Some(1)
    }

    async fn exec(&self, _args: &[Value]) -> Result<Box<dyn ExecResult>> {
        self.state.call("stmt.exec").await?;
        Ok(exec_result())
    }

    async fn query(&self, _args: &[Value]) -> Result<Box<dyn Rows>> {
        self.state.call("stmt.query").await?;
        Ok(rows())
    }

    fn as_exec_context(&self) -> Option<&dyn StmtExecContext> {
        self.state
            .capabilities
            .stmt_exec_context
            .then_some(self as &dyn StmtExecContext)
    }

    fn as_query_context(&self) -> Option<&dyn StmtQueryContext> {
        self.state
            .capabilities
            .stmt_query_context
            .then_some(self as &dyn StmtQueryContext)
    }
}

#[async_trait]
impl StmtExecContext for MockStmt {
    async fn exec_context(
        &self,
        _ctx: &Context,
        _args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        self.state.call("stmt.exec_context").await?;
        Ok(exec_result())
    }
}

#[async_trait]
impl StmtQueryContext for MockStmt {
    async fn query_context(&self, _ctx: &Context, _args: &[NamedValue]) -> Result<Box<dyn Rows>> {
        self.state.call("stmt.query_context").await?;
        Ok(rows())
    }
}

struct MockTx {
    state: Arc<MockState>,
}

#[async_trait]
impl Tx for MockTx {
    async fn commit(&self) -> Result<()> {
        self.state.call("tx.commit").await
    }

    async fn rollback(&self) -> Result<()> {
        self.state.call("tx.rollback").await
    }
}
