//! Connection wrapper.

use std::sync::Arc;

use async_trait::async_trait;
use opentelemetry::Context;

use super::{observe, InstrumentedStmt, InstrumentedTx};
use crate::driver::{
    named_values_to_values, Arguments, Conn, ConnBeginTx, ConnPrepareContext, DriverError,
    ExecResult, Execer, ExecerContext, NamedValue, Pinger, Queryer, QueryerContext, Result, Rows,
    SessionResetter, Stmt, Tx, TxOptions, Value,
};
use crate::hooks::{Configuration, HookEvent, Operation};

/// Connection that fires hooks around every operation.
///
/// Context-aware calls on a base that lacks the matching capability fall
/// back to the legacy form and are reported under the legacy operation,
/// so each logical call yields exactly one event.
pub struct InstrumentedConn {
    base: Box<dyn Conn>,
    config: Arc<Configuration>,
}

impl InstrumentedConn {
    pub fn new(base: Box<dyn Conn>, config: Arc<Configuration>) -> Self {
        Self { base, config }
    }

    /// The wrapped connection.
    pub fn base(&self) -> &dyn Conn {
        self.base.as_ref()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    fn event(&self, operation: Operation) -> HookEvent {
        self.config.event(operation)
    }

    async fn exec_legacy(
        &self,
        ctx: Context,
        query: &str,
        args: &[Value],
    ) -> Result<Box<dyn ExecResult>> {
        let Some(execer) = self.base.as_execer() else {
            return Err(DriverError::Skip);
        };

        let event = self
            .event(Operation::ConnExec)
            .with_query(query)
            .with_args(Arguments::Values(args.to_vec()));
        let (_, result) = observe(&self.config, ctx, event, |_| execer.exec(query, args)).await;
        result
    }

    async fn query_legacy(
        &self,
        ctx: Context,
        query: &str,
        args: &[Value],
    ) -> Result<Box<dyn Rows>> {
        let Some(queryer) = self.base.as_queryer() else {
            return Err(DriverError::Skip);
        };

        let event = self
            .event(Operation::ConnQuery)
            .with_query(query)
            .with_args(Arguments::Values(args.to_vec()));
        let (_, result) = observe(&self.config, ctx, event, |_| queryer.query(query, args)).await;
        result
    }

    async fn prepare_legacy(&self, ctx: Context, query: &str) -> Result<Box<dyn Stmt>> {
        let event = self.event(Operation::ConnPrepare).with_query(query);
        let (ctx, result) = observe(&self.config, ctx, event, |_| self.base.prepare(query)).await;
        result.map(|stmt| self.wrap_stmt(stmt, ctx, query))
    }

    async fn begin_legacy(&self, ctx: Context) -> Result<Box<dyn Tx>> {
        let event = self.event(Operation::ConnBegin);
        let (ctx, result) = observe(&self.config, ctx, event, |_| self.base.begin()).await;
        result.map(|tx| self.wrap_tx(tx, ctx))
    }

    fn wrap_stmt(&self, base: Box<dyn Stmt>, ctx: Context, query: &str) -> Box<dyn Stmt> {
        Box::new(InstrumentedStmt::new(base, self.config.clone(), ctx, query))
    }

    fn wrap_tx(&self, base: Box<dyn Tx>, ctx: Context) -> Box<dyn Tx> {
        Box::new(InstrumentedTx::new(base, self.config.clone(), ctx))
    }
}

#[async_trait]
impl Conn for InstrumentedConn {
    async fn prepare(&self, query: &str) -> Result<Box<dyn Stmt>> {
        self.prepare_legacy(Context::current(), query).await
    }

    async fn close(&self) -> Result<()> {
        let event = self.event(Operation::ConnClose);
        let (_, result) =
            observe(&self.config, Context::current(), event, |_| self.base.close()).await;
        result
    }

    async fn begin(&self) -> Result<Box<dyn Tx>> {
        self.begin_legacy(Context::current()).await
    }

    fn as_execer(&self) -> Option<&dyn Execer> {
        Some(self)
    }

    fn as_execer_context(&self) -> Option<&dyn ExecerContext> {
        Some(self)
    }

    fn as_queryer(&self) -> Option<&dyn Queryer> {
        Some(self)
    }

    fn as_queryer_context(&self) -> Option<&dyn QueryerContext> {
        Some(self)
    }

    fn as_prepare_context(&self) -> Option<&dyn ConnPrepareContext> {
        Some(self)
    }

    fn as_begin_tx(&self) -> Option<&dyn ConnBeginTx> {
        Some(self)
    }

    fn as_pinger(&self) -> Option<&dyn Pinger> {
        Some(self)
    }

    fn as_session_resetter(&self) -> Option<&dyn SessionResetter> {
        Some(self)
    }
}

#[async_trait]
impl Execer for InstrumentedConn {
    async fn exec(&self, query: &str, args: &[Value]) -> Result<Box<dyn ExecResult>> {
        self.exec_legacy(Context::current(), query, args).await
    }
}

#[async_trait]
impl ExecerContext for InstrumentedConn {
    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        let Some(execer) = self.base.as_execer_context() else {
            let values = named_values_to_values(args)?;
            return self.exec_legacy(ctx.clone(), query, &values).await;
        };

        let event = self
            .event(Operation::ConnExecContext)
            .with_query(query)
            .with_args(Arguments::Named(args.to_vec()));
        let (_, result) = observe(&self.config, ctx.clone(), event, |ctx| async move {
            execer.exec_context(&ctx, query, args).await
        })
        .await;
        result
    }
}

#[async_trait]
impl Queryer for InstrumentedConn {
    async fn query(&self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>> {
        self.query_legacy(Context::current(), query, args).await
    }
}

#[async_trait]
impl QueryerContext for InstrumentedConn {
    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        let Some(queryer) = self.base.as_queryer_context() else {
            let values = named_values_to_values(args)?;
            return self.query_legacy(ctx.clone(), query, &values).await;
        };

        let event = self
            .event(Operation::ConnQueryContext)
            .with_query(query)
            .with_args(Arguments::Named(args.to_vec()));
        let (_, result) = observe(&self.config, ctx.clone(), event, |ctx| async move {
            queryer.query_context(&ctx, query, args).await
        })
        .await;
        result
    }
}

#[async_trait]
impl ConnPrepareContext for InstrumentedConn {
    async fn prepare_context(&self, ctx: &Context, query: &str) -> Result<Box<dyn Stmt>> {
        let Some(preparer) = self.base.as_prepare_context() else {
            return self.prepare_legacy(ctx.clone(), query).await;
        };

        let event = self.event(Operation::ConnPrepareContext).with_query(query);
        let (ctx, result) = observe(&self.config, ctx.clone(), event, |ctx| async move {
            preparer.prepare_context(&ctx, query).await
        })
        .await;
        result.map(|stmt| self.wrap_stmt(stmt, ctx, query))
    }
}

#[async_trait]
impl ConnBeginTx for InstrumentedConn {
    async fn begin_tx(&self, ctx: &Context, opts: TxOptions) -> Result<Box<dyn Tx>> {
        let Some(beginner) = self.base.as_begin_tx() else {
            opts.ensure_legacy_compatible()?;
            return self.begin_legacy(ctx.clone()).await;
        };

        let event = self.event(Operation::ConnBeginTx);
        let (ctx, result) = observe(&self.config, ctx.clone(), event, |ctx| async move {
            beginner.begin_tx(&ctx, opts).await
        })
        .await;
        result.map(|tx| self.wrap_tx(tx, ctx))
    }
}

#[async_trait]
impl Pinger for InstrumentedConn {
    async fn ping(&self, ctx: &Context) -> Result<()> {
        // Without a pinger there is nothing to check.
        let Some(pinger) = self.base.as_pinger() else {
            return Ok(());
        };

        let event = self.event(Operation::ConnPing);
        let (_, result) = observe(&self.config, ctx.clone(), event, |ctx| async move {
            pinger.ping(&ctx).await
        })
        .await;
        result
    }
}

#[async_trait]
impl SessionResetter for InstrumentedConn {
    async fn reset_session(&self, ctx: &Context) -> Result<()> {
        let Some(resetter) = self.base.as_session_resetter() else {
            return Ok(());
        };

        let event = self.event(Operation::ConnResetSession);
        let (_, result) = observe(&self.config, ctx.clone(), event, |ctx| async move {
            resetter.reset_session(&ctx).await
        })
        .await;
        result
    }
}
