//! Prepared statement wrapper.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use opentelemetry::Context;

use super::observe;
use crate::driver::{
    named_values_to_values, Arguments, ExecResult, NamedValue, Result, Rows, Stmt,
    StmtExecContext, StmtQueryContext, Value,
};
use crate::hooks::{Configuration, Operation};

/// Prepared statement that fires hooks around exec and query.
///
/// Carries the context produced by the last `before` pass; legacy calls
/// run under it. Like the statements it wraps, it must not be driven from
/// several tasks at once.
pub struct InstrumentedStmt {
    base: Box<dyn Stmt>,
    config: Arc<Configuration>,
    query: String,
    ctx: Mutex<Context>,
}

impl InstrumentedStmt {
    pub fn new(
        base: Box<dyn Stmt>,
        config: Arc<Configuration>,
        ctx: Context,
        query: impl Into<String>,
    ) -> Self {
        Self {
            base,
            config,
            query: query.into(),
            ctx: Mutex::new(ctx),
        }
    }

    pub fn base(&self) -> &dyn Stmt {
        self.base.as_ref()
    }

    /// Query text the statement was prepared from.
    pub fn query_text(&self) -> &str {
        &self.query
    }

    /// Context the next legacy call will run under.
    pub fn context(&self) -> Context {
        self.ctx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_context(&self, ctx: Context) {
        *self.ctx.lock().unwrap_or_else(PoisonError::into_inner) = ctx;
    }

    async fn exec_legacy(&self, ctx: Context, args: &[Value]) -> Result<Box<dyn ExecResult>> {
        let event = self
            .config
            .event(Operation::StmtExec)
            .with_query(self.query.as_str())
            .with_args(Arguments::Values(args.to_vec()));
        let (ctx, result) = observe(&self.config, ctx, event, |_| self.base.exec(args)).await;
        self.set_context(ctx);
        result
    }

    async fn query_legacy(&self, ctx: Context, args: &[Value]) -> Result<Box<dyn Rows>> {
        let event = self
            .config
            .event(Operation::StmtQuery)
            .with_query(self.query.as_str())
            .with_args(Arguments::Values(args.to_vec()));
        let (ctx, result) = observe(&self.config, ctx, event, |_| self.base.query(args)).await;
        self.set_context(ctx);
        result
    }
}

#[async_trait]
impl Stmt for InstrumentedStmt {
    async fn close(&self) -> Result<()> {
        self.base.close().await
    }

    fn num_input(&self) -> Option<usize> {
        self.base.num_input()
    }

    async fn exec(&self, args: &[Value]) -> Result<Box<dyn ExecResult>> {
        self.exec_legacy(self.context(), args).await
    }

    async fn query(&self, args: &[Value]) -> Result<Box<dyn Rows>> {
        self.query_legacy(self.context(), args).await
    }

    fn as_exec_context(&self) -> Option<&dyn StmtExecContext> {
        Some(self)
    }

    fn as_query_context(&self) -> Option<&dyn StmtQueryContext> {
        Some(self)
    }
}

#[async_trait]
impl StmtExecContext for InstrumentedStmt {
    async fn exec_context(
        &self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        let Some(execer) = self.base.as_exec_context() else {
            let values = named_values_to_values(args)?;
            return self.exec_legacy(ctx.clone(), &values).await;
        };

        let event = self
            .config
            .event(Operation::StmtExecContext)
            .with_query(self.query.as_str())
            .with_args(Arguments::Named(args.to_vec()));
        let (ctx, result) = observe(&self.config, ctx.clone(), event, |ctx| async move {
            execer.exec_context(&ctx, args).await
        })
        .await;
        self.set_context(ctx);
        result
    }
}

#[async_trait]
impl StmtQueryContext for InstrumentedStmt {
    async fn query_context(&self, ctx: &Context, args: &[NamedValue]) -> Result<Box<dyn Rows>> {
        let Some(queryer) = self.base.as_query_context() else {
            let values = named_values_to_values(args)?;
            return self.query_legacy(ctx.clone(), &values).await;
        };

        let event = self
            .config
            .event(Operation::StmtQueryContext)
            .with_query(self.query.as_str())
            .with_args(Arguments::Named(args.to_vec()));
        let (ctx, result) = observe(&self.config, ctx.clone(), event, |ctx| async move {
            queryer.query_context(&ctx, args).await
        })
        .await;
        self.set_context(ctx);
        result
    }
}
