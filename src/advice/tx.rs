//! Transaction wrapper.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use opentelemetry::Context;

use super::observe;
use crate::driver::{Result, Tx};
use crate::hooks::{Configuration, Operation};

/// Transaction that fires one event per commit or rollback.
///
/// Runs under the context captured when the transaction began.
pub struct InstrumentedTx {
    base: Box<dyn Tx>,
    config: Arc<Configuration>,
    ctx: Mutex<Context>,
}

impl InstrumentedTx {
    pub fn new(base: Box<dyn Tx>, config: Arc<Configuration>, ctx: Context) -> Self {
        Self {
            base,
            config,
            ctx: Mutex::new(ctx),
        }
    }

    pub fn base(&self) -> &dyn Tx {
        self.base.as_ref()
    }

    pub fn context(&self) -> Context {
        self.ctx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn finish(&self, operation: Operation) -> Result<()> {
        let event = self.config.event(operation);
        let (ctx, result) = observe(&self.config, self.context(), event, |_| match operation {
            Operation::TxRollback => self.base.rollback(),
            _ => self.base.commit(),
        })
        .await;
        *self.ctx.lock().unwrap_or_else(PoisonError::into_inner) = ctx;
        result
    }
}

#[async_trait]
impl Tx for InstrumentedTx {
    async fn commit(&self) -> Result<()> {
        self.finish(Operation::TxCommit).await
    }

    async fn rollback(&self) -> Result<()> {
        self.finish(Operation::TxRollback).await
    }
}
