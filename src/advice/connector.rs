//! Connector wrapper.

use std::sync::Arc;

use async_trait::async_trait;
use opentelemetry::Context;

use super::InstrumentedDriver;
use crate::driver::{Conn, Connector, Driver, Result};

/// Hands out instrumented connections for one DSN.
///
/// Connecting is not an instrumented operation itself; the resulting
/// connection fires hooks for everything done on it.
pub struct InstrumentedConnector {
    base: Option<Arc<dyn Connector>>,
    dsn: String,
    driver: InstrumentedDriver,
}

impl InstrumentedConnector {
    /// `base` is `None` when the base driver cannot create connectors, in
    /// which case every connect goes through [`Driver::open`].
    pub fn new(
        base: Option<Arc<dyn Connector>>,
        dsn: impl Into<String>,
        driver: InstrumentedDriver,
    ) -> Self {
        Self {
            base,
            dsn: dsn.into(),
            driver,
        }
    }

    pub fn base(&self) -> Option<&Arc<dyn Connector>> {
        self.base.as_ref()
    }
}

#[async_trait]
impl Connector for InstrumentedConnector {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Conn>> {
        match &self.base {
            Some(base) => {
                let conn = base.connect(ctx).await?;
                Ok(self.driver.wrap(conn))
            }
            None => self.driver.open(&self.dsn).await,
        }
    }

    fn driver(&self) -> Arc<dyn Driver> {
        Arc::new(self.driver.clone())
    }
}
