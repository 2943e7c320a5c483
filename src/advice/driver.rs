//! Driver wrapper.

use std::sync::Arc;

use async_trait::async_trait;

use super::{InstrumentedConn, InstrumentedConnector};
use crate::driver::{Conn, Connector, Driver, DriverContext, Result};
use crate::hooks::Configuration;

/// Driver whose connections fire the configured hooks.
///
/// Cheap to clone; clones share the base driver and configuration.
#[derive(Clone)]
pub struct InstrumentedDriver {
    base: Arc<dyn Driver>,
    config: Arc<Configuration>,
}

impl InstrumentedDriver {
    pub fn new(base: Arc<dyn Driver>, config: Arc<Configuration>) -> Self {
        Self { base, config }
    }

    /// The wrapped driver.
    pub fn base(&self) -> &Arc<dyn Driver> {
        &self.base
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.config
    }

    pub(crate) fn wrap(&self, conn: Box<dyn Conn>) -> Box<dyn Conn> {
        Box::new(InstrumentedConn::new(conn, self.config.clone()))
    }
}

#[async_trait]
impl Driver for InstrumentedDriver {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Conn>> {
        let conn = self.base.open(dsn).await?;
        Ok(self.wrap(conn))
    }

    fn as_driver_context(&self) -> Option<&dyn DriverContext> {
        Some(self)
    }
}

impl DriverContext for InstrumentedDriver {
    fn open_connector(&self, dsn: &str) -> Result<Arc<dyn Connector>> {
        let base = self
            .base
            .as_driver_context()
            .map(|driver| driver.open_connector(dsn))
            .transpose()?;

        Ok(Arc::new(InstrumentedConnector::new(
            base,
            dsn,
            self.clone(),
        )))
    }
}

impl std::fmt::Debug for InstrumentedDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedDriver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
