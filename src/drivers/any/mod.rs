//! sqlx `Any` base driver.
//!
//! One driver type serves every enabled backend; the DSN scheme picks the
//! sqlx driver (`sqlite:`, `postgres://`, `mysql://`). The [`System`] the
//! driver is created for only labels it.

mod conn;
mod value;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use opentelemetry::Context;
use sqlx::any::AnyConnectOptions;
use sqlx::{AnyConnection, Connection};
use tracing::debug;

use crate::driver::{Conn, Connector, Driver, DriverContext, Result};
use crate::hooks::System;

pub use conn::{SqlxConn, SqlxStmt, SqlxTx};

/// Base driver backed by sqlx.
#[derive(Debug, Clone)]
pub struct SqlxDriver {
    system: System,
}

impl SqlxDriver {
    pub fn new(system: System) -> Self {
        // Idempotent; guarded by a `Once` inside sqlx.
        sqlx::any::install_default_drivers();
        Self { system }
    }

    pub fn system(&self) -> System {
        self.system
    }

    async fn connect_with(&self, options: &AnyConnectOptions) -> Result<Box<dyn Conn>> {
        debug!(system = %self.system, "Opening sqlx connection");
        let conn = AnyConnection::connect_with(options).await?;
        Ok(Box::new(SqlxConn::new(self.system, conn)))
    }
}

#[async_trait]
impl Driver for SqlxDriver {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Conn>> {
        let options = AnyConnectOptions::from_str(dsn)?;
        self.connect_with(&options).await
    }

    fn as_driver_context(&self) -> Option<&dyn DriverContext> {
        Some(self)
    }
}

impl DriverContext for SqlxDriver {
    fn open_connector(&self, dsn: &str) -> Result<Arc<dyn Connector>> {
        let options = AnyConnectOptions::from_str(dsn)?;
        Ok(Arc::new(SqlxConnector {
            driver: self.clone(),
            options,
        }))
    }
}

/// Connector holding DSN options parsed once.
pub struct SqlxConnector {
    driver: SqlxDriver,
    options: AnyConnectOptions,
}

#[async_trait]
impl Connector for SqlxConnector {
    async fn connect(&self, _ctx: &Context) -> Result<Box<dyn Conn>> {
        self.driver.connect_with(&self.options).await
    }

    fn driver(&self) -> Arc<dyn Driver> {
        Arc::new(self.driver.clone())
    }
}
