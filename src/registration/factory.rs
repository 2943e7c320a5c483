//! Base driver selection per database system.

use std::sync::Arc;

use super::RegistrationError;
use crate::advice::InstrumentedDriver;
use crate::driver::Driver;
use crate::hooks::{Configuration, Hook, System};

/// Creates an instrumented driver for a database system.
pub trait DriverFactory: Send + Sync {
    fn create(
        &self,
        system: System,
        hooks: Vec<Arc<dyn Hook>>,
    ) -> Result<InstrumentedDriver, RegistrationError>;
}

/// Wraps the sqlx-backed driver of each system enabled at build time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxDriverFactory;

impl SqlxDriverFactory {
    fn base(system: System) -> Option<Arc<dyn Driver>> {
        match system {
            #[cfg(feature = "sqlite")]
            System::Sqlite => Some(Arc::new(crate::drivers::SqlxDriver::new(system))),
            #[cfg(feature = "postgres")]
            System::Postgres => Some(Arc::new(crate::drivers::SqlxDriver::new(system))),
            #[cfg(feature = "mysql")]
            System::MySql => Some(Arc::new(crate::drivers::SqlxDriver::new(system))),
            _ => None,
        }
    }
}

impl DriverFactory for SqlxDriverFactory {
    fn create(
        &self,
        system: System,
        hooks: Vec<Arc<dyn Hook>>,
    ) -> Result<InstrumentedDriver, RegistrationError> {
        let base = Self::base(system).ok_or(RegistrationError::FactoryUnsupported(system))?;
        Ok(InstrumentedDriver::new(
            base,
            Arc::new(Configuration::new(system, hooks)),
        ))
    }
}
