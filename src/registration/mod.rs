//! Driver registration.
//!
//! Turns a driver name such as `"sqlite"` into an instrumented driver
//! registered in the native driver table under `"<prefix>-<name>"`:
//!
//! ```ignore
//! let name = sqlhooks::register("sqlite", hooks)?; // "sqlhooks-sqlite"
//! let db = sqlhooks::sql::open(&name, "sqlite::memory:")?;
//! ```
//!
//! Registering the same name again returns the existing registration.

mod factory;
mod registry;

use std::sync::{Arc, LazyLock};

use tracing::{debug, info};

use crate::hooks::{Hook, System};
use crate::sql::{self, SqlError};

pub use factory::{DriverFactory, SqlxDriverFactory};
pub use registry::DriverRegistry;

/// Prefix of registration names made by the default registrar.
pub const DEFAULT_PREFIX: &str = "sqlhooks";

/// Errors raised while registering a driver.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("unsupported database system for driver {0}")]
    UnsupportedSystem(String),

    #[error("no base driver available for {0}")]
    FactoryUnsupported(System),

    #[error(transparent)]
    Native(#[from] SqlError),
}

/// Registers instrumented drivers with the native driver table.
pub struct Registrar {
    prefix: String,
    registry: DriverRegistry,
    factory: Arc<dyn DriverFactory>,
}

impl Registrar {
    pub fn new(factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            registry: DriverRegistry::new(),
            factory,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Name the instrumented driver for `name` is registered under.
    pub fn registration_name(&self, name: &str) -> String {
        format!("{}-{}", self.prefix, name)
    }

    /// Register an instrumented driver for `name` and return the name it
    /// can be opened under.
    ///
    /// Idempotent: later calls for the same name return the first
    /// registration and ignore `hooks`.
    pub fn register(
        &self,
        name: &str,
        hooks: Vec<Arc<dyn Hook>>,
    ) -> Result<String, RegistrationError> {
        let registered = self.registration_name(name);
        if self.registry.has(&registered) {
            debug!(driver = %name, registered = %registered, "Driver already registered");
            return Ok(registered);
        }

        self.registry.get_or_try_insert(&registered, || {
            let system = System::from_driver_name(name);
            if system == System::Unknown {
                return Err(RegistrationError::UnsupportedSystem(name.to_string()));
            }

            let driver = self.factory.create(system, hooks)?;
            sql::register(&registered, Arc::new(driver.clone()))?;

            info!(
                driver = %name,
                registered = %registered,
                system = %system,
                hooks = driver.configuration().hooks().len(),
                "Registered instrumented driver"
            );
            Ok(driver)
        })?;

        Ok(registered)
    }
}

impl Default for Registrar {
    fn default() -> Self {
        Self::new(Arc::new(SqlxDriverFactory))
    }
}

static DEFAULT_REGISTRAR: LazyLock<Registrar> = LazyLock::new(Registrar::default);

/// The process-wide registrar used by [`register`].
pub fn default_registrar() -> &'static Registrar {
    &DEFAULT_REGISTRAR
}

/// Register an instrumented driver for `name` with the process-wide
/// registrar. See [`Registrar::register`].
pub fn register(name: &str, hooks: Vec<Arc<dyn Hook>>) -> Result<String, RegistrationError> {
    DEFAULT_REGISTRAR.register(name, hooks)
}
