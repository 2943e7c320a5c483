//! Instrumented drivers registered by this process.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::advice::InstrumentedDriver;

/// Thread-safe map of registration name to instrumented driver.
///
/// Adding a name twice keeps the first driver.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, InstrumentedDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: &str, driver: InstrumentedDriver) {
        self.drivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert(driver);
    }

    pub fn has(&self, name: &str) -> bool {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<InstrumentedDriver> {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the driver under `name`, creating it with `create` if absent.
    ///
    /// The write lock is held while `create` runs, so concurrent callers for
    /// the same name run it at most once. `create` must not touch this
    /// registry.
    pub fn get_or_try_insert<E>(
        &self,
        name: &str,
        create: impl FnOnce() -> Result<InstrumentedDriver, E>,
    ) -> Result<InstrumentedDriver, E> {
        let mut drivers = self.drivers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(driver) = drivers.get(name) {
            return Ok(driver.clone());
        }

        let driver = create()?;
        drivers.insert(name.to_string(), driver.clone());
        Ok(driver)
    }
}
