//! Logging hook: one structured `tracing` event per operation.

use std::collections::HashSet;

use opentelemetry::Context;
use serde::Deserialize;
use tracing::field::display;

use super::{Hook, HookEvent, Operation};

/// Severity at which successful operations are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Emits one record per finished operation.
///
/// Fields: `system`, `operation`, `query`, `arguments` (opt-in),
/// `latency_us`, `lastInsertId`, `rowsAffected`, `error`. Operations that
/// failed with a real driver error are logged at `ERROR` regardless of
/// the configured level.
#[derive(Debug, Clone, Default)]
pub struct LogHook {
    level: LogLevel,
    log_arguments: bool,
    excluded: HashSet<Operation>,
}

macro_rules! emit {
    ($level:expr, $($fields:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($fields)+),
            LogLevel::Debug => tracing::debug!($($fields)+),
            LogLevel::Info => tracing::info!($($fields)+),
            LogLevel::Warn => tracing::warn!($($fields)+),
            LogLevel::Error => tracing::error!($($fields)+),
        }
    };
}

impl LogHook {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Include call arguments in the record. Off by default since
    /// arguments may carry sensitive data.
    pub fn with_arguments(mut self, enabled: bool) -> Self {
        self.log_arguments = enabled;
        self
    }

    /// Never log the given operations.
    pub fn excluding(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.excluded.extend(operations);
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn is_excluded(&self, operation: Operation) -> bool {
        self.excluded.contains(&operation)
    }
}

impl Hook for LogHook {
    fn before(&self, ctx: Context, _event: &HookEvent) -> Context {
        ctx
    }

    fn after(&self, _ctx: &Context, event: &HookEvent) {
        if self.is_excluded(event.operation()) {
            return;
        }

        let arguments = self.log_arguments.then(|| event.args().to_string());
        let arguments = arguments.as_deref();
        let latency_us = event.latency().ok().map(|d| d.as_micros() as u64);
        let error = event.error().filter(|e| !e.is_skip());
        let level = if error.is_some() {
            LogLevel::Error
        } else {
            self.level
        };

        emit!(
            level,
            system = %event.system(),
            operation = %event.operation(),
            query = event.query(),
            arguments,
            latency_us,
            lastInsertId = event.last_insert_id(),
            rowsAffected = event.rows_affected(),
            error = error.map(display),
            "sql operation"
        );
    }
}
