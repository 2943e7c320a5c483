//! Built-in hook configuration types.

use serde::Deserialize;

use crate::hooks::{LogHook, LogLevel, Operation, TraceHook};

/// Logging hook configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogHookConfig {
    /// Install the logging hook.
    pub enabled: bool,
    /// Level for successful operations.
    pub level: LogLevel,
    /// Include call arguments in records.
    pub log_arguments: bool,
    /// Operations never logged, e.g. `connection:ping`.
    pub exclude: Vec<Operation>,
}

impl Default for LogHookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
            log_arguments: false,
            exclude: Vec::new(),
        }
    }
}

impl LogHookConfig {
    pub fn build(&self) -> LogHook {
        LogHook::new(self.level)
            .with_arguments(self.log_arguments)
            .excluding(self.exclude.iter().copied())
    }
}

/// Tracing hook configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TraceHookConfig {
    /// Install the tracing hook.
    pub enabled: bool,
    /// Attach call arguments as `db.arguments`.
    pub log_arguments: bool,
    /// Operations never traced.
    pub exclude: Vec<Operation>,
}

impl Default for TraceHookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_arguments: false,
            exclude: Vec::new(),
        }
    }
}

impl TraceHookConfig {
    /// Build a hook bound to the global tracer provider.
    pub fn build(&self) -> TraceHook {
        TraceHook::global()
            .with_arguments(self.log_arguments)
            .excluding(self.exclude.iter().copied())
    }
}
