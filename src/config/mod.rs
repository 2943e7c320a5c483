//! Hook configuration.
//!
//! Selects and tunes the built-in hooks. Loaded from YAML files and
//! environment variables:
//!
//! ```yaml
//! log:
//!   level: debug
//!   log_arguments: true
//!   exclude: ["connection:ping", "connection:reset-session"]
//! trace:
//!   enabled: false
//! ```

mod hooks;

use std::sync::Arc;

use serde::Deserialize;

use crate::hooks::Hook;

pub use self::hooks::{LogHookConfig, TraceHookConfig};
pub use ::config::ConfigError;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "sqlhooks.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "SQLHOOKS_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "SQLHOOKS";
/// Environment variable for logging filter directives.
pub const LOG_ENV_VAR: &str = "SQLHOOKS_LOG";

/// Built-in hook selection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Logging hook.
    pub log: LogHookConfig,
    /// Tracing hook.
    pub trace: TraceHookConfig,
}

impl HooksConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `sqlhooks.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, e.g.
    ///    `SQLHOOKS__LOG__LEVEL=debug`
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// The enabled hooks, tracing first so its span encloses the log record.
    pub fn build_hooks(&self) -> Vec<Arc<dyn Hook>> {
        let mut hooks: Vec<Arc<dyn Hook>> = Vec::new();
        if self.trace.enabled {
            hooks.push(Arc::new(self.trace.build()));
        }
        if self.log.enabled {
            hooks.push(Arc::new(self.log.build()));
        }
        hooks
    }
}
