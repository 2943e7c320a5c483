//! sqlhooks - SQL driver instrumentation
//!
//! A transparent decorator placed between a SQL front-end and a concrete
//! database driver. Every driver-level operation fires configurable
//! [`hooks::Hook`]s before and after it runs, so logging and tracing can
//! observe queries without the caller or the base driver knowing.
//!
//! ```ignore
//! let hooks: Vec<Arc<dyn Hook>> = vec![Arc::new(TraceHook::global()), Arc::new(LogHook::default())];
//! let name = sqlhooks::register("sqlite", hooks)?;
//! let db = sqlhooks::sql::open(&name, "sqlite::memory:")?;
//! let conn = db.conn(&Context::current()).await?;
//! conn.exec(&Context::current(), "CREATE TABLE foo (bar TEXT)", &[]).await?;
//! ```

pub mod advice;
pub mod config;
pub mod driver;
pub mod drivers;
pub mod hooks;
pub mod registration;
pub mod sql;
pub mod utils;

pub use registration::{register, RegistrationError};
