//! Base driver implementations.
//!
//! - [`SqlxDriver`]: sqlx `Any` backed driver for SQLite, PostgreSQL and
//!   MySQL (each behind its cargo feature)
//! - [`MockDriver`]: in-memory driver with switchable capabilities

pub mod any;
pub mod mock;

pub use self::any::SqlxDriver;
pub use self::mock::{Capabilities, MockDriver};
