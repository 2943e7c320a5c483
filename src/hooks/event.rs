//! Per-call event record handed to hooks.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::{Operation, System};
use crate::driver::{Arguments, DriverError};

/// Errors reading derived figures from an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("event was not started")]
    NotStarted,

    #[error("event was not stopped")]
    NotStopped,
}

/// One intercepted driver call.
///
/// Created by a wrapper for every call, filled in as the call progresses,
/// and passed by shared reference to each hook.
#[derive(Debug, Clone)]
pub struct HookEvent {
    system: System,
    operation: Operation,
    query: String,
    args: Arguments,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    /// Monotonic marks behind `latency`; wall-clock steps do not affect them.
    started: Option<Instant>,
    stopped: Option<Instant>,
    last_insert_id: Option<i64>,
    rows_affected: Option<i64>,
    error: Option<DriverError>,
}

impl HookEvent {
    pub fn new(system: System, operation: Operation) -> Self {
        Self {
            system,
            operation,
            query: String::new(),
            args: Arguments::None,
            started_at: None,
            stopped_at: None,
            started: None,
            stopped: None,
            last_insert_id: None,
            rows_affected: None,
            error: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_args(mut self, args: Arguments) -> Self {
        self.args = args;
        self
    }

    pub fn system(&self) -> System {
        self.system
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Query text, empty when the operation has none.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn args(&self) -> &Arguments {
        &self.args
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stopped_at
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    pub fn rows_affected(&self) -> Option<i64> {
        self.rows_affected
    }

    pub fn error(&self) -> Option<&DriverError> {
        self.error.as_ref()
    }

    /// Mark the base call as started.
    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
        self.started = Some(Instant::now());
    }

    /// Mark the base call as finished.
    pub fn stop(&mut self) {
        self.stopped_at = Some(Utc::now());
        self.stopped = Some(Instant::now());
    }

    /// Time spent in the base call.
    pub fn latency(&self) -> Result<Duration, EventError> {
        let started = self.started.ok_or(EventError::NotStarted)?;
        let stopped = self.stopped.ok_or(EventError::NotStopped)?;
        // A stop recorded before the start does not close this call.
        stopped
            .checked_duration_since(started)
            .ok_or(EventError::NotStopped)
    }

    pub fn set_error(&mut self, error: DriverError) {
        self.error = Some(error);
    }

    pub fn set_last_insert_id(&mut self, id: i64) {
        self.last_insert_id = Some(id);
    }

    pub fn set_rows_affected(&mut self, rows: i64) {
        self.rows_affected = Some(rows);
    }
}
