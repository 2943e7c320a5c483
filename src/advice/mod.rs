//! Instrumentation advice for database drivers.
//!
//! Wrapper types that fire the configured hooks around every driver
//! operation without touching the base driver or the caller:
//!
//! ```ignore
//! // Base driver - pure database access
//! let base = Arc::new(SqlxDriver::new(System::Sqlite));
//!
//! // Apply instrumentation
//! let driver = InstrumentedDriver::new(base, Arc::new(Configuration::new(System::Sqlite, hooks)));
//!
//! // Use as normal - hooks are transparent
//! let conn = driver.open("sqlite::memory:").await?;
//! ```
//!
//! Each wrapper owns exactly one base object and shares the
//! [`Configuration`]. Results and errors are returned unchanged; the
//! wrappers only observe.

mod conn;
mod connector;
mod driver;
mod stmt;
mod tx;

#[cfg(test)]
mod tests;

use std::future::Future;

use opentelemetry::Context;

use crate::driver::{ExecResult, Result, Rows, Stmt, Tx};
use crate::hooks::{Configuration, HookEvent};

pub use conn::InstrumentedConn;
pub use connector::InstrumentedConnector;
pub use driver::InstrumentedDriver;
pub use stmt::InstrumentedStmt;
pub use tx::InstrumentedTx;

/// Figures a successful base call contributes to its event.
pub(crate) trait Outcome {
    fn record(&self, _event: &mut HookEvent) {}
}

impl Outcome for () {}

impl Outcome for Box<dyn Rows> {}

impl Outcome for Box<dyn Stmt> {}

impl Outcome for Box<dyn Tx> {}

impl Outcome for Box<dyn ExecResult> {
    fn record(&self, event: &mut HookEvent) {
        // Either figure may be unsupported by the driver.
        if let Ok(id) = self.last_insert_id() {
            event.set_last_insert_id(id);
        }
        if let Ok(rows) = self.rows_affected() {
            event.set_rows_affected(rows);
        }
    }
}

/// Run one base call between the configured hooks.
///
/// `before` hooks run first and may replace the context, the event is
/// timed around `call`, the outcome is recorded, then `after` hooks run.
/// Returns the context produced by `before` alongside the untouched
/// result of `call`.
pub(crate) async fn observe<T, F, Fut>(
    config: &Configuration,
    ctx: Context,
    mut event: HookEvent,
    call: F,
) -> (Context, Result<T>)
where
    T: Outcome,
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let ctx = config.before(ctx, &event);

    event.start();
    let result = call(ctx.clone()).await;
    event.stop();

    match &result {
        Ok(outcome) => outcome.record(&mut event),
        Err(err) => event.set_error(err.clone()),
    }

    config.after(&ctx, &event);
    (ctx, result)
}
