//! Observability hooks fired around every driver operation.
//!
//! A [`Hook`] sees each intercepted call twice: [`Hook::before`] runs
//! before the base driver is invoked and may enrich the context (for
//! example by starting a span), [`Hook::after`] runs once the call
//! returned and the [`HookEvent`] holds its outcome.
//!
//! Hooks compose in configured order for both phases. `after` is not
//! reversed, so a hook whose span must enclose another hook's work has to
//! be listed first.

mod event;
mod log;
mod operation;
mod system;
mod trace;

use std::sync::Arc;

use opentelemetry::Context;

pub use event::{EventError, HookEvent};
pub use log::{LogHook, LogLevel};
pub use operation::Operation;
pub use system::System;
pub use trace::TraceHook;

/// Observability extension point.
///
/// Hooks receive events read-only and are expected not to fail; errors
/// inside a hook are the hook's own concern.
pub trait Hook: Send + Sync {
    /// Runs before the base call. Returns the context used downstream.
    fn before(&self, ctx: Context, event: &HookEvent) -> Context;

    /// Runs after the base call with the context returned by `before`.
    fn after(&self, ctx: &Context, event: &HookEvent);
}

/// Binds a database system to an ordered list of hooks.
///
/// Shared read-only by every wrapper created under one instrumented driver.
#[derive(Clone, Default)]
pub struct Configuration {
    system: System,
    hooks: Vec<Arc<dyn Hook>>,
}

impl Configuration {
    pub fn new(system: System, hooks: Vec<Arc<dyn Hook>>) -> Self {
        Self { system, hooks }
    }

    pub fn system(&self) -> System {
        self.system
    }

    pub fn hooks(&self) -> &[Arc<dyn Hook>] {
        &self.hooks
    }

    /// Start an event for this configuration's system.
    pub fn event(&self, operation: Operation) -> HookEvent {
        HookEvent::new(self.system, operation)
    }

    /// Apply `before` of every hook in order, threading the context.
    pub fn before(&self, ctx: Context, event: &HookEvent) -> Context {
        self.hooks
            .iter()
            .fold(ctx, |ctx, hook| hook.before(ctx, event))
    }

    /// Apply `after` of every hook in configured order.
    pub fn after(&self, ctx: &Context, event: &HookEvent) {
        for hook in &self.hooks {
            hook.after(ctx, event);
        }
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("system", &self.system)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Marker(&'static str);

    struct OrderHook {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Hook for OrderHook {
        fn before(&self, ctx: Context, _event: &HookEvent) -> Context {
            self.log.lock().unwrap().push(format!("before:{}", self.name));
            ctx.with_value(Marker(self.name))
        }

        fn after(&self, ctx: &Context, _event: &HookEvent) {
            let seen = ctx.get::<Marker>().map(|m| m.0).unwrap_or("none");
            self.log
                .lock()
                .unwrap()
                .push(format!("after:{}:{}", self.name, seen));
        }
    }

    #[test]
    fn test_before_and_after_run_in_configured_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks: Vec<Arc<dyn Hook>> = vec![
            Arc::new(OrderHook {
                name: "first",
                log: log.clone(),
            }),
            Arc::new(OrderHook {
                name: "second",
                log: log.clone(),
            }),
        ];
        let config = Configuration::new(System::Sqlite, hooks);
        let event = config.event(Operation::ConnPing);

        let ctx = config.before(Context::new(), &event);
        config.after(&ctx, &event);

        // Context values are overwritten by the last hook, and after() is
        // not reversed.
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "before:first",
                "before:second",
                "after:first:second",
                "after:second:second",
            ]
        );
    }

    #[test]
    fn test_no_hooks_passes_context_through() {
        let config = Configuration::new(System::Unknown, vec![]);
        let event = config.event(Operation::ConnClose);
        let ctx = Context::new().with_value(Marker("caller"));

        let ctx = config.before(ctx, &event);
        assert_eq!(ctx.get::<Marker>(), Some(&Marker("caller")));
    }

    #[test]
    fn test_event_carries_system() {
        let config = Configuration::new(System::Postgres, vec![]);
        assert_eq!(config.event(Operation::TxCommit).system(), System::Postgres);
    }
}
