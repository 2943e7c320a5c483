//! Tracing hook: one OpenTelemetry span per operation.

use std::collections::HashSet;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{Span, SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};

use super::{Hook, HookEvent, Operation};

/// Instrumentation scope used by [`TraceHook::global`].
pub const TRACER_NAME: &str = "sqlhooks";

/// Starts a client span named `SQL <operation>` in `before` and ends it in
/// `after`, with the event outcome recorded as attributes and status.
pub struct TraceHook<T = BoxedTracer> {
    tracer: T,
    log_arguments: bool,
    excluded: HashSet<Operation>,
}

impl TraceHook<BoxedTracer> {
    /// Hook bound to the globally installed tracer provider.
    pub fn global() -> Self {
        Self::new(global::tracer(TRACER_NAME))
    }
}

impl<T> TraceHook<T>
where
    T: Tracer + Send + Sync,
    T::Span: Send + Sync + 'static,
{
    pub fn new(tracer: T) -> Self {
        Self {
            tracer,
            log_arguments: false,
            excluded: HashSet::new(),
        }
    }

    /// Attach call arguments as the `db.arguments` attribute.
    pub fn with_arguments(mut self, enabled: bool) -> Self {
        self.log_arguments = enabled;
        self
    }

    /// Never trace the given operations.
    pub fn excluding(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.excluded.extend(operations);
        self
    }

    pub fn is_excluded(&self, operation: Operation) -> bool {
        self.excluded.contains(&operation)
    }
}

impl<T> Hook for TraceHook<T>
where
    T: Tracer + Send + Sync,
    T::Span: Send + Sync + 'static,
{
    fn before(&self, ctx: Context, event: &HookEvent) -> Context {
        if self.is_excluded(event.operation()) {
            return ctx;
        }

        let mut attributes = vec![
            KeyValue::new("db.system", event.system().semconv_name()),
            KeyValue::new("db.operation", event.operation().as_str()),
        ];
        if !event.query().is_empty() {
            attributes.push(KeyValue::new("db.statement", event.query().to_string()));
        }
        if self.log_arguments && !event.args().is_empty() {
            attributes.push(KeyValue::new("db.arguments", event.args().to_string()));
        }

        let span = self
            .tracer
            .span_builder(format!("SQL {}", event.operation()))
            .with_kind(SpanKind::Client)
            .with_attributes(attributes)
            .start_with_context(&self.tracer, &ctx);

        ctx.with_span(span)
    }

    fn after(&self, ctx: &Context, event: &HookEvent) {
        if self.is_excluded(event.operation()) {
            return;
        }

        let span = ctx.span();
        if let Some(rows) = event.rows_affected() {
            span.set_attribute(KeyValue::new("db.rows_affected", rows));
        }
        if let Some(id) = event.last_insert_id() {
            span.set_attribute(KeyValue::new("db.last_insert_id", id));
        }

        match event.error().filter(|e| !e.is_skip()) {
            Some(err) => {
                span.record_error(err);
                span.set_status(Status::error(err.to_string()));
            }
            None => span.set_status(Status::Ok),
        }
        span.end();
    }
}
