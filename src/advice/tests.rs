//! Tests for the instrumented wrappers over the mock driver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use opentelemetry::Context;

use super::*;
use crate::driver::{Conn, Driver, DriverError, IsolationLevel, NamedValue, TxOptions, Value};
use crate::drivers::{Capabilities, MockDriver};
use crate::hooks::{Hook, Operation, System};

/// Context value set by every `before`, numbered in call order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Seq(usize);

#[derive(Debug, Clone)]
struct Record {
    hook: &'static str,
    phase: &'static str,
    operation: Operation,
    query: String,
    seen: Option<usize>,
    error: Option<String>,
    rows_affected: Option<i64>,
    last_insert_id: Option<i64>,
    timed: bool,
}

struct RecordingHook {
    name: &'static str,
    records: Arc<Mutex<Vec<Record>>>,
    counter: Arc<AtomicUsize>,
}

impl RecordingHook {
    fn record(&self, phase: &'static str, ctx: &Context, event: &HookEvent) {
        self.records.lock().unwrap().push(Record {
            hook: self.name,
            phase,
            operation: event.operation(),
            query: event.query().to_string(),
            seen: ctx.get::<Seq>().map(|s| s.0),
            error: event.error().map(|e| e.to_string()),
            rows_affected: event.rows_affected(),
            last_insert_id: event.last_insert_id(),
            timed: event.latency().is_ok(),
        });
    }
}

impl Hook for RecordingHook {
    fn before(&self, ctx: Context, event: &HookEvent) -> Context {
        self.record("before", &ctx, event);
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.with_value(Seq(n))
    }

    fn after(&self, ctx: &Context, event: &HookEvent) {
        self.record("after", ctx, event);
    }
}

struct Fixture {
    mock: MockDriver,
    driver: InstrumentedDriver,
    records: Arc<Mutex<Vec<Record>>>,
}

impl Fixture {
    fn new(capabilities: Capabilities) -> Self {
        let records = Arc::new(Mutex::new(Vec::new()));
        let counter = Arc::new(AtomicUsize::new(0));
        let hooks: Vec<Arc<dyn Hook>> = ["a", "b"]
            .into_iter()
            .map(|name| {
                Arc::new(RecordingHook {
                    name,
                    records: records.clone(),
                    counter: counter.clone(),
                }) as Arc<dyn Hook>
            })
            .collect();

        let mock = MockDriver::new(capabilities);
        let driver = InstrumentedDriver::new(
            Arc::new(mock.clone()),
            Arc::new(Configuration::new(System::Sqlite, hooks)),
        );
        Self {
            mock,
            driver,
            records,
        }
    }

    async fn conn(&self) -> Box<dyn Conn> {
        let conn = self.driver.open("mock").await.unwrap();
        self.mock.take_calls().await;
        conn
    }

    fn take_records(&self) -> Vec<Record> {
        std::mem::take(&mut *self.records.lock().unwrap())
    }

    /// `(hook, phase, operation)` of every record so far.
    fn take_trail(&self) -> Vec<(&'static str, &'static str, Operation)> {
        self.take_records()
            .into_iter()
            .map(|r| (r.hook, r.phase, r.operation))
            .collect()
    }
}

fn one_event(op: Operation) -> Vec<(&'static str, &'static str, Operation)> {
    vec![
        ("a", "before", op),
        ("b", "before", op),
        ("a", "after", op),
        ("b", "after", op),
    ]
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
async fn test_exec_context_fires_each_hook_once_in_order() {
    let fx = Fixture::new(Capabilities::all());
    let conn = fx.conn().await;
    let args = vec![NamedValue::positional(1, "test")];

    conn.as_execer_context()
        .unwrap()
        .exec_context(&Context::new(), "INSERT INTO foo VALUES (?)", &args)
        .await
        .unwrap();

    let records = fx.take_records();
    let trail: Vec<_> = records
        .iter()
        .map(|r| (r.hook, r.phase, r.operation))
        .collect();
    assert_eq!(trail, one_event(Operation::ConnExecContext));
    assert!(records
        .iter()
        .all(|r| r.query == "INSERT INTO foo VALUES (?)"));

    let after = &records[2];
    assert_eq!(after.rows_affected, Some(1));
    assert_eq!(after.last_insert_id, Some(1));
    assert!(after.timed);
    assert!(!records[0].timed);
    assert_eq!(fx.mock.take_calls().await, vec!["conn.exec_context"]);
}

#[tokio::test]
async fn test_before_threads_context_through_hooks() {
    let fx = Fixture::new(Capabilities::all());
    let conn = fx.conn().await;

    conn.as_pinger()
        .unwrap()
        .ping(&Context::new().with_value(Seq(100)))
        .await
        .unwrap();

    let seen: Vec<_> = fx.take_records().into_iter().map(|r| r.seen).collect();
    // b sees a's context, both afters see the context b returned.
    assert_eq!(seen, vec![Some(100), Some(1), Some(2), Some(2)]);
}

#[tokio::test]
async fn test_context_call_on_legacy_base_reports_legacy_operation() {
    let fx = Fixture::new(Capabilities::legacy());
    let conn = fx.conn().await;
    let args = vec![NamedValue::positional(1, 7)];

    conn.as_execer_context()
        .unwrap()
        .exec_context(&Context::new(), "UPDATE foo", &args)
        .await
        .unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::ConnExec));

    conn.as_queryer_context()
        .unwrap()
        .query_context(&Context::new(), "SELECT bar FROM foo", &args)
        .await
        .unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::ConnQuery));

    assert_eq!(fx.mock.take_calls().await, vec!["conn.exec", "conn.query"]);
}

#[tokio::test]
async fn test_fallback_keeps_caller_context() {
    let fx = Fixture::new(Capabilities::legacy());
    let conn = fx.conn().await;

    conn.as_execer_context()
        .unwrap()
        .exec_context(&Context::new().with_value(Seq(42)), "DELETE FROM foo", &[])
        .await
        .unwrap();

    assert_eq!(fx.take_records()[0].seen, Some(42));
}

#[tokio::test]
async fn test_named_arguments_rejected_on_legacy_fallback() {
    let fx = Fixture::new(Capabilities::legacy());
    let conn = fx.conn().await;
    let args = vec![NamedValue::named("bar", 1, "x")];

    let err = conn
        .as_execer_context()
        .unwrap()
        .exec_context(&Context::new(), "UPDATE foo SET bar = :bar", &args)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, DriverError::NamedParameters));
    assert!(fx.take_records().is_empty());
    assert!(fx.mock.take_calls().await.is_empty());
}

#[tokio::test]
async fn test_exec_without_execer_skips_silently() {
    let fx = Fixture::new(Capabilities::none());
    let conn = fx.conn().await;

    let err = conn
        .as_execer_context()
        .unwrap()
        .exec_context(&Context::new(), "INSERT", &[])
        .await
        .err()
        .unwrap();
    assert!(err.is_skip());

    let err = conn
        .as_queryer()
        .unwrap()
        .query("SELECT", &[])
        .await
        .err()
        .unwrap();
    assert!(err.is_skip());

    assert!(fx.take_records().is_empty());
    assert!(fx.mock.take_calls().await.is_empty());
}

#[tokio::test]
async fn test_base_error_is_recorded_and_returned() {
    let fx = Fixture::new(Capabilities::all());
    let conn = fx.conn().await;
    fx.mock.set_fail_with(Some(DriverError::BadConn)).await;

    let err = conn
        .as_execer()
        .unwrap()
        .exec("INSERT", &[Value::from(1)])
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DriverError::BadConn));

    let records = fx.take_records();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].error, None);
    assert_eq!(
        records[3].error.as_deref(),
        Some("driver: bad connection")
    );
    assert_eq!(records[3].rows_affected, None);
}

#[tokio::test]
async fn test_ping_and_reset_without_capability_fire_nothing() {
    let fx = Fixture::new(Capabilities::none());
    let conn = fx.conn().await;

    conn.as_pinger().unwrap().ping(&Context::new()).await.unwrap();
    conn.as_session_resetter()
        .unwrap()
        .reset_session(&Context::new())
        .await
        .unwrap();

    assert!(fx.take_records().is_empty());
}

#[tokio::test]
async fn test_reset_session_and_close_fire_events() {
    let fx = Fixture::new(Capabilities::all());
    let conn = fx.conn().await;

    conn.as_session_resetter()
        .unwrap()
        .reset_session(&Context::new())
        .await
        .unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::ConnResetSession));

    conn.close().await.unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::ConnClose));
}

#[tokio::test]
async fn test_every_operation_fires_one_event_per_hook() {
    for op in Operation::ALL {
        let fx = Fixture::new(Capabilities::all());
        let conn = fx.conn().await;
        let stmt = conn.prepare("SELECT bar FROM foo WHERE bar = ?").await.unwrap();
        let tx = conn.begin().await.unwrap();
        fx.take_records();

        let ctx = Context::new();
        let query = "SELECT bar FROM foo WHERE bar = ?";
        let args = vec![NamedValue::positional(1, "x")];
        let values = vec![Value::from("x")];

        match op {
            Operation::ConnBegin => drop(conn.begin().await.unwrap()),
            Operation::ConnBeginTx => drop(
                conn.as_begin_tx()
                    .unwrap()
                    .begin_tx(&ctx, TxOptions::default())
                    .await
                    .unwrap(),
            ),
            Operation::ConnExec => drop(
                conn.as_execer()
                    .unwrap()
                    .exec(query, &values)
                    .await
                    .unwrap(),
            ),
            Operation::ConnExecContext => drop(
                conn.as_execer_context()
                    .unwrap()
                    .exec_context(&ctx, query, &args)
                    .await
                    .unwrap(),
            ),
            Operation::ConnQuery => drop(
                conn.as_queryer()
                    .unwrap()
                    .query(query, &values)
                    .await
                    .unwrap(),
            ),
            Operation::ConnQueryContext => drop(
                conn.as_queryer_context()
                    .unwrap()
                    .query_context(&ctx, query, &args)
                    .await
                    .unwrap(),
            ),
            Operation::ConnPrepare => drop(conn.prepare(query).await.unwrap()),
            Operation::ConnPrepareContext => drop(
                conn.as_prepare_context()
                    .unwrap()
                    .prepare_context(&ctx, query)
                    .await
                    .unwrap(),
            ),
            Operation::ConnPing => conn.as_pinger().unwrap().ping(&ctx).await.unwrap(),
            Operation::ConnResetSession => conn
                .as_session_resetter()
                .unwrap()
                .reset_session(&ctx)
                .await
                .unwrap(),
            Operation::ConnClose => conn.close().await.unwrap(),
            Operation::TxCommit => tx.commit().await.unwrap(),
            Operation::TxRollback => tx.rollback().await.unwrap(),
            Operation::StmtExec => drop(stmt.exec(&values).await.unwrap()),
            Operation::StmtExecContext => drop(
                stmt.as_exec_context()
                    .unwrap()
                    .exec_context(&ctx, &args)
                    .await
                    .unwrap(),
            ),
            Operation::StmtQuery => drop(stmt.query(&values).await.unwrap()),
            Operation::StmtQueryContext => drop(
                stmt.as_query_context()
                    .unwrap()
                    .query_context(&ctx, &args)
                    .await
                    .unwrap(),
            ),
            Operation::Unknown => unreachable!("not in Operation::ALL"),
        }

        assert_eq!(fx.take_trail(), one_event(op), "operation {}", op);
    }
}

#[tokio::test]
async fn test_native_statement_query_context() {
    let fx = Fixture::new(Capabilities::all());
    let conn = fx.conn().await;
    let stmt = conn.prepare("SELECT bar FROM foo WHERE bar = ?").await.unwrap();
    fx.take_records();

    let mut rows = stmt
        .as_query_context()
        .unwrap()
        .query_context(&Context::new(), &[NamedValue::positional(1, "test")])
        .await
        .unwrap();
    assert_eq!(rows.next().await.unwrap(), Some(vec![Value::from("test")]));

    assert_eq!(fx.take_trail(), one_event(Operation::StmtQueryContext));
    assert_eq!(
        fx.mock.take_calls().await,
        vec!["conn.prepare", "stmt.query_context"]
    );
}

// ============================================================================
// Statement
// ============================================================================

#[tokio::test]
async fn test_prepared_statement_runs_under_prepare_context() {
    let fx = Fixture::new(Capabilities::all());
    let conn = fx.conn().await;

    let stmt = conn
        .as_prepare_context()
        .unwrap()
        .prepare_context(&Context::new(), "SELECT bar FROM foo WHERE bar = ?")
        .await
        .unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::ConnPrepareContext));

    // Legacy call: no context argument, runs under the one prepare produced.
    stmt.exec(&[Value::from("test")]).await.unwrap();
    let records = fx.take_records();
    assert_eq!(records[0].operation, Operation::StmtExec);
    assert_eq!(records[0].query, "SELECT bar FROM foo WHERE bar = ?");
    assert_eq!(records[0].seen, Some(2));

    // The exec's before replaced the carried context.
    stmt.query(&[Value::from("test")]).await.unwrap();
    let records = fx.take_records();
    assert_eq!(records[0].operation, Operation::StmtQuery);
    assert_eq!(records[0].seen, Some(4));
}

#[tokio::test]
async fn test_statement_context_calls_fall_back_to_legacy() {
    let fx = Fixture::new(Capabilities {
        stmt_exec_context: false,
        stmt_query_context: false,
        ..Capabilities::all()
    });
    let conn = fx.conn().await;
    let stmt = conn.prepare("INSERT INTO foo VALUES (?)").await.unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::ConnPrepare));

    let args = vec![NamedValue::positional(1, "test")];
    stmt.as_exec_context()
        .unwrap()
        .exec_context(&Context::new(), &args)
        .await
        .unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::StmtExec));

    stmt.as_query_context()
        .unwrap()
        .query_context(&Context::new(), &args)
        .await
        .unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::StmtQuery));

    assert_eq!(
        fx.mock.take_calls().await,
        vec!["conn.prepare", "stmt.exec", "stmt.query"]
    );
}

#[tokio::test]
async fn test_statement_context_exec_records_figures() {
    let fx = Fixture::new(Capabilities::all());
    let conn = fx.conn().await;
    let stmt = conn.prepare("INSERT INTO foo VALUES (?)").await.unwrap();
    fx.take_records();

    stmt.as_exec_context()
        .unwrap()
        .exec_context(&Context::new(), &[NamedValue::positional(1, "x")])
        .await
        .unwrap();

    let records = fx.take_records();
    assert_eq!(records[3].operation, Operation::StmtExecContext);
    assert_eq!(records[3].rows_affected, Some(1));
}

#[tokio::test]
async fn test_statement_close_and_num_input_fire_nothing() {
    let fx = Fixture::new(Capabilities::all());
    let conn = fx.conn().await;
    let stmt = conn.prepare("SELECT 1").await.unwrap();
    fx.take_records();

    assert_eq!(stmt.num_input(), Some(1));
    stmt.close().await.unwrap();

    assert!(fx.take_records().is_empty());
    assert_eq!(
        fx.mock.take_calls().await,
        vec!["conn.prepare", "stmt.close"]
    );
}

#[tokio::test]
async fn test_prepare_failure_returns_error_without_statement() {
    let fx = Fixture::new(Capabilities::all());
    let conn = fx.conn().await;
    fx.mock
        .set_fail_with(Some(DriverError::msg("syntax error")))
        .await;

    let err = conn.prepare("SELEC").await.err().unwrap();

    assert_eq!(err.to_string(), "syntax error");
    assert_eq!(
        fx.take_records()[3].error.as_deref(),
        Some("syntax error")
    );
}

#[tokio::test]
async fn test_instrumented_stmt_exposes_carried_context() {
    let fx = Fixture::new(Capabilities::all());
    let base = MockDriver::new(Capabilities::all())
        .open("mock")
        .await
        .unwrap()
        .prepare("SELECT 1")
        .await
        .unwrap();

    let stmt = InstrumentedStmt::new(
        base,
        fx.driver.configuration().clone(),
        Context::new().with_value(Seq(9)),
        "SELECT 1",
    );
    assert_eq!(stmt.query_text(), "SELECT 1");
    assert_eq!(stmt.context().get::<Seq>(), Some(&Seq(9)));

    stmt.exec(&[]).await.unwrap();
    assert_eq!(fx.take_records()[0].seen, Some(9));
    assert_eq!(stmt.context().get::<Seq>(), Some(&Seq(2)));
}

// ============================================================================
// Transaction
// ============================================================================

#[tokio::test]
async fn test_transaction_runs_under_begin_context() {
    let fx = Fixture::new(Capabilities::all());
    let conn = fx.conn().await;

    let tx = conn
        .as_begin_tx()
        .unwrap()
        .begin_tx(&Context::new(), TxOptions::default())
        .await
        .unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::ConnBeginTx));

    tx.commit().await.unwrap();
    let records = fx.take_records();
    assert_eq!(records[0].operation, Operation::TxCommit);
    assert_eq!(records[0].seen, Some(2));
    assert_eq!(
        fx.mock.take_calls().await,
        vec!["conn.begin_tx", "tx.commit"]
    );
}

#[tokio::test]
async fn test_rollback_fires_one_event() {
    let fx = Fixture::new(Capabilities::all());
    let conn = fx.conn().await;
    let tx = conn.begin().await.unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::ConnBegin));

    tx.rollback().await.unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::TxRollback));
}

#[tokio::test]
async fn test_begin_tx_without_capability() {
    let fx = Fixture::new(Capabilities::none());
    let conn = fx.conn().await;
    let beginner = conn.as_begin_tx().unwrap();

    let serializable = TxOptions {
        isolation: IsolationLevel::Serializable,
        read_only: false,
    };
    let err = beginner
        .begin_tx(&Context::new(), serializable)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DriverError::UnsupportedIsolation));
    assert!(fx.take_records().is_empty());

    beginner
        .begin_tx(&Context::new(), TxOptions::default())
        .await
        .unwrap();
    assert_eq!(fx.take_trail(), one_event(Operation::ConnBegin));
    assert_eq!(fx.mock.take_calls().await, vec!["conn.begin"]);
}

// ============================================================================
// Driver / Connector
// ============================================================================

#[tokio::test]
async fn test_connector_uses_base_connector() {
    let fx = Fixture::new(Capabilities::all());
    let connector = fx
        .driver
        .as_driver_context()
        .unwrap()
        .open_connector("mock")
        .unwrap();

    let conn = connector.connect(&Context::new()).await.unwrap();
    conn.as_pinger().unwrap().ping(&Context::new()).await.unwrap();

    assert_eq!(
        fx.mock.take_calls().await,
        vec!["connector.connect", "conn.ping"]
    );
    assert_eq!(fx.take_trail(), one_event(Operation::ConnPing));
}

#[tokio::test]
async fn test_connector_without_base_connector_opens() {
    let fx = Fixture::new(Capabilities::legacy());
    let connector = fx
        .driver
        .as_driver_context()
        .unwrap()
        .open_connector("mock")
        .unwrap();

    let conn = connector.connect(&Context::new()).await.unwrap();
    conn.as_execer().unwrap().exec("SELECT 1", &[]).await.unwrap();

    assert_eq!(fx.mock.take_calls().await, vec!["driver.open", "conn.exec"]);
    assert_eq!(fx.take_trail(), one_event(Operation::ConnExec));
}

#[tokio::test]
async fn test_open_failure_is_returned() {
    let fx = Fixture::new(Capabilities::all());
    fx.mock.set_fail_with(Some(DriverError::BadConn)).await;

    let err = fx.driver.open("mock").await.err().unwrap();
    assert!(matches!(err, DriverError::BadConn));
    assert!(fx.take_records().is_empty());
}
