//! Conversion between driver values and sqlx `Any` arguments/rows.

use sqlx::any::{Any, AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Column, Row};

use crate::driver::{DriverError, IsolationLevel, Result, TxOptions, Value};
use crate::hooks::System;

pub(super) type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// Bind positional values. Timestamps travel as RFC 3339 text since the
/// `Any` driver has no portable timestamp type.
///
/// `Any` has no untyped null either, so `Value::Null` is bound as a null
/// text parameter. Postgres infers `text` for it and rejects the bind
/// against a non-text column unless the query casts the placeholder
/// (`$1::int`). SQLite and MySQL accept it anywhere.
pub(super) fn bind<'q>(query: AnyQuery<'q>, args: &[Value]) -> AnyQuery<'q> {
    args.iter().fold(query, |query, value| match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Bytes(v) => query.bind(v.clone()),
        Value::Timestamp(v) => query.bind(v.to_rfc3339()),
    })
}

pub(super) fn column_names(row: &AnyRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

pub(super) fn decode_row(row: &AnyRow) -> Result<Vec<Value>> {
    (0..row.len()).map(|i| decode_column(row, i)).collect()
}

fn decode_column(row: &AnyRow, index: usize) -> Result<Value> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return Ok(v.map_or(Value::Null, Value::Int));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return Ok(v.map_or(Value::Null, Value::Float));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return Ok(v.map_or(Value::Null, Value::Text));
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return Ok(v.map_or(Value::Null, Value::Bytes));
    }
    row.try_get::<Option<bool>, _>(index)
        .map(|v| v.map_or(Value::Null, Value::Bool))
        .map_err(DriverError::from)
}

/// Statements that open a transaction with the requested options.
pub(super) fn begin_statements(system: System, opts: TxOptions) -> Result<Vec<String>> {
    match system {
        System::Postgres => {
            let mut sql = String::from("BEGIN");
            if let Some(level) = opts.isolation.as_sql() {
                sql.push_str(" ISOLATION LEVEL ");
                sql.push_str(level);
            }
            if opts.read_only {
                sql.push_str(" READ ONLY");
            }
            Ok(vec![sql])
        }
        System::MySql => {
            let mut statements = Vec::new();
            if let Some(level) = opts.isolation.as_sql() {
                statements.push(format!("SET TRANSACTION ISOLATION LEVEL {}", level));
            }
            statements.push(if opts.read_only {
                "START TRANSACTION READ ONLY".to_string()
            } else {
                "START TRANSACTION".to_string()
            });
            Ok(statements)
        }
        System::Sqlite | System::Unknown => {
            // SQLite transactions are always serializable.
            match opts.isolation {
                IsolationLevel::Default | IsolationLevel::Serializable => {}
                _ => return Err(DriverError::UnsupportedIsolation),
            }
            if opts.read_only {
                return Err(DriverError::ReadOnlyUnsupported);
            }
            Ok(vec!["BEGIN".to_string()])
        }
    }
}
