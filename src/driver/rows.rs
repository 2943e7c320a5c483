//! In-memory result types shared by the bundled drivers.

use std::collections::VecDeque;

use async_trait::async_trait;

use super::{DriverError, ExecResult, Result, Rows, Value};

/// Exec outcome with optionally known figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecSummary {
    pub last_insert_id: Option<i64>,
    pub rows_affected: Option<i64>,
}

impl ExecSummary {
    pub fn new(last_insert_id: Option<i64>, rows_affected: Option<i64>) -> Self {
        Self {
            last_insert_id,
            rows_affected,
        }
    }
}

impl ExecResult for ExecSummary {
    fn last_insert_id(&self) -> Result<i64> {
        self.last_insert_id
            .ok_or_else(|| DriverError::Unsupported("LastInsertId".to_string()))
    }

    fn rows_affected(&self) -> Result<i64> {
        self.rows_affected
            .ok_or_else(|| DriverError::Unsupported("RowsAffected".to_string()))
    }
}

/// Fully materialized query result.
#[derive(Debug, Clone, Default)]
pub struct BufferedRows {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    closed: bool,
}

impl BufferedRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            closed: false,
        }
    }
}

#[async_trait]
impl Rows for BufferedRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self) -> Result<Option<Vec<Value>>> {
        if self.closed {
            return Err(DriverError::msg("sql: Rows are closed"));
        }
        Ok(self.rows.pop_front())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.rows.clear();
        Ok(())
    }
}
