//! Interceptable driver operations.

use std::fmt;

use serde::Deserialize;

/// Kind of driver call being intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Operation {
    ConnBegin,
    ConnBeginTx,
    ConnExec,
    ConnExecContext,
    ConnQuery,
    ConnQueryContext,
    ConnPrepare,
    ConnPrepareContext,
    ConnPing,
    ConnResetSession,
    ConnClose,
    TxCommit,
    TxRollback,
    StmtExec,
    StmtExecContext,
    StmtQuery,
    StmtQueryContext,
    Unknown,
}

impl Operation {
    /// Every known operation, `Unknown` excluded.
    pub const ALL: [Operation; 17] = [
        Operation::ConnBegin,
        Operation::ConnBeginTx,
        Operation::ConnExec,
        Operation::ConnExecContext,
        Operation::ConnQuery,
        Operation::ConnQueryContext,
        Operation::ConnPrepare,
        Operation::ConnPrepareContext,
        Operation::ConnPing,
        Operation::ConnResetSession,
        Operation::ConnClose,
        Operation::TxCommit,
        Operation::TxRollback,
        Operation::StmtExec,
        Operation::StmtExecContext,
        Operation::StmtQuery,
        Operation::StmtQueryContext,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ConnBegin => "connection:begin",
            Operation::ConnBeginTx => "connection:begin-tx",
            Operation::ConnExec => "connection:exec",
            Operation::ConnExecContext => "connection:exec-context",
            Operation::ConnQuery => "connection:query",
            Operation::ConnQueryContext => "connection:query-context",
            Operation::ConnPrepare => "connection:prepare",
            Operation::ConnPrepareContext => "connection:prepare-context",
            Operation::ConnPing => "connection:ping",
            Operation::ConnResetSession => "connection:reset-session",
            Operation::ConnClose => "connection:close",
            Operation::TxCommit => "transaction:commit",
            Operation::TxRollback => "transaction:rollback",
            Operation::StmtExec => "statement:exec",
            Operation::StmtExecContext => "statement:exec-context",
            Operation::StmtQuery => "statement:query",
            Operation::StmtQueryContext => "statement:query-context",
            Operation::Unknown => "unknown",
        }
    }

    /// Parse an operation name. Unrecognized names become `Unknown`.
    pub fn parse(name: &str) -> Self {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == name)
            .unwrap_or(Operation::Unknown)
    }
}

impl From<&str> for Operation {
    fn from(name: &str) -> Self {
        Operation::parse(name)
    }
}

impl From<String> for Operation {
    fn from(name: String) -> Self {
        Operation::parse(&name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
