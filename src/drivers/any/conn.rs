//! sqlx connection, statement and transaction.

use std::sync::Arc;

use async_trait::async_trait;
use opentelemetry::Context;
use sqlx::{AnyConnection, Column, Connection, Either, Executor, Statement};
use tokio::sync::Mutex;

use super::value::{begin_statements, bind, column_names, decode_row};
use crate::driver::{
    named_values_to_values, BufferedRows, Conn, ConnBeginTx, ConnPrepareContext, DriverError,
    ExecResult, ExecSummary, Execer, ExecerContext, NamedValue, Pinger, Queryer, QueryerContext,
    Result, Rows, SessionResetter, Stmt, StmtExecContext, StmtQueryContext, Tx, TxOptions, Value,
};
use crate::hooks::System;

/// Connection shared by a conn and the statements/transactions it created.
/// `None` once closed.
type SharedConn = Arc<Mutex<Option<AnyConnection>>>;

async fn execute(
    conn: &SharedConn,
    system: System,
    query: &str,
    args: &[Value],
) -> Result<Box<dyn ExecResult>> {
    let mut guard = conn.lock().await;
    let conn = guard.as_mut().ok_or(DriverError::BadConn)?;

    let result = bind(sqlx::query(query), args).execute(&mut *conn).await?;
    let last_insert_id = match result.last_insert_id() {
        Some(id) => Some(id),
        // The `Any` SQLite backend drops the rowid; read it back while the
        // connection is still held.
        None if system == System::Sqlite => Some(
            sqlx::query_scalar::<_, i64>("SELECT last_insert_rowid()")
                .fetch_one(&mut *conn)
                .await?,
        ),
        None => None,
    };
    Ok(Box::new(ExecSummary::new(
        last_insert_id,
        Some(result.rows_affected() as i64),
    )))
}

async fn fetch(conn: &SharedConn, query: &str, args: &[Value]) -> Result<Box<dyn Rows>> {
    let mut guard = conn.lock().await;
    let conn = guard.as_mut().ok_or(DriverError::BadConn)?;

    let rows = bind(sqlx::query(query), args).fetch_all(&mut *conn).await?;
    let columns = match rows.first() {
        Some(row) => column_names(row),
        None => (&mut *conn)
            .prepare(query)
            .await?
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect(),
    };
    let values = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
    Ok(Box::new(BufferedRows::new(columns, values)))
}

/// Run statements without arguments, outside the prepared statement cache.
async fn run(conn: &SharedConn, statements: &[String]) -> Result<()> {
    let mut guard = conn.lock().await;
    let conn = guard.as_mut().ok_or(DriverError::BadConn)?;

    for sql in statements {
        (&mut *conn).execute(sql.as_str()).await?;
    }
    Ok(())
}

/// A single sqlx `Any` connection.
pub struct SqlxConn {
    system: System,
    conn: SharedConn,
}

impl SqlxConn {
    pub fn new(system: System, conn: AnyConnection) -> Self {
        Self {
            system,
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    async fn prepare_stmt(&self, query: &str) -> Result<Box<dyn Stmt>> {
        let num_input = {
            let mut guard = self.conn.lock().await;
            let conn = guard.as_mut().ok_or(DriverError::BadConn)?;
            let statement = (&mut *conn).prepare(query).await?;
            statement.parameters().map(|params| match params {
                Either::Left(types) => types.len(),
                Either::Right(count) => count,
            })
        };

        Ok(Box::new(SqlxStmt {
            conn: self.conn.clone(),
            system: self.system,
            query: query.to_string(),
            num_input,
        }))
    }

    async fn begin_with(&self, opts: TxOptions) -> Result<Box<dyn Tx>> {
        let statements = begin_statements(self.system, opts)?;
        run(&self.conn, &statements).await?;
        Ok(Box::new(SqlxTx {
            conn: self.conn.clone(),
        }))
    }
}

#[async_trait]
impl Conn for SqlxConn {
    async fn prepare(&self, query: &str) -> Result<Box<dyn Stmt>> {
        self.prepare_stmt(query).await
    }

    async fn close(&self) -> Result<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.close().await?;
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn Tx>> {
        self.begin_with(TxOptions::default()).await
    }

    fn as_execer(&self) -> Option<&dyn Execer> {
        Some(self)
    }

    fn as_execer_context(&self) -> Option<&dyn ExecerContext> {
        Some(self)
    }

    fn as_queryer(&self) -> Option<&dyn Queryer> {
        Some(self)
    }

    fn as_queryer_context(&self) -> Option<&dyn QueryerContext> {
        Some(self)
    }

    fn as_prepare_context(&self) -> Option<&dyn ConnPrepareContext> {
        Some(self)
    }

    fn as_begin_tx(&self) -> Option<&dyn ConnBeginTx> {
        Some(self)
    }

    fn as_pinger(&self) -> Option<&dyn Pinger> {
        Some(self)
    }

    fn as_session_resetter(&self) -> Option<&dyn SessionResetter> {
        Some(self)
    }
}

#[async_trait]
impl Execer for SqlxConn {
    async fn exec(&self, query: &str, args: &[Value]) -> Result<Box<dyn ExecResult>> {
        execute(&self.conn, self.system, query, args).await
    }
}

#[async_trait]
impl ExecerContext for SqlxConn {
    async fn exec_context(
        &self,
        _ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        let values = named_values_to_values(args)?;
        execute(&self.conn, self.system, query, &values).await
    }
}

#[async_trait]
impl Queryer for SqlxConn {
    async fn query(&self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>> {
        fetch(&self.conn, query, args).await
    }
}

#[async_trait]
impl QueryerContext for SqlxConn {
    async fn query_context(
        &self,
        _ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        let values = named_values_to_values(args)?;
        fetch(&self.conn, query, &values).await
    }
}

#[async_trait]
impl ConnPrepareContext for SqlxConn {
    async fn prepare_context(&self, _ctx: &Context, query: &str) -> Result<Box<dyn Stmt>> {
        self.prepare_stmt(query).await
    }
}

#[async_trait]
impl ConnBeginTx for SqlxConn {
    async fn begin_tx(&self, _ctx: &Context, opts: TxOptions) -> Result<Box<dyn Tx>> {
        self.begin_with(opts).await
    }
}

#[async_trait]
impl Pinger for SqlxConn {
    async fn ping(&self, _ctx: &Context) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(DriverError::BadConn)?;
        conn.ping().await?;
        Ok(())
    }
}

#[async_trait]
impl SessionResetter for SqlxConn {
    async fn reset_session(&self, _ctx: &Context) -> Result<()> {
        // No per-session state is kept; only a closed connection is unusable.
        match self.conn.lock().await.as_ref() {
            Some(_) => Ok(()),
            None => Err(DriverError::BadConn),
        }
    }
}

/// Prepared statement. sqlx caches the server-side statement per
/// connection, so executing re-binds by query text.
pub struct SqlxStmt {
    conn: SharedConn,
    system: System,
    query: String,
    num_input: Option<usize>,
}

#[async_trait]
impl Stmt for SqlxStmt {
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn num_input(&self) -> Option<usize> {
        self.num_input
    }

    async fn exec(&self, args: &[Value]) -> Result<Box<dyn ExecResult>> {
        execute(&self.conn, self.system, &self.query, args).await
    }

    async fn query(&self, args: &[Value]) -> Result<Box<dyn Rows>> {
        fetch(&self.conn, &self.query, args).await
    }

    fn as_exec_context(&self) -> Option<&dyn StmtExecContext> {
        Some(self)
    }

    fn as_query_context(&self) -> Option<&dyn StmtQueryContext> {
        Some(self)
    }
}

#[async_trait]
impl StmtExecContext for SqlxStmt {
    async fn exec_context(
        &self,
        _ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        let values = named_values_to_values(args)?;
        execute(&self.conn, self.system, &self.query, &values).await
    }
}

#[async_trait]
impl StmtQueryContext for SqlxStmt {
    async fn query_context(&self, _ctx: &Context, args: &[NamedValue]) -> Result<Box<dyn Rows>> {
        let values = named_values_to_values(args)?;
        fetch(&self.conn, &self.query, &values).await
    }
}

/// Transaction opened with an explicit `BEGIN` on the shared connection.
pub struct SqlxTx {
    conn: SharedConn,
}

#[async_trait]
impl Tx for SqlxTx {
    async fn commit(&self) -> Result<()> {
        run(&self.conn, &["COMMIT".to_string()]).await
    }

    async fn rollback(&self) -> Result<()> {
        run(&self.conn, &["ROLLBACK".to_string()]).await
    }
}
