use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, warn};

use super::Connection;
use super::client::{ERRNO_TIMEOUT, NativeError, StatementHandle};
use crate::error::{SqlMiddlewareDbError, is_connection_lost_message};
use crate::registry::QueryEvent;
use crate::results::{CustomDbRow, ExecResult, ResultSet};
use crate::track::TrackKind;
use crate::types::RowValues;

const FOUND_ROWS_SQL: &str = "SELECT FOUND_ROWS() as count";

/// A statement prepared on the server but not yet executed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub(crate) handle: StatementHandle,
    pub sql: String,
    pub binds: Vec<RowValues>,
}

#[derive(Clone, Copy)]
enum Stage {
    Prepare,
    Execute,
}

/// Race a native call against `limit`; elapsing maps to the timeout errno.
async fn race<T, F>(limit: Option<Duration>, call: F) -> Result<T, NativeError>
where
    F: Future<Output = Result<T, NativeError>>,
{
    match limit {
        Some(limit) => match timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(NativeError::new(
                ERRNO_TIMEOUT,
                format!("statement exceeded {limit:?}"),
            )),
        },
        None => call.await,
    }
}

impl Connection {
    fn effective_timeout(&self, requested: Option<Duration>) -> Option<Duration> {
        requested.or_else(|| self.config.execute_timeout())
    }

    fn begin_statement(&mut self, sql: &str, binds: &[RowValues]) {
        self.last_sql = sql.to_string();
        self.last_binds = binds.to_vec();
        self.last_errno = 0;
        self.last_error.clear();
        self.affected_rows = 0;
        self.total_count = 0;
    }

    /// Record a native failure and turn it into the matching error kind.
    ///
    /// Loss classification only flags the connection; the error still propagates.
    fn statement_error(&mut self, stage: Stage, err: NativeError, started: Instant) -> SqlMiddlewareDbError {
        self.last_errno = err.errno;
        self.last_error.clone_from(&err.message);
        let sql = self.last_query();

        if is_connection_lost_message(&err.message) {
            warn!(errno = err.errno, "connection lost: {}", err.message);
            self.needs_reconnect = true;
        }

        self.track.push(
            TrackKind::Debug,
            format!("[{}] {} with statement -> {sql}", err.errno, err.message),
        );
        self.registry.notify(&QueryEvent {
            sql: sql.clone(),
            runtime: started.elapsed(),
            affected_rows: 0,
            errno: Some(err.errno),
        });

        if err.errno == ERRNO_TIMEOUT {
            self.needs_reconnect = true;
            return SqlMiddlewareDbError::QueryTimeout {
                errno: err.errno,
                message: err.message,
                sql,
            };
        }
        match stage {
            Stage::Prepare => SqlMiddlewareDbError::PrepareError {
                errno: err.errno,
                message: err.message,
                sql,
            },
            Stage::Execute => SqlMiddlewareDbError::ExecuteError {
                errno: err.errno,
                message: err.message,
                sql,
            },
        }
    }

    fn record_success(&mut self, outcome: &ExecResult, started: Instant) {
        let runtime = started.elapsed();
        self.affected_rows = outcome.affected_rows;
        if outcome.insert_id > 0 {
            self.insert_id = outcome.insert_id;
        }
        let sql = self.last_query();
        self.track.push(
            TrackKind::Statement,
            format!("{sql} [ RunTime:{:.6}s ]", runtime.as_secs_f64()),
        );
        self.registry.notify(&QueryEvent {
            sql,
            runtime,
            affected_rows: outcome.affected_rows,
            errno: None,
        });
    }

    /// Prepare `sql` without executing it.
    ///
    /// # Errors
    /// `ConnectError`, `PrepareError` or `QueryTimeout`.
    pub async fn prepare(
        &mut self,
        sql: &str,
        binds: &[RowValues],
        timeout: Option<Duration>,
    ) -> Result<PreparedStatement, SqlMiddlewareDbError> {
        self.connect(false).await?;
        self.begin_statement(sql, binds);
        let limit = self.effective_timeout(timeout);
        let started = Instant::now();
        match race(limit, self.client.prepare(sql, limit)).await {
            Ok(handle) => Ok(PreparedStatement {
                handle,
                sql: sql.to_string(),
                binds: binds.to_vec(),
            }),
            Err(err) => Err(self.statement_error(Stage::Prepare, err, started)),
        }
    }

    async fn execute_handle(
        &mut self,
        handle: StatementHandle,
        binds: &[RowValues],
        limit: Option<Duration>,
        started: Instant,
    ) -> Result<ExecResult, SqlMiddlewareDbError> {
        match race(limit, self.client.execute(handle, binds, limit)).await {
            Ok(outcome) => {
                self.record_success(&outcome, started);
                Ok(outcome)
            }
            Err(err) => Err(self.statement_error(Stage::Execute, err, started)),
        }
    }

    /// Prepare and execute `sql` with positional `binds`.
    ///
    /// `timeout` overrides the configured execute timeout for this call.
    ///
    /// # Errors
    /// `ConnectError`, `PrepareError`, `ExecuteError` or `QueryTimeout`; each
    /// statement error carries the reified SQL and the native code/text.
    pub async fn execute(
        &mut self,
        sql: &str,
        binds: &[RowValues],
        timeout: Option<Duration>,
    ) -> Result<ExecResult, SqlMiddlewareDbError> {
        let limit = self.effective_timeout(timeout);
        let started = Instant::now();
        let prepared = self.prepare(sql, binds, timeout).await?;
        self.execute_handle(prepared.handle, binds, limit, started)
            .await
    }

    /// Execute a statement returned by [`Connection::prepare`] or a `Handle` outcome.
    ///
    /// # Errors
    /// `ConnectError`, `ExecuteError` or `QueryTimeout`.
    pub async fn execute_prepared(
        &mut self,
        statement: &PreparedStatement,
        timeout: Option<Duration>,
    ) -> Result<ExecResult, SqlMiddlewareDbError> {
        self.connect(false).await?;
        self.begin_statement(&statement.sql, &statement.binds);
        let limit = self.effective_timeout(timeout);
        self.execute_handle(statement.handle, &statement.binds, limit, Instant::now())
            .await
    }

    /// Run `sql` without preparing it. No binds; the text goes out verbatim.
    ///
    /// # Errors
    /// `ConnectError`, `ExecuteError` or `QueryTimeout`.
    pub async fn query_unprepared(
        &mut self,
        sql: &str,
        timeout: Option<Duration>,
    ) -> Result<ResultSet, SqlMiddlewareDbError> {
        self.connect(false).await?;
        self.begin_statement(sql, &[]);
        let limit = self.effective_timeout(timeout);
        let started = Instant::now();
        match race(limit, self.client.query(sql, limit)).await {
            Ok(outcome) => {
                self.record_success(&outcome, started);
                Ok(outcome.rows)
            }
            Err(err) => Err(self.statement_error(Stage::Execute, err, started)),
        }
    }

    /// Execute a parameterized statement and return its rows.
    ///
    /// # Errors
    /// As [`Connection::execute`].
    pub async fn raw_query(
        &mut self,
        sql: &str,
        binds: &[RowValues],
    ) -> Result<ResultSet, SqlMiddlewareDbError> {
        Ok(self.execute(sql, binds, None).await?.rows)
    }

    /// First row of [`Connection::raw_query`]; no `LIMIT` is added.
    ///
    /// # Errors
    /// As [`Connection::execute`].
    pub async fn raw_query_one(
        &mut self,
        sql: &str,
        binds: &[RowValues],
    ) -> Result<Option<CustomDbRow>, SqlMiddlewareDbError> {
        let rows = self.raw_query(sql, binds).await?;
        Ok(rows.results.into_iter().next())
    }

    /// Escape through the native client, connecting first if needed.
    ///
    /// # Errors
    /// `ConnectError` when the session cannot be opened.
    pub async fn escape(&mut self, input: &str) -> Result<String, SqlMiddlewareDbError> {
        self.connect(false).await?;
        Ok(self.client.escape(input))
    }

    /// Run `EXPLAIN` for a statement and log the plan as an `[EXPLAIN]` entry.
    ///
    /// # Errors
    /// As [`Connection::execute`].
    pub async fn explain(
        &mut self,
        sql: &str,
        binds: &[RowValues],
    ) -> Result<ResultSet, SqlMiddlewareDbError> {
        let plan = self.raw_query(&format!("EXPLAIN {sql}"), binds).await?;
        let rendered: Vec<String> = plan
            .results
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(name, value)| {
                        format!("{name}={}", value.to_plain_string().unwrap_or_else(|| "NULL".into()))
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        let text = format!("{} => {}", crate::reify::reify(sql, binds), rendered.join("; "));
        self.track.push(TrackKind::Explain, text);
        Ok(plan)
    }

    /// Fetch `FOUND_ROWS()` after a `SQL_CALC_FOUND_ROWS` select.
    pub(crate) async fn fetch_total_count(&mut self) -> Result<u64, SqlMiddlewareDbError> {
        let limit = self.config.execute_timeout();
        let started = Instant::now();
        let outcome = match race(limit, self.client.query(FOUND_ROWS_SQL, limit)).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.statement_error(Stage::Execute, err, started)),
        };
        let count = outcome
            .rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(|value| match value {
                RowValues::Int(n) => u64::try_from(*n).ok(),
                other => other.to_plain_string().and_then(|s| s.parse().ok()),
            })
            .unwrap_or(0);
        debug!(count, "fetched FOUND_ROWS()");
        self.total_count = count;
        Ok(count)
    }
}
