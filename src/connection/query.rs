use std::sync::Arc;
use std::time::Duration;

use super::Connection;
use crate::error::SqlMiddlewareDbError;
use crate::query_builder::{
    BuilderState, Clauses, InsertVerb, Value, compile_delete, compile_insert, compile_select,
    compile_update, data,
};
use crate::registry::Registry;
use crate::results::{CustomDbRow, ExecResult, QueryOutcome, ResultSet};
use crate::types::{QueryAndParams, RowValues};

/// Connection-bound builder.
///
/// Clause methods come from [`Clauses`]; the terminal calls below compile,
/// execute and clear the clause state whether they succeed or not.
pub struct Query<'c> {
    conn: &'c mut Connection,
    timeout: Option<Duration>,
    fetch_handle: bool,
}

impl<'c> Query<'c> {
    pub(crate) fn new(conn: &'c mut Connection) -> Self {
        Self {
            conn,
            timeout: None,
            fetch_handle: false,
        }
    }

    /// Per-call execute timeout, overriding the configured default.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Make `select` return a prepared handle instead of rows.
    pub fn fetch_handle(&mut self) -> &mut Self {
        self.fetch_handle = true;
        self
    }

    /// Compile the current SELECT without executing or clearing anything.
    ///
    /// # Errors
    /// Compile errors.
    pub fn to_sql(&self) -> Result<QueryAndParams, SqlMiddlewareDbError> {
        compile_select(&self.conn.builder)
    }

    fn take_state(&mut self) -> BuilderState {
        self.conn.builder.take()
    }

    async fn run(&mut self, compiled: &QueryAndParams) -> Result<ExecResult, SqlMiddlewareDbError> {
        self.conn
            .execute(&compiled.query, &compiled.params, self.timeout)
            .await
    }

    /// Execute the SELECT.
    ///
    /// # Errors
    /// Compile errors before any I/O; statement errors afterwards.
    pub async fn select(&mut self) -> Result<QueryOutcome, SqlMiddlewareDbError> {
        let state = self.take_state();
        let compiled = compile_select(&state)?;
        if self.fetch_handle {
            let prepared = self
                .conn
                .prepare(&compiled.query, &compiled.params, self.timeout)
                .await?;
            return Ok(QueryOutcome::Handle(prepared));
        }
        let outcome = self.run(&compiled).await?;
        if state.wants_total_count() {
            self.conn.fetch_total_count().await?;
        }
        Ok(QueryOutcome::Rows(outcome.rows))
    }

    async fn select_rows(&mut self) -> Result<ResultSet, SqlMiddlewareDbError> {
        self.fetch_handle = false;
        match self.select().await? {
            QueryOutcome::Rows(rows) => Ok(rows),
            QueryOutcome::Handle(_) | QueryOutcome::Deferred(_) => Ok(ResultSet::default()),
        }
    }

    /// `LIMIT 1` and return the first row.
    ///
    /// # Errors
    /// As [`Query::select`].
    pub async fn find(&mut self) -> Result<Option<CustomDbRow>, SqlMiddlewareDbError> {
        self.limit(1);
        let rows = self.select_rows().await?;
        Ok(rows.results.into_iter().next())
    }

    /// First row's `column`.
    ///
    /// # Errors
    /// As [`Query::select`].
    pub async fn value(&mut self, column: &str) -> Result<Option<RowValues>, SqlMiddlewareDbError> {
        self.fields(&[column]).limit(1);
        let rows = self.select_rows().await?;
        Ok(rows.first().and_then(|row| row.get(column)).cloned())
    }

    /// Every row's `column`.
    ///
    /// # Errors
    /// As [`Query::select`].
    pub async fn column(&mut self, column: &str) -> Result<Vec<RowValues>, SqlMiddlewareDbError> {
        self.fields(&[column]);
        let rows = self.select_rows().await?;
        Ok(rows.column(column))
    }

    async fn insert_with<I, K, V>(
        &mut self,
        verb: InsertVerb,
        row: I,
    ) -> Result<u64, SqlMiddlewareDbError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let state = self.take_state();
        let row = data(row);
        let compiled = compile_insert(&state, verb, &row)?;
        let outcome = self.run(&compiled).await?;
        Ok(outcome.insert_id)
    }

    /// Insert one row and return the generated id (0 when none).
    ///
    /// # Errors
    /// Compile errors before any I/O; statement errors afterwards.
    pub async fn insert<I, K, V>(&mut self, row: I) -> Result<u64, SqlMiddlewareDbError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.insert_with(InsertVerb::Insert, row).await
    }

    /// # Errors
    /// As [`Query::insert`].
    pub async fn replace<I, K, V>(&mut self, row: I) -> Result<u64, SqlMiddlewareDbError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.insert_with(InsertVerb::Replace, row).await
    }

    /// Update matching rows and return the affected count.
    ///
    /// # Errors
    /// `EmptyCondition` when there is no WHERE and `force` is false; nothing
    /// reaches the server in that case.
    pub async fn update<I, K, V>(&mut self, row: I, force: bool) -> Result<u64, SqlMiddlewareDbError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let state = self.take_state();
        let row = data(row);
        let compiled = compile_update(&state, &row, force)?;
        Ok(self.run(&compiled).await?.affected_rows)
    }

    /// Delete matching rows and return the affected count.
    ///
    /// # Errors
    /// `EmptyCondition` when there is no WHERE and `force` is false.
    pub async fn delete(&mut self, force: bool) -> Result<u64, SqlMiddlewareDbError> {
        let state = self.take_state();
        let compiled = compile_delete(&state, force)?;
        Ok(self.run(&compiled).await?.affected_rows)
    }
}

impl Clauses for Query<'_> {
    fn state_mut(&mut self) -> &mut BuilderState {
        &mut self.conn.builder
    }

    fn registry(&self) -> Option<Arc<Registry>> {
        Some(self.conn.registry().clone())
    }
}
