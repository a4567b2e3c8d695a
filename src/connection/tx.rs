use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use super::Connection;
use crate::error::SqlMiddlewareDbError;
use crate::types::{LockMethod, QueryAndParams};

/// Boxed unit of work handed to [`Connection::transaction`].
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SqlMiddlewareDbError>> + Send + 'a>>;

fn savepoint_name(depth: u32) -> String {
    format!("trans{depth}")
}

impl Connection {
    /// Open a transaction, or a savepoint when one is already open.
    ///
    /// Depth 1 issues `BEGIN`; depth N > 1 issues `SAVEPOINT transN` when the
    /// client supports savepoints and nothing otherwise.
    ///
    /// # Errors
    /// Statement errors from the server; the depth is restored on failure.
    pub async fn start(&mut self) -> Result<(), SqlMiddlewareDbError> {
        self.connect(false).await?;
        self.trans_depth += 1;
        let depth = self.trans_depth;
        let result = if depth == 1 {
            self.query_unprepared("BEGIN", None).await.map(drop)
        } else if self.client.supports_savepoints() {
            self.query_unprepared(&format!("SAVEPOINT {}", savepoint_name(depth)), None)
                .await
                .map(drop)
        } else {
            debug!(depth, "savepoints unsupported; nested start is a no-op");
            Ok(())
        };
        if result.is_err() {
            self.trans_depth -= 1;
        }
        result
    }

    /// Commit at depth 1; deeper levels only unwind the counter.
    ///
    /// # Errors
    /// `TransactionLost` when the session dropped since `start`; statement
    /// errors from `COMMIT`. The depth is decremented regardless.
    pub async fn commit(&mut self) -> Result<(), SqlMiddlewareDbError> {
        if self.trans_depth > 0 {
            self.connect(false).await?;
        }
        let depth = self.trans_depth;
        self.trans_depth = depth.saturating_sub(1);
        if depth == 1 {
            self.query_unprepared("COMMIT", None).await?;
        }
        Ok(())
    }

    /// Roll back the whole transaction at depth 1, or to the current
    /// savepoint when nested.
    ///
    /// # Errors
    /// `TransactionLost` when the session dropped since `start`; statement
    /// errors from the rollback. The depth is decremented regardless.
    pub async fn rollback(&mut self) -> Result<(), SqlMiddlewareDbError> {
        if self.trans_depth > 0 {
            self.connect(false).await?;
        }
        let depth = self.trans_depth;
        self.trans_depth = depth.saturating_sub(1);
        if depth == 1 {
            self.query_unprepared("ROLLBACK", None).await?;
        } else if depth > 1 && self.client.supports_savepoints() {
            self.query_unprepared(
                &format!("ROLLBACK TO SAVEPOINT {}", savepoint_name(depth)),
                None,
            )
            .await?;
        }
        Ok(())
    }

    /// Run `work` inside `start()`/`commit()`, rolling back and returning the
    /// original error if it fails.
    ///
    /// ```rust,no_run
    /// use mysql_middleware::prelude::*;
    ///
    /// # async fn demo(conn: &mut Connection) -> Result<(), SqlMiddlewareDbError> {
    /// let moved = conn
    ///     .transaction(|conn| {
    ///         Box::pin(async move {
    ///             conn.raw_query("UPDATE a SET n = n - 1 WHERE id = ?", &[1.into()]).await?;
    ///             conn.raw_query("UPDATE a SET n = n + 1 WHERE id = ?", &[2.into()]).await?;
    ///             Ok::<_, SqlMiddlewareDbError>(conn.affected_rows())
    ///         })
    ///     })
    ///     .await?;
    /// # let _ = moved;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// The error from `start`, from `work`, or from `commit`.
    pub async fn transaction<T, F>(&mut self, work: F) -> Result<T, SqlMiddlewareDbError>
    where
        F: for<'a> FnOnce(&'a mut Connection) -> TxFuture<'a, T>,
    {
        self.start().await?;
        match work(self).await {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!("rollback after failed unit of work also failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    /// Execute `statements` in order inside one (possibly nested) transaction.
    ///
    /// # Errors
    /// The first failing statement's error, after rolling back.
    pub async fn batch_query(
        &mut self,
        statements: &[QueryAndParams],
    ) -> Result<u64, SqlMiddlewareDbError> {
        if statements.is_empty() {
            return Ok(0);
        }
        self.start().await?;
        let mut affected = 0;
        for statement in statements {
            match self.execute(&statement.query, &statement.params, None).await {
                Ok(outcome) => affected += outcome.affected_rows,
                Err(err) => {
                    if let Err(rollback_err) = self.rollback().await {
                        warn!("rollback after failed batch also failed: {rollback_err}");
                    }
                    return Err(err);
                }
            }
        }
        self.commit().await?;
        Ok(affected)
    }

    pub fn set_lock_method(&mut self, method: LockMethod) {
        self.lock_method = method;
    }

    #[must_use]
    pub fn lock_method(&self) -> LockMethod {
        self.lock_method
    }

    /// `LOCK TABLES p_t1 READ, p_t2 READ` using the current lock method.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty table list; statement errors otherwise.
    pub async fn lock(&mut self, tables: &[&str]) -> Result<(), SqlMiddlewareDbError> {
        if tables.is_empty() {
            return Err(SqlMiddlewareDbError::InvalidArgument(
                "lock needs at least one table".into(),
            ));
        }
        let method = self.lock_method.as_sql();
        let list: Vec<String> = tables
            .iter()
            .map(|t| format!("{}{t} {method}", self.config.table_prefix))
            .collect();
        self.query_unprepared(&format!("LOCK TABLES {}", list.join(", ")), None)
            .await?;
        Ok(())
    }

    /// # Errors
    /// Statement errors from `UNLOCK TABLES`.
    pub async fn unlock(&mut self) -> Result<(), SqlMiddlewareDbError> {
        self.query_unprepared("UNLOCK TABLES", None).await?;
        Ok(())
    }
}
