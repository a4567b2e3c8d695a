//! One leased session against the server.

mod client;
mod executor;
mod query;
mod schema;
mod tx;

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, info, warn};

pub use client::{ClientFactory, ERRNO_TIMEOUT, NativeClient, NativeError, StatementHandle};
pub use executor::PreparedStatement;
pub use query::Query;
pub use schema::{FieldBindType, FieldInfo, field_bind_type, parse_sql_table};
pub use tx::TxFuture;

use crate::config::PoolConfig;
use crate::error::SqlMiddlewareDbError;
use crate::query_builder::BuilderState;
use crate::registry::Registry;
use crate::track::TrackContainer;
use crate::types::{FieldCase, LockMethod, RowValues};

/// Errno used for connect failures the client reported without a code.
const ERRNO_CONNECT_TIMEOUT: u32 = 2013;

/// Exclusive session: one native client plus the per-call bookkeeping.
pub struct Connection {
    client: Box<dyn NativeClient>,
    config: Arc<PoolConfig>,
    registry: Arc<Registry>,
    pub(crate) builder: BuilderState,
    track: TrackContainer,
    retry_count: u32,
    needs_reconnect: bool,
    trans_depth: u32,
    field_case: FieldCase,
    lock_method: LockMethod,
    last_sql: String,
    last_binds: Vec<RowValues>,
    affected_rows: u64,
    insert_id: u64,
    total_count: u64,
    last_errno: u32,
    last_error: String,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("target", &self.config.target())
            .field("connected", &self.client.connected())
            .field("trans_depth", &self.trans_depth)
            .field("needs_reconnect", &self.needs_reconnect)
            .finish_non_exhaustive()
    }
}

impl Connection {
    #[must_use]
    pub fn new(
        client: Box<dyn NativeClient>,
        config: Arc<PoolConfig>,
        registry: Arc<Registry>,
    ) -> Self {
        let builder = BuilderState::new(config.table_prefix.clone());
        let track = TrackContainer::new(config.sql_log_capacity);
        let field_case = config.field_case;
        Self {
            client,
            config,
            registry,
            builder,
            track,
            retry_count: 0,
            needs_reconnect: false,
            trans_depth: 0,
            field_case,
            lock_method: LockMethod::Read,
            last_sql: String::new(),
            last_binds: Vec::new(),
            affected_rows: 0,
            insert_id: 0,
            total_count: 0,
            last_errno: 0,
            last_error: String::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.client.connected()
    }

    /// Set by connection-loss classification or a statement timeout.
    #[must_use]
    pub fn needs_reconnect(&self) -> bool {
        self.needs_reconnect
    }

    /// Connect attempts made since the last success.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Open the session.
    ///
    /// Without `force` this is a no-op on a live session. With `force` the
    /// current session is closed and the retry counter starts over. Failed
    /// attempts are retried up to `max_connect_retries` times.
    ///
    /// A session flagged as lost is reopened, but if it held an open
    /// transaction the depth is cleared and `TransactionLost` is returned so
    /// the caller does not keep writing outside the transaction it assumes.
    ///
    /// # Errors
    /// `ConnectError` with the target and the last native code/text once
    /// retries are exhausted. `TransactionLost` as described above.
    pub async fn connect(&mut self, force: bool) -> Result<(), SqlMiddlewareDbError> {
        let mut lost_depth = 0;
        if force {
            self.disconnect().await;
            self.retry_count = 0;
        } else if self.needs_reconnect {
            self.disconnect().await;
            lost_depth = self.trans_depth;
        } else if self.client.connected() {
            return Ok(());
        }

        let params = self.config.connect_params();
        let target = self.config.target();
        loop {
            let attempt = match params.timeout {
                Some(limit) => match timeout(limit, self.client.connect(&params)).await {
                    Ok(result) => result,
                    Err(_) => Err(NativeError::new(
                        ERRNO_CONNECT_TIMEOUT,
                        format!("connect timed out after {limit:?}"),
                    )),
                },
                None => self.client.connect(&params).await,
            };

            match attempt {
                Ok(()) => {
                    info!(dsn = %target, retries = self.retry_count, "connected");
                    self.retry_count = 0;
                    self.needs_reconnect = false;
                    if lost_depth > 0 {
                        warn!(
                            dsn = %target,
                            depth = lost_depth,
                            "open transaction lost with the session"
                        );
                        self.trans_depth = 0;
                        let err = SqlMiddlewareDbError::TransactionLost(lost_depth);
                        self.last_errno = 0;
                        self.last_error = err.to_string();
                        return Err(err);
                    }
                    return Ok(());
                }
                Err(err) if self.retry_count < self.config.max_connect_retries => {
                    self.retry_count += 1;
                    warn!(
                        dsn = %target,
                        attempt = self.retry_count,
                        errno = err.errno,
                        "connect failed, retrying: {}",
                        err.message
                    );
                }
                Err(err) => {
                    self.last_errno = err.errno;
                    self.last_error = err.message.clone();
                    return Err(SqlMiddlewareDbError::ConnectError {
                        target,
                        errno: err.errno,
                        message: err.message,
                    });
                }
            }
        }
    }

    pub async fn disconnect(&mut self) {
        if self.client.connected() {
            debug!(dsn = %self.config.target(), "closing connection");
            self.client.close().await;
        }
    }

    /// Prepare this connection for a new lease.
    ///
    /// Clears leftover clauses, reconnects a session flagged as lost or timed
    /// out, and rolls back a transaction the previous holder left open.
    ///
    /// # Errors
    /// Propagates a failed reconnect or rollback; the pool then discards the
    /// connection.
    pub async fn before_use(&mut self) -> Result<(), SqlMiddlewareDbError> {
        self.builder.reset();
        if self.needs_reconnect {
            debug!("revalidating connection flagged for reconnect");
            self.connect(true).await?;
            self.trans_depth = 0;
        }
        if self.trans_depth > 0 {
            warn!(
                depth = self.trans_depth,
                "connection returned with an open transaction; rolling back"
            );
            self.trans_depth = 1;
            self.rollback().await?;
        }
        Ok(())
    }

    /// Drop leftover clause state; called when the connection goes back to the pool.
    pub fn clear_builder(&mut self) {
        if self.builder.is_dirty() {
            debug!("discarding unfinished builder state");
        }
        self.builder.reset();
    }

    /// Builder bound to this connection. Clause state is consumed by the
    /// terminal call (`select`, `insert`, ...), success or not.
    pub fn query(&mut self) -> Query<'_> {
        Query::new(self)
    }

    #[must_use]
    pub fn field_case(&self) -> FieldCase {
        self.field_case
    }

    pub fn set_field_case(&mut self, case: FieldCase) {
        self.field_case = case;
    }

    #[must_use]
    pub fn trans_depth(&self) -> u32 {
        self.trans_depth
    }

    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    #[must_use]
    pub fn insert_id(&self) -> u64 {
        self.insert_id
    }

    /// `FOUND_ROWS()` of the last SELECT that asked for a total count.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Last statement with binds substituted, for display only.
    #[must_use]
    pub fn last_query(&self) -> String {
        crate::reify::reify(&self.last_sql, &self.last_binds)
    }

    #[must_use]
    pub fn last_error(&self) -> &str {
        self.last_error.trim()
    }

    #[must_use]
    pub fn last_errno(&self) -> u32 {
        self.last_errno
    }

    /// Code, text and statement of the last failure, or `None` after a success.
    #[must_use]
    pub fn get_error(&self) -> Option<String> {
        (self.last_errno != 0 || !self.last_error.is_empty()).then(|| {
            format!(
                "[{}] {} with statement -> {}",
                self.last_errno,
                self.last_error(),
                self.last_query()
            )
        })
    }

    #[must_use]
    pub fn sql_log(&self) -> &TrackContainer {
        &self.track
    }

    pub fn clear_sql_log(&mut self) {
        self.track.clear();
    }
}
