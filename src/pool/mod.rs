//! Bounded leasing of connections.

mod connection;
mod manager;
mod types;

use std::sync::Arc;
use std::time::Duration;

use deadpool::Runtime;
use deadpool::managed::{PoolError, Timeouts};
use tracing::{debug, info};

pub use connection::MiddlewarePoolConnection;
pub use manager::ConnectionManager;
pub use types::{MiddlewarePool, PoolStatus};

use crate::config::PoolConfig;
use crate::connection::ClientFactory;
use crate::error::SqlMiddlewareDbError;
use crate::registry::Registry;

/// Configuration and connection pool for one server.
///
/// Cloning is cheap; clones share the same pool.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use mysql_middleware::prelude::*;
///
/// # async fn demo(factory: Arc<dyn ClientFactory>) -> Result<(), SqlMiddlewareDbError> {
/// let config = PoolConfig::from_json_str(r#"{"database": "app", "max_size": 4}"#)?;
/// let pool = ConfigAndPool::new(config, factory)?;
/// let mut conn = pool.acquire(Some(std::time::Duration::from_secs(2))).await?;
/// let rows = conn.query().table("users").where_in("id", [1, 2]).select().await?;
/// # let _ = rows;
/// pool.release(conn);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ConfigAndPool {
    /// The connection pool
    pub pool: MiddlewarePool,
    pub config: Arc<PoolConfig>,
}

impl ConfigAndPool {
    /// Pool with an empty registry.
    ///
    /// # Errors
    /// `ConfigError` when the pool cannot be built.
    pub fn new(
        config: PoolConfig,
        factory: Arc<dyn ClientFactory>,
    ) -> Result<Self, SqlMiddlewareDbError> {
        Self::with_registry(config, factory, Registry::empty())
    }

    /// Pool whose connections share `registry`.
    ///
    /// # Errors
    /// `ConfigError` when `max_size` is zero or the pool cannot be built.
    pub fn with_registry(
        config: PoolConfig,
        factory: Arc<dyn ClientFactory>,
        registry: Arc<Registry>,
    ) -> Result<Self, SqlMiddlewareDbError> {
        if config.max_size == 0 {
            return Err(SqlMiddlewareDbError::ConfigError(
                "max_size must be at least 1".into(),
            ));
        }
        let config = Arc::new(config);
        let manager = ConnectionManager::new(config.clone(), factory, registry);
        let pool = MiddlewarePool::builder(manager)
            .max_size(config.max_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| SqlMiddlewareDbError::ConfigError(format!("failed to build pool: {e}")))?;
        info!(dsn = %config.target(), max_size = config.max_size, "pool ready");
        Ok(Self { pool, config })
    }

    /// Lease a connection, waiting at most `wait` (the configured
    /// `wait_timeout_secs` when `None`, forever when neither is set).
    ///
    /// # Errors
    /// `PoolTimeout` when the budget elapses, `PoolClosed` after [`close`](Self::close),
    /// or the error that made the lease's revalidation fail.
    pub async fn acquire(
        &self,
        wait: Option<Duration>,
    ) -> Result<MiddlewarePoolConnection, SqlMiddlewareDbError> {
        let wait = wait.or_else(|| self.config.wait_timeout());
        let mut timeouts = Timeouts::default();
        timeouts.wait = wait;
        match self.pool.timeout_get(&timeouts).await {
            Ok(conn) => Ok(MiddlewarePoolConnection::new(conn)),
            Err(PoolError::Timeout(_)) => {
                debug!(?wait, "pool wait budget exhausted");
                Err(SqlMiddlewareDbError::PoolTimeout(wait.unwrap_or_default()))
            }
            Err(PoolError::Backend(err)) => Err(err),
            Err(PoolError::Closed) => Err(SqlMiddlewareDbError::PoolClosed),
            Err(other) => Err(SqlMiddlewareDbError::Other(other.to_string())),
        }
    }

    /// [`acquire`](Self::acquire) with the configured wait budget.
    ///
    /// # Errors
    /// As [`acquire`](Self::acquire).
    pub async fn get_connection(&self) -> Result<MiddlewarePoolConnection, SqlMiddlewareDbError> {
        self.acquire(None).await
    }

    /// Hand a lease back. Leftover clause state is discarded first; the
    /// longest-waiting `acquire` is woken.
    pub fn release(&self, mut conn: MiddlewarePoolConnection) {
        conn.clear_builder();
        drop(conn);
    }

    /// Close idle connections unused for longer than `max_idle`; returns how
    /// many were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let result = self
            .pool
            .retain(|_, metrics| metrics.last_used() < max_idle);
        let removed = result.removed.len();
        if removed > 0 {
            info!(removed, "evicted idle connections");
        }
        removed
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Refuse new leases and drop idle connections. Outstanding leases are
    /// dropped on release.
    pub fn close(&self) {
        self.pool.close();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
