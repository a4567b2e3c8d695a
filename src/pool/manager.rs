use std::fmt;
use std::sync::Arc;

use deadpool::managed::{Manager, Metrics, RecycleError, RecycleResult};
use tracing::debug;

use crate::config::PoolConfig;
use crate::connection::{ClientFactory, Connection};
use crate::error::SqlMiddlewareDbError;
use crate::registry::Registry;

/// deadpool manager that builds [`Connection`]s from a [`ClientFactory`].
///
/// New connections are not opened until their first statement; recycling
/// runs [`Connection::before_use`].
pub struct ConnectionManager {
    config: Arc<PoolConfig>,
    factory: Arc<dyn ClientFactory>,
    registry: Arc<Registry>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(
        config: Arc<PoolConfig>,
        factory: Arc<dyn ClientFactory>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            config,
            factory,
            registry,
        }
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("target", &self.config.target())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Manager for ConnectionManager {
    type Type = Connection;
    type Error = SqlMiddlewareDbError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        debug!(dsn = %self.config.target(), "creating pooled connection");
        Ok(Connection::new(
            self.factory.create_client(),
            self.config.clone(),
            self.registry.clone(),
        ))
    }

    async fn recycle(&self, conn: &mut Self::Type, _metrics: &Metrics) -> RecycleResult<Self::Error> {
        conn.before_use().await.map_err(|err| {
            debug!("dropping pooled connection that failed revalidation: {err}");
            RecycleError::Backend(err)
        })
    }
}
