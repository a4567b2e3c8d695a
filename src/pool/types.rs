use deadpool::managed::Pool;

use super::manager::ConnectionManager;

/// Bounded pool of [`crate::connection::Connection`]s.
///
/// Waiters are queued on a fair semaphore, so they are served in arrival order.
pub type MiddlewarePool = Pool<ConnectionManager>;

/// Snapshot of pool occupancy.
pub use deadpool::Status as PoolStatus;
