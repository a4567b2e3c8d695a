use std::ops::{Deref, DerefMut};

use deadpool::managed::Object;

use super::manager::ConnectionManager;
use crate::connection::Connection;

/// Exclusive lease on a pooled [`Connection`].
///
/// Dropping the lease returns the connection to the pool; the next holder
/// gets it only after [`Connection::before_use`] succeeds.
pub struct MiddlewarePoolConnection {
    conn: Object<ConnectionManager>,
}

impl MiddlewarePoolConnection {
    pub(crate) fn new(conn: Object<ConnectionManager>) -> Self {
        Self { conn }
    }

    /// Take the connection out of the pool for good; the slot is freed.
    #[must_use]
    pub fn detach(self) -> Connection {
        Object::take(self.conn)
    }
}

impl std::fmt::Debug for MiddlewarePoolConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MiddlewarePoolConnection")
            .field(&*self.conn)
            .finish()
    }
}

impl Deref for MiddlewarePoolConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for MiddlewarePoolConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
