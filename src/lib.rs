//! Async MySQL client layer: a bounded connection pool, a fluent query
//! compiler producing `(sql, binds)`, and connections with retrying connect,
//! connection-loss detection and savepoint-based nested transactions.
//!
//! The wire protocol itself is supplied by a [`connection::NativeClient`]
//! implementation handed to the pool through a [`connection::ClientFactory`].

pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod prelude;
pub mod query_builder;
pub mod registry;
pub mod reify;
pub mod results;
pub mod track;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::SqlMiddlewareDbError;
pub use reify::reify;
pub use types::{QueryAndParams, RowValues};
