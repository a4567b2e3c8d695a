//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{ConnectParams, PoolConfig};
pub use crate::connection::{
    ClientFactory, Connection, FieldBindType, FieldInfo, NativeClient, NativeError,
    PreparedStatement, Query, StatementHandle, TxFuture, field_bind_type, parse_sql_table,
};
pub use crate::error::SqlMiddlewareDbError;
pub use crate::pool::{ConfigAndPool, MiddlewarePool, MiddlewarePoolConnection, PoolStatus};
pub use crate::query_builder::{
    Clauses, CondValue, InsertVerb, QueryBuilder, SubQuery, Value, data,
};
pub use crate::registry::{QueryEvent, Registry, RegistryBuilder};
pub use crate::reify::reify;
pub use crate::results::{CustomDbRow, ExecResult, QueryOutcome, ResultSet};
pub use crate::track::{TrackContainer, TrackEntry, TrackKind};
pub use crate::types::{FieldCase, LockMethod, QueryAndParams, RowValues};
