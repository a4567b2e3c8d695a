use std::time::Duration;

use thiserror::Error;

/// Substrings of native error text that mean the transport is gone rather than
/// the statement being wrong.
pub(crate) const CONNECTION_LOST_MARKERS: &[&str] = &[
    "server has gone away",
    "no connection to the server",
    "Lost connection",
    "is dead or not enabled",
    "Error while sending",
    "decryption failed or bad record mac",
    "server closed the connection unexpectedly",
    "SSL connection has been closed unexpectedly",
    "Error writing data to the connection",
    "Resource deadlock avoided",
];

/// Case-insensitive match of `message` against [`CONNECTION_LOST_MARKERS`].
#[must_use]
pub fn is_connection_lost_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    CONNECTION_LOST_MARKERS
        .iter()
        .any(|marker| lowered.contains(&marker.to_lowercase()))
}

#[derive(Debug, Error)]
pub enum SqlMiddlewareDbError {
    #[error("[{errno}] connect to {target} failed: {message}")]
    ConnectError {
        target: String,
        errno: u32,
        message: String,
    },

    #[error("no connection became available within {0:?}")]
    PoolTimeout(Duration),

    #[error("connection pool is closed")]
    PoolClosed,

    #[error("[{errno}] Prepare Query Failed: {message} with statement -> {sql}")]
    PrepareError {
        errno: u32,
        message: String,
        sql: String,
    },

    #[error("[{errno}] Execute Statement Failed: {message} with statement -> {sql}")]
    ExecuteError {
        errno: u32,
        message: String,
        sql: String,
    },

    #[error("[{errno}] Execute Statement TimeOut: {message} with statement -> {sql}")]
    QueryTimeout {
        errno: u32,
        message: String,
        sql: String,
    },

    #[error("connection lost with a transaction open at depth {0}; the server discarded it")]
    TransactionLost(u32),

    #[error("Wrong query operation: {0}")]
    WrongOperation(String),

    #[error("QueryTable Not Set!")]
    TableNotSet,

    #[error("{0} condition is empty; pass force = true to run it against the whole table")]
    EmptyCondition(&'static str),

    #[error("Wrong JOIN type: {0}")]
    JoinType(String),

    #[error("Wrong order direction: {0}")]
    OrderDirection(String),

    #[error("Wrong query option: {0}")]
    WrongOption(String),

    #[error("Unknown scope: {0}")]
    UnknownScope(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlMiddlewareDbError {
    /// Native error code carried by connect/statement errors.
    #[must_use]
    pub fn errno(&self) -> Option<u32> {
        match self {
            Self::ConnectError { errno, .. }
            | Self::PrepareError { errno, .. }
            | Self::ExecuteError { errno, .. }
            | Self::QueryTimeout { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    /// Reified SQL text attached to a statement error.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::PrepareError { sql, .. }
            | Self::ExecuteError { sql, .. }
            | Self::QueryTimeout { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// True when the native error text denotes a dead transport.
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Self::ConnectError { message, .. }
            | Self::PrepareError { message, .. }
            | Self::ExecuteError { message, .. }
            | Self::QueryTimeout { message, .. } => is_connection_lost_message(message),
            _ => false,
        }
    }
}
