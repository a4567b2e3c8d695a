use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ConnectParams;
use crate::results::ExecResult;
use crate::types::RowValues;

/// Errno the server reports when a statement hits its execution deadline.
pub const ERRNO_TIMEOUT: u32 = 110;

/// Error text and code exactly as the native client reported them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub errno: u32,
    pub message: String,
}

impl NativeError {
    pub fn new(errno: u32, message: impl Into<String>) -> Self {
        Self {
            errno,
            message: message.into(),
        }
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.errno, self.message)
    }
}

/// Opaque id of a server-side prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementHandle(pub u64);

/// The wire-protocol driver a [`super::Connection`] drives.
///
/// Implementations own one socket. Timeouts are advisory hints for the
/// driver; the connection also races every call against its own deadline.
#[async_trait]
pub trait NativeClient: Send {
    async fn connect(&mut self, params: &ConnectParams) -> Result<(), NativeError>;

    fn connected(&self) -> bool;

    async fn prepare(
        &mut self,
        sql: &str,
        timeout: Option<Duration>,
    ) -> Result<StatementHandle, NativeError>;

    async fn execute(
        &mut self,
        statement: StatementHandle,
        binds: &[RowValues],
        timeout: Option<Duration>,
    ) -> Result<ExecResult, NativeError>;

    /// Run a statement without preparing it.
    async fn query(
        &mut self,
        sql: &str,
        timeout: Option<Duration>,
    ) -> Result<ExecResult, NativeError>;

    /// Escape a string for inclusion in a quoted literal.
    fn escape(&self, input: &str) -> String;

    async fn close(&mut self);

    /// Whether `SAVEPOINT` can emulate nested transactions.
    fn supports_savepoints(&self) -> bool {
        true
    }
}

/// Builds a fresh, unconnected client for each pooled connection.
pub trait ClientFactory: Send + Sync {
    fn create_client(&self) -> Box<dyn NativeClient>;
}

impl<F> ClientFactory for F
where
    F: Fn() -> Box<dyn NativeClient> + Send + Sync,
{
    fn create_client(&self) -> Box<dyn NativeClient> {
        self()
    }
}
