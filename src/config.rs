use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SqlMiddlewareDbError;
use crate::types::FieldCase;

/// Settings shared read-only by every connection a pool creates.
///
/// Missing fields take their defaults, so `{}` is a valid config:
///
/// ```rust
/// use mysql_middleware::prelude::*;
///
/// let cfg = PoolConfig::from_json_str(r#"{"database": "app", "table_prefix": "p_"}"#).unwrap();
/// assert_eq!(cfg.host, "localhost");
/// assert_eq!(cfg.port, 3306);
/// assert_eq!(cfg.target(), "mysql://root@localhost:3306/app");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub charset: String,
    pub table_prefix: String,
    /// Return rows as name-keyed maps rather than positional arrays.
    pub fetch_mode: bool,
    /// Keep native column types instead of stringifying everything.
    pub strict_type: bool,
    pub connect_timeout_secs: Option<f64>,
    pub execute_timeout_secs: Option<f64>,
    /// Default wait budget for `acquire` when the caller passes none.
    pub wait_timeout_secs: Option<f64>,
    pub max_connect_retries: u32,
    pub max_size: usize,
    pub field_case: FieldCase,
    pub sql_log_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 3306,
            user: "root".into(),
            password: String::new(),
            database: String::new(),
            charset: "utf8".into(),
            table_prefix: String::new(),
            fetch_mode: true,
            strict_type: true,
            connect_timeout_secs: None,
            execute_timeout_secs: None,
            wait_timeout_secs: None,
            max_connect_retries: 1,
            max_size: 16,
            field_case: FieldCase::Natural,
            sql_log_capacity: 256,
        }
    }
}

/// Parameters handed to [`crate::connection::NativeClient::connect`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub charset: String,
    pub fetch_mode: bool,
    pub strict_type: bool,
    pub timeout: Option<Duration>,
}

fn seconds(value: Option<f64>) -> Option<Duration> {
    value
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(Duration::from_secs_f64)
}

impl PoolConfig {
    /// Parse a JSON document; absent keys keep their defaults.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::Json` on malformed input.
    pub fn from_json_str(json: &str) -> Result<Self, SqlMiddlewareDbError> {
        let cfg: PoolConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns `Io` when the file cannot be read, `Json` when it does not parse.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SqlMiddlewareDbError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    fn validate(&self) -> Result<(), SqlMiddlewareDbError> {
        if self.max_size == 0 {
            return Err(SqlMiddlewareDbError::ConfigError(
                "max_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        seconds(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn execute_timeout(&self) -> Option<Duration> {
        seconds(self.execute_timeout_secs)
    }

    #[must_use]
    pub fn wait_timeout(&self) -> Option<Duration> {
        seconds(self.wait_timeout_secs)
    }

    #[must_use]
    pub fn connect_params(&self) -> ConnectParams {
        ConnectParams {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            charset: self.charset.clone(),
            fetch_mode: self.fetch_mode,
            strict_type: self.strict_type,
            timeout: self.connect_timeout(),
        }
    }

    /// Connection target as shown in connect errors. The password never appears.
    #[must_use]
    pub fn target(&self) -> String {
        format!(
            "mysql://{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}
