//! Scripted in-memory [`NativeClient`] for exercising connections and pools
//! without a server.
//!
//! A [`Script`] is shared by every client it creates, so tests can queue
//! failures and canned rows up front and inspect the traffic afterwards.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ConnectParams, PoolConfig};
use crate::connection::{ClientFactory, Connection, NativeClient, NativeError, StatementHandle};
use crate::registry::Registry;
use crate::results::{ExecResult, ResultSet};
use crate::types::RowValues;

/// Errno the scripted client reports for refused connects.
pub const ERRNO_CONNECT_REFUSED: u32 = 2002;

#[derive(Debug)]
struct ScriptState {
    statements: Vec<String>,
    executed: Vec<(String, Vec<RowValues>)>,
    connect_attempts: u32,
    clients_created: usize,
    fail_connects: u32,
    prepare_failures: VecDeque<NativeError>,
    execute_failures: VecDeque<NativeError>,
    responses: Vec<(String, ResultSet)>,
    execute_delay: Option<Duration>,
    affected_rows: u64,
    insert_id: u64,
    savepoints: bool,
}

impl Default for ScriptState {
    fn default() -> Self {
        Self {
            statements: Vec::new(),
            executed: Vec::new(),
            connect_attempts: 0,
            clients_created: 0,
            fail_connects: 0,
            prepare_failures: VecDeque::new(),
            execute_failures: VecDeque::new(),
            responses: Vec::new(),
            execute_delay: None,
            affected_rows: 0,
            insert_id: 0,
            savepoints: true,
        }
    }
}

impl ScriptState {
    fn outcome_for(&self, sql: &str) -> ExecResult {
        let upper = sql.to_ascii_uppercase();
        let rows = self
            .responses
            .iter()
            .filter(|(prefix, _)| upper.starts_with(&prefix.to_ascii_uppercase()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, rows)| rows.clone());
        match rows {
            Some(rows) => ExecResult {
                affected_rows: rows.len() as u64,
                insert_id: 0,
                rows,
            },
            None => ExecResult {
                rows: ResultSet::default(),
                affected_rows: self.affected_rows,
                insert_id: self.insert_id,
            },
        }
    }
}

/// Shared script driving every [`ScriptedClient`] it hands out.
#[derive(Debug, Clone, Default)]
pub struct Script {
    inner: Arc<Mutex<ScriptState>>,
}

impl Script {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse the next `n` connect attempts.
    pub fn fail_connects(&self, n: u32) -> &Self {
        self.state().fail_connects = n;
        self
    }

    pub fn fail_next_prepare(&self, errno: u32, message: &str) -> &Self {
        self.state()
            .prepare_failures
            .push_back(NativeError::new(errno, message));
        self
    }

    /// Fail the next execute or unprepared query.
    pub fn fail_next_execute(&self, errno: u32, message: &str) -> &Self {
        self.state()
            .execute_failures
            .push_back(NativeError::new(errno, message));
        self
    }

    /// Return `rows` for statements starting with `prefix` (case-insensitive,
    /// longest prefix wins).
    pub fn respond(&self, prefix: &str, rows: ResultSet) -> &Self {
        self.state().responses.push((prefix.to_string(), rows));
        self
    }

    /// Sleep this long inside every execute.
    pub fn delay_execute(&self, delay: Duration) -> &Self {
        self.state().execute_delay = Some(delay);
        self
    }

    pub fn set_affected_rows(&self, n: u64) -> &Self {
        self.state().affected_rows = n;
        self
    }

    pub fn set_insert_id(&self, id: u64) -> &Self {
        self.state().insert_id = id;
        self
    }

    pub fn without_savepoints(&self) -> &Self {
        self.state().savepoints = false;
        self
    }

    /// Every SQL text the clients were asked to prepare or run, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.state().statements.clone()
    }

    /// Executions with their binds; unprepared queries appear with no binds.
    #[must_use]
    pub fn executed(&self) -> Vec<(String, Vec<RowValues>)> {
        self.state().executed.clone()
    }

    #[must_use]
    pub fn connect_attempts(&self) -> u32 {
        self.state().connect_attempts
    }

    #[must_use]
    pub fn clients_created(&self) -> usize {
        self.state().clients_created
    }

    /// Forget recorded traffic; queued failures and responses stay.
    pub fn clear_log(&self) {
        let mut state = self.state();
        state.statements.clear();
        state.executed.clear();
    }

    /// Unpooled connection backed by a fresh scripted client.
    #[must_use]
    pub fn connection(&self, config: PoolConfig) -> Connection {
        Connection::new(self.create_client(), Arc::new(config), Registry::empty())
    }

    /// As [`Script::connection`], sharing `registry`.
    #[must_use]
    pub fn connection_with_registry(&self, config: PoolConfig, registry: Arc<Registry>) -> Connection {
        Connection::new(self.create_client(), Arc::new(config), registry)
    }
}

impl ClientFactory for Script {
    fn create_client(&self) -> Box<dyn NativeClient> {
        self.state().clients_created += 1;
        Box::new(ScriptedClient {
            script: self.clone(),
            connected: false,
            prepared: HashMap::new(),
            next_handle: 1,
        })
    }
}

/// One fake session. Statements are recorded on the owning [`Script`].
#[derive(Debug)]
pub struct ScriptedClient {
    script: Script,
    connected: bool,
    prepared: HashMap<u64, String>,
    next_handle: u64,
}

impl ScriptedClient {
    fn finish(&mut self, sql: &str, failure: Option<NativeError>) -> Result<ExecResult, NativeError> {
        if let Some(err) = failure {
            if crate::error::is_connection_lost_message(&err.message) {
                self.connected = false;
            }
            return Err(err);
        }
        Ok(self.script.state().outcome_for(sql))
    }
}

#[async_trait]
impl NativeClient for ScriptedClient {
    async fn connect(&mut self, _params: &ConnectParams) -> Result<(), NativeError> {
        let mut state = self.script.state();
        state.connect_attempts += 1;
        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(NativeError::new(
                ERRNO_CONNECT_REFUSED,
                "Can't connect to MySQL server",
            ));
        }
        self.connected = true;
        Ok(())
    }

    fn connected(&self) -> bool {
        self.connected
    }

    async fn prepare(
        &mut self,
        sql: &str,
        _timeout: Option<Duration>,
    ) -> Result<StatementHandle, NativeError> {
        let failure = {
            let mut state = self.script.state();
            state.statements.push(sql.to_string());
            state.prepare_failures.pop_front()
        };
        if let Some(err) = failure {
            return Err(err);
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.prepared.insert(handle, sql.to_string());
        Ok(StatementHandle(handle))
    }

    async fn execute(
        &mut self,
        statement: StatementHandle,
        binds: &[RowValues],
        _timeout: Option<Duration>,
    ) -> Result<ExecResult, NativeError> {
        let Some(sql) = self.prepared.get(&statement.0).cloned() else {
            return Err(NativeError::new(1243, "Unknown prepared statement handler"));
        };
        let delay = {
            let mut state = self.script.state();
            state.executed.push((sql.clone(), binds.to_vec()));
            state.execute_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.script.state().execute_failures.pop_front();
        self.finish(&sql, failure)
    }

    async fn query(
        &mut self,
        sql: &str,
        _timeout: Option<Duration>,
    ) -> Result<ExecResult, NativeError> {
        let failure = {
            let mut state = self.script.state();
            state.statements.push(sql.to_string());
            state.executed.push((sql.to_string(), Vec::new()));
            state.execute_failures.pop_front()
        };
        self.finish(sql, failure)
    }

    fn escape(&self, input: &str) -> String {
        crate::reify::add_slashes(input)
    }

    async fn close(&mut self) {
        self.connected = false;
        self.prepared.clear();
    }

    fn supports_savepoints(&self) -> bool {
        self.script.state().savepoints
    }
}
