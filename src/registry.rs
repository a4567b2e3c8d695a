use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SqlMiddlewareDbError;
use crate::query_builder::BuilderState;
use crate::types::RowValues;

/// Named clause bundle applied through `Clauses::scope`.
pub type ScopeHandler =
    Arc<dyn Fn(&mut BuilderState, &[RowValues]) -> Result<(), SqlMiddlewareDbError> + Send + Sync>;

/// Callback fired after every statement a connection executes.
pub type QueryListener = Arc<dyn Fn(&QueryEvent) + Send + Sync>;

/// What listeners receive once a statement finishes.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    /// Reified statement text
    pub sql: String,
    pub runtime: Duration,
    pub affected_rows: u64,
    pub errno: Option<u32>,
}

/// Scopes and listeners, frozen before the pool hands out its first connection.
///
/// ```rust
/// use mysql_middleware::prelude::*;
///
/// let registry = RegistryBuilder::new()
///     .register_scope("active", |state, _args| {
///         state.and_where("status", "=", 1);
///         Ok(())
///     })
///     .build();
/// assert!(registry.scope("active").is_some());
/// ```
#[derive(Default)]
pub struct Registry {
    scopes: HashMap<String, ScopeHandler>,
    listeners: Vec<QueryListener>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.scopes.keys().collect();
        names.sort();
        f.debug_struct("Registry")
            .field("scopes", &names)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Registry {
    /// Registry with nothing registered.
    #[must_use]
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn scope(&self, name: &str) -> Option<&ScopeHandler> {
        self.scopes.get(name)
    }

    pub(crate) fn apply_scope(
        &self,
        name: &str,
        state: &mut BuilderState,
        args: &[RowValues],
    ) -> Result<(), SqlMiddlewareDbError> {
        let handler = self
            .scopes
            .get(name)
            .ok_or_else(|| SqlMiddlewareDbError::UnknownScope(name.to_string()))?;
        handler(state, args)
    }

    pub(crate) fn notify(&self, event: &QueryEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    inner: Registry,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Later registrations under the same name replace earlier ones.
    #[must_use]
    pub fn register_scope<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut BuilderState, &[RowValues]) -> Result<(), SqlMiddlewareDbError>
            + Send
            + Sync
            + 'static,
    {
        self.inner.scopes.insert(name.into(), Arc::new(handler));
        self
    }

    #[must_use]
    pub fn on_query<F>(mut self, listener: F) -> Self
    where
        F: Fn(&QueryEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.push(Arc::new(listener));
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<Registry> {
        Arc::new(self.inner)
    }
}
