//! Clause accumulation and compilation into `(sql, binds)`.
//!
//! Nothing here touches the network. A [`QueryBuilder`] is the detached
//! flavour used for sub-queries and offline compilation; the connection-bound
//! flavour lives in `crate::connection::Query` and shares the [`Clauses`] trait.

mod binding;
mod clauses;
mod condition;
mod dml;
mod select;
pub(crate) mod state;

use std::sync::Arc;

pub use binding::{SubQuery, Value};
pub use clauses::Clauses;
pub use condition::{CondValue, Condition, Logic};
pub use dml::{InsertVerb, compile_delete, compile_insert, compile_update, data};
pub use select::compile_select;
pub use state::{
    BuilderState, Join, JoinTarget, Limit, LockClause, OnDuplicate, OrderDirection,
};

use crate::error::SqlMiddlewareDbError;
use crate::registry::Registry;
use crate::results::QueryOutcome;
use crate::types::QueryAndParams;

/// Detached builder: compiles but never executes.
///
/// ```rust
/// use mysql_middleware::prelude::*;
///
/// # fn demo() -> Result<(), SqlMiddlewareDbError> {
/// let mut inner = QueryBuilder::sub_query("");
/// inner.table("banned").fields(&["user_id"]).and_where("reason", "=", "spam");
/// let sub = inner.get_sub_query()?;
///
/// let mut outer = QueryBuilder::new("");
/// outer.table("users").and_where("age", ">", 18).where_not_in("id", sub);
/// let q = outer.compile_select()?;
/// assert_eq!(
///     q.query,
///     "SELECT * FROM users WHERE age > ? AND id not in (SELECT user_id FROM banned WHERE reason = ?)"
/// );
/// assert_eq!(q.params.len(), 2);
/// # Ok(())
/// # }
/// # demo().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    state: BuilderState,
    alias: Option<String>,
    registry: Option<Arc<Registry>>,
}

impl QueryBuilder {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            state: BuilderState::new(prefix),
            alias: None,
            registry: None,
        }
    }

    /// Builder whose output is embedded in a parent query, optionally aliased.
    #[must_use]
    pub fn sub_query(alias: &str) -> Self {
        Self {
            state: BuilderState::default(),
            alias: (!alias.is_empty()).then(|| alias.to_string()),
            registry: None,
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.state.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// # Errors
    /// See [`compile_select`].
    pub fn compile_select(&self) -> Result<QueryAndParams, SqlMiddlewareDbError> {
        compile_select(&self.state)
    }

    /// # Errors
    /// See [`compile_insert`].
    pub fn compile_insert(
        &self,
        verb: InsertVerb,
        row: &[(String, Value)],
    ) -> Result<QueryAndParams, SqlMiddlewareDbError> {
        compile_insert(&self.state, verb, row)
    }

    /// # Errors
    /// See [`compile_update`].
    pub fn compile_update(
        &self,
        row: &[(String, Value)],
        force: bool,
    ) -> Result<QueryAndParams, SqlMiddlewareDbError> {
        compile_update(&self.state, row, force)
    }

    /// # Errors
    /// See [`compile_delete`].
    pub fn compile_delete(&self, force: bool) -> Result<QueryAndParams, SqlMiddlewareDbError> {
        compile_delete(&self.state, force)
    }

    /// Compile the SELECT and freeze it; the builder is cleared afterwards.
    ///
    /// # Errors
    /// See [`compile_select`]. The builder is cleared on failure too.
    pub fn get_sub_query(&mut self) -> Result<SubQuery, SqlMiddlewareDbError> {
        let state = self.state.take();
        let compiled = compile_select(&state)?;
        Ok(SubQuery {
            sql: compiled.query,
            binds: compiled.params,
            alias: self.alias.clone(),
        })
    }

    /// # Errors
    /// See [`compile_select`].
    pub fn into_sub_query(mut self) -> Result<SubQuery, SqlMiddlewareDbError> {
        self.get_sub_query()
    }

    /// Detached builders never execute: the result is always `Deferred`.
    ///
    /// # Errors
    /// See [`compile_select`].
    pub fn select(&mut self) -> Result<QueryOutcome, SqlMiddlewareDbError> {
        Ok(QueryOutcome::Deferred(self.get_sub_query()?))
    }
}

impl Clauses for QueryBuilder {
    fn state_mut(&mut self) -> &mut BuilderState {
        &mut self.state
    }

    fn registry(&self) -> Option<Arc<Registry>> {
        self.registry.clone()
    }
}
