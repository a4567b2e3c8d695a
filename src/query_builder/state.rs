use lazy_static::lazy_static;
use regex::Regex;

use super::binding::{SubQuery, Value};
use super::condition::Condition;

lazy_static! {
    /// Characters allowed in an ORDER BY expression.
    pub(crate) static ref ORDER_FIELD_RE: Regex =
        Regex::new(r#"(?i)[^ \-a-z0-9.(),_`*'"]+"#).expect("valid order-by pattern");
    /// Characters allowed in a FIELD() custom ordering value.
    pub(crate) static ref ORDER_VALUE_RE: Regex =
        Regex::new(r"(?i)[^\x{80}-\x{10FFFF}\-a-z0-9.(),_` ]+").expect("valid order-value pattern");
    /// Characters allowed in a GROUP BY expression.
    pub(crate) static ref GROUP_FIELD_RE: Regex =
        Regex::new(r"(?i)[^\-a-z0-9.(),_* <>=!]+").expect("valid group-by pattern");
    /// A backtick-quoted table qualifier, e.g. `` `users`. ``
    pub(crate) static ref QUOTED_TABLE_RE: Regex =
        Regex::new(r"(`)([`a-zA-Z0-9_]*\.)").expect("valid table qualifier pattern");
    pub(crate) static ref INTERVAL_RE: Regex =
        Regex::new(r"([+-]?) ?([0-9]+) ?([a-zA-Z]?)").expect("valid interval pattern");
}

pub(crate) const ALLOWED_JOIN_TYPES: &[&str] = &[
    "LEFT",
    "RIGHT",
    "OUTER",
    "INNER",
    "LEFT OUTER",
    "RIGHT OUTER",
    "NATURAL",
];

pub(crate) const ALLOWED_OPTIONS: &[&str] = &[
    "ALL",
    "DISTINCT",
    "DISTINCTROW",
    "HIGH_PRIORITY",
    "STRAIGHT_JOIN",
    "SQL_SMALL_RESULT",
    "SQL_BIG_RESULT",
    "SQL_BUFFER_RESULT",
    "SQL_CACHE",
    "SQL_NO_CACHE",
    "SQL_CALC_FOUND_ROWS",
    "LOW_PRIORITY",
    "IGNORE",
    "QUICK",
    "FOR UPDATE",
    "LOCK IN SHARE MODE",
];

pub(crate) const CALC_FOUND_ROWS: &str = "SQL_CALC_FOUND_ROWS";

#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    Table(String),
    SubQuery(SubQuery),
}

impl From<&str> for JoinTarget {
    fn from(value: &str) -> Self {
        JoinTarget::Table(value.to_string())
    }
}

impl From<String> for JoinTarget {
    fn from(value: String) -> Self {
        JoinTarget::Table(value)
    }
}

impl From<SubQuery> for JoinTarget {
    fn from(value: SubQuery) -> Self {
        JoinTarget::SubQuery(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Upper-cased, validated join type; empty for a plain `JOIN`.
    pub kind: String,
    pub target: JoinTarget,
    pub condition: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: Option<u64>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnDuplicate {
    /// `None` re-uses the value being inserted for that column.
    pub columns: Vec<(String, Option<Value>)>,
    pub last_insert_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockClause {
    ForUpdate,
    ShareMode,
}

impl LockClause {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            LockClause::ForUpdate => "FOR UPDATE",
            LockClause::ShareMode => "LOCK IN SHARE MODE",
        }
    }
}

/// Clause accumulator for one logical query.
///
/// Cleared after every executed statement; only the table prefix survives
/// a [`BuilderState::reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderState {
    pub(crate) prefix: String,
    pub(crate) table: Option<String>,
    pub(crate) columns: String,
    pub(crate) joins: Vec<Join>,
    /// Extra `on` conditions keyed by the prefixed join table name.
    pub(crate) join_wheres: Vec<(String, Condition)>,
    pub(crate) wheres: Vec<Condition>,
    pub(crate) havings: Vec<Condition>,
    pub(crate) group_by: Vec<String>,
    /// Insertion-ordered; re-adding a field replaces its direction in place.
    pub(crate) order_by: Vec<(String, Option<OrderDirection>)>,
    pub(crate) limit: Option<Limit>,
    pub(crate) on_duplicate: Option<OnDuplicate>,
    pub(crate) options: Vec<String>,
    pub(crate) lock: Option<LockClause>,
}

impl Default for BuilderState {
    fn default() -> Self {
        Self::new("")
    }
}

impl BuilderState {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            table: None,
            columns: "*".to_string(),
            joins: Vec::new(),
            join_wheres: Vec::new(),
            wheres: Vec::new(),
            havings: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            on_duplicate: None,
            options: Vec::new(),
            lock: None,
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Clear every clause, keeping the prefix.
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.prefix));
    }

    /// Move the accumulated clauses out, leaving a fresh state behind.
    pub fn take(&mut self) -> BuilderState {
        let fresh = Self::new(self.prefix.clone());
        std::mem::replace(self, fresh)
    }

    /// True once any clause beyond the prefix has been recorded.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        *self != Self::new(self.prefix.clone())
    }

    /// True when at least one WHERE entry will actually render.
    #[must_use]
    pub fn has_effective_where(&self) -> bool {
        self.wheres.iter().any(|c| !c.is_unset())
    }

    #[must_use]
    pub fn wants_total_count(&self) -> bool {
        self.options.iter().any(|o| o == CALC_FOUND_ROWS)
    }

    /// Prefix a table name unless it is schema-qualified.
    #[must_use]
    pub fn prefixed(&self, table: &str) -> String {
        if self.prefix.is_empty() || table.contains('.') {
            table.to_string()
        } else {
            format!("{}{table}", self.prefix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_prefix_only() {
        let mut state = BuilderState::new("p_");
        state.table = Some("users".into());
        state.options.push("DISTINCT".into());
        assert!(state.is_dirty());
        let taken = state.take();
        assert_eq!(taken.table.as_deref(), Some("users"));
        assert!(!state.is_dirty());
        assert_eq!(state.prefix(), "p_");
    }

    #[test]
    fn schema_qualified_tables_skip_prefix() {
        let state = BuilderState::new("p_");
        assert_eq!(state.prefixed("users u"), "p_users u");
        assert_eq!(state.prefixed("information_schema.tables"), "information_schema.tables");
    }
}
