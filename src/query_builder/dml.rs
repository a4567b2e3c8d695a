use super::binding::Value;
use super::select::{DataClause, assemble, target_table};
use super::state::BuilderState;
use crate::error::SqlMiddlewareDbError;
use crate::types::QueryAndParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertVerb {
    Insert,
    Replace,
}

impl InsertVerb {
    fn as_sql(self) -> &'static str {
        match self {
            InsertVerb::Insert => "INSERT",
            InsertVerb::Replace => "REPLACE",
        }
    }
}

/// Collect `(column, value)` pairs into the owned form the compiler reads.
pub fn data<I, K, V>(pairs: I) -> Vec<(String, Value)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// `INSERT|REPLACE [options] INTO table (cols) VALUES (...) [ON DUPLICATE KEY UPDATE ...]`.
///
/// # Errors
/// `TableNotSet`, or `InvalidArgument` for an on-duplicate column with no value.
pub fn compile_insert(
    state: &BuilderState,
    verb: InsertVerb,
    row: &[(String, Value)],
) -> Result<QueryAndParams, SqlMiddlewareDbError> {
    let table = target_table(state)?;
    let mut parts = vec![verb.as_sql().to_string()];
    parts.extend(state.options.iter().cloned());
    parts.push("INTO".to_string());
    parts.push(table);
    assemble(state, parts, Some(DataClause::Values(row)))
}

/// `UPDATE [options] table SET ...`.
///
/// # Errors
/// `EmptyCondition` when no WHERE entry renders and `force` is false;
/// `TableNotSet`; `InvalidArgument` for an empty data set.
pub fn compile_update(
    state: &BuilderState,
    row: &[(String, Value)],
    force: bool,
) -> Result<QueryAndParams, SqlMiddlewareDbError> {
    if !force && !state.has_effective_where() {
        return Err(SqlMiddlewareDbError::EmptyCondition("update"));
    }
    if row.is_empty() {
        return Err(SqlMiddlewareDbError::InvalidArgument(
            "update needs at least one column".into(),
        ));
    }
    let table = target_table(state)?;
    let mut parts = vec!["UPDATE".to_string()];
    parts.extend(state.options.iter().cloned());
    parts.push(table);
    assemble(state, parts, Some(DataClause::Set(row)))
}

/// `DELETE [options] FROM table`, or `DELETE alias FROM table alias JOIN ...`
/// when joins are present.
///
/// # Errors
/// `EmptyCondition` when no WHERE entry renders and `force` is false; `TableNotSet`.
pub fn compile_delete(
    state: &BuilderState,
    force: bool,
) -> Result<QueryAndParams, SqlMiddlewareDbError> {
    if !force && !state.has_effective_where() {
        return Err(SqlMiddlewareDbError::EmptyCondition("delete"));
    }
    let table = target_table(state)?;
    let mut parts = vec!["DELETE".to_string()];
    parts.extend(state.options.iter().cloned());
    if !state.joins.is_empty() {
        let alias = table.split_whitespace().last().unwrap_or(table.as_str());
        parts.push(alias.to_string());
    }
    parts.push("FROM".to_string());
    parts.push(table);
    assemble(state, parts, None)
}
