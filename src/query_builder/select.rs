use super::binding::{Value, quote_column, render_data_pairs};
use super::condition::{render_chain, render_conditions};
use super::state::{BuilderState, JoinTarget};
use crate::error::SqlMiddlewareDbError;
use crate::types::{QueryAndParams, RowValues};

/// Column data carried by a mutation.
#[derive(Clone, Copy)]
pub(crate) enum DataClause<'a> {
    Values(&'a [(String, Value)]),
    Set(&'a [(String, Value)]),
}

/// Resolve and prefix the target table.
pub(crate) fn target_table(state: &BuilderState) -> Result<String, SqlMiddlewareDbError> {
    match state.table.as_deref().map(str::trim) {
        Some(table) if !table.is_empty() => Ok(state.prefixed(table)),
        _ => Err(SqlMiddlewareDbError::TableNotSet),
    }
}

fn render_joins(
    state: &BuilderState,
    parts: &mut Vec<String>,
    binds: &mut Vec<RowValues>,
) -> Result<(), SqlMiddlewareDbError> {
    for join in &state.joins {
        let target = match &join.target {
            JoinTarget::Table(name) => name.clone(),
            JoinTarget::SubQuery(sub) => sub.render(binds),
        };
        if join.kind.is_empty() {
            parts.push("JOIN".to_string());
        } else {
            parts.push(format!("{} JOIN", join.kind));
        }
        parts.push(target.clone());
        if !join.condition.is_empty() {
            if !join.condition.to_lowercase().contains("using") {
                parts.push("on".to_string());
            }
            parts.push(join.condition.clone());
        }
        let extra: Vec<_> = state
            .join_wheres
            .iter()
            .filter(|(table, _)| *table == target)
            .map(|(_, cond)| cond.clone())
            .collect();
        let chain = render_chain(&extra, false, binds)?;
        if !chain.is_empty() {
            parts.push(chain);
        }
    }
    Ok(())
}

fn render_on_duplicate(
    state: &BuilderState,
    inserted: &[(String, Value)],
    parts: &mut Vec<String>,
    binds: &mut Vec<RowValues>,
) -> Result<(), SqlMiddlewareDbError> {
    let Some(dup) = &state.on_duplicate else {
        return Ok(());
    };
    if dup.columns.is_empty() && dup.last_insert_id.is_none() {
        return Ok(());
    }
    let mut resolved: Vec<(String, Value)> = Vec::with_capacity(dup.columns.len());
    for (column, value) in &dup.columns {
        let value = match value {
            Some(v) => v.clone(),
            None => inserted
                .iter()
                .find(|(c, _)| c == column)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| {
                    SqlMiddlewareDbError::InvalidArgument(format!(
                        "on duplicate column `{column}` has no inserted value"
                    ))
                })?,
        };
        resolved.push((column.clone(), value));
    }
    let mut pieces = Vec::new();
    if let Some(id_column) = &dup.last_insert_id {
        pieces.push(format!("{id_column}=LAST_INSERT_ID ({id_column})"));
    }
    if !resolved.is_empty() {
        pieces.push(render_data_pairs(&resolved, true, binds));
    }
    parts.push("ON DUPLICATE KEY UPDATE".to_string());
    parts.push(pieces.join(", "));
    Ok(())
}

/// Append every clause after the statement head in the fixed order:
/// joins, data, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT,
/// ON DUPLICATE KEY UPDATE, lock.
pub(crate) fn assemble(
    state: &BuilderState,
    mut parts: Vec<String>,
    data: Option<DataClause<'_>>,
) -> Result<QueryAndParams, SqlMiddlewareDbError> {
    let mut binds = Vec::new();

    render_joins(state, &mut parts, &mut binds)?;

    let inserted: &[(String, Value)] = match data {
        Some(DataClause::Values(rows)) => {
            if !rows.is_empty() {
                let columns: Vec<String> = rows.iter().map(|(c, _)| quote_column(c)).collect();
                parts.push(format!("({})", columns.join(", ")));
            }
            parts.push(format!(
                "VALUES ({})",
                render_data_pairs(rows, false, &mut binds)
            ));
            rows
        }
        Some(DataClause::Set(rows)) => {
            parts.push("SET".to_string());
            parts.push(render_data_pairs(rows, true, &mut binds));
            &[]
        }
        None => &[],
    };

    if let Some(clause) = render_conditions("WHERE", &state.wheres, &mut binds)? {
        parts.push(clause);
    }
    if !state.group_by.is_empty() {
        parts.push(format!("GROUP BY {}", state.group_by.join(", ")));
    }
    if let Some(clause) = render_conditions("HAVING", &state.havings, &mut binds)? {
        parts.push(clause);
    }
    if !state.order_by.is_empty() {
        let items: Vec<String> = state
            .order_by
            .iter()
            .map(|(field, dir)| match dir {
                Some(dir) => format!("{field} {}", dir.as_sql()),
                None => field.clone(),
            })
            .collect();
        parts.push(format!("ORDER BY {}", items.join(", ")));
    }
    if let Some(limit) = state.limit {
        match limit.offset {
            Some(offset) => parts.push(format!("LIMIT {offset}, {}", limit.count)),
            None => parts.push(format!("LIMIT {}", limit.count)),
        }
    }
    if matches!(data, Some(DataClause::Values(_))) {
        render_on_duplicate(state, inserted, &mut parts, &mut binds)?;
    }
    if let Some(lock) = state.lock {
        parts.push(lock.as_sql().to_string());
    }

    Ok(QueryAndParams::new(parts.join(" "), binds))
}

/// Compile `SELECT [options] columns FROM table ...`.
///
/// # Errors
/// `TableNotSet` without a table; argument errors from conditions.
pub fn compile_select(state: &BuilderState) -> Result<QueryAndParams, SqlMiddlewareDbError> {
    let table = target_table(state)?;
    let mut parts = vec!["SELECT".to_string()];
    parts.extend(state.options.iter().cloned());
    parts.push(state.columns.clone());
    parts.push("FROM".to_string());
    parts.push(table);
    assemble(state, parts, None)
}
