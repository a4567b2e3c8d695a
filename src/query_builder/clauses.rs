use std::sync::Arc;

use super::binding::{SubQuery, Value};
use super::condition::{CondValue, Condition, Logic};
use super::state::{
    ALLOWED_JOIN_TYPES, ALLOWED_OPTIONS, BuilderState, CALC_FOUND_ROWS, GROUP_FIELD_RE, Join,
    JoinTarget, Limit, LockClause, ORDER_FIELD_RE, ORDER_VALUE_RE, OnDuplicate, OrderDirection,
    QUOTED_TABLE_RE,
};
use crate::error::SqlMiddlewareDbError;
use crate::reify::add_slashes;
use crate::registry::Registry;
use crate::types::RowValues;

fn push_condition(
    list: &mut Vec<Condition>,
    logic: Logic,
    field: &str,
    operator: &str,
    value: CondValue,
) {
    list.push(Condition {
        logic,
        field: field.to_string(),
        operator: operator.to_string(),
        value,
    });
}

fn sanitize_order_field(state: &BuilderState, field: &str) -> String {
    let cleaned = ORDER_FIELD_RE.replace_all(field, "");
    let replacement = format!("${{1}}{}${{2}}", state.prefix.replace('$', "$$"));
    QUOTED_TABLE_RE
        .replace_all(&cleaned, replacement.as_str())
        .into_owned()
}

fn parse_direction(direction: &str) -> Result<OrderDirection, SqlMiddlewareDbError> {
    match direction.trim().to_uppercase().as_str() {
        "ASC" => Ok(OrderDirection::Asc),
        "DESC" => Ok(OrderDirection::Desc),
        other => Err(SqlMiddlewareDbError::OrderDirection(other.to_string())),
    }
}

fn upsert_order(state: &mut BuilderState, field: String, direction: Option<OrderDirection>) {
    if let Some(entry) = state.order_by.iter_mut().find(|(f, _)| *f == field) {
        entry.1 = direction;
    } else {
        state.order_by.push((field, direction));
    }
}

/// Fluent clause accumulation shared by every builder flavour.
///
/// Each method records into [`BuilderState`] and hands back `self` so calls
/// chain; methods that validate their arguments return `Result` and reject
/// bad input before anything is compiled.
///
/// ```rust
/// use mysql_middleware::prelude::*;
///
/// # fn demo() -> Result<(), SqlMiddlewareDbError> {
/// let mut qb = QueryBuilder::new("");
/// qb.table("t")
///     .and_where("a", "=", 1)
///     .where_in("b", vec![2, 3]);
/// let compiled = qb.compile_select()?;
/// assert_eq!(compiled.query, "SELECT * FROM t WHERE a = ? AND b in ( ?, ? )");
/// # Ok(())
/// # }
/// # demo().unwrap();
/// ```
pub trait Clauses {
    fn state_mut(&mut self) -> &mut BuilderState;

    /// Registry used to resolve [`Clauses::scope`].
    fn registry(&self) -> Option<Arc<Registry>> {
        None
    }

    /// Target table, without prefix.
    fn table(&mut self, table: &str) -> &mut Self {
        self.state_mut().table = Some(table.to_string());
        self
    }

    fn fields(&mut self, columns: &[&str]) -> &mut Self {
        self.state_mut().columns = if columns.is_empty() {
            "*".to_string()
        } else {
            columns.join(",")
        };
        self
    }

    fn and_where(
        &mut self,
        field: &str,
        operator: &str,
        value: impl Into<CondValue>,
    ) -> &mut Self {
        push_condition(
            &mut self.state_mut().wheres,
            Logic::And,
            field,
            operator,
            value.into(),
        );
        self
    }

    fn or_where(&mut self, field: &str, operator: &str, value: impl Into<CondValue>) -> &mut Self {
        push_condition(
            &mut self.state_mut().wheres,
            Logic::Or,
            field,
            operator,
            value.into(),
        );
        self
    }

    /// `field in ( ?, ... )`, or `field in (sub-query)` for a [`SubQuery`].
    fn where_in(&mut self, field: &str, values: impl Into<CondValue>) -> &mut Self {
        self.and_where(field, "in", values)
    }

    fn where_not_in(&mut self, field: &str, values: impl Into<CondValue>) -> &mut Self {
        self.and_where(field, "not in", values)
    }

    fn where_between(
        &mut self,
        field: &str,
        low: impl Into<RowValues>,
        high: impl Into<RowValues>,
    ) -> &mut Self {
        self.and_where(
            field,
            "between",
            CondValue::List(vec![low.into(), high.into()]),
        )
    }

    fn where_not_between(
        &mut self,
        field: &str,
        low: impl Into<RowValues>,
        high: impl Into<RowValues>,
    ) -> &mut Self {
        self.and_where(
            field,
            "not between",
            CondValue::List(vec![low.into(), high.into()]),
        )
    }

    fn where_null(&mut self, field: &str) -> &mut Self {
        self.and_where(field, "IS", CondValue::Null)
    }

    fn where_not_null(&mut self, field: &str) -> &mut Self {
        self.and_where(field, "IS NOT", CondValue::Null)
    }

    fn where_exists(&mut self, sub: SubQuery) -> &mut Self {
        self.and_where("", "exists", Value::SubQuery(sub))
    }

    fn where_not_exists(&mut self, sub: SubQuery) -> &mut Self {
        self.and_where("", "not exists", Value::SubQuery(sub))
    }

    /// Raw expression whose own `?` markers consume `binds` in order.
    fn where_raw(&mut self, expr: &str, binds: Vec<RowValues>) -> &mut Self {
        self.and_where(expr, "", CondValue::List(binds))
    }

    fn having(&mut self, field: &str, operator: &str, value: impl Into<CondValue>) -> &mut Self {
        push_condition(
            &mut self.state_mut().havings,
            Logic::And,
            field,
            operator,
            value.into(),
        );
        self
    }

    fn or_having(&mut self, field: &str, operator: &str, value: impl Into<CondValue>) -> &mut Self {
        push_condition(
            &mut self.state_mut().havings,
            Logic::Or,
            field,
            operator,
            value.into(),
        );
        self
    }

    /// Add a join. `kind` is one of `LEFT`, `RIGHT`, `OUTER`, `INNER`,
    /// `LEFT OUTER`, `RIGHT OUTER`, `NATURAL` (any case) or empty.
    ///
    /// # Errors
    /// Returns `JoinType` for anything else.
    fn join(
        &mut self,
        target: impl Into<JoinTarget>,
        condition: &str,
        kind: &str,
    ) -> Result<&mut Self, SqlMiddlewareDbError> {
        let kind = kind.trim().to_uppercase();
        if !kind.is_empty() && !ALLOWED_JOIN_TYPES.contains(&kind.as_str()) {
            return Err(SqlMiddlewareDbError::JoinType(kind));
        }
        let state = self.state_mut();
        let target = match target.into() {
            JoinTarget::Table(name) => JoinTarget::Table(state.prefixed(&name)),
            sub @ JoinTarget::SubQuery(_) => sub,
        };
        state.joins.push(Join {
            kind,
            target,
            condition: condition.to_string(),
        });
        Ok(self)
    }

    /// Extra condition rendered after the `on` clause of `join_table`.
    fn join_where(
        &mut self,
        join_table: &str,
        field: &str,
        operator: &str,
        value: impl Into<CondValue>,
    ) -> &mut Self {
        let state = self.state_mut();
        let key = state.prefixed(join_table);
        state.join_wheres.push((
            key,
            Condition {
                logic: Logic::And,
                field: field.to_string(),
                operator: operator.to_string(),
                value: value.into(),
            },
        ));
        self
    }

    fn join_or_where(
        &mut self,
        join_table: &str,
        field: &str,
        operator: &str,
        value: impl Into<CondValue>,
    ) -> &mut Self {
        let state = self.state_mut();
        let key = state.prefixed(join_table);
        state.join_wheres.push((
            key,
            Condition {
                logic: Logic::Or,
                field: field.to_string(),
                operator: operator.to_string(),
                value: value.into(),
            },
        ));
        self
    }

    /// # Errors
    /// Returns `OrderDirection` unless `direction` is `ASC` or `DESC`.
    fn order_by(&mut self, field: &str, direction: &str) -> Result<&mut Self, SqlMiddlewareDbError> {
        let direction = parse_direction(direction)?;
        let state = self.state_mut();
        let field = sanitize_order_field(state, field);
        if field.replace(' ', "").eq_ignore_ascii_case("rand()") {
            upsert_order(state, "rand()".to_string(), None);
        } else {
            upsert_order(state, field, Some(direction));
        }
        Ok(self)
    }

    /// `ORDER BY FIELD (field, "a","b") direction`.
    ///
    /// # Errors
    /// Returns `OrderDirection` for a bad direction.
    fn order_by_field_list(
        &mut self,
        field: &str,
        values: &[&str],
        direction: &str,
    ) -> Result<&mut Self, SqlMiddlewareDbError> {
        let direction = parse_direction(direction)?;
        let state = self.state_mut();
        let field = sanitize_order_field(state, field);
        let values: Vec<String> = values
            .iter()
            .map(|v| ORDER_VALUE_RE.replace_all(v, "").into_owned())
            .collect();
        let expr = format!("FIELD ({field}, \"{}\")", values.join("\",\""));
        upsert_order(state, expr, Some(direction));
        Ok(self)
    }

    /// `ORDER BY field REGEXP 'pattern' direction`.
    ///
    /// # Errors
    /// Returns `OrderDirection` for a bad direction.
    fn order_by_regexp(
        &mut self,
        field: &str,
        pattern: &str,
        direction: &str,
    ) -> Result<&mut Self, SqlMiddlewareDbError> {
        let direction = parse_direction(direction)?;
        let state = self.state_mut();
        let field = sanitize_order_field(state, field);
        let expr = format!("{field} REGEXP '{}'", add_slashes(pattern));
        upsert_order(state, expr, Some(direction));
        Ok(self)
    }

    fn group_by(&mut self, field: &str) -> &mut Self {
        let cleaned = GROUP_FIELD_RE.replace_all(field, "");
        let cleaned = cleaned.trim();
        if !cleaned.is_empty() {
            self.state_mut().group_by.push(cleaned.to_string());
        }
        self
    }

    fn limit(&mut self, count: u64) -> &mut Self {
        self.state_mut().limit = Some(Limit {
            offset: None,
            count,
        });
        self
    }

    fn limit_offset(&mut self, offset: u64, count: u64) -> &mut Self {
        self.state_mut().limit = Some(Limit {
            offset: Some(offset),
            count,
        });
        self
    }

    /// `ON DUPLICATE KEY UPDATE` re-using the inserted value for each column.
    fn on_duplicate(&mut self, columns: &[&str]) -> &mut Self {
        let dup = self
            .state_mut()
            .on_duplicate
            .get_or_insert_with(OnDuplicate::default);
        dup.columns
            .extend(columns.iter().map(|c| ((*c).to_string(), None)));
        self
    }

    /// `ON DUPLICATE KEY UPDATE column = value`.
    fn on_duplicate_set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        let dup = self
            .state_mut()
            .on_duplicate
            .get_or_insert_with(OnDuplicate::default);
        dup.columns.push((column.to_string(), Some(value.into())));
        self
    }

    /// Prepend `column=LAST_INSERT_ID (column)` so the insert id reflects the updated row.
    fn on_duplicate_last_insert_id(&mut self, column: &str) -> &mut Self {
        self.state_mut()
            .on_duplicate
            .get_or_insert_with(OnDuplicate::default)
            .last_insert_id = Some(column.to_string());
        self
    }

    /// Add a query option (case-insensitive). `FOR UPDATE` and
    /// `LOCK IN SHARE MODE` set the trailing lock clause.
    ///
    /// # Errors
    /// Returns `WrongOption` for anything outside the allow-list.
    fn option(&mut self, option: &str) -> Result<&mut Self, SqlMiddlewareDbError> {
        let normalized = option
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        if !ALLOWED_OPTIONS.contains(&normalized.as_str()) {
            return Err(SqlMiddlewareDbError::WrongOption(normalized));
        }
        let state = self.state_mut();
        match normalized.as_str() {
            "FOR UPDATE" => state.lock = Some(LockClause::ForUpdate),
            "LOCK IN SHARE MODE" => state.lock = Some(LockClause::ShareMode),
            _ => {
                if !state.options.contains(&normalized) {
                    state.options.push(normalized);
                }
            }
        }
        Ok(self)
    }

    /// Ask for `SQL_CALC_FOUND_ROWS`; the connection then fetches `FOUND_ROWS()`.
    fn with_total_count(&mut self) -> &mut Self {
        let state = self.state_mut();
        if !state.options.iter().any(|o| o == CALC_FOUND_ROWS) {
            state.options.push(CALC_FOUND_ROWS.to_string());
        }
        self
    }

    fn for_update(&mut self) -> &mut Self {
        self.state_mut().lock = Some(LockClause::ForUpdate);
        self
    }

    fn lock_in_share_mode(&mut self) -> &mut Self {
        self.state_mut().lock = Some(LockClause::ShareMode);
        self
    }

    /// Apply a scope registered under `name`.
    ///
    /// # Errors
    /// Returns `UnknownScope` when nothing is registered under `name`,
    /// or whatever the scope handler itself returns.
    fn scope(&mut self, name: &str, args: &[RowValues]) -> Result<&mut Self, SqlMiddlewareDbError> {
        let registry = self
            .registry()
            .ok_or_else(|| SqlMiddlewareDbError::UnknownScope(name.to_string()))?;
        registry.apply_scope(name, self.state_mut(), args)?;
        Ok(self)
    }
}

impl Clauses for BuilderState {
    fn state_mut(&mut self) -> &mut BuilderState {
        self
    }
}
