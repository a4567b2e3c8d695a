use chrono::NaiveDateTime;

use super::binding::{SubQuery, Value};
use crate::error::SqlMiddlewareDbError;
use crate::types::RowValues;

/// Right-hand side of a WHERE/HAVING entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CondValue {
    Value(Value),
    /// Element list for `IN`/`BETWEEN`, or positional binds for a raw expression.
    List(Vec<RowValues>),
    /// Emits `operator NULL`.
    Null,
    /// The whole clause is skipped when compiled.
    Unset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    fn as_sql(self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub logic: Logic,
    pub field: String,
    /// Emitted exactly as the caller wrote it.
    pub operator: String,
    pub value: CondValue,
}

enum OperatorKind {
    In,
    Between,
    Exists,
    Other,
}

fn classify(operator: &str) -> OperatorKind {
    let normalized = operator
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    match normalized.as_str() {
        "in" | "not in" => OperatorKind::In,
        "between" | "not between" => OperatorKind::Between,
        "exists" | "not exists" => OperatorKind::Exists,
        _ => OperatorKind::Other,
    }
}

impl Condition {
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self.value, CondValue::Unset)
    }

    /// Render `field operator value` (without the logical connective).
    fn render(&self, binds: &mut Vec<RowValues>) -> Result<String, SqlMiddlewareDbError> {
        let field = self.field.as_str();
        let op = self.operator.trim();
        let mut parts: Vec<String> = Vec::with_capacity(3);
        if !field.is_empty() {
            parts.push(field.to_string());
        }

        match classify(op) {
            OperatorKind::In => {
                let inner = match &self.value {
                    CondValue::List(items) if items.is_empty() => {
                        return Err(SqlMiddlewareDbError::InvalidArgument(format!(
                            "{op} list for `{field}` is empty"
                        )));
                    }
                    CondValue::List(items) => {
                        binds.extend(items.iter().cloned());
                        format!("( {} )", vec!["?"; items.len()].join(", "))
                    }
                    CondValue::Value(Value::SubQuery(sub)) => {
                        binds.extend(sub.binds.iter().cloned());
                        format!("({})", sub.sql)
                    }
                    CondValue::Value(value) => format!("( {} )", value.render(field, binds)),
                    CondValue::Null | CondValue::Unset => {
                        return Err(SqlMiddlewareDbError::InvalidArgument(format!(
                            "{op} for `{field}` needs a list or a sub-query"
                        )));
                    }
                };
                parts.push(op.to_string());
                parts.push(inner);
            }
            OperatorKind::Between => match &self.value {
                CondValue::List(items) if items.len() == 2 => {
                    binds.extend(items.iter().cloned());
                    parts.push(format!("{op} ? AND ?"));
                }
                _ => {
                    return Err(SqlMiddlewareDbError::InvalidArgument(format!(
                        "{op} for `{field}` needs exactly two values"
                    )));
                }
            },
            OperatorKind::Exists => match &self.value {
                CondValue::Value(Value::SubQuery(sub)) => {
                    parts.push(op.to_string());
                    parts.push(sub.render(binds));
                }
                _ => {
                    return Err(SqlMiddlewareDbError::InvalidArgument(format!(
                        "{op} needs a sub-query"
                    )));
                }
            },
            OperatorKind::Other => match &self.value {
                CondValue::List(items) => binds.extend(items.iter().cloned()),
                CondValue::Null => parts.push(format!("{op} NULL")),
                CondValue::Value(value) => {
                    parts.push(op.to_string());
                    parts.push(value.render(field, binds));
                }
                CondValue::Unset => {}
            },
        }
        Ok(parts.join(" "))
    }
}

/// Render a condition list after `keyword` (`WHERE`, `HAVING`), or nothing
/// when every entry is unset. The first rendered entry drops its connective.
pub(crate) fn render_conditions(
    keyword: &str,
    conditions: &[Condition],
    binds: &mut Vec<RowValues>,
) -> Result<Option<String>, SqlMiddlewareDbError> {
    let body = render_chain(conditions, true, binds)?;
    Ok((!body.is_empty()).then(|| format!("{keyword} {body}")))
}

/// Join the rendered conditions. Join `on` extensions pass `drop_first_logic = false`
/// so every entry keeps its connective.
pub(crate) fn render_chain(
    conditions: &[Condition],
    drop_first_logic: bool,
    binds: &mut Vec<RowValues>,
) -> Result<String, SqlMiddlewareDbError> {
    let mut out: Vec<String> = Vec::new();
    for cond in conditions.iter().filter(|c| !c.is_unset()) {
        let rendered = cond.render(binds)?;
        if out.is_empty() && drop_first_logic {
            out.push(rendered);
        } else {
            out.push(format!("{} {rendered}", cond.logic.as_sql()));
        }
    }
    Ok(out.join(" "))
}

macro_rules! cond_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CondValue {
                fn from(value: $ty) -> Self {
                    CondValue::Value(Value::from(value))
                }
            }
        )*
    };
}

cond_from_scalar!(i64, i32, u32, f64, bool, &str, String, NaiveDateTime, SubQuery);

macro_rules! cond_from_list {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for CondValue {
                fn from(values: Vec<$ty>) -> Self {
                    CondValue::List(values.into_iter().map(RowValues::from).collect())
                }
            }

            impl<const N: usize> From<[$ty; N]> for CondValue {
                fn from(values: [$ty; N]) -> Self {
                    CondValue::List(values.into_iter().map(RowValues::from).collect())
                }
            }
        )*
    };
}

cond_from_list!(i64, i32, u32, f64, &str, String, RowValues);

impl From<RowValues> for CondValue {
    fn from(value: RowValues) -> Self {
        if value.is_null() {
            CondValue::Null
        } else {
            CondValue::Value(Value::Bind(value))
        }
    }
}

impl From<Value> for CondValue {
    fn from(value: Value) -> Self {
        CondValue::Value(value)
    }
}

/// `None` skips the clause, so optional filters need no branching.
impl<T: Into<CondValue>> From<Option<T>> for CondValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CondValue::Unset, Into::into)
    }
}
