use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::SqlMiddlewareDbError;
use crate::types::RowValues;

/// A compiled child query embedded in a parent clause.
///
/// Produced by freezing a [`super::QueryBuilder`]; the parent copies the
/// text and splices `binds` into its own list at the point of insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    pub sql: String,
    pub binds: Vec<RowValues>,
    pub alias: Option<String>,
}

impl SubQuery {
    pub(crate) fn render(&self, binds: &mut Vec<RowValues>) -> String {
        binds.extend(self.binds.iter().cloned());
        match &self.alias {
            Some(alias) if !alias.is_empty() => format!("({}) {alias}", self.sql),
            _ => format!("({})", self.sql),
        }
    }
}

/// One value position in a data list or condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Positional bind, rendered as `?`.
    Bind(RowValues),
    /// `` `column` + step ``; `column` defaults to the column being assigned.
    Step { column: Option<String>, step: i64 },
    /// Raw SQL expression followed by the binds its own `?` markers consume.
    Func { expr: String, binds: Vec<RowValues> },
    /// `!name`, or `!` applied to the column being assigned.
    Not(Option<String>),
    SubQuery(SubQuery),
}

const INTERVAL_UNITS: &[(char, &str)] = &[
    ('s', "second"),
    ('m', "minute"),
    ('h', "hour"),
    ('d', "day"),
    ('M', "month"),
    ('Y', "year"),
];

/// Quote a column name, keeping an optional `table.` qualifier bare.
pub(crate) fn quote_column(column: &str) -> String {
    if column.contains('`') {
        return column.to_string();
    }
    match column.split_once('.') {
        Some((table, name)) => format!("{table}.`{name}`"),
        None => format!("`{column}`"),
    }
}

impl Value {
    #[must_use]
    pub fn inc(step: i64) -> Self {
        Value::Step { column: None, step }
    }

    #[must_use]
    pub fn dec(step: i64) -> Self {
        Value::Step {
            column: None,
            step: step.saturating_neg(),
        }
    }

    #[must_use]
    pub fn inc_column(column: impl Into<String>, step: i64) -> Self {
        Value::Step {
            column: Some(column.into()),
            step,
        }
    }

    #[must_use]
    pub fn not(column: Option<&str>) -> Self {
        Value::Not(column.map(str::to_string))
    }

    #[must_use]
    pub fn func(expr: impl Into<String>, binds: Vec<RowValues>) -> Self {
        Value::Func {
            expr: expr.into(),
            binds,
        }
    }

    /// `NOW()` shifted by `diff` (see [`Value::interval`]).
    ///
    /// # Errors
    /// Returns `InvalidArgument` when `diff` carries an unknown unit.
    pub fn now(diff: Option<&str>) -> Result<Self, SqlMiddlewareDbError> {
        Ok(Value::func(Self::interval(diff, "NOW()")?, Vec::new()))
    }

    /// Render `base [+-] interval N unit` from a diff like `"-1d"`, `"+ 30 m"`, `"2Y"`.
    ///
    /// Units: `s` second, `m` minute, `h` hour, `d` day (default), `M` month, `Y` year.
    /// An absent or empty diff returns `base` unchanged.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an unknown unit.
    pub fn interval(diff: Option<&str>, base: &str) -> Result<String, SqlMiddlewareDbError> {
        let Some(diff) = diff.filter(|d| !d.is_empty()) else {
            return Ok(base.to_string());
        };
        let Some(caps) = crate::query_builder::state::INTERVAL_RE.captures(diff) else {
            return Ok(base.to_string());
        };
        let sign = caps.get(1).map_or("", |m| m.as_str());
        let sign = if sign.is_empty() { "+" } else { sign };
        let amount = caps.get(2).map_or("", |m| m.as_str());
        let unit = caps
            .get(3)
            .and_then(|m| m.as_str().chars().next())
            .unwrap_or('d');
        let unit_name = INTERVAL_UNITS
            .iter()
            .find(|(key, _)| *key == unit)
            .map(|(_, name)| *name)
            .ok_or_else(|| {
                SqlMiddlewareDbError::InvalidArgument(format!(
                    "invalid interval type in '{diff}'"
                ))
            })?;
        Ok(format!("{base} {sign} interval {amount} {unit_name}"))
    }

    /// Decode a JSON marker object: `{"[I]": n}`, `{"[F]": [expr, [binds]]}`, `{"[N]": col}`.
    /// Any other non-object JSON becomes a plain bind.
    ///
    /// # Errors
    /// Returns `WrongOperation` naming an unknown marker key, or
    /// `InvalidArgument` when a marker payload has the wrong shape.
    pub fn from_marker(json: &JsonValue) -> Result<Self, SqlMiddlewareDbError> {
        let JsonValue::Object(map) = json else {
            return Ok(Value::Bind(RowValues::from(json.clone())));
        };
        let mut entries = map.iter();
        let (Some((key, payload)), None) = (entries.next(), entries.next()) else {
            return Err(SqlMiddlewareDbError::InvalidArgument(
                "marker object must have exactly one key".into(),
            ));
        };
        match key.as_str() {
            "[I]" => {
                let step = match payload {
                    JsonValue::Number(n) => n.as_i64(),
                    JsonValue::String(s) => s.trim().trim_start_matches('+').parse().ok(),
                    _ => None,
                }
                .ok_or_else(|| {
                    SqlMiddlewareDbError::InvalidArgument(format!(
                        "increment step must be a number, got {payload}"
                    ))
                })?;
                Ok(Value::inc(step))
            }
            "[F]" => match payload {
                JsonValue::String(expr) => Ok(Value::func(expr.clone(), Vec::new())),
                JsonValue::Array(parts) => {
                    let expr = parts.first().and_then(JsonValue::as_str).ok_or_else(|| {
                        SqlMiddlewareDbError::InvalidArgument(
                            "function marker needs an expression".into(),
                        )
                    })?;
                    let binds = match parts.get(1) {
                        Some(JsonValue::Array(values)) => {
                            values.iter().cloned().map(RowValues::from).collect()
                        }
                        Some(JsonValue::Null) | None => Vec::new(),
                        Some(single) => vec![RowValues::from(single.clone())],
                    };
                    Ok(Value::func(expr, binds))
                }
                other => Err(SqlMiddlewareDbError::InvalidArgument(format!(
                    "function marker payload must be a string or array, got {other}"
                ))),
            },
            "[N]" => match payload {
                JsonValue::String(s) if !s.is_empty() => Ok(Value::Not(Some(s.clone()))),
                _ => Ok(Value::Not(None)),
            },
            other => Err(SqlMiddlewareDbError::WrongOperation(other.to_string())),
        }
    }

    /// Render this value for `column`, appending any binds in order.
    pub(crate) fn render(&self, column: &str, binds: &mut Vec<RowValues>) -> String {
        match self {
            Value::Bind(value) => {
                binds.push(value.clone());
                "?".to_string()
            }
            Value::Step { column: target, step } => {
                let target = quote_column(target.as_deref().unwrap_or(column));
                if *step < 0 {
                    format!("{target} - {}", step.unsigned_abs())
                } else {
                    format!("{target} + {step}")
                }
            }
            Value::Func { expr, binds: extra } => {
                binds.extend(extra.iter().cloned());
                expr.clone()
            }
            Value::Not(Some(name)) => format!("!{name}"),
            Value::Not(None) => format!("!{}", quote_column(column)),
            Value::SubQuery(sub) => sub.render(binds),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Bind(RowValues::from(value))
                }
            }
        )*
    };
}

value_from!(i64, i32, u32, f64, bool, &str, String, NaiveDateTime, Vec<u8>);

impl From<RowValues> for Value {
    fn from(value: RowValues) -> Self {
        Value::Bind(value)
    }
}

impl From<SubQuery> for Value {
    fn from(value: SubQuery) -> Self {
        Value::SubQuery(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Bind(RowValues::Null), Into::into)
    }
}

/// Render `SET`-style `` `col` = value `` pairs, or bare values for `VALUES (...)`.
pub(crate) fn render_data_pairs(
    data: &[(String, Value)],
    assign: bool,
    binds: &mut Vec<RowValues>,
) -> String {
    data.iter()
        .map(|(column, value)| {
            let rendered = value.render(column, binds);
            if assign {
                format!("{} = {rendered}", quote_column(column))
            } else {
                rendered
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
