use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Connection;
use crate::error::SqlMiddlewareDbError;
use crate::query_builder::Clauses;
use crate::results::CustomDbRow;
use crate::types::RowValues;

lazy_static! {
    static ref TABLE_MARKER_RE: Regex = Regex::new(r"__([A-Z0-9_-]+?)__").expect("valid table marker pattern");
}

/// One column as reported by `SHOW COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: String,
    pub notnull: bool,
    pub default: Option<String>,
    pub primary: bool,
    pub autoincrement: bool,
}

/// How a value for a column of a given SQL type should be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldBindType {
    Str,
    Float,
    Int,
    Bool,
}

/// Classify a column type such as `int(11) unsigned` or `decimal(10,2)`.
#[must_use]
pub fn field_bind_type(sql_type: &str) -> FieldBindType {
    let lowered = sql_type.to_ascii_lowercase();
    let base = lowered
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default();
    if base.starts_with("set") || base.starts_with("enum") {
        FieldBindType::Str
    } else if ["double", "float", "decimal", "real", "numeric"]
        .iter()
        .any(|t| base.contains(t))
    {
        FieldBindType::Float
    } else if ["int", "serial", "bit"].iter().any(|t| base.contains(t)) {
        FieldBindType::Int
    } else if base.contains("bool") {
        FieldBindType::Bool
    } else {
        FieldBindType::Str
    }
}

/// Replace `__NAME__` markers with `prefix` + the lowercased name.
///
/// ```rust
/// use mysql_middleware::prelude::*;
///
/// let sql = parse_sql_table("SELECT * FROM __USER_LOG__ WHERE id = ?", "p_");
/// assert_eq!(sql, "SELECT * FROM p_user_log WHERE id = ?");
/// ```
#[must_use]
pub fn parse_sql_table(sql: &str, prefix: &str) -> String {
    TABLE_MARKER_RE
        .replace_all(sql, |caps: &regex::Captures<'_>| {
            format!("{prefix}{}", caps[1].to_lowercase())
        })
        .into_owned()
}

fn text(row: &CustomDbRow, column: &str) -> Option<String> {
    row.get(column).and_then(RowValues::to_plain_string)
}

fn quote_table(prefix: &str, table: &str) -> String {
    match table.split_once('.') {
        Some((db, name)) => format!("`{db}`.`{prefix}{name}`"),
        None => format!("`{prefix}{table}`"),
    }
}

impl Connection {
    /// `__NAME__` substitution using this connection's table prefix.
    #[must_use]
    pub fn parse_sql_table(&self, sql: &str) -> String {
        parse_sql_table(sql, &self.config.table_prefix)
    }

    /// Columns of `table` (prefix applied), in server order. Names follow the
    /// connection's [`FieldCase`](crate::types::FieldCase).
    ///
    /// # Errors
    /// Statement errors from `SHOW COLUMNS`.
    pub async fn get_fields(&mut self, table: &str) -> Result<Vec<FieldInfo>, SqlMiddlewareDbError> {
        let sql = format!(
            "SHOW COLUMNS FROM {}",
            quote_table(&self.config.table_prefix, table)
        );
        let rows = self.query_unprepared(&sql, None).await?;
        let case = self.field_case;
        let fields: Vec<FieldInfo> = rows
            .results
            .iter()
            .map(|row| {
                let null = text(row, "Null").unwrap_or_default();
                FieldInfo {
                    name: case.apply(&text(row, "Field").unwrap_or_default()),
                    field_type: text(row, "Type").unwrap_or_default(),
                    notnull: null.is_empty() || null.eq_ignore_ascii_case("no"),
                    default: text(row, "Default"),
                    primary: text(row, "Key").is_some_and(|k| k.eq_ignore_ascii_case("pri")),
                    autoincrement: text(row, "Extra")
                        .is_some_and(|e| e.eq_ignore_ascii_case("auto_increment")),
                }
            })
            .collect();
        debug!(table, columns = fields.len(), "loaded column metadata");
        Ok(fields)
    }

    /// Table names in `database` (the current one when `None`) that carry the
    /// configured prefix.
    ///
    /// # Errors
    /// Statement errors from `SHOW TABLES`.
    pub async fn get_tables(
        &mut self,
        database: Option<&str>,
    ) -> Result<Vec<String>, SqlMiddlewareDbError> {
        let sql = match database {
            Some(db) => format!("SHOW TABLES FROM `{db}`"),
            None => "SHOW TABLES".to_string(),
        };
        let rows = self.query_unprepared(&sql, None).await?;
        let prefix = self.config.table_prefix.clone();
        Ok(rows
            .results
            .iter()
            .filter_map(|row| row.get_by_index(0).and_then(RowValues::to_plain_string))
            .filter(|name| name.starts_with(&prefix))
            .collect())
    }

    /// True when every listed table (prefix applied) exists in the configured
    /// database.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty list; statement errors otherwise.
    pub async fn table_exists(&mut self, tables: &[&str]) -> Result<bool, SqlMiddlewareDbError> {
        if tables.is_empty() {
            return Err(SqlMiddlewareDbError::InvalidArgument(
                "table_exists needs at least one table".into(),
            ));
        }
        let prefix = self.config.table_prefix.clone();
        let database = self.config.database.clone();
        let names: Vec<String> = tables.iter().map(|t| format!("{prefix}{t}")).collect();
        let wanted = names.len() as u64;

        self.clear_builder();
        let mut query = self.query();
        query
            .table("information_schema.tables")
            .fields(&["table_name"])
            .and_where("table_schema", "=", database)
            .where_in("table_name", names)
            .with_total_count()
            .limit(wanted);
        query.select().await?;
        Ok(self.total_count == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_type_classification() {
        assert_eq!(field_bind_type("enum('a','b')"), FieldBindType::Str);
        assert_eq!(field_bind_type("set('x')"), FieldBindType::Str);
        assert_eq!(field_bind_type("decimal(10,2)"), FieldBindType::Float);
        assert_eq!(field_bind_type("DOUBLE"), FieldBindType::Float);
        assert_eq!(field_bind_type("int(11) unsigned"), FieldBindType::Int);
        assert_eq!(field_bind_type("tinyint(1)"), FieldBindType::Int);
        assert_eq!(field_bind_type("bigserial"), FieldBindType::Int);
        assert_eq!(field_bind_type("boolean"), FieldBindType::Bool);
        assert_eq!(field_bind_type("varchar(255)"), FieldBindType::Str);
        assert_eq!(field_bind_type("datetime"), FieldBindType::Str);
    }

    #[test]
    fn table_markers_take_the_prefix() {
        assert_eq!(
            parse_sql_table("SELECT * FROM __A__ JOIN __B_C__ ON 1", "x_"),
            "SELECT * FROM x_a JOIN x_b_c ON 1"
        );
        assert_eq!(parse_sql_table("__lower__ untouched", "x_"), "__lower__ untouched");
    }

    #[test]
    fn quoted_table_with_database() {
        assert_eq!(quote_table("p_", "users"), "`p_users`");
        assert_eq!(quote_table("p_", "app.users"), "`app`.`p_users`");
    }
}
