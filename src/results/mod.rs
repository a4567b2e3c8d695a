mod result_set;
mod row;

pub use result_set::ResultSet;
pub use row::CustomDbRow;

use crate::connection::PreparedStatement;
use crate::query_builder::SubQuery;

/// What the native client reports for one executed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecResult {
    pub rows: ResultSet,
    pub affected_rows: u64,
    pub insert_id: u64,
}

impl ExecResult {
    #[must_use]
    pub fn affected(affected_rows: u64) -> Self {
        Self {
            affected_rows,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_rows(rows: ResultSet) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }
}

/// Result of a SELECT, tagged by how it was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Executed; rows fetched.
    Rows(ResultSet),
    /// Prepared but not executed; run it with `Connection::execute_prepared`.
    Handle(PreparedStatement),
    /// Compiled only, for embedding into a parent query.
    Deferred(SubQuery),
}

impl QueryOutcome {
    /// Rows when the query ran, `None` for handles and deferred sub-queries.
    #[must_use]
    pub fn into_rows(self) -> Option<ResultSet> {
        match self {
            QueryOutcome::Rows(rows) => Some(rows),
            QueryOutcome::Handle(_) | QueryOutcome::Deferred(_) => None,
        }
    }
}
