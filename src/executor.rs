//! Query Executor
//!
//! Runs one read-only statement against the warehouse. Faults never
//! propagate from here: a rejected statement or a warehouse failure is
//! returned as an `ErrorResult` so the oracle can observe it and retry
//! with different SQL.

use crate::table::{ErrorResult, Table};
use crate::warehouse::Warehouse;
use std::sync::Arc;
use tracing::warn;

/// Either rows or the recoverable error sentinel.
#[derive(Debug, Clone)]
pub enum TabularResult {
    Rows(Table),
    Error(ErrorResult),
}

pub struct QueryExecutor {
    warehouse: Arc<dyn Warehouse>,
}

impl QueryExecutor {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }

    /// Execute `sql` if it is a SELECT; anything else fails fast without
    /// touching the warehouse.
    pub async fn execute(&self, sql: &str) -> TabularResult {
        let trimmed = sql.trim();
        if let Some(rejection) = select_gate(trimmed) {
            warn!(sql = trimmed, "rejected non-SELECT statement");
            return TabularResult::Error(ErrorResult::new(rejection));
        }

        match self.warehouse.run_select(trimmed).await {
            Ok(table) => TabularResult::Rows(table),
            Err(e) => {
                warn!(error = %e, "query failed");
                TabularResult::Error(ErrorResult::new(e.to_string()))
            }
        }
    }
}

/// Returns a rejection message unless the trimmed statement begins with
/// SELECT (case-insensitive).
fn select_gate(trimmed: &str) -> Option<String> {
    if trimmed.is_empty() {
        return Some("empty SQL statement; expected a SELECT".to_string());
    }
    let first_word = trimmed.split_whitespace().next().unwrap_or(trimmed);
    let is_select = first_word
        .get(..6)
        .map(|prefix| prefix.eq_ignore_ascii_case("select"))
        .unwrap_or(false);
    if is_select {
        None
    } else {
        Some(format!(
            "only SELECT statements are allowed, got '{}'",
            first_word
        ))
    }
}
