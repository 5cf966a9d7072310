//! Tabular result model
//!
//! Everything that flows between the tools, the session trace and the
//! display pipeline is expressed in these types. A `Table` is fully
//! materialized; zero rows is a valid table and distinct from "no table".

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inferred column type used by the visualization classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Datetime,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A fully materialized query result. Cell values are carried as JSON
/// values: numbers as numbers, datetimes as their string form, NULL as
/// `Value::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

lazy_static! {
    // Shape prefilter before handing candidates to chrono.
    static ref ISO_DATE_SHAPE: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?$")
            .unwrap();
}

impl Table {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Exact, case-sensitive column lookup. The result selector uses this
    /// to tell a data table apart from a table carrying an `error` column.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Upgrade text columns whose non-null values all parse as ISO
    /// dates/datetimes. Warehouses frequently ship dates as strings; the
    /// classifier needs them typed as `Datetime` to pick a time series.
    pub fn upgrade_datetime_columns(&mut self) {
        for (idx, column) in self.columns.iter_mut().enumerate() {
            if column.kind != ColumnType::Text {
                continue;
            }
            let mut saw_value = false;
            let all_dates = self.rows.iter().all(|row| match row.get(idx) {
                Some(Value::Null) | None => true,
                Some(Value::String(s)) => {
                    saw_value = true;
                    looks_like_datetime(s)
                }
                Some(_) => false,
            });
            if saw_value && all_dates {
                column.kind = ColumnType::Datetime;
            }
        }
    }
}

fn looks_like_datetime(value: &str) -> bool {
    let value = value.trim();
    if !ISO_DATE_SHAPE.is_match(value) {
        return false;
    }
    // The prefilter admits impossible dates like 2024-99-99; let chrono
    // validate the calendar part.
    NaiveDate::parse_from_str(&value[..10], "%Y-%m-%d").is_ok()
}

/// Recoverable error sentinel returned instead of raising, so the oracle
/// can observe a failure and retry with different SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
}

impl ErrorResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    /// Table-shaped rendering: a single `error` column with a single row.
    pub fn to_table(&self) -> Table {
        Table::new(
            vec![Column::new("error", ColumnType::Text)],
            vec![vec![Value::String(self.error.clone())]],
        )
    }
}

/// What a tool invocation produced, as recorded in the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Observation {
    Table(Table),
    Error(ErrorResult),
    Text(String),
}

impl Observation {
    /// Compact single-observation rendering used for the oracle scratchpad
    /// and the diagnostic trace. Tables are truncated to `max_rows`.
    pub fn preview(&self, max_rows: usize) -> String {
        match self {
            Observation::Text(text) => text.clone(),
            Observation::Error(err) => format!("error: {}", err.error),
            Observation::Table(table) => {
                let header: Vec<&str> =
                    table.columns.iter().map(|c| c.name.as_str()).collect();
                let mut lines = vec![header.join(" | ")];
                for row in table.rows.iter().take(max_rows) {
                    let cells: Vec<String> = row.iter().map(cell_to_string).collect();
                    lines.push(cells.join(" | "));
                }
                if table.rows.len() > max_rows {
                    lines.push(format!("... ({} more rows)", table.rows.len() - max_rows));
                }
                lines.join("\n")
            }
        }
    }
}

pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One oracle decision and its outcome, in strict chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub tool_name: String,
    pub tool_input: String,
    pub observation: Observation,
}

/// The complete output of one question. Immutable once returned; the
/// trace is discarded with it (no persistence across questions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub final_answer: String,
    pub steps: Vec<ExecutionStep>,
}
