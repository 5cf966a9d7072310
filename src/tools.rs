//! Tool Registry
//!
//! The fixed set of capabilities the oracle may invoke. Descriptions are
//! first-class steering text: they tell the oracle when to pick a tool
//! and forbid it from hallucinating row-level facts out of schema output.

use crate::error::{AssistantError, Result};
use crate::executor::{QueryExecutor, TabularResult};
use crate::table::Observation;
use crate::warehouse::Warehouse;
use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const RUN_QUERY: &str = "run_query";
pub const LIST_TABLES: &str = "list_tables";
pub const DESCRIBE_TABLE: &str = "describe_table";

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn call(&self, input: &str) -> Result<Observation>;
}

/// (name, description) pair handed to the oracle prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

/// Ordered, immutable set of tools. Construction rejects duplicate names.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self> {
        for (i, tool) in tools.iter().enumerate() {
            if tools[..i].iter().any(|t| t.name() == tool.name()) {
                return Err(AssistantError::Tool(format!(
                    "duplicate tool name '{}'",
                    tool.name()
                )));
            }
        }
        Ok(Self { tools })
    }

    /// The standard three-tool set bound to one warehouse.
    pub fn standard(warehouse: Arc<dyn Warehouse>) -> Result<Self> {
        Self::new(vec![
            Arc::new(RunQueryTool::new(warehouse.clone())),
            Arc::new(ListTablesTool::new(warehouse.clone())),
            Arc::new(DescribeTableTool::new(warehouse)),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Descriptors in registration order, for the oracle prompt.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }
}

/// Runs gated SELECT statements through the Query Executor.
pub struct RunQueryTool {
    executor: QueryExecutor,
}

impl RunQueryTool {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self {
            executor: QueryExecutor::new(warehouse),
        }
    }
}

#[async_trait]
impl Tool for RunQueryTool {
    fn name(&self) -> &str {
        RUN_QUERY
    }

    fn description(&self) -> &str {
        "Execute a read-only SQL SELECT statement against the warehouse and get the \
         resulting rows back. Always use this tool when the question asks about data \
         values, counts, aggregates, breakdowns or trends. Input must be a single \
         SELECT statement; any other statement kind is rejected."
    }

    async fn call(&self, input: &str) -> Result<Observation> {
        let sql = strip_sql_fences(input);
        debug!(sql = sql.as_str(), "run_query");
        Ok(match self.executor.execute(&sql).await {
            TabularResult::Rows(table) => Observation::Table(table),
            TabularResult::Error(err) => Observation::Error(err),
        })
    }
}

/// Oracles habitually wrap SQL in markdown fences; unwrap before execution.
pub fn strip_sql_fences(input: &str) -> String {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = rest
        .strip_prefix("sql")
        .or_else(|| rest.strip_prefix("SQL"))
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim().to_string()
}

/// Enumerates the tables available in the warehouse.
pub struct ListTablesTool {
    warehouse: Arc<dyn Warehouse>,
}

impl ListTablesTool {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    fn name(&self) -> &str {
        LIST_TABLES
    }

    fn description(&self) -> &str {
        "List the names of all tables available in the warehouse, one per line. \
         The input is ignored. Use this first when you do not know which tables exist."
    }

    async fn call(&self, _input: &str) -> Result<Observation> {
        let tables = self.warehouse.list_tables().await?;
        if tables.is_empty() {
            return Ok(Observation::Text("no tables found".to_string()));
        }
        Ok(Observation::Text(tables.join("\n")))
    }
}

/// Returns the schema of one table, with fuzzy suggestions on a miss.
pub struct DescribeTableTool {
    warehouse: Arc<dyn Warehouse>,
}

impl DescribeTableTool {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }

    async fn suggestions(&self, wanted: &str) -> Result<String> {
        let mut candidates = self.warehouse.list_tables().await?;
        candidates.sort_by(|a, b| {
            strsim::jaro_winkler(wanted, b)
                .partial_cmp(&strsim::jaro_winkler(wanted, a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(candidates.iter().take(3).join(", "))
    }
}

#[async_trait]
impl Tool for DescribeTableTool {
    fn name(&self) -> &str {
        DESCRIBE_TABLE
    }

    fn description(&self) -> &str {
        "Get the column names and types of a named table. Input is the table name. \
         The output contains schema only, no sample rows; never infer row-level \
         facts, values or cardinalities from the schema alone. For any question \
         about the data itself, run a query with run_query instead."
    }

    async fn call(&self, input: &str) -> Result<Observation> {
        let name = input
            .trim()
            .trim_matches(|c| c == '`' || c == '"' || c == '\'')
            .trim();
        if name.is_empty() {
            return Ok(Observation::Error(crate::table::ErrorResult::new(
                "describe_table needs a table name",
            )));
        }

        let columns = self.warehouse.describe_table(name).await?;
        if columns.is_empty() {
            let closest = self.suggestions(name).await?;
            return Ok(Observation::Error(crate::table::ErrorResult::new(format!(
                "unknown table '{}'; closest matches: {}",
                name, closest
            ))));
        }

        let lines = columns
            .iter()
            .map(|(name, kind)| format!("column {}: {}", name, kind))
            .join("\n");
        Ok(Observation::Text(lines))
    }
}
