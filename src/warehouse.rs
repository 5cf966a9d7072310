//! Warehouse access
//!
//! The warehouse is an external collaborator reached over the BigQuery
//! REST API (`jobs.query`). Everything above this module only sees the
//! `Warehouse` trait, so tests substitute in-memory implementations.

use crate::config::Config;
use crate::error::{AssistantError, Result};
use crate::table::{Column, ColumnType, Table};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Human-readable identifier used in logs and diagnostics.
    fn name(&self) -> String;

    /// Run a SELECT and materialize every result row. The SELECT gate
    /// lives in the executor; implementations may assume gated SQL.
    async fn run_select(&self, sql: &str) -> Result<Table>;

    /// All table names in the dataset, sorted.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// (column name, column type) pairs for one table, in schema order.
    /// An unknown table yields an empty list. No sample rows.
    async fn describe_table(&self, table: &str) -> Result<Vec<(String, String)>>;
}

/// BigQuery over the synchronous `jobs.query` REST endpoint. Schema
/// lookups go through INFORMATION_SCHEMA on the same endpoint.
pub struct BigQueryWarehouse {
    client: reqwest::Client,
    project: String,
    dataset: String,
    location: String,
    access_token: String,
    api_base: String,
}

impl BigQueryWarehouse {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            project: config.project.clone(),
            dataset: config.dataset.clone(),
            location: config.location.clone(),
            access_token: config.access_token.clone(),
            api_base: config.api_base.clone(),
        }
    }

    async fn query(&self, sql: &str) -> Result<Value> {
        let url = format!("{}/projects/{}/queries", self.api_base, self.project);
        let body = serde_json::json!({
            "query": sql,
            "useLegacySql": false,
            "location": self.location,
            "defaultDataset": {
                "projectId": self.project,
                "datasetId": self.dataset,
            },
        });
        debug!(sql, "warehouse query");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Warehouse(format!("request failed: {}", e)))?;
        decode_response(response).await
    }

    /// `getQueryResults` for one continuation page of a finished job.
    async fn result_page(&self, job_id: &str, page_token: &str) -> Result<Value> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.api_base, self.project, job_id
        );
        debug!(job_id, "fetching next result page");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("pageToken", page_token), ("location", self.location.as_str())])
            .send()
            .await
            .map_err(|e| AssistantError::Warehouse(format!("request failed: {}", e)))?;
        decode_response(response).await
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    fn name(&self) -> String {
        format!(
            "bigquery://{}/{}?location={}",
            self.project, self.dataset, self.location
        )
    }

    async fn run_select(&self, sql: &str) -> Result<Table> {
        let payload = self.query(sql).await?;
        ensure_job_complete(&payload)?;
        let columns = columns_from_schema(&payload)?;
        let mut rows = rows_from_payload(&payload, &columns)?;

        // jobs.query caps each response; follow pageToken until every
        // result row is materialized.
        let mut page_token = payload["pageToken"].as_str().map(String::from);
        if page_token.is_some() {
            let job_id = payload["jobReference"]["jobId"]
                .as_str()
                .ok_or_else(|| {
                    AssistantError::Warehouse(
                        "paginated response missing jobReference.jobId".to_string(),
                    )
                })?
                .to_string();
            while let Some(token) = page_token {
                let page = self.result_page(&job_id, &token).await?;
                ensure_job_complete(&page)?;
                rows.extend(rows_from_payload(&page, &columns)?);
                page_token = page["pageToken"].as_str().map(String::from);
            }
        }

        let mut table = Table::new(columns, rows);
        table.upgrade_datetime_columns();
        Ok(table)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT table_name FROM `{}.{}`.INFORMATION_SCHEMA.TABLES ORDER BY table_name",
            self.project, self.dataset
        );
        let table = self.run_select(&sql).await?;
        Ok(table
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_str).map(String::from))
            .collect())
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<(String, String)>> {
        let sql = format!(
            "SELECT column_name, data_type FROM `{}.{}`.INFORMATION_SCHEMA.COLUMNS \
             WHERE table_name = '{}' ORDER BY ordinal_position",
            self.project,
            self.dataset,
            table.replace('\'', "\\'")
        );
        let result = self.run_select(&sql).await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| match (row.first(), row.get(1)) {
                (Some(Value::String(name)), Some(Value::String(kind))) => {
                    Some((name.clone(), kind.clone()))
                }
                _ => None,
            })
            .collect())
    }
}

/// Shared status/error handling for service responses.
async fn decode_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .map_err(|e| AssistantError::Warehouse(format!("invalid response body: {}", e)))?;

    if !status.is_success() {
        let message = payload["error"]["message"]
            .as_str()
            .unwrap_or("unknown service error");
        return Err(AssistantError::Warehouse(format!("{}: {}", status, message)));
    }
    if let Some(errors) = payload["errors"].as_array() {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e["message"].as_str())
                .collect();
            return Err(AssistantError::Warehouse(messages.join("; ")));
        }
    }
    Ok(payload)
}

/// Map a BigQuery wire type to the classifier's inferred type.
pub fn column_type_for(wire_type: &str) -> ColumnType {
    match wire_type.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT64" | "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => {
            ColumnType::Numeric
        }
        "DATE" | "DATETIME" | "TIMESTAMP" => ColumnType::Datetime,
        _ => ColumnType::Text,
    }
}

/// A response that timed out server-side carries `jobComplete: false`
/// and no usable rows; treating it as data would show a wrong (empty)
/// answer.
fn ensure_job_complete(payload: &Value) -> Result<()> {
    if payload["jobComplete"].as_bool() == Some(false) {
        return Err(AssistantError::Warehouse(
            "query did not complete within the request deadline".to_string(),
        ));
    }
    Ok(())
}

fn columns_from_schema(payload: &Value) -> Result<Vec<Column>> {
    let fields = payload["schema"]["fields"]
        .as_array()
        .ok_or_else(|| AssistantError::Warehouse("response missing schema.fields".into()))?;
    Ok(fields
        .iter()
        .map(|field| {
            let name = field["name"].as_str().unwrap_or("").to_string();
            let kind = column_type_for(field["type"].as_str().unwrap_or(""));
            Column { name, kind }
        })
        .collect())
}

/// Cells arrive as strings in `rows[].f[].v`; numeric columns are parsed
/// back into numbers.
fn rows_from_payload(payload: &Value, columns: &[Column]) -> Result<Vec<Vec<Value>>> {
    let mut rows = Vec::new();
    if let Some(raw_rows) = payload["rows"].as_array() {
        for raw_row in raw_rows {
            let cells = raw_row["f"].as_array().ok_or_else(|| {
                AssistantError::Warehouse("response row missing cell list".into())
            })?;
            let row: Vec<Value> = cells
                .iter()
                .zip(columns.iter())
                .map(|(cell, column)| decode_cell(&cell["v"], column.kind))
                .collect();
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Build a `Table` from a single complete `jobs.query` response, with
/// schema-driven typing and the date-shaped text upgrade applied.
pub fn table_from_query_response(payload: &Value) -> Result<Table> {
    ensure_job_complete(payload)?;
    let columns = columns_from_schema(payload)?;
    let rows = rows_from_payload(payload, &columns)?;
    let mut table = Table::new(columns, rows);
    table.upgrade_datetime_columns();
    Ok(table)
}

fn decode_cell(value: &Value, kind: ColumnType) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) if kind == ColumnType::Numeric => s
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| s.parse::<f64>().map(Value::from))
            .unwrap_or_else(|_| Value::String(s.clone())),
        other => other.clone(),
    }
}
