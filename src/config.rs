//! Environment-driven configuration
//!
//! Reads the warehouse and oracle settings from the process environment
//! (`.env` is loaded by the binary before this runs).

use crate::error::{AssistantError, Result};

pub const DEFAULT_BQ_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project holding the dataset.
    pub project: String,
    /// BigQuery dataset queried by the assistant.
    pub dataset: String,
    /// BigQuery location, defaults to "EU".
    pub location: String,
    /// Bearer token for the BigQuery REST API.
    pub access_token: String,
    /// REST endpoint base, overridable for tests/emulators.
    pub api_base: String,

    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            project: required("GCP_PROJECT")?,
            dataset: required("BQ_DATASET")?,
            location: optional("BQ_LOCATION", "EU"),
            access_token: required("BQ_ACCESS_TOKEN")?,
            api_base: optional("BQ_API_BASE", DEFAULT_BQ_API_BASE),
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: optional("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            openai_model: optional("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
        })
    }

    /// Connection string shown in diagnostics, matching the SQLAlchemy-style
    /// URI the warehouse is addressed by.
    pub fn connection_uri(&self) -> String {
        format!(
            "bigquery://{}/{}?location={}",
            self.project, self.dataset, self.location
        )
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| {
        AssistantError::Config(format!("missing required environment variable {}", name))
    })
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
