//! Assistant wiring
//!
//! Owns the oracle, the warehouse handle and the bound tool registry.
//! Oracle and warehouse setup is expensive and stateless across
//! questions, so one process-wide instance is built lazily on the first
//! question and reused afterwards. Nothing mutates the registry or the
//! connections post-construction.

use crate::config::Config;
use crate::error::{AssistantError, Result};
use crate::oracle::{ChatOracle, Oracle};
use crate::session::ReasoningSession;
use crate::table::SessionResult;
use crate::tools::ToolRegistry;
use crate::warehouse::{BigQueryWarehouse, Warehouse};
use lazy_static::lazy_static;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct Assistant {
    connection_uri: String,
    oracle: Arc<dyn Oracle>,
    registry: Arc<ToolRegistry>,
}

impl Assistant {
    pub fn from_config(config: Config) -> Result<Self> {
        let warehouse: Arc<dyn Warehouse> = Arc::new(BigQueryWarehouse::new(&config));
        let registry = Arc::new(ToolRegistry::standard(warehouse)?);
        let oracle: Arc<dyn Oracle> = Arc::new(ChatOracle::new(&config));
        info!(warehouse = config.connection_uri(), "assistant ready");
        Ok(Self {
            connection_uri: config.connection_uri(),
            oracle,
            registry,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(Config::from_env()?)
    }

    /// Test seam: any oracle and registry.
    pub fn with_parts(
        connection_uri: String,
        oracle: Arc<dyn Oracle>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            connection_uri,
            oracle,
            registry,
        }
    }

    pub fn connection_uri(&self) -> &str {
        &self.connection_uri
    }

    /// Answer one question with a fresh bounded session.
    pub async fn answer(&self, question: &str, max_steps: usize) -> Result<SessionResult> {
        ReasoningSession::new(self.oracle.clone(), self.registry.clone())
            .with_max_steps(max_steps)
            .run(question)
            .await
    }
}

lazy_static! {
    static ref SHARED: Mutex<Option<Arc<Assistant>>> = Mutex::new(None);
}

/// Process-wide assistant, built from the environment on first use.
/// A failed construction is reported to the caller but does not poison
/// later attempts.
pub fn shared() -> Result<Arc<Assistant>> {
    let mut guard = SHARED
        .lock()
        .map_err(|_| AssistantError::Config("assistant lock poisoned".to_string()))?;
    if let Some(assistant) = guard.as_ref() {
        return Ok(assistant.clone());
    }
    let assistant = Arc::new(Assistant::from_env()?);
    *guard = Some(assistant.clone());
    Ok(assistant)
}
