//! Reasoning Session
//!
//! Bounded decide/invoke/observe loop. Tool faults are recorded as
//! observations and the loop continues; only oracle faults are fatal.

use crate::error::Result;
use crate::oracle::{Decision, Oracle};
use crate::table::{ErrorResult, ExecutionStep, Observation, SessionResult};
use crate::tools::ToolRegistry;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_STEPS: usize = 10;

pub struct ReasoningSession {
    oracle: Arc<dyn Oracle>,
    registry: Arc<ToolRegistry>,
    max_steps: usize,
}

impl ReasoningSession {
    pub fn new(oracle: Arc<dyn Oracle>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            oracle,
            registry,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Drive one question to completion. The returned trace preserves
    /// exact chronological invocation order.
    pub async fn run(&self, question: &str) -> Result<SessionResult> {
        let session_id = Uuid::new_v4();
        info!(%session_id, question, "session started");

        let descriptors = self.registry.descriptors();
        let mut steps: Vec<ExecutionStep> = Vec::new();

        for turn in 1..=self.max_steps {
            // Oracle faults propagate: no SessionResult on a dead oracle.
            let decision = self.oracle.decide(question, &descriptors, &steps).await?;

            let (tool_name, tool_input) = match decision {
                Decision::Final { answer } => {
                    info!(%session_id, turns = turn, "session finished");
                    return Ok(SessionResult {
                        final_answer: answer,
                        steps,
                    });
                }
                Decision::CallTool { tool, input } => (tool, input),
            };

            let observation = match self.registry.get(&tool_name) {
                None => {
                    warn!(%session_id, tool = tool_name.as_str(), "unknown tool chosen");
                    Observation::Text(format!(
                        "Unknown tool '{}'. Valid tools: {}",
                        tool_name,
                        self.registry.names().join(", ")
                    ))
                }
                Some(tool) => match tool.call(&tool_input).await {
                    Ok(observation) => observation,
                    // Tool faults are observations, not session failures.
                    Err(e) => {
                        warn!(%session_id, tool = tool_name.as_str(), error = %e, "tool fault");
                        Observation::Error(ErrorResult::new(e.to_string()))
                    }
                },
            };

            info!(%session_id, turn, tool = tool_name.as_str(), "step recorded");
            steps.push(ExecutionStep {
                tool_name,
                tool_input,
                observation,
            });
        }

        warn!(%session_id, max_steps = self.max_steps, "step limit reached");
        Ok(SessionResult {
            final_answer: format!(
                "Stopped after {} steps without reaching a final answer.",
                self.max_steps
            ),
            steps,
        })
    }
}
