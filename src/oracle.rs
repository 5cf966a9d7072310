//! Oracle runtime
//!
//! The reasoning oracle is an external collaborator: it receives the
//! question, the tool descriptors and the trace so far, and returns either
//! a tool call or a final answer. `ChatOracle` speaks the zero-shot ReAct
//! protocol over an OpenAI-style chat-completions endpoint; anything the
//! oracle returns that fits neither shape is a fatal oracle fault.

use crate::config::Config;
use crate::error::{AssistantError, Result};
use crate::table::ExecutionStep;
use crate::tools::ToolDescriptor;
use async_trait::async_trait;
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

/// Rows of a table observation shown to the oracle per step.
const OBSERVATION_PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    CallTool { tool: String, input: String },
    Final { answer: String },
}

#[async_trait]
pub trait Oracle: Send + Sync {
    async fn decide(
        &self,
        question: &str,
        tools: &[ToolDescriptor],
        steps: &[ExecutionStep],
    ) -> Result<Decision>;
}

pub struct ChatOracle {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatOracle {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.openai_model.clone(),
        }
    }
}

#[async_trait]
impl Oracle for ChatOracle {
    async fn decide(
        &self,
        question: &str,
        tools: &[ToolDescriptor],
        steps: &[ExecutionStep],
    ) -> Result<Decision> {
        let prompt = build_prompt(question, tools, steps);
        debug!(turn = steps.len() + 1, "oracle round-trip");

        // Stop on "Observation:" so the model cannot fabricate tool output.
        let body = serde_json::json!({
            "model": self.model,
            "messages": [ { "role": "user", "content": prompt } ],
            "temperature": 0,
            "stop": ["Observation:"],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Oracle(format!("request failed: {}", e)))?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Oracle(format!("invalid response body: {}", e)))?;

        if !status.is_success() {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown service error");
            return Err(AssistantError::Oracle(format!("{}: {}", status, message)));
        }

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AssistantError::Oracle("no content in completion".to_string()))?;
        parse_decision(content)
    }
}

/// Zero-shot ReAct prompt: tool list, format instructions, then the
/// question with the trace replayed as an Action/Observation scratchpad.
pub fn build_prompt(
    question: &str,
    tools: &[ToolDescriptor],
    steps: &[ExecutionStep],
) -> String {
    let tool_lines = tools
        .iter()
        .map(|t| format!("{}: {}", t.name, t.description))
        .join("\n");
    let tool_names = tools.iter().map(|t| t.name.as_str()).join(", ");

    let mut prompt = format!(
        "Answer the following question as best you can. You have access to the \
         following tools:\n\n{tool_lines}\n\n\
         Use the following format:\n\n\
         Question: the input question you must answer\n\
         Thought: you should always think about what to do\n\
         Action: the action to take, must be one of [{tool_names}]\n\
         Action Input: the input to the action\n\
         Observation: the result of the action\n\
         ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
         Thought: I now know the final answer\n\
         Final Answer: the final answer to the original question\n\n\
         Begin!\n\n\
         Question: {question}\n"
    );
    for step in steps {
        prompt.push_str(&format!(
            "Thought:\nAction: {}\nAction Input: {}\nObservation: {}\n",
            step.tool_name,
            step.tool_input,
            step.observation.preview(OBSERVATION_PREVIEW_ROWS)
        ));
    }
    prompt.push_str("Thought:");
    prompt
}

lazy_static! {
    static ref ACTION_RE: Regex =
        Regex::new(r"(?s)Action:\s*([^\n]+)\n\s*Action\s*Input:\s*(.*)").unwrap();
}

/// Extract the oracle's decision from a completion. `Final Answer:` wins;
/// otherwise an Action/Action Input pair; anything else is malformed
/// oracle output and fatal to the session.
pub fn parse_decision(content: &str) -> Result<Decision> {
    if let Some(idx) = content.find("Final Answer:") {
        let answer = content[idx + "Final Answer:".len()..].trim().to_string();
        return Ok(Decision::Final { answer });
    }
    if let Some(caps) = ACTION_RE.captures(content) {
        let tool = caps[1].trim().trim_matches(|c| c == '[' || c == ']').to_string();
        let input = caps[2].trim().to_string();
        return Ok(Decision::CallTool { tool, input });
    }
    let snippet: String = content.chars().take(200).collect();
    Err(AssistantError::Oracle(format!(
        "could not parse oracle output: {:?}",
        snippet
    )))
}
