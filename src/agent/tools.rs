use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::history::ToolCall;
use crate::access::Role;
use crate::llm::RagChain;

/// Tool description handed to the chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

#[async_trait]
pub trait AgentTool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// Runs the tool on the model's raw JSON arguments.
    async fn call(&self, arguments: &str) -> Result<String>;
}

/// Ordered set of tools available to one agent run.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn AgentTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, tool: Arc<dyn AgentTool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Executes one call. Unknown tools and tool failures come back as text
    /// so the model can react to them.
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.spec().name == call.name) else {
            log::warn!("Model requested unknown tool '{}'", call.name);
            return format!("Error: unknown tool '{}'", call.name);
        };

        log::info!("Calling tool {} with {}", call.name, call.arguments);
        match tool.call(&call.arguments).await {
            Ok(output) => output,
            Err(e) => {
                log::error!("Tool {} failed: {}", call.name, e);
                format!("Error: {} failed: {}", call.name, e)
            }
        }
    }
}

pub const RESEARCH_TOOL: &str = "research_fund_reports";

#[derive(Debug, Deserialize)]
struct ResearchArgs {
    query: String,
}

/// Searches the internal fund reports through the RAG chain, with the
/// visibility of the user the agent is acting for.
pub struct ResearchTool {
    chain: Arc<RagChain>,
    role: Role,
}

impl ResearchTool {
    pub fn new(chain: Arc<RagChain>, role: Role) -> Self {
        Self { chain, role }
    }
}

#[async_trait]
impl AgentTool for ResearchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: RESEARCH_TOOL.to_string(),
            description: "Use this tool to find qualitative information from internal Vanguard reports. \
                          Useful for questions about risks, outlooks, fees, or fund strategy."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look up in the fund reports"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, arguments: &str) -> Result<String> {
        let args: ResearchArgs = serde_json::from_str(arguments)?;
        self.chain.invoke(&args.query, &self.role).await
    }
}
