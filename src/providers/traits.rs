use anyhow::Result;
use async_trait::async_trait;

use crate::agent::{Message, ToolCall, ToolSpec};

/// What the chat model produced for one turn: either text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantTurn {
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Single-prompt completion, sent as one user message.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Multi-turn chat with the given tools bound.
    async fn chat(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AssistantTurn>;

    fn get_model_info(&self) -> String;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of document texts, one vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}
