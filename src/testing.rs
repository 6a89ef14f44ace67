//! In-crate fakes shared by unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::agent::{Message, ToolCall, ToolSpec};
use crate::document::{AccessLevel, Chunk, ChunkMetadata};
use crate::providers::{AssistantTurn, CompletionProvider, EmbeddingProvider};

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket, so
/// texts sharing words land close together.
pub struct FakeEmbedder {
    pub dimension: usize,
    pub query_calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            query_calls: AtomicUsize::new(0),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for word in text.split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if word.is_empty() {
                continue;
            }
            let bucket = word
                .bytes()
                .fold(7u64, |h, b| h.wrapping_mul(31).wrapping_add(b as u64))
                % self.dimension as u64;
            vector[bucket as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }
}

/// Chat provider that replays scripted turns and records what it was sent.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<AssistantTurn>>,
    repeat: Option<AssistantTurn>,
    completion: String,
    pub prompts: Mutex<Vec<String>>,
    pub transcripts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<AssistantTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            repeat: None,
            completion: "scripted answer".to_string(),
            prompts: Mutex::new(Vec::new()),
            transcripts: Mutex::new(Vec::new()),
        }
    }

    /// Returns the same turn on every chat call.
    pub fn repeating(turn: AssistantTurn) -> Self {
        Self {
            repeat: Some(turn),
            ..Self::new(Vec::new())
        }
    }

    pub fn completing(answer: &str) -> Self {
        Self {
            completion: answer.to_string(),
            ..Self::new(Vec::new())
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.completion.clone())
    }

    async fn chat(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<AssistantTurn> {
        self.transcripts.lock().unwrap().push(messages.to_vec());
        if let Some(turn) = &self.repeat {
            return Ok(turn.clone());
        }
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("script exhausted"))
    }

    fn get_model_info(&self) -> String {
        "scripted".to_string()
    }
}

/// Chat provider whose every call fails.
pub struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(anyhow!("upstream exploded: secret-token-123"))
    }

    async fn chat(&self, _messages: &[Message], _tools: &[ToolSpec]) -> Result<AssistantTurn> {
        Err(anyhow!("upstream exploded: secret-token-123"))
    }

    fn get_model_info(&self) -> String {
        "failing".to_string()
    }
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

pub fn chunk(text: &str, level: AccessLevel, source: &str) -> Chunk {
    Chunk {
        text: text.to_string(),
        metadata: ChunkMetadata {
            access_level: level,
            fund_id: "VYM".to_string(),
            year: 2025,
            source: source.to_string(),
            page: Some(1),
        },
    }
}
