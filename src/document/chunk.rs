use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Public,
    Confidential,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Confidential => "confidential",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(AccessLevel::Public),
            "confidential" => Ok(AccessLevel::Confidential),
            other => Err(format!("unknown access level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub access_level: AccessLevel,
    pub fund_id: String,
    pub year: i32,
    pub source: String,
    /// 1-based page the chunk was cut from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A chunk as read back from a vector store. Payload fields are optional
/// because the store may hold records written by other tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub score: f32,
    pub source: Option<String>,
    pub year: Option<i64>,
    pub fund_id: Option<String>,
    pub access_level: Option<AccessLevel>,
    pub page: Option<u32>,
}

impl RetrievedChunk {
    pub fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            text: chunk.text.clone(),
            score,
            source: Some(chunk.metadata.source.clone()),
            year: Some(chunk.metadata.year as i64),
            fund_id: Some(chunk.metadata.fund_id.clone()),
            access_level: Some(chunk.metadata.access_level),
            page: chunk.metadata.page,
        }
    }
}
