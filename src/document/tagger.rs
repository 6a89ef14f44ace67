use serde::{Deserialize, Serialize};

use super::chunk::{AccessLevel, Chunk, ChunkMetadata};

/// Access-control and provenance values stamped on every chunk of one
/// source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentProfile {
    pub access_level: AccessLevel,
    pub fund_id: String,
    pub year: i32,
    pub source: String,
}

impl DocumentProfile {
    pub fn tag(&self, page: Option<u32>, text: String) -> Chunk {
        Chunk {
            text,
            metadata: ChunkMetadata {
                access_level: self.access_level,
                fund_id: self.fund_id.clone(),
                year: self.year,
                source: self.source.clone(),
                page,
            },
        }
    }

    pub fn tag_all(&self, pieces: Vec<(u32, String)>) -> Vec<Chunk> {
        pieces
            .into_iter()
            .map(|(page, text)| self.tag(Some(page), text))
            .collect()
    }
}
