mod chunk;
mod ingest;
mod loader;
mod splitter;
mod tagger;

use thiserror::Error;

pub use chunk::{AccessLevel, Chunk, ChunkMetadata, RetrievedChunk};
pub use ingest::{IngestReport, Ingestor};
pub use loader::load_pdf_pages;
pub use splitter::{ChunkingConfig, TextSplitter};
pub use tagger::DocumentProfile;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Invalid chunking configuration: size {size}, overlap {overlap}")]
    InvalidChunking { size: usize, overlap: usize },
    #[error("PDF extraction failed: {0}")]
    Extraction(String),
}
