use anyhow::{anyhow, Result};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::loader::load_pdf_pages;
use super::splitter::TextSplitter;
use super::tagger::DocumentProfile;
use crate::database::{EmbeddedRecord, VectorStore};
use crate::providers::EmbeddingProvider;

const DEFAULT_BATCH_SIZE: usize = 64;
const BATCHES_IN_FLIGHT: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum IngestReport {
    /// The source file was not there; nothing was written.
    Skipped { path: PathBuf },
    Completed { pages: usize, chunks: usize },
}

/// Load, split, tag, embed and store one document.
pub struct Ingestor {
    splitter: TextSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    dimension: u64,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(
        splitter: TextSplitter,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        dimension: u64,
    ) -> Self {
        Self {
            splitter,
            embedder,
            store,
            dimension,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn ingest_pdf(&self, path: &Path, profile: &DocumentProfile) -> Result<IngestReport> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            error!("File not found at {}", path.display());
            return Ok(IngestReport::Skipped {
                path: path.to_path_buf(),
            });
        }

        info!("Loading PDF from {}", path.display());
        let pages = load_pdf_pages(path).await?;
        self.ingest_pages(&pages, profile).await
    }

    pub async fn ingest_pages(&self, pages: &[String], profile: &DocumentProfile) -> Result<IngestReport> {
        let pieces = self.splitter.split_pages(pages);
        let chunks = profile.tag_all(pieces);
        info!(
            "Split {} pages into {} chunks tagged {} / {} / {}",
            pages.len(),
            chunks.len(),
            profile.access_level,
            profile.fund_id,
            profile.year
        );

        if chunks.is_empty() {
            warn!("No text extracted; nothing to ingest");
            return Ok(IngestReport::Completed {
                pages: pages.len(),
                chunks: 0,
            });
        }

        let vectors = self.embed_all(chunks.iter().map(|c| c.text.clone()).collect()).await?;
        if let Some(bad) = vectors.iter().find(|v| v.len() as u64 != self.dimension) {
            return Err(anyhow!(
                "Embedding dimension {} does not match configured dimension {}",
                bad.len(),
                self.dimension
            ));
        }

        self.store.ensure_collection(self.dimension).await?;
        let records: Vec<EmbeddedRecord> = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, chunk)| EmbeddedRecord::new(vector, chunk))
            .collect();
        let stored = self.store.upsert(records).await?;

        info!("Successfully indexed {} chunks", stored);
        Ok(IngestReport::Completed {
            pages: pages.len(),
            chunks: stored,
        })
    }

    async fn embed_all(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let pb = ProgressBar::new(texts.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message("embedding chunks");

        let batches: Vec<&[String]> = texts.chunks(self.batch_size).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for window in batches.chunks(BATCHES_IN_FLIGHT) {
            let results = join_all(window.iter().map(|batch| self.embedder.embed_documents(batch))).await;
            for (batch, result) in window.iter().zip(results) {
                let embedded = result?;
                if embedded.len() != batch.len() {
                    pb.abandon_with_message("embedding failed");
                    return Err(anyhow!(
                        "Embedding provider returned {} vectors for {} texts",
                        embedded.len(),
                        batch.len()
                    ));
                }
                pb.inc(batch.len() as u64);
                vectors.extend(embedded);
            }
        }

        pb.finish_with_message("embedded");
        Ok(vectors)
    }
}
