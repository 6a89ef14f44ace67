use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::vector_db::{EmbeddedRecord, VectorDBError, VectorStore};
use crate::access::AccessFilter;
use crate::document::RetrievedChunk;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collection {
    dimension: Option<u64>,
    records: Vec<EmbeddedRecord>,
}

/// Exact-search store kept in memory and, when opened from a path, written
/// back to a JSON file after every upsert. Meant for development and tests
/// where no Qdrant server is available.
pub struct LocalVectorStore {
    path: Option<PathBuf>,
    collection: RwLock<Collection>,
}

impl LocalVectorStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            collection: RwLock::new(Collection::default()),
        }
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self, VectorDBError> {
        let path = path.as_ref().to_path_buf();
        let collection = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| VectorDBError::Storage(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collection::default(),
            Err(e) => return Err(VectorDBError::Storage(format!("{}: {}", path.display(), e))),
        };
        log::info!(
            "Opened local vector store {} ({} records)",
            path.display(),
            collection.records.len()
        );
        Ok(Self {
            path: Some(path),
            collection: RwLock::new(collection),
        })
    }

    pub async fn len(&self) -> usize {
        self.collection.read().await.records.len()
    }

    async fn persist(&self, collection: &Collection) -> Result<(), VectorDBError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VectorDBError::Storage(e.to_string()))?;
        }
        let bytes = serde_json::to_vec(collection).map_err(|e| VectorDBError::Storage(e.to_string()))?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| VectorDBError::Storage(e.to_string()))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn ensure_collection(&self, dimension: u64) -> Result<(), VectorDBError> {
        let mut collection = self.collection.write().await;
        match collection.dimension {
            Some(expected) if expected != dimension => Err(VectorDBError::DimensionMismatch {
                expected,
                actual: dimension,
            }),
            Some(_) => Ok(()),
            None => {
                collection.dimension = Some(dimension);
                Ok(())
            }
        }
    }

    async fn upsert(&self, records: Vec<EmbeddedRecord>) -> Result<usize, VectorDBError> {
        let mut collection = self.collection.write().await;
        let count = records.len();
        for record in records {
            let actual = record.vector.len() as u64;
            let expected = *collection.dimension.get_or_insert(actual);
            if actual != expected {
                return Err(VectorDBError::DimensionMismatch { expected, actual });
            }
            match collection.records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => collection.records.push(record),
            }
        }
        self.persist(&collection).await?;
        Ok(count)
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: u64,
        filter: AccessFilter,
    ) -> Result<Vec<RetrievedChunk>, VectorDBError> {
        let collection = self.collection.read().await;
        if let Some(expected) = collection.dimension {
            let actual = query_vector.len() as u64;
            if actual != expected {
                return Err(VectorDBError::DimensionMismatch { expected, actual });
            }
        }

        // filter first so the limit counts eligible records only
        let mut scored: Vec<(f32, &EmbeddedRecord)> = collection
            .records
            .iter()
            .filter(|record| filter.permits(&record.chunk.metadata))
            .map(|record| (cosine_similarity(&query_vector, &record.vector), record))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit as usize)
            .map(|(score, record)| RetrievedChunk::from_chunk(&record.chunk, score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AccessLevel, Chunk, ChunkMetadata};

    fn record(text: &str, level: AccessLevel, vector: Vec<f32>) -> EmbeddedRecord {
        EmbeddedRecord::new(
            vector,
            Chunk {
                text: text.to_string(),
                metadata: ChunkMetadata {
                    access_level: level,
                    fund_id: "VYM".to_string(),
                    year: 2025,
                    source: "Annual Report".to_string(),
                    page: Some(1),
                },
            },
        )
    }

    #[tokio::test]
    async fn ranks_by_cosine_similarity() {
        let store = LocalVectorStore::in_memory();
        store.ensure_collection(2).await.unwrap();
        store
            .upsert(vec![
                record("far", AccessLevel::Public, vec![0.0, 1.0]),
                record("near", AccessLevel::Public, vec![1.0, 0.1]),
            ])
            .await
            .unwrap();

        let hits = store.search(vec![1.0, 0.0], 2, AccessFilter::Unrestricted).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "near");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn filter_applies_before_limit() {
        let store = LocalVectorStore::in_memory();
        store
            .upsert(vec![
                record("secret-1", AccessLevel::Confidential, vec![1.0, 0.0]),
                record("secret-2", AccessLevel::Confidential, vec![0.9, 0.1]),
                record("public", AccessLevel::Public, vec![0.1, 0.9]),
            ])
            .await
            .unwrap();

        let hits = store
            .search(vec![1.0, 0.0], 1, AccessFilter::ExcludeConfidential)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "public");
    }

    #[tokio::test]
    async fn rejects_dimension_mismatch() {
        let store = LocalVectorStore::in_memory();
        store.ensure_collection(3).await.unwrap();
        let err = store
            .upsert(vec![record("bad", AccessLevel::Public, vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorDBError::DimensionMismatch { expected: 3, actual: 2 }));
        assert!(store.ensure_collection(4).await.is_err());
    }

    #[tokio::test]
    async fn persists_to_disk_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("funds.json");

        let store = LocalVectorStore::open(&path).await.unwrap();
        store
            .upsert(vec![record("kept", AccessLevel::Public, vec![1.0, 0.0])])
            .await
            .unwrap();
        drop(store);

        let reopened = LocalVectorStore::open(&path).await.unwrap();
        assert_eq!(reopened.len().await, 1);
        let hits = reopened.search(vec![1.0, 0.0], 3, AccessFilter::Unrestricted).await.unwrap();
        assert_eq!(hits[0].text, "kept");
        assert_eq!(hits[0].source.as_deref(), Some("Annual Report"));
    }
}
