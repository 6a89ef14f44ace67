use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        point_id::PointIdOptions, value::Kind, vectors_config, with_payload_selector::SelectorOptions,
        Condition, CreateCollection, Distance, Filter, PointId, PointStruct, ScoredPoint, SearchPoints,
        UpsertPoints, Value, VectorParams, VectorsConfig, WithPayloadSelector,
    },
    Qdrant,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::access::AccessFilter;
use crate::database::qdrant_config::create_qdrant_client;
use crate::document::{AccessLevel, Chunk, RetrievedChunk};

#[derive(Error, Debug)]
pub enum VectorDBError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Operation failed: {0}")]
    Operation(String),
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: u64, actual: u64 },
    #[error("Storage error: {0}")]
    Storage(String),
}

/// A chunk paired with its embedding, ready to be persisted.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmbeddedRecord {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

impl EmbeddedRecord {
    pub fn new(vector: Vec<f32>, chunk: Chunk) -> Self {
        Self {
            id: Uuid::new_v4(),
            vector,
            chunk,
        }
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the backing collection if needed. Fails if an existing
    /// collection was built with a different dimension.
    async fn ensure_collection(&self, dimension: u64) -> Result<(), VectorDBError>;

    async fn upsert(&self, records: Vec<EmbeddedRecord>) -> Result<usize, VectorDBError>;

    /// Top-`limit` nearest neighbours among records the filter admits.
    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: u64,
        filter: AccessFilter,
    ) -> Result<Vec<RetrievedChunk>, VectorDBError>;
}

/// Qdrant-backed store. Access filters become payload conditions so the
/// server ranks only eligible points.
#[derive(Clone)]
pub struct VectorDB {
    client: Arc<Qdrant>,
    collection: String,
}

impl VectorDB {
    pub async fn new(url: &str, collection: &str) -> Result<Self, VectorDBError> {
        let client = create_qdrant_client(url)
            .await
            .map_err(|e| VectorDBError::Connection(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
            collection: collection.to_string(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

pub(crate) fn payload_for(chunk: &Chunk) -> HashMap<String, Value> {
    let meta = &chunk.metadata;
    let mut payload = HashMap::new();
    payload.insert("text".to_string(), Value::from(chunk.text.clone()));
    payload.insert("access_level".to_string(), Value::from(meta.access_level.as_str().to_string()));
    payload.insert("fund_id".to_string(), Value::from(meta.fund_id.clone()));
    payload.insert("year".to_string(), Value::from(meta.year as i64));
    payload.insert("source".to_string(), Value::from(meta.source.clone()));
    if let Some(page) = meta.page {
        payload.insert("page".to_string(), Value::from(page as i64));
    }
    payload
}

pub(crate) fn filter_for(filter: AccessFilter) -> Option<Filter> {
    match filter {
        AccessFilter::Unrestricted => None,
        AccessFilter::ExcludeConfidential => Some(Filter::must_not([Condition::matches(
            "access_level",
            AccessLevel::Confidential.as_str().to_string(),
        )])),
    }
}

fn string_field(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn integer_field(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::IntegerValue(i)) => Some(*i),
        Some(Kind::DoubleValue(d)) => Some(*d as i64),
        _ => None,
    })
}

pub(crate) fn decode_point(point: ScoredPoint) -> Option<RetrievedChunk> {
    let payload = point.payload;
    let text = string_field(&payload, "text")?;
    Some(RetrievedChunk {
        text,
        score: point.score,
        source: string_field(&payload, "source"),
        year: integer_field(&payload, "year"),
        fund_id: string_field(&payload, "fund_id"),
        access_level: string_field(&payload, "access_level").and_then(|s| s.parse().ok()),
        page: integer_field(&payload, "page").map(|p| p as u32),
    })
}

#[async_trait]
impl VectorStore for VectorDB {
    async fn ensure_collection(&self, dimension: u64) -> Result<(), VectorDBError> {
        let vectors_config = VectorParams {
            size: dimension,
            distance: Distance::Cosine.into(),
            ..Default::default()
        };

        let create_collection = CreateCollection {
            collection_name: self.collection.clone(),
            vectors_config: Some(VectorsConfig {
                config: Some(vectors_config::Config::Params(vectors_config)),
            }),
            ..Default::default()
        };

        match self.client.create_collection(create_collection).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().to_lowercase().contains("already exists") => {
                log::info!("Collection {} already exists, skipping creation", self.collection);
                Ok(())
            }
            Err(e) => Err(VectorDBError::Operation(e.to_string())),
        }
    }

    async fn upsert(&self, records: Vec<EmbeddedRecord>) -> Result<usize, VectorDBError> {
        let count = records.len();
        if count == 0 {
            return Ok(0);
        }

        let points = records
            .into_iter()
            .map(|record| PointStruct {
                id: Some(PointId {
                    point_id_options: Some(PointIdOptions::Uuid(record.id.to_string())),
                }),
                payload: payload_for(&record.chunk),
                vectors: Some(record.vector.into()),
            })
            .collect();

        let upsert_points = UpsertPoints {
            collection_name: self.collection.clone(),
            wait: Some(true),
            points,
            ..Default::default()
        };

        self.client
            .upsert_points(upsert_points)
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        Ok(count)
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: u64,
        filter: AccessFilter,
    ) -> Result<Vec<RetrievedChunk>, VectorDBError> {
        let request = SearchPoints {
            collection_name: self.collection.clone(),
            vector: query_vector,
            limit,
            filter: filter_for(filter),
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let results = self
            .client
            .search_points(request)
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        Ok(results.result.into_iter().filter_map(decode_point).collect())
    }
}
