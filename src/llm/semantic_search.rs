use anyhow::{Error, Result};
use std::sync::Arc;

use crate::access::{AccessFilter, AccessPolicy, Role};
use crate::database::VectorStore;
use crate::document::RetrievedChunk;
use crate::providers::EmbeddingProvider;

pub const DEFAULT_TOP_K: u64 = 3;

/// One filtered similarity search. Built per query and never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalRequest {
    pub query_text: String,
    pub k: u64,
    pub filter: AccessFilter,
}

/// Embeds the query and searches the store with the caller's access filter
/// applied inside the search.
pub struct RoleFilteredRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    policy: AccessPolicy,
    k: u64,
}

impl RoleFilteredRetriever {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            policy: AccessPolicy,
            k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, k: u64) -> Self {
        self.k = k;
        self
    }

    pub fn request_for(&self, query: &str, role: &Role) -> RetrievalRequest {
        let filter = self.policy.filter_for(role);
        match filter {
            AccessFilter::ExcludeConfidential => log::warn!(
                "Security Alert: Restrictions applied for role '{}'. Filtering out confidential data.",
                role
            ),
            AccessFilter::Unrestricted => log::info!("Access granted for role '{}'", role),
        }
        RetrievalRequest {
            query_text: query.to_string(),
            k: self.k,
            filter,
        }
    }

    pub async fn retrieve(&self, query: &str, role: &Role) -> Result<Vec<RetrievedChunk>> {
        let request = self.request_for(query, role);
        self.execute(&request).await
    }

    pub async fn execute(&self, request: &RetrievalRequest) -> Result<Vec<RetrievedChunk>> {
        let vector = self.embedder.embed_query(&request.query_text).await?;
        let chunks = self
            .store
            .search(vector, request.k, request.filter)
            .await
            .map_err(|e| Error::msg(format!("Failed to search: {}", e)))?;

        log::info!("Retrieved {} chunks (k = {})", chunks.len(), request.k);
        Ok(chunks)
    }
}
