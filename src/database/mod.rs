pub mod database;
pub mod local_store;
pub mod qdrant_config;
pub mod vector_db;

use std::sync::Arc;

use crate::config::StoreConfig;

pub use database::{AuditEntry, Database, DatabaseError};
pub use local_store::LocalVectorStore;
pub use vector_db::{EmbeddedRecord, VectorDB, VectorDBError, VectorStore};

/// Opens the vector store backend chosen by configuration.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn VectorStore>, VectorDBError> {
    match config {
        StoreConfig::Qdrant { url, collection } => Ok(Arc::new(VectorDB::new(url, collection).await?)),
        StoreConfig::Local { path } => Ok(Arc::new(LocalVectorStore::open(path).await?)),
    }
}
