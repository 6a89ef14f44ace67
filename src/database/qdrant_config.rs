use qdrant_client::{config::QdrantConfig, Qdrant};
use std::time::Duration;

use super::vector_db::VectorDBError;

/// Normalizes a Qdrant URL to its gRPC endpoint. The REST port 6333 is
/// swapped for the gRPC port 6334.
pub fn grpc_url(url: &str) -> String {
    let host = url.split("://").nth(1).unwrap_or(url).trim_end_matches('/');
    let host = match host.strip_suffix(":6333") {
        Some(stripped) => format!("{}:6334", stripped),
        None => host.to_string(),
    };
    format!("http://{}", host)
}

pub async fn create_qdrant_client(url: &str) -> Result<Qdrant, VectorDBError> {
    let url_with_scheme = grpc_url(url);
    log::info!("Attempting to connect to Qdrant with URL: {}", url_with_scheme);

    let mut config = QdrantConfig::from_url(&url_with_scheme);
    config.check_compatibility = false;
    config.timeout = Duration::from_secs(30);
    config.connect_timeout = Duration::from_secs(10);

    let client = Qdrant::new(config).map_err(|e| VectorDBError::Connection(e.to_string()))?;

    match client.list_collections().await {
        Ok(_) => {
            log::info!("Successfully connected to Qdrant");
            Ok(client)
        }
        Err(e) => {
            log::error!("Connection test failed: {}", e);
            Err(VectorDBError::Connection(format!("Failed to connect to Qdrant: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_port_maps_to_grpc_port() {
        assert_eq!(grpc_url("http://localhost:6333"), "http://localhost:6334");
        assert_eq!(grpc_url("localhost:6333/"), "http://localhost:6334");
        assert_eq!(grpc_url("https://qdrant.internal:7000"), "http://qdrant.internal:7000");
    }
}
