use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::document::{AccessLevel, ChunkingConfig, DocumentProfile};

const PLACEHOLDER_KEY: &str = "placeholder_key";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("AZURE_OPENAI_ENDPOINT is required when AZURE_OPENAI_API_KEY is set")]
    MissingAzureEndpoint,
    #[error("{0} is required when AZURE_OPENAI_API_KEY is set")]
    MissingAzureDeployment(&'static str),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Invalid chunking configuration: size {size}, overlap {overlap}")]
    InvalidChunking { size: usize, overlap: usize },
}

/// Which OpenAI-compatible backend serves embeddings and chat completions.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAI {
        /// When unset, async-openai falls back to `OPENAI_API_KEY` itself.
        api_key: Option<String>,
        chat_model: String,
        embedding_model: String,
    },
    Azure {
        api_key: String,
        endpoint: String,
        api_version: String,
        chat_deployment: String,
        embedding_deployment: String,
    },
}

impl ProviderConfig {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderConfig::OpenAI { .. } => "OpenAI",
            ProviderConfig::Azure { .. } => "Azure OpenAI",
        }
    }
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Qdrant { url: String, collection: String },
    Local { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub pdf_path: PathBuf,
    pub profile: DocumentProfile,
}

/// Process-wide settings, resolved once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub store: StoreConfig,
    pub embedding_dimension: u64,
    pub document: DocumentSource,
    pub chunking: ChunkingConfig,
    pub top_k: u64,
    pub agent_max_iterations: usize,
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub audit_db_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. `from_env` is the
    /// production entry point; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("AZURE_OPENAI_API_KEY").filter(|k| k != PLACEHOLDER_KEY) {
            Some(api_key) => {
                let endpoint = get("AZURE_OPENAI_ENDPOINT").ok_or(ConfigError::MissingAzureEndpoint)?;
                ProviderConfig::Azure {
                    api_key,
                    endpoint,
                    api_version: get("AZURE_OPENAI_API_VERSION")
                        .unwrap_or_else(|| "2023-05-15".to_string()),
                    chat_deployment: get("AZURE_GPT4_DEPLOYMENT")
                        .ok_or(ConfigError::MissingAzureDeployment("AZURE_GPT4_DEPLOYMENT"))?,
                    embedding_deployment: get("AZURE_EMBEDDING_DEPLOYMENT")
                        .ok_or(ConfigError::MissingAzureDeployment("AZURE_EMBEDDING_DEPLOYMENT"))?,
                }
            }
            None => ProviderConfig::OpenAI {
                api_key: get("OPENAI_API_KEY"),
                chat_model: get("OPENAI_CHAT_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
                embedding_model: get("OPENAI_EMBEDDING_MODEL")
                    .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            },
        };

        let collection = get("COLLECTION_NAME").unwrap_or_else(|| "fund_reports".to_string());
        let store = match get("QDRANT_URL") {
            Some(url) => StoreConfig::Qdrant { url, collection },
            None => {
                let dir = PathBuf::from(get("VECTOR_DB_PATH").unwrap_or_else(|| "./vector_db".to_string()));
                StoreConfig::Local {
                    path: dir.join(format!("{}.json", collection)),
                }
            }
        };

        let profile = DocumentProfile {
            access_level: parse_or(&get, "FUND_ACCESS_LEVEL", AccessLevel::Confidential)?,
            fund_id: get("FUND_ID").unwrap_or_else(|| "VYM".to_string()),
            year: parse_or(&get, "FUND_YEAR", 2025)?,
            source: get("FUND_SOURCE").unwrap_or_else(|| {
                "Vanguard High Dividend Yield Index Fund Annual Report".to_string()
            }),
        };

        let chunking = ChunkingConfig {
            chunk_size: parse_or(&get, "CHUNK_SIZE", 1000)?,
            chunk_overlap: parse_or(&get, "CHUNK_OVERLAP", 200)?,
        };
        if chunking.chunk_size == 0 || chunking.chunk_overlap >= chunking.chunk_size {
            return Err(ConfigError::InvalidChunking {
                size: chunking.chunk_size,
                overlap: chunking.chunk_overlap,
            });
        }

        Ok(Self {
            provider,
            store,
            embedding_dimension: parse_or(&get, "EMBEDDING_DIMENSION", 1536)?,
            document: DocumentSource {
                pdf_path: PathBuf::from(
                    get("FUND_PDF_PATH").unwrap_or_else(|| "./data/fund_report_2024.pdf".to_string()),
                ),
                profile,
            },
            chunking,
            top_k: parse_or(&get, "RETRIEVAL_TOP_K", 3)?,
            agent_max_iterations: parse_or(&get, "AGENT_MAX_ITERATIONS", 8)?,
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 120)?),
            max_concurrent_requests: parse_or(&get, "MAX_CONCURRENT_REQUESTS", 16)?,
            audit_db_path: PathBuf::from(
                get("AUDIT_DB_PATH").unwrap_or_else(|| "data/audit.db".to_string()),
            ),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_select_openai_and_local_store() {
        let config = config_from(&[]).unwrap();
        assert!(matches!(config.provider, ProviderConfig::OpenAI { ref chat_model, .. } if chat_model == "gpt-4o"));
        match config.store {
            StoreConfig::Local { path } => assert!(path.ends_with("fund_reports.json")),
            other => panic!("unexpected store {:?}", other),
        }
        assert_eq!(config.top_k, 3);
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.document.profile.access_level, AccessLevel::Confidential);
        assert_eq!(config.document.profile.fund_id, "VYM");
        assert_eq!(config.document.profile.year, 2025);
    }

    #[test]
    fn placeholder_azure_key_falls_back_to_openai() {
        let config = config_from(&[("AZURE_OPENAI_API_KEY", "placeholder_key")]).unwrap();
        assert_eq!(config.provider.label(), "OpenAI");
    }

    #[test]
    fn azure_without_endpoint_is_fatal() {
        let err = config_from(&[("AZURE_OPENAI_API_KEY", "secret")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAzureEndpoint));
    }

    #[test]
    fn azure_selected_with_full_settings() {
        let config = config_from(&[
            ("AZURE_OPENAI_API_KEY", "secret"),
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
            ("AZURE_GPT4_DEPLOYMENT", "gpt4"),
            ("AZURE_EMBEDDING_DEPLOYMENT", "embed"),
        ])
        .unwrap();
        match config.provider {
            ProviderConfig::Azure { api_version, chat_deployment, .. } => {
                assert_eq!(api_version, "2023-05-15");
                assert_eq!(chat_deployment, "gpt4");
            }
            other => panic!("unexpected provider {:?}", other),
        }
    }

    #[test]
    fn qdrant_url_selects_qdrant_backend() {
        let config = config_from(&[("QDRANT_URL", "http://localhost:6333"), ("COLLECTION_NAME", "funds")]).unwrap();
        assert!(matches!(config.store, StoreConfig::Qdrant { ref collection, .. } if collection == "funds"));
    }

    #[test]
    fn rejects_bad_numbers_and_overlap() {
        assert!(matches!(
            config_from(&[("RETRIEVAL_TOP_K", "three")]),
            Err(ConfigError::InvalidValue { key: "RETRIEVAL_TOP_K", .. })
        ));
        assert!(matches!(
            config_from(&[("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")]),
            Err(ConfigError::InvalidChunking { .. })
        ));
    }
}
