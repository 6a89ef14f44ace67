use anyhow::Result;
use std::sync::Arc;

use crate::access::Role;
use crate::agent::{fund_advisor_tools, Agent};
use crate::config::AppConfig;
use crate::database::{open_store, VectorStore};
use crate::document::{Ingestor, TextSplitter};
use crate::llm::{CachedEmbedder, RagChain, RoleFilteredRetriever, DEFAULT_QUERY_CACHE_SIZE};
use crate::providers::openai::build_providers;
use crate::providers::{CompletionProvider, EmbeddingProvider};

/// Long-lived components shared by the CLI and the HTTP server.
#[derive(Clone)]
pub struct Services {
    pub config: AppConfig,
    pub generator: Arc<dyn CompletionProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub store: Arc<dyn VectorStore>,
    pub chain: Arc<RagChain>,
}

impl Services {
    pub async fn build(config: AppConfig) -> Result<Self> {
        log::info!("Using {} provider", config.provider.label());
        let (generator, embedder) = build_providers(&config.provider);
        let store = open_store(&config.store).await?;
        Ok(Self::from_parts(config, generator, embedder, store))
    }

    pub fn from_parts(
        config: AppConfig,
        generator: Arc<dyn CompletionProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(CachedEmbedder::new(embedder, DEFAULT_QUERY_CACHE_SIZE));
        let retriever = RoleFilteredRetriever::new(store.clone(), embedder.clone()).with_top_k(config.top_k);
        let chain = Arc::new(RagChain::new(retriever, generator.clone()));
        Self {
            config,
            generator,
            embedder,
            store,
            chain,
        }
    }

    pub fn ingestor(&self) -> Result<Ingestor> {
        let splitter = TextSplitter::new(self.config.chunking)?;
        Ok(Ingestor::new(
            splitter,
            self.embedder.clone(),
            self.store.clone(),
            self.config.embedding_dimension,
        ))
    }

    /// A planner agent whose research tool sees what `role` may see.
    pub fn agent_for(&self, role: Role) -> Agent {
        Agent::new(self.generator.clone(), fund_advisor_tools(self.chain.clone(), role))
            .with_max_iterations(self.config.agent_max_iterations)
    }
}
