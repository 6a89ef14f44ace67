pub mod chat;
pub mod context;
pub mod embeddings;
pub mod semantic_search;

pub use chat::{build_prompt, missing_citations, RagAnswer, RagChain, FALLBACK_ANSWER};
pub use context::format_docs;
pub use embeddings::{CachedEmbedder, DEFAULT_QUERY_CACHE_SIZE};
pub use semantic_search::{RetrievalRequest, RoleFilteredRetriever, DEFAULT_TOP_K};
