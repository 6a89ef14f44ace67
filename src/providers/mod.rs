pub mod openai;
pub mod traits;
pub mod utils;

pub use traits::{AssistantTurn, CompletionProvider, EmbeddingProvider};
pub use utils::RetryPolicy;
