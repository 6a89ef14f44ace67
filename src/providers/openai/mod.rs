pub mod openai;

pub use openai::{build_providers, OpenAIProvider};
