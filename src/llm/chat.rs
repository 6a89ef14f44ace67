use anyhow::Result;
use std::sync::Arc;

use super::context::format_docs;
use super::semantic_search::RoleFilteredRetriever;
use crate::access::Role;
use crate::document::RetrievedChunk;
use crate::providers::CompletionProvider;

pub const FALLBACK_ANSWER: &str = "Information not available in internal reports.";

pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a Vanguard Investment Research Assistant.\n\
         Answer the user's question using ONLY the context provided below.\n\
         If the answer is not in the context, say \"{FALLBACK_ANSWER}\"\n\
         Do not guess.\n\
         \n\
         Format your answer cleanly. If there are financial figures, use bullet points.\n\
         ALWAYS cite the 'source' and 'Year' from the metadata.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {question}\n"
    )
}

/// Sources the answer should cite but does not. Empty when the answer is
/// the fallback phrase or no sources were supplied.
pub fn missing_citations(answer: &str, chunks: &[RetrievedChunk]) -> Vec<String> {
    if answer.contains(FALLBACK_ANSWER) {
        return Vec::new();
    }
    let mut sources: Vec<String> = chunks.iter().filter_map(|c| c.source.clone()).collect();
    sources.dedup();
    if sources.iter().any(|s| answer.contains(s.as_str())) {
        return Vec::new();
    }
    sources
}

/// Result of one retrieval-augmented answer.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub answer: String,
    pub chunks: Vec<RetrievedChunk>,
}

/// Retriever, context formatter, prompt and generator composed into one call.
pub struct RagChain {
    retriever: RoleFilteredRetriever,
    generator: Arc<dyn CompletionProvider>,
}

impl RagChain {
    pub fn new(retriever: RoleFilteredRetriever, generator: Arc<dyn CompletionProvider>) -> Self {
        Self { retriever, generator }
    }

    pub async fn answer(&self, question: &str, role: &Role) -> Result<RagAnswer> {
        let chunks = self.retriever.retrieve(question, role).await?;
        if chunks.is_empty() {
            log::info!("No eligible context found for role '{}'", role);
        }

        let context = format_docs(&chunks);
        let prompt = build_prompt(&context, question);
        let answer = self.generator.complete(&prompt).await?;

        let missing = missing_citations(&answer, &chunks);
        if !missing.is_empty() {
            log::warn!("Answer cites none of the supplied sources: {}", missing.join(", "));
        }

        Ok(RagAnswer { answer, chunks })
    }

    pub async fn invoke(&self, question: &str, role: &Role) -> Result<String> {
        Ok(self.answer(question, role).await?.answer)
    }
}
