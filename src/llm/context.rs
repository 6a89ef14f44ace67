use crate::document::RetrievedChunk;

/// Renders retrieved chunks, in rank order, as citation-headed blocks
/// separated by a blank line.
pub fn format_docs(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            let source = chunk.source.as_deref().unwrap_or("Unknown");
            let year = chunk
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            format!("[Source: {}, Year: {}] \nContent: {}", source, year, chunk.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retrieved(text: &str, source: Option<&str>, year: Option<i64>) -> RetrievedChunk {
        RetrievedChunk {
            text: text.to_string(),
            score: 0.5,
            source: source.map(str::to_string),
            year,
            fund_id: None,
            access_level: None,
            page: None,
        }
    }

    #[test]
    fn every_block_carries_a_citation_header() {
        let formatted = format_docs(&[
            retrieved("Returns were 7%", Some("Annual Report"), Some(2025)),
            retrieved("Fees fell", Some("Fact Sheet"), Some(2024)),
        ]);
        assert_eq!(
            formatted,
            "[Source: Annual Report, Year: 2025] \nContent: Returns were 7%\n\n\
             [Source: Fact Sheet, Year: 2024] \nContent: Fees fell"
        );
    }

    #[test]
    fn missing_metadata_uses_placeholders() {
        let formatted = format_docs(&[retrieved("Orphan text", None, None)]);
        assert_eq!(formatted, "[Source: Unknown, Year: N/A] \nContent: Orphan text");
    }

    #[test]
    fn no_chunks_formats_to_empty() {
        assert_eq!(format_docs(&[]), "");
    }
}
