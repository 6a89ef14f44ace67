use std::collections::VecDeque;

use super::DocumentError;

/// Break points tried in order: paragraph, line, word, then raw characters.
const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Upper bound on chunk length, in characters.
    pub chunk_size: usize,
    /// Characters carried over from the tail of the previous chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Recursive character splitter. Coarser separators win; a piece only falls
/// through to the next separator when it is still too large on its own.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: ChunkingConfig,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, DocumentError> {
        if config.chunk_size == 0 || config.chunk_overlap >= config.chunk_size {
            return Err(DocumentError::InvalidChunking {
                size: config.chunk_size,
                overlap: config.chunk_overlap,
            });
        }
        Ok(Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Splits every page independently, keeping document order. Pairs each
    /// chunk with the 1-based page number it came from.
    pub fn split_pages(&self, pages: &[String]) -> Vec<(u32, String)> {
        pages
            .iter()
            .enumerate()
            .flat_map(|(idx, page)| {
                self.split_text(page)
                    .into_iter()
                    .map(move |chunk| (idx as u32 + 1, chunk))
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();

        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut fitting: Vec<&str> = Vec::new();
        for piece in split_keep_separator(text, separator) {
            if char_len(piece) < self.config.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        chunks
    }

    /// Greedily packs small pieces into chunks, then drops pieces from the
    /// front until at most `chunk_overlap` characters remain for the next one.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > size && !current.is_empty() {
                push_joined(&mut docs, &current);
                while total > overlap || (total + len > size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            current.push_back(piece);
            total += len;
        }
        push_joined(&mut docs, &current);

        docs
    }
}

fn push_joined(docs: &mut Vec<String>, parts: &VecDeque<&str>) {
    let joined: String = parts.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

/// Splits before every occurrence of `separator`, so each piece after the
/// first starts with the separator it was cut at. Empty pieces are dropped.
fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
