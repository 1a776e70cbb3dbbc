//! Passage retrieval for prompt grounding.
//!
//! The retrieval engine is a black box behind [`ContextRetriever`]: a query
//! and a top-k go in, ranked text snippets come out, and an empty result is
//! a valid answer rather than an error. The bundled [`KnowledgeBase`] ranks
//! markdown chunks by keyword overlap; swapping in a real vector store only
//! means implementing the trait.

use std::fs;
use std::io;
use std::path::Path;

use async_trait::async_trait;

/// Ranked-snippet retrieval. Unavailable or unmatched queries return an
/// empty list, never an error.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> Vec<String>;
}

/// Keyword-ranked retrieval over a chunked markdown knowledge base.
pub struct KnowledgeBase {
    chunks: Vec<String>,
}

impl KnowledgeBase {
    /// Chunk markdown content: a new chunk starts at each `##`/`###` heading,
    /// or when the current chunk would outgrow `chunk_size`.
    pub fn from_markdown(content: &str, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let mut chunks = Vec::new();
        let mut current = String::new();

        for line in content.lines() {
            let heading = line.starts_with("## ") || line.starts_with("### ");
            if (heading || current.len() + line.len() > chunk_size) && !current.trim().is_empty() {
                chunks.push(current.trim().to_string());
                current.clear();
            }
            current.push_str(line);
            current.push('\n');
        }
        if !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
        }

        Self { chunks }
    }

    pub fn load(path: &Path, chunk_size: usize) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_markdown(&content, chunk_size))
    }

    /// A knowledge base with nothing in it; every query retrieves nothing.
    pub fn empty() -> Self {
        Self { chunks: Vec::new() }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl ContextRetriever for KnowledgeBase {
    async fn retrieve(&self, query: &str, top_k: usize) -> Vec<String> {
        let terms = query_terms(query);
        if terms.is_empty() || self.chunks.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &String)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let lower = chunk.to_lowercase();
                let score = terms.iter().filter(|term| lower.contains(term.as_str())).count();
                (score, chunk)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps document order between equally-scored chunks.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(top_k).map(|(_, chunk)| chunk.clone()).collect()
    }
}

fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 3)
        .map(|word| word.to_string())
        .collect()
}

/// Render retrieved snippets the way the prompt expects them.
pub fn format_context(snippets: &[String]) -> String {
    snippets
        .iter()
        .enumerate()
        .map(|(index, snippet)| format!("[Context {}]\n{snippet}", index + 1))
        .collect::<Vec<_>>()
        .join("\n\n")
}
