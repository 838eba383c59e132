//! Context retrieval backends.
//!
//! Augmented answers draw their context from a [`Retriever`]. The harness
//! never looks past this trait, so the ranking strategy belongs entirely to
//! the backend.

mod corpus;
mod qdrant;

pub use corpus::{Chunk, ChunkConfig, CorpusRetriever};
pub use qdrant::QdrantRetriever;

use crate::config::{RetrievalBackend, RetrievalConfig};
use crate::error::{EvalError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Separator placed between passages in a context block.
pub const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";

/// A ranked piece of reference text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    /// Where the passage came from (file, document id, ...), if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Backend-specific relevance score; higher is better.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Passage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
            score: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// A ranked passage lookup capability.
///
/// Implementations must be safe to call from many tasks at once.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `k` passages for `query`, best first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> Result<()>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// Join passages into a single context block.
pub fn join_passages(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}

/// Build the configured retriever, or `None` when retrieval is disabled.
pub fn build_retriever(config: &RetrievalConfig) -> Result<Option<Arc<dyn Retriever>>> {
    let retriever: Arc<dyn Retriever> = match config.backend {
        RetrievalBackend::Qdrant => Arc::new(QdrantRetriever::new(config.clone())?),
        RetrievalBackend::Corpus => {
            let path = config.corpus_path.as_deref().ok_or_else(|| {
                EvalError::Config("Corpus retrieval needs a corpus path".to_string())
            })?;
            let chunking = ChunkConfig {
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
            };
            Arc::new(CorpusRetriever::load(path, chunking)?)
        }
        RetrievalBackend::None => return Ok(None),
    };
    Ok(Some(retriever))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_passages() {
        let passages = vec![Passage::new("Article 9"), Passage::new("Article 1240")];
        assert_eq!(join_passages(&passages), "Article 9\n\n---\n\nArticle 1240");
        assert_eq!(join_passages(&[]), "");
    }

    #[test]
    fn test_build_none_backend() {
        let config = RetrievalConfig {
            backend: RetrievalBackend::None,
            ..Default::default()
        };
        assert!(build_retriever(&config).unwrap().is_none());
    }

    #[test]
    fn test_build_corpus_without_path_fails() {
        let config = RetrievalConfig {
            backend: RetrievalBackend::Corpus,
            ..Default::default()
        };
        assert!(build_retriever(&config).is_err());
    }
}
