//! Local corpus retrieval.
//!
//! Loads every `.txt` / `.md` file under a directory, splits it into
//! overlapping chunks and ranks chunks by lexical overlap with the query.
//! Useful for offline runs where no vector store is available.

use super::{Passage, Retriever};
use crate::error::{EvalError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Words too common to say anything about relevance.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "de", "des", "du", "est", "et", "for", "how",
    "in", "is", "it", "la", "le", "les", "of", "on", "or", "que", "the", "to", "un", "une", "what",
    "which", "who", "with",
];

/// Configuration for text chunking.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
        }
    }
}

/// A chunk of a corpus file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// File the chunk was cut from.
    pub source: String,
    /// Start character position in the file.
    pub start_pos: usize,
    /// End character position in the file.
    pub end_pos: usize,
}

#[derive(Debug)]
struct IndexedChunk {
    chunk: Chunk,
    term_counts: HashMap<String, usize>,
    term_total: usize,
}

/// In-memory lexical retriever over a directory of text files.
pub struct CorpusRetriever {
    root: PathBuf,
    chunks: Vec<IndexedChunk>,
}

impl CorpusRetriever {
    /// Load and chunk every text file under `root`.
    pub fn load(root: &Path, config: ChunkConfig) -> Result<Self> {
        if !root.is_dir() {
            return Err(EvalError::Config(format!(
                "Corpus path '{}' does not exist or is not a directory",
                root.display()
            )));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("txt") | Some("md")
                )
            })
            .collect();
        files.sort();

        let mut documents = Vec::with_capacity(files.len());
        for path in &files {
            let text = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
            let source = path
                .strip_prefix(root)
                .unwrap_or(path)
                .display()
                .to_string();
            documents.push((source, text));
        }

        let retriever = Self::from_documents(root, documents, &config);
        info!(
            files = files.len(),
            chunks = retriever.len(),
            "Loaded corpus from {}",
            root.display()
        );
        Ok(retriever)
    }

    /// Build from in-memory `(source, text)` documents.
    pub fn from_documents(
        root: impl Into<PathBuf>,
        documents: Vec<(String, String)>,
        config: &ChunkConfig,
    ) -> Self {
        let chunks = documents
            .into_iter()
            .flat_map(|(source, text)| chunk_text(&source, &text, config))
            .map(|chunk| {
                let terms = tokenize(&chunk.text);
                let term_total = terms.len();
                let mut term_counts = HashMap::new();
                for term in terms {
                    *term_counts.entry(term).or_insert(0) += 1;
                }
                IndexedChunk {
                    chunk,
                    term_counts,
                    term_total,
                }
            })
            .collect();

        Self {
            root: root.into(),
            chunks,
        }
    }

    /// Number of chunks in the index.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn rank(&self, query: &str, k: usize) -> Vec<Passage> {
        let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .filter_map(|(order, indexed)| {
                let hits: usize = query_terms
                    .iter()
                    .filter_map(|term| indexed.term_counts.get(term))
                    .sum();
                if hits == 0 {
                    return None;
                }
                Some((order, hits as f32 / indexed.term_total.max(1) as f32))
            })
            .collect();

        // Sort by score descending; ties keep corpus order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(order, score)| {
                let chunk = &self.chunks[order].chunk;
                Passage::new(chunk.text.clone())
                    .with_source(chunk.source.clone())
                    .with_score(score)
            })
            .collect()
    }
}

#[async_trait]
impl Retriever for CorpusRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let passages = self.rank(query, k);
        debug!(count = passages.len(), "Corpus matched passages");
        Ok(passages)
    }

    async fn health_check(&self) -> Result<()> {
        if self.chunks.is_empty() {
            return Err(EvalError::Config(format!(
                "No text found in corpus at '{}'",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("corpus:{}", self.root.display())
    }
}

/// Lowercased alphanumeric terms, without stopwords.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Chunk text into overlapping segments, preferring sentence boundaries.
fn chunk_text(source: &str, text: &str, config: &ChunkConfig) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let text_len = chars.len();
    let chunk_size = config.chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text_len {
        let end = (start + chunk_size).min(text_len);

        // Look for a sentence ending in the last 100 chars of the window.
        let final_end = if end < text_len {
            let search_start = end.saturating_sub(100).max(start + 1);
            (search_start..end)
                .rev()
                .find(|&i| matches!(chars[i], '.' | '!' | '?'))
                .map(|i| i + 1)
                .unwrap_or(end)
        } else {
            end
        };

        let piece: String = chars[start..final_end].iter().collect();
        if !piece.trim().is_empty() {
            chunks.push(Chunk {
                text: piece.trim().to_string(),
                source: source.to_string(),
                start_pos: start,
                end_pos: final_end,
            });
        }

        if final_end >= text_len {
            break;
        }

        let next_start = final_end.saturating_sub(config.chunk_overlap);
        // Overlap only when it still moves forward.
        start = if next_start > start {
            next_start
        } else {
            final_end
        };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_corpus() -> CorpusRetriever {
        CorpusRetriever::from_documents(
            "mem",
            vec![
                (
                    "civil.txt".to_string(),
                    "Article 9. Everyone has the right to respect for private life.".to_string(),
                ),
                (
                    "tort.txt".to_string(),
                    "Article 1240. Any act causing damage to another obliges the one at fault to repair it. This is the basis of tort liability.".to_string(),
                ),
            ],
            &ChunkConfig::default(),
        )
    }

    #[test]
    fn test_chunk_text() {
        let text = "This is a test. Another sentence here. And one more.";
        let config = ChunkConfig {
            chunk_size: 20,
            chunk_overlap: 5,
        };

        let chunks = chunk_text("t.txt", text, &config);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
            assert!(chunk.end_pos - chunk.start_pos <= 20);
        }
        assert_eq!(chunks[0].text, "This is a test.");
    }

    #[test]
    fn test_chunk_multibyte_text() {
        let text = "Les délits sont réprimés. ".repeat(40);
        let config = ChunkConfig {
            chunk_size: 64,
            chunk_overlap: 8,
        };
        let chunks = chunk_text("fr.txt", &text, &config);
        assert!(!chunks.is_empty());
        assert_eq!(chunks.last().unwrap().end_pos, text.chars().count());
    }

    #[test]
    fn test_tokenize_drops_stopwords() {
        assert_eq!(tokenize("What is Article 9?"), vec!["article", "9"]);
    }

    #[tokio::test]
    async fn test_retrieve_ranks_best_first() {
        let corpus = sample_corpus();
        let passages = corpus.retrieve("tort liability", 3).await.unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].source.as_deref(), Some("tort.txt"));

        let passages = corpus.retrieve("Article 9 private life", 2).await.unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].source.as_deref(), Some("civil.txt"));
    }

    #[tokio::test]
    async fn test_retrieve_respects_k() {
        let corpus = sample_corpus();
        assert_eq!(corpus.retrieve("article", 1).await.unwrap().len(), 1);
        assert!(corpus.retrieve("article", 0).await.unwrap().is_empty());
        assert!(corpus.retrieve("zebra", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "Contracts require consent.").unwrap();
        std::fs::write(dir.path().join("nested/b.md"), "# Tort\nA tort is a civil wrong.").unwrap();
        std::fs::write(dir.path().join("ignored.pdf"), "binary").unwrap();

        let corpus = CorpusRetriever::load(dir.path(), ChunkConfig::default()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert!(corpus.health_check().await.is_ok());

        let passages = corpus.retrieve("civil wrong", 1).await.unwrap();
        assert!(passages[0].source.as_deref().unwrap().ends_with("b.md"));
    }

    #[test]
    fn test_load_missing_directory() {
        let result = CorpusRetriever::load(Path::new("/nonexistent/corpus"), ChunkConfig::default());
        assert!(result.is_err());
    }
}
