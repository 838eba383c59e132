//! Configuration for the evaluation harness.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values,
//! and command-line flags (applied by the binary) take precedence over both.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Text generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Any OpenAI-compatible chat completions endpoint.
    OpenAi,
    /// A local or remote Ollama server.
    #[default]
    Ollama,
    /// Anthropic messages API.
    Anthropic,
}

impl Provider {
    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Ollama => "qwen3:4b",
            Provider::Anthropic => "claude-sonnet-4-20250514",
        }
    }

    /// API base used when none is configured.
    pub fn default_api_base(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com",
            Provider::Ollama => "http://localhost:11434",
            Provider::Anthropic => "https://api.anthropic.com",
        }
    }

    fn requires_api_key(&self) -> bool {
        !matches!(self, Provider::Ollama)
    }
}

impl FromStr for Provider {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "ollama" => Ok(Provider::Ollama),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            other => Err(EvalError::Config(format!("Unknown provider '{}'", other))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::OpenAi => "openai",
            Provider::Ollama => "ollama",
            Provider::Anthropic => "anthropic",
        };
        f.write_str(name)
    }
}

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Which backend serves generation requests.
    #[serde(default)]
    pub provider: Provider,

    /// Base URL for the LLM API. Empty means the provider default.
    #[serde(default)]
    pub api_base: String,

    /// API key for authentication (unused by Ollama)
    #[serde(default)]
    pub api_key: String,

    /// Model name. Empty means the provider default.
    #[serde(default)]
    pub model: String,

    /// Maximum tokens for response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.0
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            api_base: String::new(),
            api_key: String::new(),
            model: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// The configured model, or the provider default.
    pub fn effective_model(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    /// The configured API base, or the provider default.
    pub fn effective_api_base(&self) -> &str {
        if self.api_base.is_empty() {
            self.provider.default_api_base()
        } else {
            &self.api_base
        }
    }
}

/// Where augmented-mode context comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalBackend {
    /// Qdrant vector store queried over HTTP.
    #[default]
    Qdrant,
    /// A local directory of text files.
    Corpus,
    /// No retrieval; augmented mode fails.
    None,
}

impl FromStr for RetrievalBackend {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "qdrant" => Ok(RetrievalBackend::Qdrant),
            "corpus" => Ok(RetrievalBackend::Corpus),
            "none" => Ok(RetrievalBackend::None),
            other => Err(EvalError::Config(format!(
                "Unknown retrieval backend '{}'",
                other
            ))),
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub backend: RetrievalBackend,

    /// Qdrant server URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Qdrant collection name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// OpenAI-compatible embeddings endpoint used to embed queries for Qdrant.
    #[serde(default = "default_embedding_api_base")]
    pub embedding_api_base: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Directory of `.txt`/`.md` files for the corpus backend.
    #[serde(default)]
    pub corpus_path: Option<PathBuf>,

    /// Maximum characters per corpus chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive corpus chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Per-call timeout in seconds for embedding and search requests
    #[serde(default = "default_retrieval_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    "law_library".to_string()
}

fn default_embedding_api_base() -> String {
    "http://localhost:8080".to_string()
}

fn default_embedding_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_retrieval_timeout_secs() -> u64 {
    30
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: RetrievalBackend::default(),
            qdrant_url: default_qdrant_url(),
            collection: default_collection(),
            embedding_api_base: default_embedding_api_base(),
            embedding_model: default_embedding_model(),
            corpus_path: None,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            timeout_secs: default_retrieval_timeout_secs(),
        }
    }
}

/// Evaluation run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Number of questions processed in parallel. 1 means strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Whether to ask the model for a narrative comparison.
    #[serde(default = "default_include_analysis")]
    pub include_analysis: bool,

    /// Number of context passages retrieved for augmented answers.
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,

    /// Characters of each answer quoted in the analysis prompt.
    #[serde(default = "default_analysis_char_budget")]
    pub analysis_char_budget: usize,

    /// Characters of each answer shown in the summary table.
    #[serde(default = "default_summary_cell_limit")]
    pub summary_cell_limit: usize,
}

fn default_concurrency() -> usize {
    1
}

fn default_include_analysis() -> bool {
    true
}

fn default_retrieval_k() -> usize {
    3
}

fn default_analysis_char_budget() -> usize {
    1000
}

fn default_summary_cell_limit() -> usize {
    200
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            include_analysis: default_include_analysis(),
            retrieval_k: default_retrieval_k(),
            analysis_char_budget: default_analysis_char_budget(),
            summary_cell_limit: default_summary_cell_limit(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

impl Config {
    /// Load configuration from the default config file (if any) and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file (~/.config/rag-eval/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path().filter(|p| p.exists());
        Self::load_with(path.as_deref())
    }

    /// Same as [`Config::load`] but with an explicit config file.
    pub fn load_with(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::load_from_file(path)?,
            None => Config::default(),
        };

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;

        serde_yaml::from_str(&content)
            .map_err(|e| EvalError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Override fields from environment-style lookups.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(provider) = lookup("RAG_EVAL_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }
        if let Some(api_base) = lookup("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }
        if let Some(api_key) = lookup("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(tokens) = lookup("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = tokens;
        }
        if let Some(temp) = lookup("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.llm.temperature = temp;
        }
        if let Some(secs) = lookup("LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.llm.timeout_secs = secs;
        }

        if let Some(url) = lookup("QDRANT_URL") {
            self.retrieval.qdrant_url = url;
        }
        if let Some(collection) = lookup("QDRANT_COLLECTION") {
            self.retrieval.collection = collection;
        }
        if let Some(base) = lookup("EMBEDDING_API_BASE") {
            self.retrieval.embedding_api_base = base;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.retrieval.embedding_model = model;
        }
        if let Some(secs) = lookup("RETRIEVAL_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.retrieval.timeout_secs = secs;
        }
        if let Some(corpus) = lookup("RAG_EVAL_CORPUS") {
            self.retrieval.corpus_path = Some(PathBuf::from(corpus));
            self.retrieval.backend = RetrievalBackend::Corpus;
        }

        Ok(())
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rag-eval")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        // Empty falls back to the provider default; blank is a typo.
        if !self.llm.model.is_empty() && self.llm.model.trim().is_empty() {
            return Err(EvalError::Config(
                "LLM model name is blank. Set LLM_MODEL or leave it unset for the provider default."
                    .to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 || self.retrieval.timeout_secs == 0 {
            return Err(EvalError::Config(
                "Request timeouts must be at least 1 second".to_string(),
            ));
        }

        if self.llm.provider.requires_api_key() && self.llm.api_key.is_empty() {
            return Err(EvalError::Config(format!(
                "An API key is required for provider '{}'. Set LLM_API_KEY environment variable or add to config file.",
                self.llm.provider
            )));
        }

        if self.evaluation.concurrency == 0 {
            return Err(EvalError::Config(
                "Concurrency must be at least 1".to_string(),
            ));
        }

        match self.retrieval.backend {
            RetrievalBackend::Qdrant => {
                if self.retrieval.qdrant_url.is_empty() || self.retrieval.collection.is_empty() {
                    return Err(EvalError::Config(
                        "Qdrant retrieval needs both a URL and a collection name".to_string(),
                    ));
                }
            }
            RetrievalBackend::Corpus => {
                if self.retrieval.corpus_path.is_none() {
                    return Err(EvalError::Config(
                        "Corpus retrieval needs a corpus path. Set RAG_EVAL_CORPUS or pass --corpus."
                            .to_string(),
                    ));
                }
            }
            RetrievalBackend::None => {}
        }

        Ok(())
    }
}
