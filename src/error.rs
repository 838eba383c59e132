//! Error types for the evaluation harness.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while evaluating a question set.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed question-set input. Fatal: raised before any generation work.
    #[error("Question file malformed at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A generation call for a single question failed.
    #[error("Generation failed for question '{question}': {cause}")]
    Generation { question: String, cause: String },

    /// Context retrieval for augmented mode failed.
    #[error("Retrieval failed for query '{query}': {cause}")]
    Retrieval { query: String, cause: String },

    /// Narrative analysis could not be produced.
    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Backend API returned an error or an unusable response.
    #[error("API error: {0}")]
    Api(String),

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EvalError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap any failure as a generation failure for `question`.
    pub fn generation(question: &str, cause: impl ToString) -> Self {
        Self::Generation {
            question: question.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Wrap any failure as a retrieval failure for `query`.
    pub fn retrieval(query: &str, cause: impl ToString) -> Self {
        Self::Retrieval {
            query: query.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Whether this error only affects a single question.
    pub fn is_per_question(&self) -> bool {
        matches!(self, Self::Generation { .. } | Self::Retrieval { .. })
    }
}

impl From<reqwest::Error> for EvalError {
    fn from(err: reqwest::Error) -> Self {
        EvalError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::Serialization(err.to_string())
    }
}
