//! Answer generation in augmented and baseline mode.
//!
//! This is the shared contract between the evaluation harness and the
//! single-question `ask` command: both build prompts the same way and go
//! through the same [`RagPipeline`].

use crate::error::{EvalError, Result};
use crate::llm::{Message, Prompts, Role, TextGenerator};
use crate::retrieval::{Passage, Retriever, join_passages};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Number of most recent conversation turns kept in a prompt.
pub const HISTORY_WINDOW: usize = 6;

/// Which pipeline produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    /// Retrieved passages injected into the prompt.
    Augmented,
    /// No retrieved context.
    Baseline,
}

/// An answer plus the passages it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub mode: AnswerMode,
    pub text: String,
    pub passages: Vec<Passage>,
}

/// Source of the two answers compared for every question.
///
/// Calls for the same question are independent of each other.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    /// Answer with retrieved context.
    async fn augmented(&self, question: &str) -> Result<String>;

    /// Answer without retrieved context.
    async fn baseline(&self, question: &str) -> Result<String>;
}

/// Build the prompt for `question`.
///
/// `context` of `None` produces the baseline prompt with no context block at all.
pub fn build_prompt(question: &str, context: Option<&str>, history: &[Message]) -> String {
    let mut system = Prompts::legal_assistant().to_string();

    if let Some(context) = context {
        let context = if context.trim().is_empty() {
            Prompts::empty_context()
        } else {
            context
        };
        system.push_str("\n\n");
        system.push_str(&Prompts::context_instruction().replace("{context}", context));
    }

    let mut blocks = vec![system];

    let window_start = history.len().saturating_sub(HISTORY_WINDOW);
    for turn in &history[window_start..] {
        let speaker = match turn.role {
            Role::User => "User",
            Role::Assistant | Role::System => "Assistant",
        };
        blocks.push(format!("{}: {}", speaker, turn.content));
    }

    blocks.push(format!("User: {}", question));
    blocks.push("Assistant:".to_string());

    blocks.join("\n\n")
}

/// Retrieval-augmented answer pipeline over injected capabilities.
#[derive(Clone)]
pub struct RagPipeline {
    generator: Arc<dyn TextGenerator>,
    retriever: Option<Arc<dyn Retriever>>,
    k: usize,
}

impl RagPipeline {
    /// Create a pipeline. `retriever` of `None` makes augmented mode fail.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        retriever: Option<Arc<dyn Retriever>>,
        k: usize,
    ) -> Self {
        Self {
            generator,
            retriever,
            k,
        }
    }

    /// The generation capability, shared with the analysis step.
    pub fn generator(&self) -> Arc<dyn TextGenerator> {
        Arc::clone(&self.generator)
    }

    /// Fetch the top-k passages for `question`.
    pub async fn retrieve_context(&self, question: &str) -> Result<Vec<Passage>> {
        let retriever = self
            .retriever
            .as_ref()
            .ok_or_else(|| EvalError::retrieval(question, "no retriever configured"))?;

        retriever
            .retrieve(question, self.k)
            .await
            .map_err(|e| EvalError::retrieval(question, e))
    }

    /// Answer `question` in the given mode, with prior conversation turns.
    pub async fn ask(&self, question: &str, mode: AnswerMode, history: &[Message]) -> Result<Answer> {
        let passages = match mode {
            AnswerMode::Augmented => self.retrieve_context(question).await?,
            AnswerMode::Baseline => Vec::new(),
        };

        let context = match mode {
            AnswerMode::Augmented => Some(join_passages(&passages)),
            AnswerMode::Baseline => None,
        };

        let prompt = build_prompt(question, context.as_deref(), history);
        debug!(?mode, passages = passages.len(), "Generating answer");

        let text = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| EvalError::generation(question, e))?;

        Ok(Answer {
            mode,
            text,
            passages,
        })
    }

    /// Retrieve context and answer with it.
    pub async fn generate_augmented(&self, question: &str) -> Result<String> {
        Ok(self.ask(question, AnswerMode::Augmented, &[]).await?.text)
    }

    /// Answer without any retrieved context.
    pub async fn generate_baseline(&self, question: &str) -> Result<String> {
        Ok(self.ask(question, AnswerMode::Baseline, &[]).await?.text)
    }
}

#[async_trait]
impl AnswerSource for RagPipeline {
    async fn augmented(&self, question: &str) -> Result<String> {
        self.generate_augmented(question).await
    }

    async fn baseline(&self, question: &str) -> Result<String> {
        self.generate_baseline(question).await
    }
}
