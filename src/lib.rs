//! RAG Eval - compare retrieval-augmented and vanilla LLM answers.
//!
//! A fixed question set is answered twice per question: once with reference
//! passages retrieved from a vector store (or local corpus) injected into the
//! prompt, once without. The answers are collected into a Markdown report with
//! a summary table, full transcripts and an optional model-written analysis.
//!
//! # Quick Start
//!
//! ```no_run
//! use rag_eval::{
//!     config::Config,
//!     eval::{AnalysisSynthesizer, ReportBuilder, Scheduler, write_report},
//!     llm::build_generator,
//!     questions::load_questions,
//!     rag::RagPipeline,
//!     retrieval::build_retriever,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let questions = load_questions(Path::new("questions.md"))?;
//!
//!     let generator = build_generator(&config.llm)?;
//!     let retriever = build_retriever(&config.retrieval)?;
//!     let pipeline = RagPipeline::new(generator.clone(), retriever, config.evaluation.retrieval_k);
//!
//!     let run = Scheduler::new(Arc::new(pipeline)).run(&questions, 4).await?;
//!     let analysis = AnalysisSynthesizer::new(generator).synthesize(&run.results).await;
//!
//!     let report = ReportBuilder::new().render_run(&run, analysis.as_deref());
//!     write_report(Path::new("results.md"), &report)?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **questions**: parses the Markdown question list into ordered records
//! - **llm**: `TextGenerator` trait with OpenAI-compatible, Ollama and Anthropic adapters
//! - **retrieval**: `Retriever` trait with Qdrant and local-corpus adapters
//! - **rag**: prompt construction and the augmented/baseline answer pipeline
//! - **eval**: scheduling, analysis and report rendering

pub mod config;
pub mod error;
pub mod eval;
pub mod llm;
pub mod persistence;
pub mod questions;
pub mod rag;
pub mod retrieval;

// Re-export commonly used types
pub use config::Config;
pub use error::{EvalError, Result};
pub use eval::{EvaluationResult, EvaluationRun, FailedQuestion, ReportBuilder, Scheduler};
pub use llm::TextGenerator;
pub use persistence::{load_run, save_run};
pub use questions::{QuestionRecord, load_questions, parse_questions};
pub use rag::{AnswerMode, AnswerSource, RagPipeline};
pub use retrieval::{Passage, Retriever};
