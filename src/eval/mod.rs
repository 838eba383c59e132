//! Comparative evaluation of augmented vs. baseline answers.
//!
//! - [`Scheduler`]: runs every question through both modes, sequentially or
//!   on a bounded pool, and restores question order afterwards
//! - [`AnalysisSynthesizer`]: best-effort narrative comparison across questions
//! - [`ReportBuilder`]: renders the Markdown report

pub mod analysis;
pub mod report;
pub mod scheduler;

pub use analysis::AnalysisSynthesizer;
pub use report::{ReportBuilder, ReportLabels, truncate_cell, write_report};
pub use scheduler::{Scheduler, restore_order};

use serde::{Deserialize, Serialize};

/// Both answers for one successfully evaluated question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub title: String,
    /// The question text.
    pub body: String,
    pub augmented_answer: String,
    pub baseline_answer: String,
}

/// A question whose evaluation failed, with the cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedQuestion {
    pub title: String,
    pub error: String,
}

/// Outcome of a full evaluation run.
///
/// `results` holds only successful questions, in question-file order.
/// Failures are kept apart so the report table never contains them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRun {
    pub results: Vec<EvaluationResult>,
    pub failures: Vec<FailedQuestion>,
    /// Number of questions dispatched.
    pub attempted: usize,
    /// Wall-clock duration of the run.
    pub elapsed_secs: f64,
}

impl EvaluationRun {
    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether every attempted question produced both answers.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.results.len() == self.attempted
    }

    /// Print the attempted/succeeded counts and every failure.
    pub fn print_summary(&self) {
        println!("\n========== Evaluation Summary ==========");
        println!("Attempted: {}", self.attempted);
        println!("Succeeded: {}", self.succeeded());
        println!("Failed:    {}", self.failed());
        for failure in &self.failures {
            println!("  - {}: {}", failure.title, failure.error);
        }
        println!("Total time: {:.1}s", self.elapsed_secs);
        println!("========================================\n");
    }
}
