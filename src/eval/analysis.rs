//! Narrative comparison of the two answer sets.

use super::EvaluationResult;
use super::report::truncate_chars;
use crate::error::{EvalError, Result};
use crate::llm::{Prompts, TextGenerator};
use std::sync::Arc;
use tracing::{info, warn};

/// Default characters of each answer quoted in the analysis prompt.
pub const DEFAULT_CHAR_BUDGET: usize = 1000;

/// Asks the generation capability to compare augmented and baseline answers.
pub struct AnalysisSynthesizer {
    generator: Arc<dyn TextGenerator>,
    char_budget: usize,
}

impl AnalysisSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            char_budget: DEFAULT_CHAR_BUDGET,
        }
    }

    /// Limit how much of each answer is quoted.
    pub fn with_char_budget(mut self, char_budget: usize) -> Self {
        self.char_budget = char_budget;
        self
    }

    /// Build the analysis prompt: rubric, then every question with both answers.
    pub fn build_prompt(&self, results: &[EvaluationResult]) -> String {
        let mut prompt = Prompts::analysis_rubric().to_string();

        for result in results {
            prompt.push_str(&format!(
                "\nQuestion: {}\n\nRAG Response: {}\n\nVanilla Response: {}\n\n---\n",
                result.body,
                truncate_chars(&result.augmented_answer, self.char_budget),
                truncate_chars(&result.baseline_answer, self.char_budget),
            ));
        }

        prompt.push_str(Prompts::analysis_request());
        prompt
    }

    /// Generate the analysis, surfacing failures as [`EvalError::Analysis`].
    pub async fn try_synthesize(&self, results: &[EvaluationResult]) -> Result<String> {
        let prompt = self.build_prompt(results);
        self.generator
            .generate(&prompt)
            .await
            .map_err(|e| EvalError::Analysis(e.to_string()))
    }

    /// Best-effort analysis.
    ///
    /// Returns `None` when there is nothing to analyze. A failed generation
    /// call yields a failure note instead of an error, so the report is
    /// still produced.
    pub async fn synthesize(&self, results: &[EvaluationResult]) -> Option<String> {
        if results.is_empty() {
            return None;
        }

        info!("Generating analysis over {} results", results.len());
        match self.try_synthesize(results).await {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!("{}", e);
                Some(format!("Analysis generation failed: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .map_err(|e| EvalError::Api(e.to_string()))
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn result(title: &str, augmented: &str, baseline: &str) -> EvaluationResult {
        EvaluationResult {
            title: title.to_string(),
            body: format!("What about {}?", title),
            augmented_answer: augmented.to_string(),
            baseline_answer: baseline.to_string(),
        }
    }

    #[test]
    fn test_prompt_truncates_answers() {
        let synthesizer = AnalysisSynthesizer::new(Arc::new(Fixed(Ok(""))));
        let long = "x".repeat(1500);
        let prompt = synthesizer.build_prompt(&[result("Q1", &long, "short")]);

        assert!(prompt.starts_with(Prompts::analysis_rubric()));
        assert!(prompt.contains(&format!("RAG Response: {}\n", "x".repeat(1000))));
        assert!(!prompt.contains(&"x".repeat(1001)));
        assert!(prompt.contains("Vanilla Response: short"));
        assert!(prompt.ends_with("Provide your analysis:"));
    }

    #[test]
    fn test_prompt_lists_every_question() {
        let synthesizer = AnalysisSynthesizer::new(Arc::new(Fixed(Ok("")))).with_char_budget(10);
        let prompt = synthesizer.build_prompt(&[result("Q1", "a", "b"), result("Q2", "c", "d")]);
        let q1 = prompt.find("What about Q1?").unwrap();
        let q2 = prompt.find("What about Q2?").unwrap();
        assert!(q1 < q2);
    }

    #[test]
    fn test_synthesize_success() {
        let synthesizer = AnalysisSynthesizer::new(Arc::new(Fixed(Ok("RAG wins."))));
        let analysis = tokio_test::block_on(synthesizer.synthesize(&[result("Q1", "a", "b")]));
        assert_eq!(analysis.as_deref(), Some("RAG wins."));
    }

    #[test]
    fn test_synthesize_failure_becomes_note() {
        let synthesizer = AnalysisSynthesizer::new(Arc::new(Fixed(Err("timeout"))));
        let analysis = tokio_test::block_on(synthesizer.synthesize(&[result("Q1", "a", "b")]))
            .unwrap();
        assert!(analysis.starts_with("Analysis generation failed:"));
        assert!(analysis.contains("timeout"));
    }

    #[test]
    fn test_synthesize_nothing_to_analyze() {
        let synthesizer = AnalysisSynthesizer::new(Arc::new(Fixed(Ok("unused"))));
        assert!(tokio_test::block_on(synthesizer.synthesize(&[])).is_none());
    }
}
