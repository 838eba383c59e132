//! Markdown report rendering.
//!
//! Rendering is pure: it only reads already computed results, plus the
//! wall clock for the header stamp in [`ReportBuilder::render`].

use super::{EvaluationResult, EvaluationRun, FailedQuestion};
use crate::error::{EvalError, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;

/// Default characters of each answer shown in the summary table.
pub const DEFAULT_CELL_LIMIT: usize = 200;

/// Headings used in the report.
#[derive(Debug, Clone)]
pub struct ReportLabels {
    pub title: String,
    /// Name of the augmented mode, e.g. "RAG".
    pub augmented: String,
    /// Name of the baseline mode, e.g. "Vanilla".
    pub baseline: String,
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self {
            title: "RAG vs Vanilla Evaluation Report".to_string(),
            augmented: "RAG".to_string(),
            baseline: "Vanilla".to_string(),
        }
    }
}

/// Attempted count and failure log shown alongside the results.
struct RunSummary<'a> {
    attempted: usize,
    failures: &'a [FailedQuestion],
}

/// Renders results into a Markdown document.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    labels: ReportLabels,
    cell_limit: usize,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            labels: ReportLabels::default(),
            cell_limit: DEFAULT_CELL_LIMIT,
        }
    }

    pub fn with_labels(mut self, labels: ReportLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Characters of each answer kept in summary table cells.
    pub fn with_cell_limit(mut self, cell_limit: usize) -> Self {
        self.cell_limit = cell_limit;
        self
    }

    /// Render results and optional analysis, stamped with the current time.
    pub fn render(&self, results: &[EvaluationResult], analysis: Option<&str>) -> String {
        self.render_at(results, analysis, Local::now())
    }

    /// Same as [`ReportBuilder::render`] with an explicit timestamp.
    pub fn render_at(
        &self,
        results: &[EvaluationResult],
        analysis: Option<&str>,
        timestamp: DateTime<Local>,
    ) -> String {
        self.compose(results, None, analysis, timestamp)
    }

    /// Render a full run, including the answered/attempted count and failures.
    pub fn render_run(&self, run: &EvaluationRun, analysis: Option<&str>) -> String {
        self.render_run_at(run, analysis, Local::now())
    }

    pub fn render_run_at(
        &self,
        run: &EvaluationRun,
        analysis: Option<&str>,
        timestamp: DateTime<Local>,
    ) -> String {
        let summary = RunSummary {
            attempted: run.attempted,
            failures: &run.failures,
        };
        self.compose(&run.results, Some(summary), analysis, timestamp)
    }

    fn compose(
        &self,
        results: &[EvaluationResult],
        summary: Option<RunSummary<'_>>,
        analysis: Option<&str>,
        timestamp: DateTime<Local>,
    ) -> String {
        let labels = &self.labels;
        let mut report = format!(
            "# {}\n\nGenerated: {}\n\n",
            labels.title,
            timestamp.format("%Y-%m-%d %H:%M:%S")
        );

        if let Some(summary) = &summary {
            report.push_str(&format!(
                "Questions: {}/{} answered\n\n",
                results.len(),
                summary.attempted
            ));
        }

        // Summary table
        report.push_str("## Summary\n\n");
        report.push_str(&format!(
            "| # | Question | {} Response | {} Response |\n",
            labels.augmented, labels.baseline
        ));
        report.push_str("|---|----------|--------------|------------------|\n");

        for (i, result) in results.iter().enumerate() {
            report.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                i + 1,
                escape_cell(&result.title),
                truncate_cell(&result.augmented_answer, self.cell_limit),
                truncate_cell(&result.baseline_answer, self.cell_limit),
            ));
        }

        // Full transcripts
        report.push_str("\n## Detailed Responses\n\n");

        for (i, result) in results.iter().enumerate() {
            report.push_str(&format!(
                "### {}. {}\n\n**Question:** {}\n\n#### {} Response\n\n{}\n\n#### {} Response\n\n{}\n\n---\n\n",
                i + 1,
                result.title,
                result.body,
                labels.augmented,
                result.augmented_answer,
                labels.baseline,
                result.baseline_answer,
            ));
        }

        if let Some(summary) = summary.filter(|s| !s.failures.is_empty()) {
            report.push_str("## Failures\n\n");
            for failure in summary.failures {
                report.push_str(&format!("- **{}**: {}\n", failure.title, failure.error));
            }
            report.push('\n');
        }

        if let Some(analysis) = analysis {
            report.push_str(&format!("## Analysis\n\n{}\n", analysis));
        }

        report
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Shorten an answer for a summary table cell.
///
/// Whitespace runs (including newlines) collapse to single spaces and `|`
/// is escaped. The escaped text is cut to at most `limit` characters and
/// marked with `...`, never splitting an escape.
pub fn truncate_cell(text: &str, limit: usize) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut cell = String::with_capacity(normalized.len().min(limit + 3));
    let mut width = 0;
    for c in normalized.chars() {
        let escaped_width = if c == '|' { 2 } else { 1 };
        if width + escaped_width > limit {
            cell.push_str("...");
            return cell;
        }
        if c == '|' {
            cell.push_str("\\|");
        } else {
            cell.push(c);
        }
        width += escaped_width;
    }

    cell
}

/// Keep `|` from breaking the table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Write the rendered report, creating parent directories as needed.
pub fn write_report(path: &Path, report: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }
    }

    fs::write(path, report).map_err(|e| EvalError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn result(title: &str, augmented: &str, baseline: &str) -> EvaluationResult {
        EvaluationResult {
            title: title.to_string(),
            body: format!("Question about {}", title),
            augmented_answer: augmented.to_string(),
            baseline_answer: baseline.to_string(),
        }
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    fn table_rows(report: &str) -> Vec<&str> {
        report
            .lines()
            .filter(|l| l.starts_with("| ") && !l.starts_with("| # |"))
            .collect()
    }

    #[test]
    fn test_truncate_long_answer() {
        let answer = "a".repeat(600);
        let cell = truncate_cell(&answer, 200);
        assert!(cell.ends_with("..."));
        assert!(cell.chars().count() <= 203);
    }

    #[test]
    fn test_short_answer_untouched() {
        let answer = "Article 9 protects\n  private   life.".to_string() + &" ok".repeat(6);
        let normalized = answer.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(normalized.len() <= 50);
        assert_eq!(truncate_cell(&answer, 200), normalized);
    }

    #[test]
    fn test_truncate_counts_characters() {
        let cell = truncate_cell(&"é".repeat(300), 200);
        assert_eq!(cell.chars().count(), 203);
    }

    #[test]
    fn test_pipes_are_escaped() {
        assert_eq!(truncate_cell("a | b", 200), "a \\| b");
    }

    #[test]
    fn test_pipe_heavy_answer_stays_within_limit() {
        let cell = truncate_cell(&"a|".repeat(300), 200);
        assert!(cell.ends_with("..."));
        assert!(cell.chars().count() <= 203);

        let body = cell.trim_end_matches("...");
        assert!(!body.ends_with('\\'));
        assert_eq!(body.replace("\\|", "|").chars().count(), 133);
    }

    #[test]
    fn test_exact_fit_is_not_marked() {
        assert_eq!(truncate_cell("ab|", 4), "ab\\|");
        assert_eq!(truncate_cell("abc|", 4), "abc...");
    }

    #[test]
    fn test_header_and_timestamp() {
        let report = ReportBuilder::new().render_at(&[], None, fixed_time());
        assert!(report.starts_with("# RAG vs Vanilla Evaluation Report\n\nGenerated: 2026-03-14 09:26:53\n"));
        assert!(report.contains("| # | Question | RAG Response | Vanilla Response |"));
        assert!(table_rows(&report).is_empty());
    }

    #[test]
    fn test_analysis_section_only_when_present() {
        let results = vec![result("Q1", "aug", "base")];
        let builder = ReportBuilder::new();

        let without = builder.render_at(&results, None, fixed_time());
        assert!(!without.contains("## Analysis"));

        let with = builder.render_at(&results, Some("X"), fixed_time());
        assert!(with.ends_with("## Analysis\n\nX\n"));
    }

    #[test]
    fn test_detailed_section_order() {
        let results = vec![result("Q1", "augmented text", "baseline text")];
        let report = ReportBuilder::new().render_at(&results, None, fixed_time());

        let detail = report.split("## Detailed Responses").nth(1).unwrap();
        let question = detail.find("**Question:** Question about Q1").unwrap();
        let aug = detail.find("#### RAG Response\n\naugmented text").unwrap();
        let base = detail.find("#### Vanilla Response\n\nbaseline text").unwrap();
        assert!(question < aug && aug < base);
    }

    #[test]
    fn test_rows_follow_result_order() {
        let results = vec![result("First", "a", "b"), result("Second", "c", "d")];
        let report = ReportBuilder::new().render_at(&results, None, fixed_time());

        let rows = table_rows(&report);
        assert_eq!(rows, vec!["| 1 | First | a | b |", "| 2 | Second | c | d |"]);
    }

    #[test]
    fn test_custom_labels() {
        let labels = ReportLabels {
            title: "Corpus vs Bare".to_string(),
            augmented: "Corpus".to_string(),
            baseline: "Bare".to_string(),
        };
        let report = ReportBuilder::new()
            .with_labels(labels)
            .render_at(&[result("Q", "a", "b")], None, fixed_time());
        assert!(report.contains("| # | Question | Corpus Response | Bare Response |"));
        assert!(report.contains("#### Bare Response"));
    }

    #[test]
    fn test_run_report_lists_failures() {
        let run = EvaluationRun {
            results: vec![result("Q1", "a", "b")],
            failures: vec![FailedQuestion {
                title: "Q2".to_string(),
                error: "timeout".to_string(),
            }],
            attempted: 2,
            elapsed_secs: 0.5,
        };

        let report = ReportBuilder::new().render_run_at(&run, None, fixed_time());
        assert!(report.contains("Questions: 1/2 answered"));
        assert!(report.contains("## Failures\n\n- **Q2**: timeout\n"));
        assert_eq!(table_rows(&report).len(), 1);
    }

    #[test]
    fn test_write_report_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/nested/results.md");

        write_report(&path, "# Report\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Report\n");
    }
}
