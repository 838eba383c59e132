//! Question set parsing.
//!
//! A question file is a Markdown numbered list. Each item line carries the
//! question title in bold and is followed by the question body as a blockquote:
//!
//! ```text
//! 1. **Article 9**
//!    > What does Article 9 of the Civil Code protect?
//!
//! 2. **Tort**
//!    > Define tort.
//! ```
//!
//! The body runs until a blank line, the next numbered item, or end of input.

use crate::error::{EvalError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// `<index>. **<title>**`, capturing the first bold span.
static ITEM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s+\*\*(.+?)\*\*").expect("valid item pattern"));

/// Any numbered list item, bold or not.
static NUMBERED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s").expect("valid numbered pattern"));

/// A single question from the question set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Unique, non-empty title. Identity key for the question.
    pub title: String,
    /// The question text sent to both pipelines.
    pub body: String,
}

impl QuestionRecord {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Parse a question document into records, preserving document order.
///
/// Empty input yields an empty list. An item without a blockquoted body, or
/// with an empty title, is a [`EvalError::Parse`].
///
/// Duplicate titles do not fail parsing; later occurrences are renamed to
/// `"<title> (#<position>)"` so titles stay unique identity keys.
pub fn parse_questions(text: &str) -> Result<Vec<QuestionRecord>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut records = Vec::new();
    let mut seen = HashSet::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(caps) = ITEM_PATTERN.captures(lines[i]) else {
            i += 1;
            continue;
        };

        let item_line = i + 1;
        let title = caps[1].trim().to_string();
        if title.is_empty() {
            return Err(EvalError::Parse {
                line: item_line,
                message: "question title is empty".to_string(),
            });
        }
        i += 1;

        let starts_with_quote = lines
            .get(i)
            .is_some_and(|l| l.trim_start().starts_with('>'));
        if !starts_with_quote {
            return Err(EvalError::Parse {
                line: item_line,
                message: format!("question '{}' is not followed by a blockquoted body", title),
            });
        }

        let mut body_lines = Vec::new();
        while i < lines.len() {
            let line = lines[i];
            if line.trim().is_empty() || NUMBERED_PATTERN.is_match(line) {
                break;
            }
            body_lines.push(strip_quote(line));
            i += 1;
        }

        let body = body_lines.join("\n").trim().to_string();
        if body.is_empty() {
            return Err(EvalError::Parse {
                line: item_line,
                message: format!("question '{}' has an empty body", title),
            });
        }

        let title = unique_title(title, records.len() + 1, &mut seen);
        debug!(title = %title, line = item_line, "Parsed question");
        records.push(QuestionRecord { title, body });
    }

    Ok(records)
}

/// Read and parse a question file.
pub fn load_questions(path: &Path) -> Result<Vec<QuestionRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    parse_questions(&content)
}

fn strip_quote(line: &str) -> &str {
    let line = line.trim();
    match line.strip_prefix('>') {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest).trim_end(),
        None => line,
    }
}

fn unique_title(title: String, position: usize, seen: &mut HashSet<String>) -> String {
    if seen.insert(title.clone()) {
        return title;
    }

    let mut candidate = format!("{} (#{})", title, position);
    let mut suffix = 2;
    while !seen.insert(candidate.clone()) {
        candidate = format!("{} (#{}.{})", title, position, suffix);
        suffix += 1;
    }
    warn!(
        "Duplicate question title '{}' at position {}; renamed to '{}'",
        title, position, candidate
    );
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "1. **Q1**\n   > What is Article 9?\n\n2. **Q2**\n   > Define tort.\n";

    #[test]
    fn test_parse_two_questions_in_order() {
        let questions = parse_questions(SAMPLE).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0], QuestionRecord::new("Q1", "What is Article 9?"));
        assert_eq!(questions[1], QuestionRecord::new("Q2", "Define tort."));
    }

    #[test]
    fn test_parse_is_idempotent() {
        assert_eq!(parse_questions(SAMPLE).unwrap(), parse_questions(SAMPLE).unwrap());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_questions("").unwrap().is_empty());
        assert!(parse_questions("# Questions\n\nNothing here yet.\n").unwrap().is_empty());
    }

    #[test]
    fn test_multiline_body() {
        let text = "# Legal questions\n\n1. **Contracts**\n   > What makes a contract valid?\n   > List the conditions.\n2. **Next**\n   > Second.";
        let questions = parse_questions(text).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(
            questions[0].body,
            "What makes a contract valid?\nList the conditions."
        );
        assert_eq!(questions[1].body, "Second.");
    }

    #[test]
    fn test_body_continuation_without_marker() {
        let text = "1. **Lazy**\n> First line\ncontinued here\n\nTrailing prose.";
        let questions = parse_questions(text).unwrap();
        assert_eq!(questions[0].body, "First line\ncontinued here");
    }

    #[test]
    fn test_title_is_first_bold_span() {
        let text = "3. **Liability** and **more**\n   > Who is liable?";
        let questions = parse_questions(text).unwrap();
        assert_eq!(questions[0].title, "Liability");
    }

    #[test]
    fn test_missing_body_is_parse_error() {
        let text = "1. **Orphan**\n\n2. **Q2**\n   > Body";
        match parse_questions(text) {
            Err(EvalError::Parse { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_quote_body_is_parse_error() {
        assert!(parse_questions("1. **Blank**\n   >   \n").is_err());
    }

    #[test]
    fn test_duplicate_titles_are_disambiguated() {
        let text = "1. **Same**\n> first\n\n2. **Same**\n> second\n";
        let questions = parse_questions(text).unwrap();
        assert_eq!(questions[0].title, "Same");
        assert_eq!(questions[1].title, "Same (#2)");
        assert_eq!(questions[1].body, "second");
    }

    #[test]
    fn test_load_questions_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.md");
        std::fs::write(&path, SAMPLE).unwrap();

        let questions = load_questions(&path).unwrap();
        assert_eq!(questions.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_questions(Path::new("/nonexistent/questions.md"));
        assert!(matches!(result, Err(EvalError::Io { .. })));
    }
}
