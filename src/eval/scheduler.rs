//! Question scheduling: one task per question, order restored at the end.

use super::{EvaluationResult, EvaluationRun, FailedQuestion};
use crate::error::{EvalError, Result};
use crate::questions::QuestionRecord;
use crate::rag::AnswerSource;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{error, info, warn};

type Outcome = (String, Result<EvaluationResult>);

/// Runs every question through both answer modes.
pub struct Scheduler {
    source: Arc<dyn AnswerSource>,
}

impl Scheduler {
    pub fn new(source: Arc<dyn AnswerSource>) -> Self {
        Self { source }
    }

    /// Evaluate `questions` with at most `concurrency` questions in flight.
    ///
    /// `concurrency == 1` processes questions strictly in order on the
    /// current task. Either way, a failing question is logged and left out
    /// of `results`; it never stops the others.
    pub async fn run(
        &self,
        questions: &[QuestionRecord],
        concurrency: usize,
    ) -> Result<EvaluationRun> {
        if concurrency == 0 {
            return Err(EvalError::Config(
                "Concurrency must be at least 1".to_string(),
            ));
        }

        let start = Instant::now();
        info!(
            questions = questions.len(),
            concurrency, "Running evaluation"
        );

        let outcomes = if concurrency == 1 {
            self.run_sequential(questions).await
        } else {
            self.run_parallel(questions, concurrency).await
        };

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for (title, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => failures.push(FailedQuestion {
                    title,
                    error: e.to_string(),
                }),
            }
        }

        // Completion order must never leak into the report.
        restore_order(&mut results, questions, |r| r.title.as_str());
        restore_order(&mut failures, questions, |f| f.title.as_str());

        let run = EvaluationRun {
            results,
            failures,
            attempted: questions.len(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            "Evaluation finished: {}/{} succeeded in {:.1}s",
            run.succeeded(),
            run.attempted,
            run.elapsed_secs
        );
        Ok(run)
    }

    async fn run_sequential(&self, questions: &[QuestionRecord]) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(questions.len());

        for (idx, question) in questions.iter().enumerate() {
            info!(
                "[{}/{}] Processing: {}",
                idx + 1,
                questions.len(),
                question.title
            );
            let outcome = evaluate_guarded(self.source.as_ref(), question).await;
            log_outcome(&question.title, &outcome);
            outcomes.push((question.title.clone(), outcome));
        }

        outcomes
    }

    async fn run_parallel(&self, questions: &[QuestionRecord], concurrency: usize) -> Vec<Outcome> {
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut join_set = JoinSet::new();
        let mut pending: HashMap<task::Id, QuestionRecord> = HashMap::new();

        for question in questions.iter().cloned() {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let record = question.clone();

            let handle = join_set.spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail.
                let _permit = semaphore.acquire_owned().await.ok();
                evaluate_guarded(source.as_ref(), &question).await
            });
            pending.insert(handle.id(), record);
        }

        // Single consumer: each completion is appended exactly once.
        let mut outcomes = Vec::with_capacity(questions.len());
        while let Some(joined) = join_set.join_next_with_id().await {
            let (question, outcome) = match joined {
                Ok((id, outcome)) => (pending.remove(&id), outcome),
                Err(e) => {
                    // A lost task still counts as that question's failure.
                    error!("Evaluation task was lost: {}", e);
                    let question = pending.remove(&e.id());
                    let body = question.as_ref().map_or("", |q| q.body.as_str());
                    let lost = EvalError::generation(body, format!("task failed: {}", e));
                    (question, Err(lost))
                }
            };

            let Some(question) = question else {
                error!("Finished task has no matching question");
                continue;
            };
            log_outcome(&question.title, &outcome);
            outcomes.push((question.title, outcome));
        }

        outcomes
    }
}

/// Evaluate one question, turning a panic into that question's failure.
async fn evaluate_guarded(
    source: &dyn AnswerSource,
    question: &QuestionRecord,
) -> Result<EvaluationResult> {
    AssertUnwindSafe(evaluate_question(source, question))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(EvalError::generation(&question.body, panic_message(&*panic)))
        })
}

/// Augmented answer first, then baseline. Either failure fails the question.
async fn evaluate_question(
    source: &dyn AnswerSource,
    question: &QuestionRecord,
) -> Result<EvaluationResult> {
    let augmented_answer = source.augmented(&question.body).await?;
    let baseline_answer = source.baseline(&question.body).await?;

    Ok(EvaluationResult {
        title: question.title.clone(),
        body: question.body.clone(),
        augmented_answer,
        baseline_answer,
    })
}

fn log_outcome(title: &str, outcome: &Result<EvaluationResult>) {
    match outcome {
        Ok(_) => info!("Completed: {}", title),
        Err(e) if e.is_per_question() => warn!("Error on '{}': {}", title, e),
        Err(e) => error!("Unexpected error on '{}': {}", title, e),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("task panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("task panicked: {}", s)
    } else {
        "task panicked".to_string()
    }
}

/// Sort `items` by the position of their title in `questions`.
///
/// Titles not found in `questions` sort last, keeping their relative order.
pub fn restore_order<T>(
    items: &mut [T],
    questions: &[QuestionRecord],
    title_of: impl Fn(&T) -> &str,
) {
    let position: HashMap<&str, usize> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| (q.title.as_str(), i))
        .collect();

    items.sort_by_key(|item| position.get(title_of(item)).copied().unwrap_or(usize::MAX));
}
