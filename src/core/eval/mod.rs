pub mod dataset;
pub mod scorers;
pub mod task;

pub use dataset::{
    load_examples, sync_examples, DatasetCommit, DatasetExample, DatasetRecord, DatasetStore,
    ExampleInput, HttpDatasetStore,
};
pub use scorers::{FormattingScorer, LlmJudgeScorer, ScoreResult, Scorer};
pub use task::{ChangelogTask, DetailLevel, EvalTask, TargetAudience, TaskParameters};

use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one scorer on one example. A failed scorer is carried in the
/// report instead of aborting the run.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreOutcome {
    pub scorer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-example results for aggregate reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ExampleReport {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub scores: Vec<ScoreOutcome>,
}

/// Aggregate per-scorer statistics across the run.
#[derive(Debug, Clone, Serialize)]
pub struct ScorerSummary {
    pub scorer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    pub scored: usize,
    pub failed: usize,
}

/// Full evaluation report.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub examples: Vec<ExampleReport>,
    pub summary: Vec<ScorerSummary>,
}

impl EvalReport {
    /// Terminal-friendly rendering of the report.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Evaluated {} examples\n\n", self.examples.len()));

        for example in &self.examples {
            out.push_str(&format!("{}\n", example.id));
            if let Some(error) = &example.error {
                out.push_str(&format!("  task failed: {}\n", error));
                continue;
            }
            for outcome in &example.scores {
                match (&outcome.score, &outcome.error) {
                    (Some(score), _) => {
                        let choice = outcome
                            .choice
                            .as_deref()
                            .map(|c| format!(" ({})", c))
                            .unwrap_or_default();
                        out.push_str(&format!("  {}: {:.2}{}\n", outcome.scorer, score, choice));
                    }
                    (None, Some(error)) => {
                        out.push_str(&format!("  {}: error: {}\n", outcome.scorer, error));
                    }
                    (None, None) => {}
                }
            }
        }

        out.push_str("\nSummary\n");
        for summary in &self.summary {
            match summary.mean {
                Some(mean) => out.push_str(&format!(
                    "  {}: mean {:.3} over {} examples ({} failed)\n",
                    summary.scorer, mean, summary.scored, summary.failed
                )),
                None => out.push_str(&format!(
                    "  {}: no scores ({} failed)\n",
                    summary.scorer, summary.failed
                )),
            }
        }
        out
    }
}

/// Drives one task function per dataset example and applies every scorer to
/// the produced output. Batch operation with no latency contract.
pub struct EvalRunner {
    task: Box<dyn EvalTask>,
    scorers: Vec<Box<dyn Scorer>>,
}

impl EvalRunner {
    pub fn new(task: Box<dyn EvalTask>, scorers: Vec<Box<dyn Scorer>>) -> Self {
        EvalRunner { task, scorers }
    }

    pub async fn run(&self, examples: &[DatasetExample]) -> EvalReport {
        let mut reports = Vec::with_capacity(examples.len());

        for (index, example) in examples.iter().enumerate() {
            let id = example
                .id
                .clone()
                .unwrap_or_else(|| format!("changelog-record-{}", index));
            info!("evaluating {}", id);

            let output = match self.task.run(&example.input).await {
                Ok(output) => output,
                Err(err) => {
                    warn!("task failed for {}: {}", id, err);
                    reports.push(ExampleReport {
                        id,
                        output: None,
                        error: Some(err.detail().to_string()),
                        scores: vec![],
                    });
                    continue;
                }
            };

            let mut scores = Vec::with_capacity(self.scorers.len());
            for scorer in &self.scorers {
                match scorer.score(&example.input, &output).await {
                    Ok(result) => scores.push(ScoreOutcome {
                        scorer: result.scorer,
                        score: Some(result.score),
                        choice: result.choice,
                        error: None,
                    }),
                    Err(err) => {
                        warn!("scorer {} failed for {}: {}", scorer.name(), id, err);
                        scores.push(ScoreOutcome {
                            scorer: scorer.name().to_string(),
                            score: None,
                            choice: None,
                            error: Some(err.detail().to_string()),
                        });
                    }
                }
            }

            reports.push(ExampleReport {
                id,
                output: Some(output),
                error: None,
                scores,
            });
        }

        let summary = summarize(&reports, &self.scorers);
        EvalReport {
            examples: reports,
            summary,
        }
    }
}

fn summarize(examples: &[ExampleReport], scorers: &[Box<dyn Scorer>]) -> Vec<ScorerSummary> {
    scorers
        .iter()
        .map(|scorer| {
            let outcomes: Vec<&ScoreOutcome> = examples
                .iter()
                .flat_map(|e| e.scores.iter())
                .filter(|o| o.scorer == scorer.name())
                .collect();

            let scored: Vec<f64> = outcomes.iter().filter_map(|o| o.score).collect();
            let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
            let mean = if scored.is_empty() {
                None
            } else {
                Some(scored.iter().sum::<f64>() / scored.len() as f64)
            };

            ScorerSummary {
                scorer: scorer.name().to_string(),
                mean,
                scored: scored.len(),
                failed,
            }
        })
        .collect()
}
