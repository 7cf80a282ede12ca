#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::observe::{FeedbackEvent, SpanLogger};
use crate::core::types::{ErrorCategory, FeedbackCategory};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// A validated feedback submission.
#[derive(Debug, Clone)]
pub struct FeedbackSubmission {
    pub score: u8,
    pub input: String,
    pub output: String,
    pub comment: Option<String>,
    pub correlation_id: String,
}

/// Receipt returned for a recorded submission. The identifier is fresh per
/// call; only uniqueness matters.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackReceipt {
    pub feedback_id: String,
    pub category: FeedbackCategory,
}

/// Validate a raw request body into a submission.
///
/// Checks run in a fixed order and the first failure wins, each with its own
/// message: the score must be a JSON number that is exactly 0 or 1, input and
/// output must be present and non-empty, and the correlation id is required
/// for tying the judgment back to its generation event.
pub fn parse_submission(body: &Value) -> Result<FeedbackSubmission, AppError> {
    let score = match body.get("score").and_then(Value::as_f64) {
        Some(n) if n == 0.0 => 0u8,
        Some(n) if n == 1.0 => 1u8,
        _ => {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "Score must be 0 or 1",
            ))
        }
    };

    let input = non_empty_str(body, "input");
    let output = non_empty_str(body, "output");
    let (input, output) = match (input, output) {
        (Some(input), Some(output)) => (input, output),
        _ => {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "Input and output are required",
            ))
        }
    };

    let correlation_id = non_empty_str(body, "correlationId").ok_or_else(|| {
        AppError::new(ErrorCategory::ValidationError, "correlationId is required")
    })?;

    let comment = body
        .get("comment")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Ok(FeedbackSubmission {
        score,
        input,
        output,
        comment,
        correlation_id,
    })
}

fn non_empty_str(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Records validated feedback against the observability collaborator.
///
/// Duplicate submissions for the same correlation id are all accepted and
/// recorded independently.
pub struct FeedbackRecorder {
    spans: Option<Arc<dyn SpanLogger>>,
}

impl FeedbackRecorder {
    pub fn new(spans: Option<Arc<dyn SpanLogger>>) -> Self {
        FeedbackRecorder { spans }
    }

    pub async fn record(
        &self,
        submission: FeedbackSubmission,
    ) -> Result<FeedbackReceipt, AppError> {
        let logger = self.spans.as_ref().ok_or_else(|| {
            AppError::new(
                ErrorCategory::LoggingError,
                "feedback logging collaborator is not initialized",
            )
        })?;

        let category = FeedbackCategory::from_score(submission.score);
        let event = FeedbackEvent {
            correlation_id: submission.correlation_id,
            input: submission.input,
            output: submission.output,
            score: submission.score,
            category,
            comment: submission.comment,
            submitted_at: Utc::now(),
        };

        logger.log_feedback(&event).await?;

        info!(
            "recorded {} feedback for generation {}",
            category, event.correlation_id
        );

        Ok(FeedbackReceipt {
            feedback_id: new_feedback_id(),
            category,
        })
    }
}

fn new_feedback_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!(
        "feedback-{}-{}",
        Utc::now().timestamp_millis(),
        suffix.to_lowercase()
    )
}
