#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::{ErrorCategory, FeedbackCategory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// Fixed metric name the binary feedback score is recorded under.
pub const FEEDBACK_METRIC: &str = "user_feedback";

/// Inputs captured for a generation event.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationInput {
    pub repository_url: String,
    pub since: Option<DateTime<Utc>>,
    pub commit_summaries: Vec<String>,
}

/// Observability record for one generation request, keyed by the correlation
/// identifier handed to the client.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationEvent {
    pub id: String,
    pub input: GenerationInput,
    pub output: Option<String>,
    pub error: Option<String>,
    pub model: String,
    pub prompt_slug: String,
}

/// Feedback record referencing an earlier generation event.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackEvent {
    pub correlation_id: String,
    pub input: String,
    pub output: String,
    pub score: u8,
    pub category: FeedbackCategory,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// External collaborator that records structured event spans for later
/// correlation.
#[async_trait]
pub trait SpanLogger: Send + Sync {
    async fn log_generation(&self, event: &GenerationEvent) -> Result<(), AppError>;
    async fn log_feedback(&self, event: &FeedbackEvent) -> Result<(), AppError>;
}

/// Span logger backed by the evaluation platform HTTP API.
pub struct HttpSpanLogger {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    project: String,
}

impl HttpSpanLogger {
    pub fn new(api_url: &str, api_key: Option<String>, project: &str) -> Self {
        HttpSpanLogger {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            project: project.to_string(),
        }
    }

    async fn post_events(&self, events: serde_json::Value) -> Result<(), AppError> {
        let url = format!("{}/v1/project_logs", self.api_url);
        let mut request = self.http.post(&url).json(&json!({ "events": events }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            AppError::new(
                ErrorCategory::LoggingError,
                format!("observability collaborator unreachable: {}", e),
            )
        })?;

        if !response.status().is_success() {
            return Err(AppError::new(
                ErrorCategory::LoggingError,
                format!(
                    "observability collaborator returned status {}",
                    response.status()
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SpanLogger for HttpSpanLogger {
    async fn log_generation(&self, event: &GenerationEvent) -> Result<(), AppError> {
        debug!("recording generation event {}", event.id);
        self.post_events(json!([{
            "id": event.id,
            "project": self.project,
            "input": event.input,
            "output": event.output,
            "error": event.error,
            "metadata": {
                "model": event.model,
                "prompt_slug": event.prompt_slug,
            },
        }]))
        .await
    }

    async fn log_feedback(&self, event: &FeedbackEvent) -> Result<(), AppError> {
        debug!(
            "recording {} feedback for generation {}",
            event.category, event.correlation_id
        );
        self.post_events(json!([{
            "id": event.correlation_id,
            "project": self.project,
            "input": event.input,
            "output": event.output,
            "scores": { (FEEDBACK_METRIC): event.score },
            "metadata": {
                "category": event.category,
                "submitted_at": event.submitted_at,
                "comment": event.comment,
            },
        }]))
        .await
    }
}
