#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::github::CommitRecord;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One message of a prompt template or a built payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

/// Fallback generation parameters applied when a template omits them.
#[derive(Debug, Clone)]
pub struct PromptDefaults {
    pub model: String,
    pub temperature: f32,
}

/// A named, versioned prompt template with resolved generation parameters.
///
/// Templates are validated on load: a template without messages is rejected
/// instead of being coerced downstream.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub slug: String,
    pub version: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub messages: Vec<PromptMessage>,
}

/// Fully-resolved prompt ready for the completion service. Immutable after
/// construction.
#[derive(Debug, Clone, Serialize)]
pub struct PromptPayload {
    pub slug: String,
    pub version: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub messages: Vec<PromptMessage>,
}

impl PromptTemplate {
    fn from_raw(raw: RawTemplate, defaults: &PromptDefaults) -> Result<Self, AppError> {
        if raw.messages.is_empty() {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                format!("prompt template '{}' has no messages", raw.slug),
            ));
        }
        if raw.messages.iter().any(|m| m.content.trim().is_empty()) {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                format!("prompt template '{}' has an empty message", raw.slug),
            ));
        }
        Ok(PromptTemplate {
            slug: raw.slug,
            version: raw.version,
            model: raw.model.unwrap_or_else(|| defaults.model.clone()),
            temperature: raw.temperature.unwrap_or(defaults.temperature),
            max_tokens: raw.max_tokens,
            messages: raw.messages,
        })
    }

    /// Interpolate template placeholders and resolve generation parameters.
    ///
    /// `{{url}}` receives the repository URL, `{{since}}` the boundary
    /// timestamp (the literal `null` when unresolved), and `{{commits}}` each
    /// commit's full message joined with a blank line, newest first.
    pub fn build(
        &self,
        repo_url: &str,
        since: Option<DateTime<Utc>>,
        commits: &[CommitRecord],
    ) -> PromptPayload {
        let since_text = render_since(since);
        let commits_text = render_commits(commits);

        let messages = self
            .messages
            .iter()
            .map(|message| PromptMessage {
                role: message.role.clone(),
                content: message
                    .content
                    .replace("{{url}}", repo_url)
                    .replace("{{since}}", &since_text)
                    .replace("{{commits}}", &commits_text),
            })
            .collect();

        PromptPayload {
            slug: self.slug.clone(),
            version: self.version.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages,
        }
    }
}

/// Render the since boundary for prompt interpolation. Absence is passed
/// through as the literal `null`.
pub fn render_since(since: Option<DateTime<Utc>>) -> String {
    since
        .map(|s| s.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "null".to_string())
}

fn render_commits(commits: &[CommitRecord]) -> String {
    commits
        .iter()
        .map(|c| c.message.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// External store of named prompt templates, scoped by project + slug.
#[async_trait]
pub trait PromptStore: Send + Sync {
    async fn load(
        &self,
        project: &str,
        slug: &str,
        defaults: &PromptDefaults,
    ) -> Result<PromptTemplate, AppError>;
}

/// Wire shape served by the platform's template endpoint.
#[derive(Debug, Deserialize)]
struct RawTemplate {
    slug: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    messages: Vec<PromptMessage>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_tokens: Option<u32>,
}

/// Template store backed by the evaluation platform HTTP API.
#[derive(Clone)]
pub struct HttpPromptStore {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpPromptStore {
    pub fn new(api_url: &str, api_key: Option<String>) -> Self {
        HttpPromptStore {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl PromptStore for HttpPromptStore {
    async fn load(
        &self,
        project: &str,
        slug: &str,
        defaults: &PromptDefaults,
    ) -> Result<PromptTemplate, AppError> {
        let url = format!("{}/v1/templates", self.api_url);
        debug!("loading prompt template {}/{}", project, slug);

        let mut request = self
            .http
            .get(&url)
            .query(&[("project", project), ("slug", slug)]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("template store request for '{}' failed: {}", slug, e),
            )
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                format!(
                    "prompt template '{}' not found in project '{}'",
                    slug, project
                ),
            ));
        }

        if !response.status().is_success() {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                format!(
                    "template store returned status {} for '{}'",
                    response.status(),
                    slug
                ),
            ));
        }

        let raw: RawTemplate = response.json().await.map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("template payload for '{}' was malformed: {}", slug, e),
            )
        })?;

        PromptTemplate::from_raw(raw, defaults)
    }
}
