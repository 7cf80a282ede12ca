#![allow(clippy::result_large_err)]

use crate::core::config::GithubConfig;
use crate::core::error::AppError;
use crate::core::repo::RepoRef;
use crate::core::types::ErrorCategory;
use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

/// ASCII set for encoding path segments (slashes included).
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'/').add(b'?').add(b'#');

/// A single commit as fetched from the hosting API. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Short hash identifier
    pub id: String,
    /// Full commit message
    pub message: String,
    /// Author name, or "unknown" when the API omits it
    pub author: String,
    /// Author timestamp
    pub date: Option<DateTime<Utc>>,
}

impl CommitRecord {
    /// First line of the commit message, used for observability summaries.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// Result of a history fetch: commits newest-first plus the resolved
/// lower bound for "new" changes.
#[derive(Debug, Clone)]
pub struct RepoHistory {
    pub commits: Vec<CommitRecord>,
    pub since: Option<DateTime<Utc>>,
}

/// Read-only client for the source-control hosting API.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
    commit_page_size: u32,
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    sha: String,
    commit: RawCommitDetail,
}

#[derive(Debug, Deserialize)]
struct RawCommitDetail {
    message: String,
    author: Option<RawCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct RawCommitAuthor {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

impl GithubClient {
    /// Build a client from the github config section.
    pub fn new(config: &GithubConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("shiplog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                AppError::new(
                    ErrorCategory::InternalError,
                    format!("failed to construct hosting API client: {}", e),
                )
            })?;
        Ok(GithubClient {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            commit_page_size: config.commit_page_size,
        })
    }

    /// Fetch the publish timestamp of the latest release, if one exists.
    ///
    /// A 404 is the normal no-release branch; every other failure is fatal
    /// for the request.
    pub async fn latest_release(&self, repo: &RepoRef) -> Result<Option<DateTime<Utc>>, AppError> {
        let url = self.endpoint(&[&repo.owner, &repo.name, "releases", "latest"]);
        debug!("fetching latest release for {}", repo);

        let response = self.request(&url).send().await.map_err(|e| {
            AppError::new(
                ErrorCategory::UpstreamError,
                format!("release lookup for {} failed: {}", repo, e),
            )
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("no release published for {}", repo);
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(self.upstream_error(repo, "release lookup", response).await);
        }

        let release: RawRelease = response.json().await.map_err(|e| {
            AppError::new(
                ErrorCategory::UpstreamError,
                format!("release payload for {} was malformed: {}", repo, e),
            )
        })?;
        Ok(release.published_at)
    }

    /// List the most recent commits, newest-first, bounded to the configured
    /// page size and optionally filtered to commits at or after `since`.
    pub async fn list_commits(
        &self,
        repo: &RepoRef,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CommitRecord>, AppError> {
        let url = self.endpoint(&[&repo.owner, &repo.name, "commits"]);
        let mut request = self
            .request(&url)
            .query(&[("per_page", self.commit_page_size.to_string())]);
        if let Some(since) = since {
            request = request.query(&[(
                "since",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            )]);
        }

        let response = request.send().await.map_err(|e| {
            AppError::new(
                ErrorCategory::UpstreamError,
                format!("commit listing for {} failed: {}", repo, e),
            )
        })?;

        if !response.status().is_success() {
            return Err(self.upstream_error(repo, "commit listing", response).await);
        }

        let raw: Vec<RawCommit> = response.json().await.map_err(|e| {
            AppError::new(
                ErrorCategory::UpstreamError,
                format!("commit payload for {} was malformed: {}", repo, e),
            )
        })?;

        Ok(raw.into_iter().map(CommitRecord::from).collect())
    }

    /// Resolve the since boundary and fetch recent history for a repository.
    ///
    /// The boundary is the latest release publish time when a release exists,
    /// otherwise the author timestamp of the oldest fetched commit, otherwise
    /// absent. Commit order from the API is preserved (newest first).
    pub async fn fetch_history(&self, repo: &RepoRef) -> Result<RepoHistory, AppError> {
        let release_since = self.latest_release(repo).await?;
        let commits = self.list_commits(repo, release_since).await?;

        let since = release_since.or_else(|| commits.last().and_then(|c| c.date));

        info!(
            "fetched {} commits for {} (since {})",
            commits.len(),
            repo,
            since
                .map(|s| s.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_else(|| "null".to_string())
        );

        Ok(RepoHistory { commits, since })
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .get(url)
            .header("accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = format!("{}/repos", self.api_url);
        for segment in segments {
            url.push('/');
            url.push_str(&encode_segment(segment));
        }
        url
    }

    async fn upstream_error(
        &self,
        repo: &RepoRef,
        operation: &str,
        response: reqwest::Response,
    ) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        let mut error = AppError::new(
            ErrorCategory::UpstreamError,
            format!("{} for {} returned status {}", operation, repo, status),
        );
        error.add_context("body", &snippet);
        error
    }
}

impl From<RawCommit> for CommitRecord {
    fn from(raw: RawCommit) -> Self {
        let author = raw.commit.author;
        CommitRecord {
            id: raw.sha.chars().take(7).collect(),
            message: raw.commit.message,
            author: author
                .as_ref()
                .and_then(|a| a.name.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            date: author.and_then(|a| a.date),
        }
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT_ENCODE_SET).to_string()
}
