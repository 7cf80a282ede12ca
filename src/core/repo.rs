#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use url::Url;

/// Owner + name pair parsed from a user-supplied repository URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse a github.com repository URL into an owner/name pair.
    ///
    /// Rejects anything without a host-qualified `owner/name` path segment
    /// before any upstream call is made. A trailing `.git` on the repository
    /// name is stripped.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Self::malformed(raw, "URL is empty"));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let parsed = Url::parse(&candidate)
            .map_err(|e| Self::malformed(raw, &format!("not a valid URL ({})", e)))?;

        let host = parsed
            .host_str()
            .ok_or_else(|| Self::malformed(raw, "URL has no host"))?;
        if host != "github.com" && host != "www.github.com" {
            return Err(Self::malformed(raw, "host must be github.com"));
        }

        let mut segments = parsed
            .path_segments()
            .map(|parts| parts.filter(|s| !s.is_empty()))
            .ok_or_else(|| Self::malformed(raw, "URL has no path"))?;

        let owner = segments
            .next()
            .ok_or_else(|| Self::malformed(raw, "missing repository owner"))?
            .to_string();
        let name = segments
            .next()
            .ok_or_else(|| Self::malformed(raw, "missing repository name"))?
            .trim_end_matches(".git")
            .to_string();

        if owner.is_empty() || name.is_empty() {
            return Err(Self::malformed(raw, "missing owner/name segment"));
        }

        Ok(RepoRef { owner, name })
    }

    /// Canonical browser URL for the repository.
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }

    fn malformed(raw: &str, reason: &str) -> AppError {
        AppError::new(
            ErrorCategory::ValidationError,
            format!(
                "repository URL '{}' must point at github.com/owner/name: {}",
                raw, reason
            ),
        )
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
