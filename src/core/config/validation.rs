#![allow(clippy::result_large_err)]

use super::ShiplogConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use url::Url;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration values before any collaborator is constructed.
    pub fn validate(config: &ShiplogConfig) -> Result<(), AppError> {
        if config.project.name.is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "Project name cannot be empty",
            ));
        }

        if config.project.prompt_slug.is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "Prompt slug cannot be empty",
            ));
        }

        Self::require_url("github.api_url", &config.github.api_url)?;
        Self::require_url("completion.api_url", &config.completion.api_url)?;
        if let Some(platform_url) = &config.platform.api_url {
            Self::require_url("platform.api_url", platform_url)?;
        }

        if config.github.commit_page_size == 0 || config.github.commit_page_size > 100 {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "github.commit_page_size must be between 1 and 100",
            ));
        }

        if !(0.0..=2.0).contains(&config.completion.default_temperature) {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "completion.default_temperature must be between 0.0 and 2.0",
            ));
        }

        if config.server.request_budget_secs == 0 {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "server.request_budget_secs must be greater than zero",
            ));
        }

        Ok(())
    }

    fn require_url(field: &str, value: &str) -> Result<(), AppError> {
        let parsed = Url::parse(value).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("{} is not a valid URL: {}", field, e),
            )
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("{} must use http or https", field),
            ));
        }
        Ok(())
    }
}
