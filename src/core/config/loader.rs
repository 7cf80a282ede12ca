#![allow(clippy::result_large_err)]

use super::ShiplogConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from the workspace (workspace/shiplog.toml).
    /// Environment variables override config file values.
    /// Missing file means defaults + env vars.
    pub fn load_from_workspace(workspace_path: &Path) -> Result<ShiplogConfig, AppError> {
        let config_path = workspace_path.join("shiplog.toml");
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();
        Self::apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Load config from a specific file path.
    /// Returns Ok(None) if the file doesn't exist.
    pub fn load_from_file(path: &Path) -> Result<Option<ShiplogConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: ShiplogConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    /// Resolve the configuration for a CLI invocation: explicit --config file
    /// when given, otherwise the current directory's shiplog.toml.
    pub fn resolve(explicit: Option<&Path>) -> Result<ShiplogConfig, AppError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?.ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ValidationError,
                    format!("Config file {} not found", path.display()),
                )
            })?,
            None => {
                let cwd = env::current_dir().map_err(|e| {
                    AppError::new(
                        ErrorCategory::IoError,
                        format!("Failed to determine working directory: {}", e),
                    )
                })?;
                return Self::load_from_workspace(&cwd);
            }
        };
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    /// Environment variables take precedence over config file values.
    fn apply_env_overrides(config: &mut ShiplogConfig) {
        if let Ok(name) = env::var("SHIPLOG_PROJECT_NAME") {
            config.project.name = name;
        }

        if let Ok(slug) = env::var("SHIPLOG_PROMPT_SLUG") {
            config.project.prompt_slug = slug;
        }

        if let Ok(api_url) = env::var("SHIPLOG_GITHUB_API_URL") {
            config.github.api_url = api_url;
        }

        // Conventional token variable shared with other GitHub tooling.
        if let Ok(token) = env::var("GITHUB_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                config.github.token = Some(token);
            }
        }

        if let Ok(api_url) = env::var("SHIPLOG_COMPLETION_API_URL") {
            config.completion.api_url = api_url;
        }

        if let Ok(api_key) = env::var("OPENAI_API_KEY") {
            if !api_key.trim().is_empty() {
                config.completion.api_key = Some(api_key);
            }
        }

        if let Ok(api_url) = env::var("SHIPLOG_PLATFORM_API_URL") {
            if !api_url.trim().is_empty() {
                config.platform.api_url = Some(api_url);
            }
        }

        if let Ok(api_key) = env::var("PLATFORM_API_KEY") {
            if !api_key.trim().is_empty() {
                config.platform.api_key = Some(api_key);
            }
        }

        if let Ok(bind) = env::var("SHIPLOG_SERVER_BIND") {
            config.server.bind = bind;
        }

        if let Ok(budget_str) = env::var("SHIPLOG_REQUEST_BUDGET_SECS") {
            if let Ok(budget) = budget_str.parse::<u64>() {
                config.server.request_budget_secs = budget;
            }
        }

        if let Ok(model) = env::var("SHIPLOG_JUDGE_MODEL") {
            config.eval.judge_model = model;
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "SHIPLOG_PROJECT_NAME - Override platform project name",
            "SHIPLOG_PROMPT_SLUG - Override the changelog prompt slug",
            "SHIPLOG_GITHUB_API_URL - Override the hosting API base URL",
            "GITHUB_ACCESS_TOKEN - Optional bearer token for higher rate limits",
            "SHIPLOG_COMPLETION_API_URL - Override the completion API base URL",
            "OPENAI_API_KEY - API key for the completion service",
            "SHIPLOG_PLATFORM_API_URL - Override the evaluation platform base URL",
            "PLATFORM_API_KEY - API key for the evaluation platform",
            "SHIPLOG_SERVER_BIND - Override the API listener bind address",
            "SHIPLOG_REQUEST_BUDGET_SECS - Override the generation request budget",
            "SHIPLOG_JUDGE_MODEL - Override the LLM-judge model",
        ]
    }
}
