#![allow(clippy::result_large_err)]

use crate::core::completion::CompletionClient;
use crate::core::config::{ConfigValidator, ShiplogConfig};
use crate::core::error::AppError;
use crate::core::github::GithubClient;
use crate::core::observe::{HttpSpanLogger, SpanLogger};
use crate::core::prompt::{HttpPromptStore, PromptDefaults, PromptStore};
use std::sync::Arc;

/// Explicit collaborator set constructed once at process start and injected
/// into every component that needs it. There is no process-wide singleton;
/// lifecycle is owned by the caller.
pub struct AppContext {
    pub config: ShiplogConfig,
    pub github: GithubClient,
    pub completions: CompletionClient,
    /// Template store. Absent when no platform endpoint is configured.
    pub prompts: Option<Arc<dyn PromptStore>>,
    /// Observability span logger. Absent when no platform endpoint is
    /// configured; feedback recording then fails as uninitialized.
    pub spans: Option<Arc<dyn SpanLogger>>,
}

impl AppContext {
    /// Validate the configuration and construct all collaborators.
    pub fn from_config(config: ShiplogConfig) -> Result<Self, AppError> {
        ConfigValidator::validate(&config)?;

        let github = GithubClient::new(&config.github)?;
        let completions = CompletionClient::new(&config.completion);

        let (prompts, spans) = match &config.platform.api_url {
            Some(url) => {
                let prompts: Arc<dyn PromptStore> =
                    Arc::new(HttpPromptStore::new(url, config.platform.api_key.clone()));
                let spans: Arc<dyn SpanLogger> = Arc::new(HttpSpanLogger::new(
                    url,
                    config.platform.api_key.clone(),
                    &config.project.name,
                ));
                (Some(prompts), Some(spans))
            }
            None => (None, None),
        };

        Ok(AppContext {
            config,
            github,
            completions,
            prompts,
            spans,
        })
    }

    /// Fallback model parameters applied when the prompt template omits them.
    pub fn prompt_defaults(&self) -> PromptDefaults {
        PromptDefaults {
            model: self.config.completion.default_model.clone(),
            temperature: self.config.completion.default_temperature,
        }
    }
}
