use serde::{Deserialize, Serialize};

/// Main shiplog configuration loaded from shiplog.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShiplogConfig {
    /// Project identity on the evaluation platform
    #[serde(default)]
    pub project: ProjectConfig,

    /// Source-control hosting API
    #[serde(default)]
    pub github: GithubConfig,

    /// Model-completion service
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Evaluation platform (prompt store, span logs, datasets)
    #[serde(default)]
    pub platform: PlatformConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Offline evaluation settings
    #[serde(default)]
    pub eval: EvalConfig,
}

/// Project identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name used to scope prompts, logs, and datasets
    #[serde(default = "default_project_name")]
    pub name: String,

    /// Slug of the changelog prompt template
    #[serde(default = "default_prompt_slug")]
    pub prompt_slug: String,

    /// Name of the evaluation dataset
    #[serde(default = "default_dataset_name")]
    pub dataset: String,
}

/// Source-control hosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Base URL of the hosting API
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Optional bearer token. Raises rate limits; absence is tolerated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Upper bound on commits fetched per request
    #[serde(default = "default_commit_page_size")]
    pub commit_page_size: u32,
}

/// Model-completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the completion API
    #[serde(default = "default_completion_api_url")]
    pub api_url: String,

    /// API key for the completion service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used when the prompt template does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Temperature used when the prompt template does not set one
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
}

/// Evaluation platform configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlatformConfig {
    /// Base URL of the platform API. When unset, span logging and the
    /// template store are treated as uninitialized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// API key for the platform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the API listener
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Coarse wall-clock budget for a generation request, in seconds
    #[serde(default = "default_request_budget_secs")]
    pub request_budget_secs: u64,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Offline evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Model used by the LLM-judge scorers
    #[serde(default = "default_judge_model")]
    pub judge_model: String,
}

fn default_project_name() -> String {
    "changelog-generator".to_string()
}

fn default_prompt_slug() -> String {
    "generate-changelog".to_string()
}

fn default_dataset_name() -> String {
    "Changelog Dataset".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_commit_page_size() -> u32 {
    20
}

fn default_completion_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_request_budget_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_judge_model() -> String {
    "gpt-4.1".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            name: default_project_name(),
            prompt_slug: default_prompt_slug(),
            dataset: default_dataset_name(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        GithubConfig {
            api_url: default_github_api_url(),
            token: None,
            commit_page_size: default_commit_page_size(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            api_url: default_completion_api_url(),
            api_key: None,
            default_model: default_model(),
            default_temperature: default_temperature(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            request_budget_secs: default_request_budget_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            judge_model: default_judge_model(),
        }
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
