#![allow(clippy::result_large_err)]

use crate::core::completion::CompletionClient;
use crate::core::error::AppError;
use crate::core::eval::dataset::ExampleInput;
use crate::core::prompt::PromptMessage;
use async_trait::async_trait;

/// Detail level of a generated changelog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DetailLevel {
    Short,
    Standard,
    Verbose,
}

impl std::fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetailLevel::Short => write!(f, "short"),
            DetailLevel::Standard => write!(f, "standard"),
            DetailLevel::Verbose => write!(f, "verbose"),
        }
    }
}

/// Intended readership of a generated changelog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TargetAudience {
    Developers,
    Marketers,
    ProductManagers,
}

impl std::fmt::Display for TargetAudience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetAudience::Developers => write!(f, "developers"),
            TargetAudience::Marketers => write!(f, "marketers"),
            TargetAudience::ProductManagers => write!(f, "product managers"),
        }
    }
}

/// Generation parameters for the built-in changelog task.
#[derive(Debug, Clone)]
pub struct TaskParameters {
    pub model: String,
    pub detail_level: DetailLevel,
    pub include_authors: bool,
    pub target_audience: TargetAudience,
}

impl Default for TaskParameters {
    fn default() -> Self {
        TaskParameters {
            model: "gpt-4o".to_string(),
            detail_level: DetailLevel::Standard,
            include_authors: true,
            target_audience: TargetAudience::Developers,
        }
    }
}

/// Candidate generation function driven once per dataset example.
#[async_trait]
pub trait EvalTask: Send + Sync {
    async fn run(&self, input: &ExampleInput) -> Result<String, AppError>;
}

/// Built-in task: generate a changelog for the example's commit list with a
/// locally-built prompt.
pub struct ChangelogTask {
    client: CompletionClient,
    params: TaskParameters,
}

impl ChangelogTask {
    pub fn new(client: CompletionClient, params: TaskParameters) -> Self {
        ChangelogTask { client, params }
    }

    fn build_messages(&self, input: &ExampleInput) -> Vec<PromptMessage> {
        let commits = input
            .commits
            .iter()
            .map(|commit| {
                format!(
                    "- {} (by {}, {})",
                    commit.message,
                    commit.author.as_deref().unwrap_or("unknown"),
                    commit.date.as_deref().unwrap_or("unknown date"),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let authors_clause = if self.params.include_authors {
            "Make sure to include the authors of the changes."
        } else {
            "Do NOT include the authors of the changes."
        };

        let user = [
            format!("Create a {} changelog.", self.params.detail_level),
            authors_clause.to_string(),
            format!(
                "The target audience of this changelog are {}.",
                self.params.target_audience
            ),
            format!(
                "The most recent commits for {} since {} are below:",
                input.repository_url,
                input.since.as_deref().unwrap_or("null"),
            ),
            commits,
        ]
        .join(" ");

        vec![
            PromptMessage {
                role: "system".to_string(),
                content: "You are an expert changelog generator. You are given a list of commits and you need to create a changelog for them.".to_string(),
            },
            PromptMessage {
                role: "user".to_string(),
                content: user,
            },
        ]
    }
}

#[async_trait]
impl EvalTask for ChangelogTask {
    async fn run(&self, input: &ExampleInput) -> Result<String, AppError> {
        let messages = self.build_messages(input);
        self.client
            .complete(&self.params.model, 0.7, None, &messages)
            .await
            .map_err(AppError::from)
    }
}
