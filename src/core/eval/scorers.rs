#![allow(clippy::result_large_err)]

use crate::core::completion::CompletionClient;
use crate::core::error::AppError;
use crate::core::eval::dataset::ExampleInput;
use crate::core::prompt::PromptMessage;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::Serialize;

/// Canonical changelog section headers in their required order.
pub const CHANGELOG_SECTIONS: [&str; 4] = [
    "🚨 Breaking Changes",
    "✨ New Features",
    "🔧 Improvements",
    "🐛 Bug Fixes",
];

/// Choice labels a judge may pick, mapped to the numeric scale.
pub const CHOICE_SCALE: [(&str, f64); 4] = [
    ("Excellent", 1.0),
    ("Good", 0.75),
    ("Fair", 0.5),
    ("Poor", 0.25),
];

/// Numeric grade produced by one scorer for one example.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub scorer: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A function grading generated output against a rubric or rule.
#[async_trait]
pub trait Scorer: Send + Sync {
    fn name(&self) -> &str;
    async fn score(&self, input: &ExampleInput, output: &str) -> Result<ScoreResult, AppError>;
}

/// Deterministic check that section headers appear in canonical order.
///
/// Headers may be omitted. Zero found scores 0; exactly one found scores 1;
/// with two or more, each found header's canonical rank must strictly exceed
/// the previous one's, else 0.
pub struct FormattingScorer;

/// Pure ordering check, shared with the scorer's async wrapper.
pub fn score_formatting(output: &str) -> f64 {
    let mut found: Vec<(usize, usize)> = CHANGELOG_SECTIONS
        .iter()
        .enumerate()
        .filter_map(|(rank, section)| output.find(section).map(|position| (rank, position)))
        .collect();

    if found.is_empty() {
        return 0.0;
    }
    if found.len() == 1 {
        return 1.0;
    }

    found.sort_by_key(|(_, position)| *position);
    for pair in found.windows(2) {
        if pair[1].0 <= pair[0].0 {
            return 0.0;
        }
    }
    1.0
}

#[async_trait]
impl Scorer for FormattingScorer {
    fn name(&self) -> &str {
        "changelog-formatting"
    }

    async fn score(&self, _input: &ExampleInput, output: &str) -> Result<ScoreResult, AppError> {
        Ok(ScoreResult {
            scorer: self.name().to_string(),
            score: score_formatting(output),
            choice: None,
            reasoning: None,
        })
    }
}

const ACCURACY_RUBRIC: &str = r#"You are evaluating the accuracy of a changelog generated from a list of git commits.

**Task**: Rate how accurately the changelog represents the actual changes described in the commits.

**Input Data**:
- Original commit list: {{input.commits}}
- Generated changelog: {{output}}

**Evaluation Focus - Accuracy**:
Assess how well the changelog reflects the actual changes by examining:

1. **Factual Correctness**: Does the changelog accurately describe what was actually changed according to the commits?
2. **No Misrepresentation**: Are there any changes described in the changelog that don't match the commit details?
3. **Technical Precision**: Are technical details, feature names, and implementation specifics correctly captured?
4. **Change Impact**: Is the significance and scope of changes accurately represented (e.g., breaking vs. non-breaking)?

**Accuracy Levels**:

**Excellent**: Changelog perfectly matches commit details with no factual errors, misrepresentations, or technical inaccuracies. Every described change can be directly traced to specific commits.

**Good**: Changelog accurately represents the vast majority of changes with only very minor discrepancies that don't affect understanding of what was actually implemented.

**Fair**: Changelog generally reflects the commits but contains some noticeable inaccuracies in describing changes, feature details, or impact that could mislead users about what was actually done.

**Poor**: Changelog contains significant factual errors, misrepresents changes, or describes things that weren't actually implemented according to the commits.

**Output Format**:
Reasoning: [Detailed analysis comparing specific changelog entries to corresponding commits, noting any discrepancies or confirming accuracy]
Choice: Excellent, Good, Fair, or Poor"#;

const COMPLETENESS_RUBRIC: &str = r#"You are evaluating the completeness of a changelog generated from a list of git commits.

**Task**: Rate how comprehensively the changelog captures significant changes while appropriately filtering out trivial ones.

**Input Data**:
- Original commit list: {{input.commits}}
- Generated changelog: {{output}}

**Evaluation Focus - Completeness**:
Assess how well the changelog includes all important changes by examining:

1. **Significant Change Coverage**: Are all major features, bug fixes, breaking changes, and improvements from the commits included?
2. **Appropriate Filtering**: Are trivial changes (typos, minor formatting, internal refactoring) properly omitted?
3. **No Major Omissions**: Are there any important user-facing or developer-impacting changes missing from the changelog?
4. **Balanced Scope**: Does the changelog capture the right level of detail without being overwhelming or insufficient?

**Completeness Levels**:

**Excellent**: Changelog includes all significant changes that users and developers need to know about, while appropriately filtering out trivial commits. No important changes are missing.

**Good**: Changelog captures most significant changes with good judgment about what to include/exclude, but may miss one or two minor-but-notable changes or include some borderline trivial items.

**Fair**: Changelog covers the main significant changes but has noticeable gaps in coverage or includes too many trivial changes, affecting the balance of what should be documented.

**Poor**: Changelog misses multiple important changes that users need to know about, or is cluttered with trivial changes that obscure the significant ones.

**Output Format**:
Reasoning: [Detailed analysis of which significant changes are included/missing, assessment of filtering decisions, and evaluation of overall coverage]
Choice: Excellent, Good, Fair, or Poor"#;

/// Judge-model scorer: prompts a model with a fixed rubric, asks for
/// chain-of-thought reasoning followed by a forced choice, and maps the
/// choice onto the numeric scale.
pub struct LlmJudgeScorer {
    name: String,
    rubric: &'static str,
    client: CompletionClient,
    model: String,
}

impl LlmJudgeScorer {
    pub fn accuracy(client: CompletionClient, model: &str) -> Self {
        LlmJudgeScorer {
            name: "changelog-accuracy".to_string(),
            rubric: ACCURACY_RUBRIC,
            client,
            model: model.to_string(),
        }
    }

    pub fn completeness(client: CompletionClient, model: &str) -> Self {
        LlmJudgeScorer {
            name: "changelog-completeness".to_string(),
            rubric: COMPLETENESS_RUBRIC,
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Scorer for LlmJudgeScorer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, input: &ExampleInput, output: &str) -> Result<ScoreResult, AppError> {
        let content = self
            .rubric
            .replace("{{input.commits}}", &render_commit_list(input))
            .replace("{{output}}", output);

        let messages = vec![PromptMessage {
            role: "system".to_string(),
            content,
        }];

        let response = self
            .client
            .complete(&self.model, 0.0, None, &messages)
            .await
            .map_err(AppError::from)?;

        let (choice, score) = parse_choice(&response)?;

        Ok(ScoreResult {
            scorer: self.name.clone(),
            score,
            choice: Some(choice),
            reasoning: parse_reasoning(&response),
        })
    }
}

fn render_commit_list(input: &ExampleInput) -> String {
    input
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
        .join("\n")
}

/// Extract the forced choice from a judge response and map it onto the scale.
///
/// The judge is instructed to end with a `Choice:` line; a response without
/// one, or with an unknown label, is a scorer error rather than a silent 0.
pub fn parse_choice(response: &str) -> Result<(String, f64), AppError> {
    let line = response
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix("Choice:"))
        .ok_or_else(|| {
            AppError::new(
                ErrorCategory::UpstreamError,
                "judge response had no Choice line",
            )
        })?;

    let label = line.trim().trim_end_matches('.');
    CHOICE_SCALE
        .iter()
        .find(|(choice, _)| choice.eq_ignore_ascii_case(label))
        .map(|(choice, score)| (choice.to_string(), *score))
        .ok_or_else(|| {
            AppError::new(
                ErrorCategory::UpstreamError,
                format!("judge picked unknown choice '{}'", label),
            )
        })
}

fn parse_reasoning(response: &str) -> Option<String> {
    response
        .lines()
        .find_map(|line| line.trim().strip_prefix("Reasoning:"))
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}
