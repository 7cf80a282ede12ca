use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    ValidationError,
    UpstreamError,
    ConfigError,
    TimeoutError,
    LoggingError,
    SerializationError,
    IoError,
    InternalError,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Error,
    Warning,
    Info,
    Debug,
}

/// Category label derived from a binary feedback score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    Positive,
    Negative,
}

impl FeedbackCategory {
    /// Derive the label from a binary score (1 is positive, 0 is negative).
    pub fn from_score(score: u8) -> Self {
        if score == 1 {
            FeedbackCategory::Positive
        } else {
            FeedbackCategory::Negative
        }
    }
}

impl std::fmt::Display for FeedbackCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackCategory::Positive => write!(f, "positive"),
            FeedbackCategory::Negative => write!(f, "negative"),
        }
    }
}

/// Output format for the evaluation report.
#[derive(Clone, clap::ValueEnum, Debug)]
pub enum ReportFormat {
    /// Human-readable, Markdown-friendly summary
    Text,
    /// JSON payload suitable for downstream tooling
    Json,
}
