use crate::core::eval::{DetailLevel, TargetAudience};
use crate::core::types::ReportFormat;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct ServeArgs {
    /// Bind address for the API listener (default from config: 127.0.0.1:8787)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Path to custom config file (default: ./shiplog.toml)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct EvalArgs {
    /// JSON file with dataset examples to evaluate
    #[arg(value_name = "DATASET")]
    pub dataset: PathBuf,

    /// Emit either terminal-friendly text or machine-readable JSON
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: ReportFormat,

    /// Model used by the candidate generation task (default from config)
    #[arg(long, value_name = "MODEL", help_heading = "Task Parameters")]
    pub model: Option<String>,

    /// Detail level of the generated changelog
    #[arg(long, value_enum, default_value_t = DetailLevel::Standard, help_heading = "Task Parameters")]
    pub detail_level: DetailLevel,

    /// Leave change authors out of the generated changelog
    #[arg(long, help_heading = "Task Parameters")]
    pub no_authors: bool,

    /// Target audience of the generated changelog
    #[arg(long, value_enum, default_value_t = TargetAudience::Developers, help_heading = "Task Parameters")]
    pub target_audience: TargetAudience,

    /// Run only the deterministic scorers, skipping the LLM judges
    #[arg(long)]
    pub skip_judges: bool,

    /// Path to custom config file (default: ./shiplog.toml)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct DatasetArgs {
    #[command(subcommand)]
    pub command: DatasetCommand,
}

#[derive(Subcommand)]
pub enum DatasetCommand {
    /// Idempotently upsert local examples into the platform dataset
    Sync {
        /// JSON file with dataset examples
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Dataset name (default from config: Changelog Dataset)
        #[arg(long, value_name = "NAME")]
        name: Option<String>,

        /// Path to custom config file (default: ./shiplog.toml)
        #[arg(long, value_name = "FILE", help_heading = "Configuration")]
        config: Option<PathBuf>,
    },
}
