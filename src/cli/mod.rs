pub mod args;
pub mod commands;

pub use args::{DatasetArgs, DatasetCommand, EvalArgs, ServeArgs};
use clap::{Parser, Subcommand};
use std::path::Path;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "shiplog")]
#[command(version = crate::VERSION)]
#[command(about = "Changelog generation service with streamed model output")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: serve the API for the browser client, then evaluate changelog quality offline against a dataset."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Serve the generation and feedback API",
        long_about = "Serve binds the HTTP listener and handles /generate (streamed changelog with a correlation id header) and /api/feedback (binary quality judgments).",
        after_help = "Example:\n    shiplog serve --bind 127.0.0.1:8787"
    )]
    Serve(ServeArgs),
    #[command(
        about = "Run the offline scoring harness against a dataset",
        long_about = "Eval drives the candidate generation task over each dataset example and applies the accuracy, completeness, and formatting scorers.",
        after_help = "Example:\n    shiplog eval eval/changelog_dataset.json --format json"
    )]
    Eval(EvalArgs),
    #[command(
        about = "Manage the evaluation dataset",
        long_about = "Dataset commands upsert local example files into the platform dataset with stable record ids.",
        after_help = "Example:\n    shiplog dataset sync eval/changelog_dataset.json"
    )]
    Dataset(DatasetArgs),
}

impl Command {
    /// Explicit config file path given on the command line, if any.
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Serve(args) => args.config.as_deref(),
            Command::Eval(args) => args.config.as_deref(),
            Command::Dataset(args) => match &args.command {
                DatasetCommand::Sync { config, .. } => config.as_deref(),
            },
        }
    }
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Serve(serve_args) => commands::serve(serve_args).await,
        Command::Eval(eval_args) => commands::eval(eval_args).await,
        Command::Dataset(dataset_args) => commands::dataset(dataset_args).await,
    }
}
