use crate::cli::{DatasetArgs, DatasetCommand, EvalArgs, ServeArgs};
use crate::core::app::AppContext;
use crate::core::completion::CompletionClient;
use crate::core::config::ConfigLoader;
use crate::core::error::AppError;
use crate::core::eval::{
    load_examples, sync_examples, ChangelogTask, EvalRunner, FormattingScorer, HttpDatasetStore,
    LlmJudgeScorer, Scorer, TaskParameters,
};
use crate::core::types::{ErrorCategory, ReportFormat};
use crate::server;
use std::sync::Arc;
use tracing::info;

/// Start the API server and block until it terminates.
pub async fn serve(args: ServeArgs) -> crate::Result<()> {
    let mut config = ConfigLoader::resolve(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let ctx = Arc::new(AppContext::from_config(config)?);
    info!(
        "serving project '{}' with prompt '{}'",
        ctx.config.project.name, ctx.config.project.prompt_slug
    );
    server::serve(ctx).await?;
    Ok(())
}

/// Run the offline scoring harness against a local dataset file.
pub async fn eval(args: EvalArgs) -> crate::Result<()> {
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    let examples = load_examples(&args.dataset)?;
    info!("evaluating {} examples", examples.len());

    let client = CompletionClient::new(&config.completion);
    let params = TaskParameters {
        model: args
            .model
            .unwrap_or_else(|| config.completion.default_model.clone()),
        detail_level: args.detail_level,
        include_authors: !args.no_authors,
        target_audience: args.target_audience,
    };
    let task = ChangelogTask::new(client.clone(), params);

    let mut scorers: Vec<Box<dyn Scorer>> = vec![Box::new(FormattingScorer)];
    if !args.skip_judges {
        scorers.push(Box::new(LlmJudgeScorer::accuracy(
            client.clone(),
            &config.eval.judge_model,
        )));
        scorers.push(Box::new(LlmJudgeScorer::completeness(
            client,
            &config.eval.judge_model,
        )));
    }

    let runner = EvalRunner::new(Box::new(task), scorers);
    let report = runner.run(&examples).await;

    match args.format {
        ReportFormat::Text => print!("{}", report.render_text()),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

/// Dataset management commands.
pub async fn dataset(args: DatasetArgs) -> crate::Result<()> {
    match args.command {
        DatasetCommand::Sync { file, name, config } => {
            let config = ConfigLoader::resolve(config.as_deref())?;
            let api_url = config.platform.api_url.as_ref().ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ConfigError,
                    "platform.api_url must be configured to sync datasets",
                )
            })?;

            let store = HttpDatasetStore::new(api_url, config.platform.api_key.clone());
            let dataset_name = name.unwrap_or_else(|| config.project.dataset.clone());
            let examples = load_examples(&file)?;
            let count = sync_examples(&store, &dataset_name, &examples).await?;
            println!("Upserted {} records into '{}'", count, dataset_name);
            Ok(())
        }
    }
}
