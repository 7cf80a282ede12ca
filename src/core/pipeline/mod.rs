#![allow(clippy::result_large_err)]

use crate::core::app::AppContext;
use crate::core::completion::ChunkStream;
use crate::core::error::AppError;
use crate::core::observe::{GenerationEvent, GenerationInput, SpanLogger};
use crate::core::prompt::PromptPayload;
use crate::core::repo::RepoRef;
use crate::core::types::ErrorCategory;
use async_stream::try_stream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Handle for one streamed generation.
///
/// The correlation identifier is available synchronously, strictly before the
/// first content chunk can be observed, so callers can surface it out-of-band
/// (a response header) even if the client disconnects mid-stream.
pub struct GenerationStream {
    generation_id: String,
    chunks: ChunkStream,
}

impl std::fmt::Debug for GenerationStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationStream")
            .field("generation_id", &self.generation_id)
            .field("chunks", &"<stream>")
            .finish()
    }
}

impl GenerationStream {
    /// Correlation identifier minted when generation started.
    pub fn generation_id(&self) -> &str {
        &self.generation_id
    }

    /// Split the handle into the identifier and the lazy chunk sequence.
    pub fn into_parts(self) -> (String, ChunkStream) {
        (self.generation_id, self.chunks)
    }
}

struct StagedGeneration {
    repo: RepoRef,
    since: Option<chrono::DateTime<chrono::Utc>>,
    commit_summaries: Vec<String>,
    payload: PromptPayload,
}

/// Run the full request pipeline: parse the URL, fetch history, build the
/// prompt, and start the streamed completion.
///
/// The whole request shares one coarse wall-clock budget. Failures before the
/// first chunk return an error here; failures after that terminate the chunk
/// stream abnormally. Partial output already delivered is not retracted.
pub async fn handle_generation(
    ctx: &AppContext,
    raw_url: &str,
) -> Result<GenerationStream, AppError> {
    let repo = RepoRef::parse(raw_url)?;

    let budget = Duration::from_secs(ctx.config.server.request_budget_secs);
    let deadline = Instant::now() + budget;

    let staged = tokio::time::timeout(budget, stage(ctx, repo))
        .await
        .map_err(|_| {
            AppError::new(
                ErrorCategory::TimeoutError,
                format!(
                    "generation request exceeded the {}s budget",
                    ctx.config.server.request_budget_secs
                ),
            )
        })??;

    let generation_id = Uuid::new_v4().to_string();
    debug!(
        "starting generation {} for {} with {} commits",
        generation_id,
        staged.repo,
        staged.commit_summaries.len()
    );

    let raw_chunks = ctx
        .completions
        .stream_chat(&staged.payload, deadline)
        .await
        .map_err(AppError::from)?;

    let event = GenerationEvent {
        id: generation_id.clone(),
        input: GenerationInput {
            repository_url: staged.repo.url(),
            since: staged.since,
            commit_summaries: staged.commit_summaries,
        },
        output: None,
        error: None,
        model: staged.payload.model.clone(),
        prompt_slug: staged.payload.slug.clone(),
    };

    let chunks = observe_chunks(ctx.spans.clone(), event, raw_chunks);

    Ok(GenerationStream {
        generation_id,
        chunks,
    })
}

async fn stage(ctx: &AppContext, repo: RepoRef) -> Result<StagedGeneration, AppError> {
    let history = ctx.github.fetch_history(&repo).await?;

    let store = ctx.prompts.as_ref().ok_or_else(|| {
        AppError::new(
            ErrorCategory::ConfigError,
            "platform template store is not configured",
        )
    })?;

    let template = store
        .load(
            &ctx.config.project.name,
            &ctx.config.project.prompt_slug,
            &ctx.prompt_defaults(),
        )
        .await?;

    let payload = template.build(&repo.url(), history.since, &history.commits);
    let commit_summaries = history
        .commits
        .iter()
        .map(|c| c.summary().to_string())
        .collect();

    Ok(StagedGeneration {
        repo,
        since: history.since,
        commit_summaries,
        payload,
    })
}

/// Forward chunks unchanged while accumulating the full output; once the
/// stream finishes (or fails) the generation event is emitted fire-and-forget
/// so logging never blocks delivery.
fn observe_chunks(
    spans: Option<Arc<dyn SpanLogger>>,
    mut event: GenerationEvent,
    inner: ChunkStream,
) -> ChunkStream {
    Box::pin(try_stream! {
        let mut inner = inner;
        let mut collected = String::new();
        loop {
            match inner.next().await {
                Some(Ok(chunk)) => {
                    collected.push_str(&chunk);
                    yield chunk;
                }
                Some(Err(err)) => {
                    event.error = Some(err.detail().to_string());
                    emit_event(spans.clone(), event.clone());
                    Err(err)?;
                }
                None => {
                    event.output = Some(collected);
                    emit_event(spans, event);
                    break;
                }
            }
        }
    })
}

fn emit_event(spans: Option<Arc<dyn SpanLogger>>, event: GenerationEvent) {
    let Some(logger) = spans else {
        debug!("span logging not configured; skipping generation record");
        return;
    };
    tokio::spawn(async move {
        if let Err(err) = logger.log_generation(&event).await {
            warn!("failed to record generation event {}: {}", event.id, err);
        }
    });
}
