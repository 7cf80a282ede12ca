#![allow(clippy::result_large_err)]

use crate::core::app::AppContext;
use crate::core::error::AppError;
use crate::core::feedback::{parse_submission, FeedbackRecorder};
use crate::core::pipeline;
use crate::core::types::ErrorCategory;
use axum::{
    body::{Body, Bytes},
    extract::Extension,
    http::{header, HeaderValue, Response, StatusCode},
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::util::MapResponseLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

/// Response header carrying the correlation identifier, available to the
/// client before the stream body completes.
pub const GENERATION_ID_HEADER: &str = "x-generation-id";

/// Start the API listener and block until the service terminates.
pub async fn serve(ctx: Arc<AppContext>) -> Result<(), AppError> {
    serve_internal(ctx, None).await
}

/// Start the API listener and notify once the bind address is known (test helper).
pub async fn serve_with_ready_notifier(
    ctx: Arc<AppContext>,
    ready_notifier: oneshot::Sender<SocketAddr>,
) -> Result<(), AppError> {
    serve_internal(ctx, Some(ready_notifier)).await
}

async fn serve_internal(
    ctx: Arc<AppContext>,
    ready_notifier: Option<oneshot::Sender<SocketAddr>>,
) -> Result<(), AppError> {
    let bind_addr: SocketAddr = ctx.config.server.bind.parse().map_err(|err| {
        AppError::new(
            ErrorCategory::ValidationError,
            format!("invalid server bind address {}: {}", ctx.config.server.bind, err),
        )
    })?;
    let max_body_bytes = ctx.config.server.max_body_bytes;

    let router = Router::new()
        .route("/generate", post(handle_generate))
        .route("/api/feedback", post(handle_feedback))
        .layer(Extension(ctx))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(MapResponseLayer::new(|mut response: Response<Body>| {
            if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
                let body = json!({ "error": "payload too large" }).to_string();
                *response.body_mut() = Body::from(body);
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
            response
        }));

    let listener = TcpListener::bind(bind_addr).await.map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to bind API listener {}: {}", bind_addr, err),
        )
    })?;
    let local_addr = listener.local_addr().map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to determine API listener address: {}", err),
        )
    })?;
    if let Some(tx) = ready_notifier {
        let _ = tx.send(local_addr);
    }
    info!("API server listening on {}", local_addr);
    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| {
            AppError::new(
                ErrorCategory::InternalError,
                format!("API server terminated: {}", err),
            )
        })
}

/// POST /generate: stream a changelog for the repository URL in the body.
///
/// The URL is accepted under either `url` or `prompt`. On success the
/// correlation identifier is exposed via the generation header before the
/// chunked text body.
async fn handle_generate(
    Extension(ctx): Extension<Arc<AppContext>>,
    body: Bytes,
) -> Result<Response<Body>, GenerateRejection> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| GenerateRejection::bad_request("invalid JSON payload"))?;

    let url = ["prompt", "url"]
        .iter()
        .find_map(|field| payload.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| GenerateRejection::bad_request("No URL provided in request"))?;

    let stream = pipeline::handle_generation(&ctx, url)
        .await
        .map_err(GenerateRejection::from_app_error)?;

    let (generation_id, chunks) = stream.into_parts();
    Response::builder()
        .status(StatusCode::OK)
        .header(GENERATION_ID_HEADER, generation_id.as_str())
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from_stream(chunks))
        .map_err(|err| {
            GenerateRejection::from_app_error(AppError::new(
                ErrorCategory::InternalError,
                format!("failed to build streaming response: {}", err),
            ))
        })
}

/// POST /api/feedback: record a binary quality judgment for a generation.
async fn handle_feedback(
    Extension(ctx): Extension<Arc<AppContext>>,
    body: Bytes,
) -> Result<Json<Value>, FeedbackRejection> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| FeedbackRejection::bad_request("invalid JSON payload".to_string()))?;

    let submission = parse_submission(&payload)
        .map_err(|err| FeedbackRejection::bad_request(err.detail().to_string()))?;

    let recorder = FeedbackRecorder::new(ctx.spans.clone());
    let receipt = recorder
        .record(submission)
        .await
        .map_err(FeedbackRejection::internal)?;

    Ok(Json(json!({
        "success": true,
        "feedbackId": receipt.feedback_id,
        "category": receipt.category,
    })))
}

/// Structured rejection for the generation endpoint: `{error, details}`.
struct GenerateRejection {
    status: StatusCode,
    error: &'static str,
    details: String,
}

impl GenerateRejection {
    fn bad_request(details: &str) -> Self {
        GenerateRejection {
            status: StatusCode::BAD_REQUEST,
            error: "An error occurred while generating the changelog",
            details: details.to_string(),
        }
    }

    fn from_app_error(err: AppError) -> Self {
        let status = match err.category {
            ErrorCategory::ValidationError => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("generation failed: {}", err);
        }
        GenerateRejection {
            status,
            error: "An error occurred while generating the changelog",
            details: err.detail().to_string(),
        }
    }
}

impl IntoResponse for GenerateRejection {
    fn into_response(self) -> Response<Body> {
        let mut resp = Json(json!({
            "error": self.error,
            "details": self.details,
        }))
        .into_response();
        *resp.status_mut() = self.status;
        resp
    }
}

/// Structured rejection for the feedback endpoint: `{error}`.
struct FeedbackRejection {
    status: StatusCode,
    error: String,
}

impl FeedbackRejection {
    fn bad_request(error: String) -> Self {
        FeedbackRejection {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }

    fn internal(err: AppError) -> Self {
        tracing::error!("feedback recording failed: {}", err);
        FeedbackRejection {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.detail().to_string(),
        }
    }
}

impl IntoResponse for FeedbackRejection {
    fn into_response(self) -> Response<Body> {
        let mut resp = Json(json!({ "error": self.error })).into_response();
        *resp.status_mut() = self.status;
        resp
    }
}
