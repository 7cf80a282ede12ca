#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// One commit of a dataset example input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetCommit {
    pub message: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Input object of a dataset example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleInput {
    pub repository_url: String,
    #[serde(default)]
    pub since: Option<String>,
    pub commits: Vec<DatasetCommit>,
}

/// A fixed input/expected-output pair used for offline regression
/// evaluation. The id is stable so upserts stay idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetExample {
    #[serde(default)]
    pub id: Option<String>,
    pub input: ExampleInput,
    pub expected: String,
}

/// Load evaluation examples from a local JSON file.
pub fn load_examples(path: &Path) -> Result<Vec<DatasetExample>, AppError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::new(
            ErrorCategory::IoError,
            format!("Failed to read dataset file {}: {}", path.display(), e),
        )
    })?;

    let examples: Vec<DatasetExample> = serde_json::from_str(&content).map_err(|e| {
        AppError::new(
            ErrorCategory::ValidationError,
            format!("Failed to parse dataset file {}: {}", path.display(), e),
        )
    })?;

    debug!("loaded {} examples from {}", examples.len(), path.display());
    Ok(examples)
}

/// Record shape sent to the dataset store.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetRecord {
    pub id: String,
    pub input: ExampleInput,
    pub expected: String,
}

/// External store supporting idempotent upsert of dataset records.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    async fn upsert(&self, dataset: &str, records: &[DatasetRecord]) -> Result<(), AppError>;
}

/// Dataset store backed by the evaluation platform HTTP API.
pub struct HttpDatasetStore {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpDatasetStore {
    pub fn new(api_url: &str, api_key: Option<String>) -> Self {
        HttpDatasetStore {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl DatasetStore for HttpDatasetStore {
    async fn upsert(&self, dataset: &str, records: &[DatasetRecord]) -> Result<(), AppError> {
        let url = format!("{}/v1/datasets/{}/insert", self.api_url, dataset);
        let mut request = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "events": records }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            AppError::new(
                ErrorCategory::UpstreamError,
                format!("dataset store unreachable: {}", e),
            )
        })?;

        if !response.status().is_success() {
            return Err(AppError::new(
                ErrorCategory::UpstreamError,
                format!("dataset store returned status {}", response.status()),
            ));
        }
        Ok(())
    }
}

/// Upsert examples into the named dataset with stable per-index ids.
///
/// Expected text has newlines stripped before upsert so repeated syncs of the
/// same file produce identical records.
pub async fn sync_examples(
    store: &dyn DatasetStore,
    dataset: &str,
    examples: &[DatasetExample],
) -> Result<usize, AppError> {
    let records: Vec<DatasetRecord> = examples
        .iter()
        .enumerate()
        .map(|(i, example)| DatasetRecord {
            id: example
                .id
                .clone()
                .unwrap_or_else(|| format!("changelog-record-{}", i)),
            input: example.input.clone(),
            expected: example.expected.replace('\n', ""),
        })
        .collect();

    store.upsert(dataset, &records).await?;
    info!("upserted {} records into dataset '{}'", records.len(), dataset);
    Ok(records.len())
}
