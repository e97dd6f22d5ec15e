//! OpenAI batch provider using the Batch API.
//!
//! Requests are uploaded as a JSONL file and referenced by a batch job.
//! Output and error files are downloaded and merged once the job ends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::provider::BatchProvider;
use super::types::{
    BatchHandle, BatchRequest, BatchStatus, ItemOutcome, ProcessingStatus, ProviderKind,
    RawResult, RequestCounts,
};
use crate::error::BatchError;

const API_BASE: &str = "https://api.openai.com";
const COMPLETION_WINDOW: &str = "24h";

/// Batch API cap on requests per batch.
const MAX_REQUESTS_PER_BATCH: usize = 50_000;

/// OpenAI provider using the Batch API over Chat Completions.
pub struct OpenAiBatchProvider {
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiBatchProvider {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_status(&self, batch_id: &str) -> Result<WireBatch, BatchError> {
        let resp = self
            .client
            .get(format!("{API_BASE}/v1/batches/{batch_id}"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| BatchError::StatusFetchFailed {
                batch_id: batch_id.to_string(),
                message: format!("OpenAI request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BatchError::StatusFetchFailed {
                batch_id: batch_id.to_string(),
                message: format!("OpenAI HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        resp.json().await.map_err(|e| BatchError::StatusFetchFailed {
            batch_id: batch_id.to_string(),
            message: format!("Failed to parse OpenAI response: {e}"),
            status_code: None,
        })
    }

    async fn upload_requests(&self, jsonl: String) -> Result<String, BatchError> {
        let part = reqwest::multipart::Part::bytes(jsonl.into_bytes())
            .file_name("requests.jsonl");
        let form = reqwest::multipart::Form::new()
            .text("purpose", "batch")
            .part("file", part);

        let resp = self
            .client
            .post(format!("{API_BASE}/v1/files"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BatchError::SubmissionFailed {
                message: format!("OpenAI file upload failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BatchError::SubmissionFailed {
                message: format!("OpenAI HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let file: FileResponse =
            resp.json().await.map_err(|e| BatchError::SubmissionFailed {
                message: format!("Failed to parse OpenAI file response: {e}"),
                status_code: None,
            })?;

        Ok(file.id)
    }

    async fn download_file(&self, file_id: &str, batch_id: &str) -> Result<String, BatchError> {
        let resp = self
            .client
            .get(format!("{API_BASE}/v1/files/{file_id}/content"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| BatchError::ResultsFetchFailed {
                batch_id: batch_id.to_string(),
                message: format!("OpenAI request failed: {e}"),
            })?;

        let http_status = resp.status();
        if !http_status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BatchError::ResultsFetchFailed {
                batch_id: batch_id.to_string(),
                message: format!("OpenAI HTTP {http_status}: {text}"),
            });
        }

        resp.text().await.map_err(|e| BatchError::ResultsFetchFailed {
            batch_id: batch_id.to_string(),
            message: format!("Failed to read results body: {e}"),
        })
    }
}

// --- Wire types ---

#[derive(Deserialize)]
struct FileResponse {
    id: String,
}

#[derive(Deserialize)]
struct WireBatch {
    id: String,
    status: String,
    #[serde(default)]
    request_counts: WireCounts,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    completed_at: Option<i64>,
    #[serde(default)]
    failed_at: Option<i64>,
    #[serde(default)]
    cancelled_at: Option<i64>,
    #[serde(default)]
    expired_at: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    output_file_id: Option<String>,
    #[serde(default)]
    error_file_id: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireCounts {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    completed: u64,
    #[serde(default)]
    failed: u64,
}

#[derive(Deserialize)]
struct OutputLine {
    custom_id: String,
    #[serde(default)]
    response: Option<LineResponse>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct LineResponse {
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    body: serde_json::Value,
}

// --- Normalization ---

/// Native statuses that mean the batch will make no further progress.
const ENDED_STATUSES: &[&str] = &["completed", "failed", "expired", "cancelled"];

fn from_epoch(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

fn normalize_status(wire: WireBatch) -> BatchStatus {
    let processing_status = if ENDED_STATUSES.contains(&wire.status.as_str()) {
        ProcessingStatus::Ended
    } else {
        ProcessingStatus::InProgress
    };

    let counts = &wire.request_counts;
    let done = counts.completed + counts.failed;

    BatchStatus {
        processing_status,
        native_status: wire.status,
        counts: RequestCounts {
            processing: counts.total.saturating_sub(done),
            succeeded: counts.completed,
            errored: counts.failed,
            canceled: 0,
            expired: 0,
        },
        created_at: from_epoch(wire.created_at),
        ended_at: from_epoch(
            wire.completed_at
                .or(wire.failed_at)
                .or(wire.cancelled_at)
                .or(wire.expired_at),
        ),
        expires_at: from_epoch(wire.expires_at),
        output_locator: wire.output_file_id,
    }
}

/// Render one request per line in the Batch API's JSONL input format.
fn request_lines(requests: &[BatchRequest]) -> String {
    let mut jsonl = String::new();
    for request in requests {
        let line = json!({
            "custom_id": request.correlation_id,
            "method": "POST",
            "url": "/v1/chat/completions",
            "body": request.payload,
        });
        jsonl.push_str(&line.to_string());
        jsonl.push('\n');
    }
    jsonl
}

/// Pull a human-readable message out of a failed result line.
fn error_detail(line: &OutputLine) -> String {
    if let Some(error) = &line.error {
        if let Some(msg) = error["message"].as_str() {
            return msg.to_string();
        }
        if !error.is_null() {
            return error.to_string();
        }
    }
    if let Some(response) = &line.response {
        if let Some(msg) = response.body["error"]["message"].as_str() {
            return msg.to_string();
        }
        if let Some(code) = response.status_code {
            return format!("request failed with HTTP {code}");
        }
    }
    "request failed".to_string()
}

fn parse_results(body: &str, batch_id: &str) -> Result<Vec<RawResult>, BatchError> {
    let mut results = Vec::new();

    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        let parsed: OutputLine =
            serde_json::from_str(line).map_err(|e| BatchError::ResultsFetchFailed {
                batch_id: batch_id.to_string(),
                message: format!("Malformed result line: {e}"),
            })?;

        let outcome = match &parsed.response {
            Some(response) if response.status_code == Some(200) => {
                match response.body["choices"][0]["message"]["content"].as_str() {
                    Some(text) => ItemOutcome::Succeeded {
                        text: text.to_string(),
                    },
                    None => ItemOutcome::Errored {
                        detail: "no content in response".to_string(),
                    },
                }
            }
            _ => ItemOutcome::Errored {
                detail: error_detail(&parsed),
            },
        };

        results.push(RawResult {
            correlation_id: parsed.custom_id,
            outcome,
        });
    }

    Ok(results)
}

#[async_trait]
impl BatchProvider for OpenAiBatchProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn submit(&self, requests: &[BatchRequest]) -> Result<BatchHandle, BatchError> {
        if requests.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        if requests.len() > MAX_REQUESTS_PER_BATCH {
            return Err(BatchError::BatchTooLarge {
                count: requests.len(),
                max: MAX_REQUESTS_PER_BATCH,
            });
        }

        tracing::info!(count = requests.len(), "Submitting batch to OpenAI");

        let file_id = self.upload_requests(request_lines(requests)).await?;
        tracing::debug!(file_id = %file_id, "Request file uploaded");

        let resp = self
            .client
            .post(format!("{API_BASE}/v1/batches"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "input_file_id": file_id,
                "endpoint": "/v1/chat/completions",
                "completion_window": COMPLETION_WINDOW,
            }))
            .send()
            .await
            .map_err(|e| BatchError::SubmissionFailed {
                message: format!("OpenAI request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BatchError::SubmissionFailed {
                message: format!("OpenAI HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let batch: WireBatch =
            resp.json().await.map_err(|e| BatchError::SubmissionFailed {
                message: format!("Failed to parse OpenAI response: {e}"),
                status_code: None,
            })?;

        tracing::info!(batch_id = %batch.id, status = %batch.status, "Batch submitted");

        Ok(BatchHandle {
            batch_id: batch.id,
            provider: ProviderKind::OpenAi,
        })
    }

    async fn status(&self, handle: &BatchHandle) -> Result<BatchStatus, BatchError> {
        let wire = self.fetch_status(&handle.batch_id).await?;
        Ok(normalize_status(wire))
    }

    async fn results(&self, handle: &BatchHandle) -> Result<Vec<RawResult>, BatchError> {
        let wire = self.fetch_status(&handle.batch_id).await?;
        let error_file_id = wire.error_file_id.clone();
        let status = normalize_status(wire);

        if let Some(native) = status.failure_reason() {
            return Err(BatchError::Failed {
                batch_id: handle.batch_id.clone(),
                native_status: native.to_string(),
            });
        }
        if status.processing_status != ProcessingStatus::Ended {
            return Err(BatchError::ResultsNotReady {
                batch_id: handle.batch_id.clone(),
                native_status: status.native_status,
            });
        }

        tracing::info!(batch_id = %handle.batch_id, "Retrieving batch results");

        // Requests rejected before execution land in a separate error file.
        let mut results = Vec::new();
        if let Some(file_id) = status.output_locator.as_deref() {
            let body = self.download_file(file_id, &handle.batch_id).await?;
            results.extend(parse_results(&body, &handle.batch_id)?);
        }
        if let Some(file_id) = error_file_id.as_deref() {
            let body = self.download_file(file_id, &handle.batch_id).await?;
            results.extend(parse_results(&body, &handle.batch_id)?);
        }

        if results.is_empty() {
            return Err(BatchError::ResultsFetchFailed {
                batch_id: handle.batch_id.clone(),
                message: "batch ended but produced no output or error file".to_string(),
            });
        }

        tracing::info!(count = results.len(), "Retrieved results");

        Ok(results)
    }
}
