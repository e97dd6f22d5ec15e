//! Anthropic batch provider using the Message Batches API.
//!
//! Requests are submitted inline as JSON; results come back as JSONL from
//! a download URL once the batch reaches `ended`.

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

const API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Message Batches API cap on requests per batch.
const MAX_REQUESTS_PER_BATCH: usize = 10_000;

/// Anthropic provider using the Message Batches API.
pub struct AnthropicBatchProvider {
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicBatchProvider {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_status(&self, batch_id: &str) -> Result<BatchResponse, BatchError> {
        let resp = self
            .client
            .get(format!("{API_BASE}/v1/messages/batches/{batch_id}"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
            .map_err(|e| BatchError::StatusFetchFailed {
                batch_id: batch_id.to_string(),
                message: format!("Anthropic request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BatchError::StatusFetchFailed {
                batch_id: batch_id.to_string(),
                message: format!("Anthropic HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        resp.json().await.map_err(|e| BatchError::StatusFetchFailed {
            batch_id: batch_id.to_string(),
            message: format!("Failed to parse Anthropic response: {e}"),
            status_code: None,
        })
    }
}

// --- Wire types ---

#[derive(Deserialize)]
struct BatchResponse {
    id: String,
    processing_status: String,
    #[serde(default)]
    request_counts: WireCounts,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    results_url: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireCounts {
    #[serde(default)]
    processing: u64,
    #[serde(default)]
    succeeded: u64,
    #[serde(default)]
    errored: u64,
    #[serde(default)]
    canceled: u64,
    #[serde(default)]
    expired: u64,
}

#[derive(Deserialize)]
struct ResultLine {
    custom_id: String,
    result: LineResult,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum LineResult {
    Succeeded {
        message: ResultMessage,
    },
    Errored {
        #[serde(default)]
        error: serde_json::Value,
    },
    Canceled,
    Expired,
}

#[derive(Deserialize)]
struct ResultMessage {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

// --- Normalization ---

fn normalize_status(resp: BatchResponse) -> BatchStatus {
    let processing_status = if resp.processing_status == "ended" {
        ProcessingStatus::Ended
    } else {
        ProcessingStatus::InProgress
    };

    BatchStatus {
        processing_status,
        native_status: resp.processing_status,
        counts: RequestCounts {
            processing: resp.request_counts.processing,
            succeeded: resp.request_counts.succeeded,
            errored: resp.request_counts.errored,
            canceled: resp.request_counts.canceled,
            expired: resp.request_counts.expired,
        },
        created_at: resp.created_at,
        ended_at: resp.ended_at,
        expires_at: resp.expires_at,
        output_locator: resp.results_url,
    }
}

/// Pull a human-readable message out of a nested error object.
fn error_detail(error: &serde_json::Value) -> String {
    error["error"]["message"]
        .as_str()
        .or_else(|| error["message"].as_str())
        .map(String::from)
        .unwrap_or_else(|| error.to_string())
}

fn parse_results(body: &str, batch_id: &str) -> Result<Vec<RawResult>, BatchError> {
    let mut results = Vec::new();

    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        let parsed: ResultLine =
            serde_json::from_str(line).map_err(|e| BatchError::ResultsFetchFailed {
                batch_id: batch_id.to_string(),
                message: format!("Malformed result line: {e}"),
            })?;

        let outcome = match parsed.result {
            LineResult::Succeeded { message } => {
                let text = message
                    .content
                    .into_iter()
                    .find(|block| block.block_type == "text")
                    .and_then(|block| block.text);
                match text {
                    Some(text) => ItemOutcome::Succeeded { text },
                    None => ItemOutcome::Errored {
                        detail: "no text content in response".to_string(),
                    },
                }
            }
            LineResult::Errored { error } => ItemOutcome::Errored {
                detail: error_detail(&error),
            },
            LineResult::Canceled => ItemOutcome::Errored {
                detail: "request canceled".to_string(),
            },
            LineResult::Expired => ItemOutcome::Errored {
                detail: "request expired".to_string(),
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
impl BatchProvider for AnthropicBatchProvider {
    fn name(&self) -> &'static str {
        "anthropic"
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

        tracing::info!(count = requests.len(), "Submitting batch to Anthropic");

        let records: Vec<serde_json::Value> = requests
            .iter()
            .map(|r| {
                json!({
                    "custom_id": r.correlation_id,
                    "params": r.payload,
                })
            })
            .collect();

        let resp = self
            .client
            .post(format!("{API_BASE}/v1/messages/batches"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&json!({ "requests": records }))
            .send()
            .await
            .map_err(|e| BatchError::SubmissionFailed {
                message: format!("Anthropic request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BatchError::SubmissionFailed {
                message: format!("Anthropic HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let batch: BatchResponse =
            resp.json().await.map_err(|e| BatchError::SubmissionFailed {
                message: format!("Failed to parse Anthropic response: {e}"),
                status_code: None,
            })?;

        tracing::info!(
            batch_id = %batch.id,
            processing_status = %batch.processing_status,
            "Batch submitted"
        );

        Ok(BatchHandle {
            batch_id: batch.id,
            provider: ProviderKind::Anthropic,
        })
    }

    async fn status(&self, handle: &BatchHandle) -> Result<BatchStatus, BatchError> {
        let resp = self.fetch_status(&handle.batch_id).await?;
        Ok(normalize_status(resp))
    }

    async fn results(&self, handle: &BatchHandle) -> Result<Vec<RawResult>, BatchError> {
        let status = self.status(handle).await?;

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

        let url = status.output_locator.unwrap_or_else(|| {
            format!("{API_BASE}/v1/messages/batches/{}/results", handle.batch_id)
        });

        tracing::info!(batch_id = %handle.batch_id, "Retrieving batch results");

        let resp = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
            .map_err(|e| BatchError::ResultsFetchFailed {
                batch_id: handle.batch_id.clone(),
                message: format!("Anthropic request failed: {e}"),
            })?;

        let http_status = resp.status();
        if !http_status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BatchError::ResultsFetchFailed {
                batch_id: handle.batch_id.clone(),
                message: format!("Anthropic HTTP {http_status}: {text}"),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| BatchError::ResultsFetchFailed {
                batch_id: handle.batch_id.clone(),
                message: format!("Failed to read results body: {e}"),
            })?;

        let results = parse_results(&body, &handle.batch_id)?;
        tracing::info!(count = results.len(), "Retrieved results");

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_in_progress_status() {
        let json = r#"{
            "id": "msgbatch_abc123",
            "type": "message_batch",
            "processing_status": "in_progress",
            "request_counts": {"processing": 7, "succeeded": 2, "errored": 1, "canceled": 0, "expired": 0},
            "created_at": "2024-09-24T18:37:24.100435Z",
            "ended_at": null,
            "expires_at": "2024-09-25T18:37:24.100435Z",
            "results_url": null
        }"#;

        let resp: BatchResponse = serde_json::from_str(json).unwrap();
        let status = normalize_status(resp);

        assert_eq!(status.processing_status, ProcessingStatus::InProgress);
        assert_eq!(status.native_status, "in_progress");
        assert_eq!(status.counts.processing, 7);
        assert_eq!(status.counts.succeeded, 2);
        assert!(status.created_at.is_some());
        assert!(status.ended_at.is_none());
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_normalize_ended_status() {
        let json = r#"{
            "id": "msgbatch_abc123",
            "processing_status": "ended",
            "request_counts": {"processing": 0, "succeeded": 9, "errored": 1, "canceled": 0, "expired": 0},
            "created_at": "2024-09-24T18:37:24Z",
            "ended_at": "2024-09-24T19:00:00Z",
            "expires_at": "2024-09-25T18:37:24Z",
            "results_url": "https://api.anthropic.com/v1/messages/batches/msgbatch_abc123/results"
        }"#;

        let resp: BatchResponse = serde_json::from_str(json).unwrap();
        let status = normalize_status(resp);

        assert_eq!(status.processing_status, ProcessingStatus::Ended);
        assert!(status.is_terminal());
        assert_eq!(status.failure_reason(), None);
        assert_eq!(
            status.output_locator.as_deref(),
            Some("https://api.anthropic.com/v1/messages/batches/msgbatch_abc123/results")
        );
    }

    #[test]
    fn test_normalize_canceling_is_fatal() {
        let json = r#"{
            "id": "msgbatch_abc123",
            "processing_status": "canceling",
            "request_counts": {"processing": 3, "succeeded": 0, "errored": 0, "canceled": 7, "expired": 0}
        }"#;

        let resp: BatchResponse = serde_json::from_str(json).unwrap();
        let status = normalize_status(resp);

        assert_eq!(status.processing_status, ProcessingStatus::InProgress);
        assert_eq!(status.failure_reason(), Some("canceling"));
        assert!(status.is_terminal());
    }

    #[test]
    fn test_parse_results_mixed_outcomes() {
        let body = concat!(
            r#"{"custom_id":"img_0000_beach","result":{"type":"succeeded","message":{"id":"msg_1","type":"message","role":"assistant","content":[{"type":"text","text":"{\"overall_score\": 8.5}"}],"model":"claude-sonnet-4-5-20250929","usage":{"input_tokens":100,"output_tokens":50}}}}"#,
            "\n",
            r#"{"custom_id":"img_0001_dune","result":{"type":"errored","error":{"type":"error","error":{"type":"invalid_request_error","message":"image too large"}}}}"#,
            "\n",
            r#"{"custom_id":"img_0002_pier","result":{"type":"expired"}}"#,
            "\n",
        );

        let results = parse_results(body, "msgbatch_abc").unwrap();
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].correlation_id, "img_0000_beach");
        assert_eq!(
            results[0].outcome,
            ItemOutcome::Succeeded {
                text: "{\"overall_score\": 8.5}".to_string()
            }
        );

        assert_eq!(
            results[1].outcome,
            ItemOutcome::Errored {
                detail: "image too large".to_string()
            }
        );

        assert_eq!(
            results[2].outcome,
            ItemOutcome::Errored {
                detail: "request expired".to_string()
            }
        );
    }

    #[test]
    fn test_parse_results_succeeded_without_text_block() {
        let body = r#"{"custom_id":"img_0000_x","result":{"type":"succeeded","message":{"content":[{"type":"tool_use","id":"t1","name":"noop","input":{}}]}}}"#;

        let results = parse_results(body, "msgbatch_abc").unwrap();
        assert_eq!(
            results[0].outcome,
            ItemOutcome::Errored {
                detail: "no text content in response".to_string()
            }
        );
    }

    #[test]
    fn test_parse_results_rejects_malformed_line() {
        let body = "{\"custom_id\": \"img_0000_x\"";
        let err = parse_results(body, "msgbatch_abc").unwrap_err();
        assert!(matches!(err, BatchError::ResultsFetchFailed { .. }));
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_batch() {
        let provider = AnthropicBatchProvider::new("sk-test");
        let err = provider.submit(&[]).await.unwrap_err();
        assert!(matches!(err, BatchError::EmptyBatch));
    }

    #[tokio::test]
    async fn test_submit_rejects_oversized_batch() {
        let provider = AnthropicBatchProvider::new("sk-test");
        let requests: Vec<BatchRequest> = (0..MAX_REQUESTS_PER_BATCH + 1)
            .map(|i| BatchRequest {
                correlation_id: format!("img_{i:04}_x"),
                payload: serde_json::Value::Null,
            })
            .collect();

        let err = provider.submit(&requests).await.unwrap_err();
        match err {
            BatchError::BatchTooLarge { count, max } => {
                assert_eq!(count, MAX_REQUESTS_PER_BATCH + 1);
                assert_eq!(max, MAX_REQUESTS_PER_BATCH);
            }
            other => panic!("expected BatchTooLarge, got {other:?}"),
        }
    }
}
