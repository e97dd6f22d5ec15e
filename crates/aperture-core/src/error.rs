//! Error types for the Aperture batch critique pipeline.
//!
//! Errors are organized by stage to provide clear, actionable error messages
//! that include relevant context (batch ids, provider status, file paths).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Aperture operations.
#[derive(Error, Debug)]
pub enum ApertureError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Batch lifecycle errors
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Local pipeline errors (discovery, preprocessing)
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// API key missing or its environment variable is unset
    #[error("No API key configured for provider '{provider}' (set {env_hint})")]
    MissingCredential { provider: String, env_hint: String },

    /// Provider name does not match any implemented adapter
    #[error("Unsupported provider: '{0}' (expected 'anthropic' or 'openai')")]
    UnsupportedProvider(String),
}

/// Batch lifecycle errors.
///
/// `Timeout` and `Failed` carry the batch id: a timed-out batch keeps running
/// on the provider side and can be picked up again with `resume`.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Submission called with no requests
    #[error("Cannot submit an empty batch")]
    EmptyBatch,

    /// Request count exceeds the provider's per-batch limit
    #[error("Batch of {count} requests exceeds provider limit of {max}")]
    BatchTooLarge { count: usize, max: usize },

    /// Batch creation request failed
    #[error("Batch submission failed: {message}{}", fmt_status(.status_code))]
    SubmissionFailed {
        message: String,
        status_code: Option<u16>,
    },

    /// Status poll request failed
    #[error("Status fetch failed for batch {batch_id}: {message}{}", fmt_status(.status_code))]
    StatusFetchFailed {
        batch_id: String,
        message: String,
        status_code: Option<u16>,
    },

    /// Results requested before the batch reached a terminal state
    #[error("Results not ready for batch {batch_id} (status: {native_status})")]
    ResultsNotReady {
        batch_id: String,
        native_status: String,
    },

    /// Results download or parse failed
    #[error("Results fetch failed for batch {batch_id}: {message}")]
    ResultsFetchFailed { batch_id: String, message: String },

    /// Polling budget exhausted; the batch may still complete on the provider side
    #[error("Batch {batch_id} did not complete within {timeout_secs}s (resume with the batch id)")]
    Timeout { batch_id: String, timeout_secs: u64 },

    /// The provider reported a terminal failure state
    #[error("Batch {batch_id} ended in state '{native_status}'")]
    Failed {
        batch_id: String,
        native_status: String,
    },
}

fn fmt_status(status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

/// Local pipeline errors (discovery and preprocessing), organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Image re-encoding failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// Scan target missing or not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Convenience type alias for Aperture results.
pub type Result<T> = std::result::Result<T, ApertureError>;

/// Convenience type alias for batch-specific results.
pub type BatchResult<T> = std::result::Result<T, BatchError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
