//! Data model for the batch lifecycle.
//!
//! These are provider-neutral types. Each adapter normalizes its wire
//! format into this model; nothing outside the adapters sees native JSON.

use chrono::{DateTime, Utc};

use crate::error::ConfigError;

/// The batch API backend to submit to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Anthropic Message Batches API
    Anthropic,
    /// OpenAI Batch API
    OpenAi,
}

impl ProviderKind {
    /// Parse a provider name as given on the command line.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }

    /// Canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request in a batch: a correlation id plus the provider-specific
/// request body built by the request builder.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Unique id echoed back with the result (`custom_id` on the wire)
    pub correlation_id: String,
    /// Provider-specific request body
    pub payload: serde_json::Value,
}

/// Handle to a submitted batch. The only state needed to poll or resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchHandle {
    /// Provider-assigned batch id
    pub batch_id: String,
    /// Which provider the batch lives on
    pub provider: ProviderKind,
}

/// Normalized processing state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    /// The provider is still working through requests
    InProgress,
    /// All requests have reached a final state
    Ended,
}

/// Per-request tallies as reported by the provider.
///
/// These are approximations while the batch is running; they are never
/// asserted against the submitted count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    pub processing: u64,
    pub succeeded: u64,
    pub errored: u64,
    pub canceled: u64,
    pub expired: u64,
}

/// Native batch states that cannot recover. A batch in one of these is done
/// failing; polling further would never surface results.
const FATAL_NATIVE_STATUSES: &[&str] = &[
    "canceled",
    "canceling",
    "cancelled",
    "cancelling",
    "failed",
    "expired",
];

/// A point-in-time snapshot of a batch, rebuilt on every poll.
#[derive(Debug, Clone)]
pub struct BatchStatus {
    /// Normalized state
    pub processing_status: ProcessingStatus,
    /// The provider's own status string, kept for diagnostics
    pub native_status: String,
    /// Per-request tallies
    pub counts: RequestCounts,
    pub created_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Where results can be fetched once the batch ends
    /// (a URL for Anthropic, a file id for OpenAI)
    pub output_locator: Option<String>,
}

impl BatchStatus {
    /// Whether the batch has reached any terminal state, successful or not.
    pub fn is_terminal(&self) -> bool {
        self.processing_status == ProcessingStatus::Ended || self.failure_reason().is_some()
    }

    /// The native status if it names an unrecoverable state.
    pub fn failure_reason(&self) -> Option<&str> {
        FATAL_NATIVE_STATUSES
            .contains(&self.native_status.as_str())
            .then_some(self.native_status.as_str())
    }
}

/// One per-item result as returned by the provider, before reconciliation.
///
/// Results arrive in no particular order relative to submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResult {
    /// Correlation id echoed back by the provider
    pub correlation_id: String,
    /// What happened to this item
    pub outcome: ItemOutcome,
}

/// Outcome of a single batch item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The model produced a response; `text` is its text content
    Succeeded { text: String },
    /// The item errored, was canceled, or expired
    Errored { detail: String },
}
