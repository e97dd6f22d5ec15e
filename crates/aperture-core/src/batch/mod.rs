//! Batch submission and retrieval for vision model critiques.
//!
//! Provides a provider abstraction over batch inference backends (Anthropic
//! Message Batches, OpenAI Batch API), a request builder that pairs each
//! request with local metadata, and a polling loop that waits out the batch
//! under a deadline.

pub(crate) mod anthropic;
pub(crate) mod openai;
pub(crate) mod orchestrator;
pub(crate) mod provider;
pub(crate) mod request;
pub(crate) mod types;

pub use orchestrator::{wait_for_completion, PollOptions};
pub use provider::{BatchProvider, ProviderFactory};
pub use request::{correlation_id, RequestBuilder, CRITIC_SYSTEM_PROMPT};
pub use types::{
    BatchHandle, BatchRequest, BatchStatus, ItemOutcome, ProcessingStatus, ProviderKind,
    RawResult, RequestCounts,
};
