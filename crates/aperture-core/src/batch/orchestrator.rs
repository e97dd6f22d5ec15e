//! Batch polling loop.
//!
//! Polls a submitted batch until it ends, fails, or the deadline passes.
//! Progress is logged at a coarse interval so day-long waits stay quiet.

use std::time::{Duration, Instant};

use super::provider::BatchProvider;
use super::types::{BatchHandle, BatchStatus, ProcessingStatus};
use crate::config::BatchConfig;
use crate::error::BatchError;

/// Configuration for the polling loop.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Delay between status checks
    pub poll_interval: Duration,
    /// Give up after this much wall-clock time
    pub timeout: Duration,
    /// Minimum gap between progress log lines
    pub progress_interval: Duration,
}

impl PollOptions {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            timeout: Duration::from_secs(config.timeout_secs),
            progress_interval: Duration::from_secs(config.progress_interval_secs),
        }
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default())
    }
}

/// Poll until the batch reaches a terminal state.
///
/// Returns the final status once the provider reports every request
/// processed. A batch that was canceled or expired on the provider side
/// returns [`BatchError::Failed`]; exceeding `options.timeout` returns
/// [`BatchError::Timeout`]. Transport errors from status checks propagate
/// immediately so the caller can resume the batch by id once the provider
/// is reachable again.
pub async fn wait_for_completion(
    provider: &dyn BatchProvider,
    handle: &BatchHandle,
    options: &PollOptions,
) -> Result<BatchStatus, BatchError> {
    let started = Instant::now();
    let mut last_progress = Instant::now();

    tracing::info!(
        batch_id = %handle.batch_id,
        provider = provider.name(),
        poll_interval_secs = options.poll_interval.as_secs(),
        "Waiting for batch to complete"
    );

    loop {
        if started.elapsed() > options.timeout {
            return Err(BatchError::Timeout {
                batch_id: handle.batch_id.clone(),
                timeout_secs: options.timeout.as_secs(),
            });
        }

        let status = provider.status(handle).await?;

        // Fatal check comes before the terminal check: a canceled or
        // expired batch can report itself ended with partial counts.
        if let Some(native) = status.failure_reason() {
            tracing::error!(
                batch_id = %handle.batch_id,
                native_status = native,
                "Batch will not complete"
            );
            return Err(BatchError::Failed {
                batch_id: handle.batch_id.clone(),
                native_status: native.to_string(),
            });
        }

        if status.processing_status == ProcessingStatus::Ended {
            tracing::info!(
                batch_id = %handle.batch_id,
                succeeded = status.counts.succeeded,
                errored = status.counts.errored,
                elapsed_secs = started.elapsed().as_secs(),
                "Batch ended"
            );
            return Ok(status);
        }

        if last_progress.elapsed() >= options.progress_interval {
            tracing::info!(
                batch_id = %handle.batch_id,
                processing = status.counts.processing,
                succeeded = status.counts.succeeded,
                errored = status.counts.errored,
                elapsed_secs = started.elapsed().as_secs(),
                "Batch still processing"
            );
            last_progress = Instant::now();
        } else {
            tracing::debug!(
                batch_id = %handle.batch_id,
                native_status = %status.native_status,
                "Batch still processing"
            );
        }

        tokio::time::sleep(options.poll_interval).await;
    }
}
