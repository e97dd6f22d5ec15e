//! Aperture Core - batch photo critique library.
//!
//! Aperture takes a directory of photographs, prepares each one for a
//! vision model, submits a single batch to a provider's batch inference
//! API, waits for the batch to end, and reconciles the per-item results
//! into scored critique reports.
//!
//! # Architecture
//!
//! ```text
//! Discover → Prepare (resize + encode) → Build Requests → Submit Batch
//!         → Poll Until Terminal → Retrieve Results → Merge → Report
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use aperture_core::batch::{
//!     wait_for_completion, PollOptions, ProviderFactory, ProviderKind, RequestBuilder,
//! };
//! use aperture_core::prepare::{prepare_batch, DecodeCapabilities, ImagePreparer};
//! use aperture_core::report::{generate_report, ReportFormat};
//! use aperture_core::{Config, ImageDiscovery};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!
//!     let discovery = ImageDiscovery::new(config.discovery.clone());
//!     let images = discovery.discover("./photos".as_ref(), true, Some(100))?;
//!
//!     let preparer = ImagePreparer::new(config.prepare.clone(), DecodeCapabilities::detect());
//!     let builder = RequestBuilder::new(
//!         ProviderKind::Anthropic,
//!         "claude-sonnet-4-5-20250929",
//!         config.batch.max_tokens,
//!     );
//!     let (requests, metadata) = prepare_batch(&images, &preparer, &builder).await;
//!
//!     let provider = ProviderFactory::create(ProviderKind::Anthropic, &config.providers)?;
//!     let handle = provider.submit(&requests).await?;
//!     wait_for_completion(provider.as_ref(), &handle, &PollOptions::from_config(&config.batch))
//!         .await?;
//!
//!     let results = provider.results(&handle).await?;
//!     generate_report(
//!         &results,
//!         &metadata,
//!         "./critique-report".as_ref(),
//!         ReportFormat::Both,
//!         0.0,
//!     )?;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod batch;
pub mod config;
pub mod discovery;
pub mod error;
pub mod prepare;
pub mod reconcile;
pub mod report;
pub mod types;

// Re-exports for convenient access
pub use batch::{BatchHandle, BatchStatus, ProviderKind};
pub use config::Config;
pub use discovery::ImageDiscovery;
pub use error::{ApertureError, BatchError, ConfigError, PipelineError, Result};
pub use prepare::{DecodeCapabilities, ImagePreparer};
pub use report::ReportFormat;
pub use types::{Critique, DiscoveredImage, ImageMetadata, MergedResult, PreparedImage};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_is_usable() {
        let config = Config::default();
        assert_eq!(config.batch.poll_interval_secs, 30);
        assert_eq!(config.prepare.max_long_edge, 1568);
    }
}
