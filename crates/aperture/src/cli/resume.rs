//! The `aperture resume` command: reattach to a batch by id and write its report.

use std::path::{Path, PathBuf};

use aperture_core::batch::{wait_for_completion, BatchHandle, PollOptions, ProviderFactory};
use aperture_core::report::generate_report;
use aperture_core::{Config, ImageMetadata};
use clap::Args;

use super::{create_spinner, print_report_paths, FormatArg, ProviderArg};

/// Arguments for the `resume` command.
#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Batch id printed at submission time
    pub batch_id: String,

    /// Provider the batch was submitted to
    #[arg(long, value_enum, default_value = "anthropic")]
    pub provider: ProviderArg,

    /// Metadata sidecar written by `critique --metadata-out`
    #[arg(long)]
    pub metadata: Option<PathBuf>,

    /// Output file path (extension is set per format)
    #[arg(short, long, default_value = "./critique-report")]
    pub output: PathBuf,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: FormatArg,

    /// Only include images scoring at or above this value
    #[arg(long, default_value = "0.0")]
    pub min_score: f64,
}

/// Execute the resume command.
pub async fn execute(args: ResumeArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let kind = args.provider.kind();

    let metadata = match &args.metadata {
        Some(path) => read_metadata_sidecar(path)?,
        None => {
            tracing::warn!(
                "No metadata sidecar given; the report will use placeholder filenames"
            );
            Vec::new()
        }
    };

    let provider = ProviderFactory::create(kind, &config.providers)?;
    let handle = BatchHandle {
        batch_id: args.batch_id.clone(),
        provider: kind,
    };

    eprintln!("Waiting for batch {}...", handle.batch_id);

    let spinner = create_spinner("Processing batch...");
    let options = PollOptions::from_config(&config.batch);

    let status = tokio::select! {
        result = wait_for_completion(provider.as_ref(), &handle, &options) => {
            spinner.finish_and_clear();
            match result {
                Ok(status) => status,
                Err(e) => {
                    eprintln!("Batch ID: {}", handle.batch_id);
                    return Err(e.into());
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            spinner.finish_and_clear();
            eprintln!();
            eprintln!("Interrupted. Batch ID: {}", handle.batch_id);
            eprintln!("You can retrieve results later using this batch ID.");
            std::process::exit(130);
        }
    };

    eprintln!(
        "Batch complete! {} succeeded, {} errored",
        status.counts.succeeded, status.counts.errored
    );

    eprintln!();
    eprintln!("Retrieving results...");
    let results = provider.results(&handle).await?;
    eprintln!("Retrieved {} results", results.len());

    eprintln!();
    eprintln!("Generating report...");
    let written = generate_report(
        &results,
        &metadata,
        &args.output,
        args.format.report_format(),
        args.min_score,
    )?;

    eprintln!();
    print_report_paths(&written);

    Ok(())
}

/// Load the metadata sidecar written at submission time.
fn read_metadata_sidecar(path: &Path) -> anyhow::Result<Vec<ImageMetadata>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read metadata file {}: {e}", path.display()))?;
    let metadata: Vec<ImageMetadata> = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("Invalid metadata file {}: {e}", path.display()))?;

    tracing::debug!(count = metadata.len(), "Loaded metadata sidecar");
    Ok(metadata)
}
