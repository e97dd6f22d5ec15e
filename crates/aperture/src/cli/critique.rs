//! The `aperture critique` command: discover, prepare, submit, wait, report.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use aperture_core::batch::{
    wait_for_completion, PollOptions, ProviderFactory, RequestBuilder,
};
use aperture_core::discovery::{scan_stats, ImageDiscovery, ScanStats};
use aperture_core::prepare::{prepare_batch, DecodeCapabilities, ImagePreparer};
use aperture_core::report::generate_report;
use aperture_core::{Config, ImageMetadata};
use clap::Args;

use super::{create_spinner, print_report_paths, FormatArg, ProviderArg};

/// Arguments for the `critique` command.
#[derive(Args, Debug)]
pub struct CritiqueArgs {
    /// Photo file or directory to critique
    pub path: PathBuf,

    /// Output file path (extension is set per format)
    #[arg(short, long, default_value = "./critique-report")]
    pub output: PathBuf,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: FormatArg,

    /// Only include images scoring at or above this value
    #[arg(long, default_value = "0.0")]
    pub min_score: f64,

    /// Batch provider to submit to
    #[arg(long, value_enum, default_value = "anthropic")]
    pub provider: ProviderArg,

    /// Model name (defaults to the provider's configured model)
    #[arg(long)]
    pub model: Option<String>,

    /// List what would be submitted without calling the API
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum number of images to submit
    #[arg(long, default_value = "100")]
    pub max_images: usize,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Write the submission metadata sidecar (enables `resume --metadata`)
    #[arg(long)]
    pub metadata_out: Option<PathBuf>,
}

/// Values match the clap `#[arg(default_value = ...)]` annotations above.
impl Default for CritiqueArgs {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            output: PathBuf::from("./critique-report"),
            format: FormatArg::Json,
            min_score: 0.0,
            provider: ProviderArg::Anthropic,
            model: None,
            dry_run: false,
            max_images: 100,
            recursive: false,
            metadata_out: None,
        }
    }
}

/// Execute the critique command.
pub async fn execute(args: CritiqueArgs) -> anyhow::Result<()> {
    let started = Instant::now();
    let config = Config::load()?;
    let kind = args.provider.kind();

    eprintln!();
    eprintln!("Aperture photo critique ({})", args.provider);

    // Phase 1: find candidate images
    eprintln!();
    eprintln!("1. Discovering images...");
    let discovery = ImageDiscovery::new(config.discovery.clone());
    let images = discovery.discover(&args.path, args.recursive, Some(args.max_images))?;

    if images.is_empty() {
        eprintln!("No images found.");
        return Ok(());
    }

    print_scan_summary(&scan_stats(&images));

    if args.dry_run {
        eprintln!("Dry run - would submit {} image(s):", images.len());
        for image in images.iter().take(10) {
            let name = image
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| image.path.display().to_string());
            eprintln!("  - {name}");
        }
        if images.len() > 10 {
            eprintln!("  ... and {} more", images.len() - 10);
        }
        return Ok(());
    }

    // Credential check happens before any image work; a missing API key
    // must not wait for encoding to finish.
    let provider = ProviderFactory::create(kind, &config.providers)?;

    // Phase 2: decode, resize, and encode into batch requests
    eprintln!();
    eprintln!("2. Preparing batch...");

    let model = ProviderFactory::effective_model(kind, &config.providers, args.model.as_deref());
    let preparer = ImagePreparer::new(config.prepare.clone(), DecodeCapabilities::detect());
    let builder = RequestBuilder::new(kind, &model, config.batch.max_tokens);

    let spinner = create_spinner("Preparing images...");
    let (requests, metadata) = prepare_batch(&images, &preparer, &builder).await;
    spinner.finish_and_clear();

    if requests.is_empty() {
        eprintln!("No images could be prepared.");
        return Ok(());
    }
    eprintln!("Prepared {} request(s) for model {}", requests.len(), model);

    if let Some(path) = &args.metadata_out {
        write_metadata_sidecar(path, &metadata)?;
        eprintln!("Metadata sidecar written to: {}", path.display());
    }

    // Phase 3: one batch submission for the whole set
    eprintln!();
    eprintln!("3. Submitting batch...");
    let handle = provider.submit(&requests).await?;
    eprintln!("Batch submitted: {}", handle.batch_id);

    // Phase 4: poll until the provider reports a terminal state
    eprintln!();
    eprintln!("4. Waiting for results...");
    eprintln!("This may take a while. You can interrupt safely; the batch keeps running.");

    let spinner = create_spinner("Processing batch...");
    let options = PollOptions::from_config(&config.batch);

    let status = tokio::select! {
        result = wait_for_completion(provider.as_ref(), &handle, &options) => {
            spinner.finish_and_clear();
            match result {
                Ok(status) => status,
                Err(e) => {
                    // The id still identifies a live batch; print it before failing
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
            eprintln!("  aperture resume {} --provider {}", handle.batch_id, args.provider);
            std::process::exit(130);
        }
    };

    eprintln!(
        "Batch complete! {} succeeded, {} errored",
        status.counts.succeeded, status.counts.errored
    );

    // Phase 5: pull the per-image outcomes back down
    eprintln!();
    eprintln!("5. Retrieving results...");
    let results = provider.results(&handle).await?;
    eprintln!("Retrieved {} result(s)", results.len());

    // Phase 6: merge, score, and write the report
    eprintln!();
    eprintln!("6. Generating report...");
    let written = generate_report(
        &results,
        &metadata,
        &args.output,
        args.format.report_format(),
        args.min_score,
    )?;

    print_run_summary(
        requests.len(),
        status.counts.succeeded,
        status.counts.errored,
        started.elapsed(),
    );
    print_report_paths(&written);

    Ok(())
}

/// Print the discovery summary table.
fn print_scan_summary(stats: &ScanStats) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("            Images Found");
    eprintln!("  ====================================");
    eprintln!("    Total:        {:>8}", stats.total);
    eprintln!("    Total Size:   {:>8.2} MB", stats.total_size_mb);
    eprintln!("    Average Size: {:>8.2} MB", stats.avg_size_mb);
    for (ext, count) in &stats.by_extension {
        eprintln!("    .{:<12} {:>8}", ext, count);
    }
    eprintln!("  ====================================");
    eprintln!();
}

/// Print the end-of-run summary table.
fn print_run_summary(submitted: usize, succeeded: u64, errored: u64, elapsed: std::time::Duration) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Submitted:    {:>8}", submitted);
    eprintln!("    Succeeded:    {:>8}", succeeded);
    if errored > 0 {
        eprintln!("    Errored:      {:>8}", errored);
    }
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("  ====================================");
    eprintln!();
}

/// Write the metadata sidecar used by `aperture resume --metadata`.
fn write_metadata_sidecar(path: &Path, metadata: &[ImageMetadata]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)
        .map_err(|e| anyhow::anyhow!("Failed to create metadata file {}: {e}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), metadata)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critique_args_default_output_path() {
        let args = CritiqueArgs::default();
        assert_eq!(args.output, PathBuf::from("./critique-report"));
    }

    #[test]
    fn critique_args_default_format_is_json() {
        let args = CritiqueArgs::default();
        assert!(matches!(args.format, FormatArg::Json));
    }

    #[test]
    fn critique_args_default_provider_is_anthropic() {
        let args = CritiqueArgs::default();
        assert!(matches!(args.provider, ProviderArg::Anthropic));
    }

    #[test]
    fn critique_args_default_limits() {
        let args = CritiqueArgs::default();
        assert_eq!(args.max_images, 100);
        assert_eq!(args.min_score, 0.0);
    }

    #[test]
    fn critique_args_default_flags_are_off() {
        let args = CritiqueArgs::default();
        assert!(!args.dry_run);
        assert!(!args.recursive);
        assert!(args.model.is_none());
        assert!(args.metadata_out.is_none());
    }

    #[test]
    fn metadata_sidecar_writes_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta").join("run.json");

        let metadata = vec![ImageMetadata {
            correlation_id: "img_0000_beach".to_string(),
            path: PathBuf::from("/photos/beach.jpg"),
            filename: "beach.jpg".to_string(),
            original_dimensions: (4000, 3000),
        }];

        write_metadata_sidecar(&path, &metadata).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let restored: Vec<ImageMetadata> = serde_json::from_str(&text).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].correlation_id, "img_0000_beach");
        assert_eq!(restored[0].original_dimensions, (4000, 3000));
    }
}
