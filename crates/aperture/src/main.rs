//! Batch photo critique from the command line.
//!
//! `aperture critique` walks a photo directory, submits every image as one
//! vision-model batch job, waits for it, and writes a scored report. Batches
//! can run for hours; `status` and `resume` reattach to one by id.
//!
//! ```bash
//! aperture critique ./photos --recursive --format both
//! aperture status msgbatch_abc123
//! aperture resume msgbatch_abc123 --metadata photos.meta.json
//! aperture config init
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Batch photo critique via vision-model batch APIs.
#[derive(Parser, Debug)]
#[command(name = "aperture")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose (debug-level) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover photos, submit one critique batch, and write the report
    Critique(cli::critique::CritiqueArgs),

    /// Show the current state of a submitted batch
    Status(cli::status::StatusArgs),

    /// Reattach to a submitted batch and write its report
    Resume(cli::resume::ResumeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

/// Load the config file, falling back to defaults on any error.
///
/// Runs before logging is installed, so complaints go through eprintln.
fn load_config_or_default() -> aperture_core::Config {
    aperture_core::Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config: {e}");
        eprintln!("  Continuing with defaults. `aperture config path` shows the file location.");
        aperture_core::Config::default()
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config_or_default();
    logging::init(&config.logging, cli.verbose, cli.json_logs);
    tracing::debug!("aperture v{}", aperture_core::VERSION);

    match cli.command {
        Commands::Critique(args) => cli::critique::execute(args).await,
        Commands::Status(args) => cli::status::execute(args).await,
        Commands::Resume(args) => cli::resume::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
