//! The `aperture config` command.

use aperture_core::Config;
use clap::{Args, Subcommand};

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Print the config file location
    Path,

    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show(),
        ConfigCommand::Path => {
            println!("{}", Config::default_path().display());
            Ok(())
        }
        ConfigCommand::Init { force } => init(force),
    }
}

/// Print the effective config: file contents when present, defaults otherwise.
fn show() -> anyhow::Result<()> {
    let path = Config::default_path();
    if !path.exists() {
        println!("# no config file at {}; showing defaults", path.display());
    }
    let config = Config::load()?;
    println!("{}", config.to_toml()?);
    Ok(())
}

fn init(force: bool) -> anyhow::Result<()> {
    let path = Config::default_path();
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // API keys stay in the environment; the file only records the ${VAR}
    // placeholders.
    std::fs::write(&path, Config::default().to_toml()?)?;

    tracing::info!(path = %path.display(), "wrote default config");
    println!("Configuration initialized at: {}", path.display());
    Ok(())
}
