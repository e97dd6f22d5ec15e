//! Command handlers and the CLI-side argument types they share.

use std::path::PathBuf;
use std::time::Duration;

use aperture_core::batch::ProviderKind;
use aperture_core::report::ReportFormat;
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};

pub mod config;
pub mod critique;
pub mod resume;
pub mod status;

/// Supported batch providers.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ProviderArg {
    /// Anthropic Message Batches API
    Anthropic,
    /// OpenAI Batch API
    Openai,
}

impl ProviderArg {
    /// The core provider this argument selects.
    pub fn kind(self) -> ProviderKind {
        match self {
            ProviderArg::Anthropic => ProviderKind::Anthropic,
            ProviderArg::Openai => ProviderKind::OpenAi,
        }
    }
}

impl std::fmt::Display for ProviderArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderArg::Anthropic => write!(f, "anthropic"),
            ProviderArg::Openai => write!(f, "openai"),
        }
    }
}

/// Supported report formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    /// Machine-readable report with statistics and full critiques
    Json,
    /// Human-readable report grouped by score tier
    Markdown,
    /// Write both formats side by side
    Both,
}

impl FormatArg {
    /// The core report format this argument selects.
    pub fn report_format(self) -> ReportFormat {
        match self {
            FormatArg::Json => ReportFormat::Json,
            FormatArg::Markdown => ReportFormat::Markdown,
            FormatArg::Both => ReportFormat::Both,
        }
    }
}

impl std::fmt::Display for FormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatArg::Json => write!(f, "json"),
            FormatArg::Markdown => write!(f, "markdown"),
            FormatArg::Both => write!(f, "both"),
        }
    }
}

/// Create a spinner for stages without a known length.
fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Print where the report files landed.
fn print_report_paths(written: &[PathBuf]) {
    match written {
        [] => eprintln!("No results to report."),
        [single] => eprintln!("Report saved to: {}", single.display()),
        many => {
            eprintln!("Reports saved to:");
            for path in many {
                eprintln!("  - {}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_arg_maps_to_core_kind() {
        assert_eq!(ProviderArg::Anthropic.kind(), ProviderKind::Anthropic);
        assert_eq!(ProviderArg::Openai.kind(), ProviderKind::OpenAi);
    }

    #[test]
    fn provider_arg_display_matches_cli_values() {
        assert_eq!(ProviderArg::Anthropic.to_string(), "anthropic");
        assert_eq!(ProviderArg::Openai.to_string(), "openai");
    }

    #[test]
    fn format_arg_maps_to_report_format() {
        assert!(matches!(FormatArg::Json.report_format(), ReportFormat::Json));
        assert!(matches!(
            FormatArg::Markdown.report_format(),
            ReportFormat::Markdown
        ));
        assert!(matches!(FormatArg::Both.report_format(), ReportFormat::Both));
    }

    #[test]
    fn format_arg_display_matches_cli_values() {
        assert_eq!(FormatArg::Json.to_string(), "json");
        assert_eq!(FormatArg::Markdown.to_string(), "markdown");
        assert_eq!(FormatArg::Both.to_string(), "both");
    }
}
