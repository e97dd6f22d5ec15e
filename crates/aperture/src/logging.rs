//! Tracing initialization for the CLI.
//!
//! Logs go to stderr in either pretty or JSON form; stdout carries only
//! report paths and batch ids so runs stay scriptable.

use aperture_core::config::LoggingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `--verbose` or the configured level
/// decides, with the HTTP stack capped at info so a debug run of a
/// multi-hour poll loop stays readable.
pub fn init(config: &LoggingConfig, verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(&config.level, verbose)));

    if json || config.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

fn directives(level: &str, verbose: bool) -> String {
    let base = if verbose { "debug" } else { level };
    match base {
        "debug" | "trace" => format!("{base},hyper_util=info,reqwest=info"),
        _ => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_configured_level() {
        assert!(directives("info", true).starts_with("debug,"));
    }

    #[test]
    fn test_configured_level_used_without_verbose() {
        assert_eq!(directives("warn", false), "warn");
    }

    #[test]
    fn test_http_stack_quieted_at_trace() {
        assert_eq!(
            directives("trace", false),
            "trace,hyper_util=info,reqwest=info"
        );
    }
}
