//! Sub-configuration structs with defaults matching the batch API limits.

use serde::{Deserialize, Serialize};

/// Image discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Supported input formats (matched against lowercase extensions)
    pub supported_formats: Vec<String>,

    /// Minimum file size in KiB; smaller files are treated as thumbnails
    pub min_file_size_kb: u64,

    /// Directory names to skip entirely
    pub excluded_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "heic".to_string(),
            ],
            min_file_size_kb: 100,
            excluded_dirs: vec![
                "_cache".to_string(),
                "__MACOSX".to_string(),
                "thumbnails".to_string(),
                ".thumbnails".to_string(),
            ],
        }
    }
}

/// Image preprocessing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Maximum long edge in pixels; larger images are downscaled before upload
    pub max_long_edge: u32,

    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: u8,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            max_long_edge: 1568,
            jpeg_quality: 95,
            decode_timeout_ms: 5000,
        }
    }
}

/// Batch polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Seconds between status polls
    pub poll_interval_secs: u64,

    /// Maximum seconds to wait for a batch before giving up locally.
    /// The batch keeps running on the provider side and stays resumable.
    pub timeout_secs: u64,

    /// Seconds between progress log lines while polling
    pub progress_interval_secs: u64,

    /// Max tokens requested per critique
    pub max_tokens: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            timeout_secs: 86400,
            progress_interval_secs: 300,
            max_tokens: 1024,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Batch provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Anthropic Message Batches configuration
    pub anthropic: AnthropicConfig,

    /// OpenAI Batch API configuration
    pub openai: OpenAiConfig,
}

/// Anthropic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-sonnet-4-5-20250929".to_string(),
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}
