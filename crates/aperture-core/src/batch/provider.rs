//! Batch provider trait and factory.
//!
//! Defines the interface both batch backends implement, plus the factory
//! that creates the right adapter from config. Credential problems surface
//! here, at construction, not on the first network call.

use async_trait::async_trait;

use super::types::{BatchHandle, BatchRequest, BatchStatus, ProviderKind, RawResult};
use crate::config::ProvidersConfig;
use crate::error::{BatchError, ConfigError};

/// Trait that all batch providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn BatchProvider>` for dynamic dispatch).
#[async_trait]
pub trait BatchProvider: Send + Sync {
    /// Provider name for logging (e.g., "anthropic", "openai").
    fn name(&self) -> &'static str;

    /// Submit a batch of requests. Returns a handle for polling.
    ///
    /// Fails with `EmptyBatch` for zero requests and `BatchTooLarge` above
    /// the provider's per-batch cap, before anything goes on the wire.
    async fn submit(&self, requests: &[BatchRequest]) -> Result<BatchHandle, BatchError>;

    /// Fetch the current status of a batch. "Still processing" is a normal
    /// `Ok`; only transport and auth problems are errors.
    async fn status(&self, handle: &BatchHandle) -> Result<BatchStatus, BatchError>;

    /// Retrieve per-item results for a terminal batch.
    ///
    /// Re-checks status first: `ResultsNotReady` if the batch is still
    /// running, `Failed` if it ended in a fatal state.
    async fn results(&self, handle: &BatchHandle) -> Result<Vec<RawResult>, BatchError>;
}

/// Shows only the provider name; adapters hold credentials that must not
/// end up in debug output.
impl std::fmt::Debug for dyn BatchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProvider")
            .field("name", &self.name())
            .finish()
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Name the variable the user should set: the configured `${VAR}` if the
/// config uses one, otherwise the provider's conventional variable.
fn env_hint(configured: &str, default_env: &str) -> String {
    if configured.starts_with("${") && configured.ends_with('}') {
        configured[2..configured.len() - 1].to_string()
    } else {
        default_env.to_string()
    }
}

/// Factory that creates the appropriate provider from config.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a batch provider for the given backend.
    ///
    /// The model is not part of the adapter: it is baked into each request
    /// payload by the request builder. Adapters only carry credentials.
    pub fn create(
        kind: ProviderKind,
        config: &ProvidersConfig,
    ) -> Result<Box<dyn BatchProvider>, ConfigError> {
        match kind {
            ProviderKind::Anthropic => {
                let api_key = resolve_env_var(&config.anthropic.api_key).ok_or_else(|| {
                    ConfigError::MissingCredential {
                        provider: "anthropic".to_string(),
                        env_hint: env_hint(&config.anthropic.api_key, "ANTHROPIC_API_KEY"),
                    }
                })?;
                Ok(Box::new(super::anthropic::AnthropicBatchProvider::new(
                    &api_key,
                )))
            }
            ProviderKind::OpenAi => {
                let api_key = resolve_env_var(&config.openai.api_key).ok_or_else(|| {
                    ConfigError::MissingCredential {
                        provider: "openai".to_string(),
                        env_hint: env_hint(&config.openai.api_key, "OPENAI_API_KEY"),
                    }
                })?;
                Ok(Box::new(super::openai::OpenAiBatchProvider::new(&api_key)))
            }
        }
    }

    /// The model a provider kind would use, honoring an override.
    ///
    /// Exposed so the CLI can echo the effective model before submission.
    pub fn effective_model(
        kind: ProviderKind,
        config: &ProvidersConfig,
        model_override: Option<&str>,
    ) -> String {
        let default = match kind {
            ProviderKind::Anthropic => &config.anthropic.model,
            ProviderKind::OpenAi => &config.openai.model,
        };
        model_override.unwrap_or(default).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[test]
    fn test_factory_fails_fast_without_credentials() {
        let mut config = ProvidersConfig::default();
        config.anthropic.api_key = "${APERTURE_TEST_UNSET_ANTHROPIC_KEY}".to_string();

        let err = ProviderFactory::create(ProviderKind::Anthropic, &config).unwrap_err();
        match err {
            ConfigError::MissingCredential { provider, env_hint } => {
                assert_eq!(provider, "anthropic");
                // The hint names the variable the config actually references
                assert_eq!(env_hint, "APERTURE_TEST_UNSET_ANTHROPIC_KEY");
            }
            other => panic!("expected MissingCredential, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_empty_key_hints_conventional_var() {
        let mut config = ProvidersConfig::default();
        config.openai.api_key = String::new();

        let err = ProviderFactory::create(ProviderKind::OpenAi, &config).unwrap_err();
        match err {
            ConfigError::MissingCredential { provider, env_hint } => {
                assert_eq!(provider, "openai");
                assert_eq!(env_hint, "OPENAI_API_KEY");
            }
            other => panic!("expected MissingCredential, got {other:?}"),
        }
    }

    #[test]
    fn test_factory_creates_provider_with_literal_key() {
        let mut config = ProvidersConfig::default();
        config.anthropic.api_key = "sk-test-literal".to_string();
        config.openai.api_key = "sk-test-literal".to_string();

        let provider = ProviderFactory::create(ProviderKind::Anthropic, &config).unwrap();
        assert_eq!(provider.name(), "anthropic");

        let provider = ProviderFactory::create(ProviderKind::OpenAi, &config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_effective_model_prefers_override() {
        let config = ProvidersConfig::default();

        assert_eq!(
            ProviderFactory::effective_model(ProviderKind::OpenAi, &config, None),
            "gpt-4o-mini"
        );
        assert_eq!(
            ProviderFactory::effective_model(ProviderKind::OpenAi, &config, Some("gpt-4o")),
            "gpt-4o"
        );
    }
}
