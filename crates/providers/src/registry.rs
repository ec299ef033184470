//! Provider registry.
//!
//! Constructs and holds all configured LLM provider instances. At startup the
//! registry reads the [`ProvidersConfig`], resolves authentication (env
//! vars), and instantiates the appropriate adapter for each configured entry.

use std::collections::HashMap;
use std::sync::Arc;

use thinksuit_core::config::{LlmStartupPolicy, ProviderKind, ProvidersConfig};
use thinksuit_core::error::{EngineError, Result};

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds all instantiated LLM providers and role routing.
///
/// When the startup policy is `allow_none`, the registry also records
/// initialization errors so they can be surfaced to callers (e.g. a
/// readiness check) without needing to scrape startup logs.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    init_errors: Vec<ProviderInitError>,
}

/// Records a provider that failed to initialize.
#[derive(Debug, Clone)]
pub struct ProviderInitError {
    pub provider_id: String,
    pub kind: String,
    /// Error message with any potential secrets masked.
    pub error: String,
}

/// Mask substrings that look like API keys or bearer tokens in an error
/// message, so raw secrets never leak into logs or readiness output.
fn mask_secrets(msg: &str) -> String {
    let mut result = msg.to_string();
    for word in msg.split(|c: char| c.is_whitespace() || c == '\'' || c == '"' || c == ',') {
        let trimmed = word.trim();
        if trimmed.len() >= 20
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            let masked = if trimmed.len() > 8 {
                format!("{}...{}", &trimmed[..4], &trimmed[trimmed.len() - 4..])
            } else {
                "***masked***".to_string()
            };
            result = result.replace(trimmed, &masked);
        }
    }
    result
}

impl ProviderRegistry {
    /// Build a registry directly from already-constructed providers,
    /// bypassing config parsing and auth resolution. Used by tests that
    /// need a deterministic `LlmProvider` double instead of a real HTTP
    /// backend.
    pub fn from_providers(providers: HashMap<String, Arc<dyn LlmProvider>>) -> Self {
        Self { providers, init_errors: Vec::new() }
    }

    /// Build the registry from the application's [`ProvidersConfig`].
    ///
    /// Each entry in `config.entries` is instantiated using the adapter for
    /// its `kind`. Auth keys are resolved eagerly (env vars are read at this
    /// point). Providers that fail to initialize are logged and skipped
    /// rather than aborting the entire startup.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        let mut init_errors: Vec<ProviderInitError> = Vec::new();

        for (id, entry) in &config.entries {
            let result: Result<Arc<dyn LlmProvider>> = match entry.kind {
                ProviderKind::OpenaiCompat => OpenAiCompatProvider::from_config(id, entry)
                    .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
                ProviderKind::Anthropic => AnthropicProvider::from_config(id, entry)
                    .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
            };

            match result {
                Ok(provider) => {
                    tracing::info!(provider_id = %id, kind = ?entry.kind, "registered LLM provider");
                    providers.insert(id.clone(), provider);
                }
                Err(e) => {
                    let safe_error = mask_secrets(&e.to_string());
                    tracing::warn!(
                        provider_id = %id,
                        kind = ?entry.kind,
                        error = %safe_error,
                        "failed to initialize LLM provider, skipping"
                    );
                    init_errors.push(ProviderInitError {
                        provider_id: id.clone(),
                        kind: format!("{:?}", entry.kind),
                        error: safe_error,
                    });
                }
            }
        }

        if providers.is_empty() && !config.entries.is_empty() {
            match config.startup_policy {
                LlmStartupPolicy::RequireOne => {
                    return Err(EngineError::Config(
                        "all configured LLM providers failed to initialize \
                         (startup_policy = require_one)"
                            .into(),
                    ));
                }
                LlmStartupPolicy::AllowNone => {
                    tracing::warn!(
                        failed_providers = init_errors.len(),
                        "no LLM providers initialized (startup_policy = allow_none); \
                         callLLM will fail until auth is configured"
                    );
                }
            }
        }

        Ok(Self { providers, init_errors })
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Resolve a `"provider_id/model_name"` spec into its provider and bare
    /// model name.
    pub fn resolve_model<'a>(&self, model_spec: &'a str) -> Option<(Arc<dyn LlmProvider>, &'a str)> {
        let (provider_id, model) = model_spec.split_once('/')?;
        let provider = self.providers.get(provider_id)?.clone();
        Some((provider, model))
    }

    /// Iterate over all registered providers.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn LlmProvider>)> {
        self.providers.iter()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// List all registered provider IDs (sorted).
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Provider initialization errors (empty if all succeeded).
    pub fn init_errors(&self) -> &[ProviderInitError] {
        &self.init_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_secrets_redacts_long_token_like_strings() {
        let masked = mask_secrets("invalid key sk-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa used");
        assert!(!masked.contains("sk-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
        assert!(masked.contains("..."));
    }

    #[test]
    fn mask_secrets_leaves_short_words_alone() {
        let masked = mask_secrets("environment variable not set");
        assert_eq!(masked, "environment variable not set");
    }

    #[test]
    fn from_config_with_no_entries_is_empty_and_ok() {
        let cfg = ProvidersConfig::default();
        let registry = ProviderRegistry::from_config(&cfg).unwrap();
        assert!(registry.is_empty());
        assert!(registry.init_errors().is_empty());
    }

    #[test]
    fn from_config_require_one_errors_when_all_entries_fail() {
        use thinksuit_core::config::{ProviderEntry, ProviderKind as PK};

        let mut entries = HashMap::new();
        entries.insert(
            "openai".to_string(),
            ProviderEntry {
                kind: PK::OpenaiCompat,
                api_key_env: Some("THINKSUIT_TEST_MISSING_KEY_9999".into()),
                base_url: None,
                max_retries: 3,
                timeout_ms: 30_000,
            },
        );
        let cfg = ProvidersConfig {
            entries,
            roles: HashMap::new(),
            startup_policy: LlmStartupPolicy::RequireOne,
            default_timeout_ms: 30_000,
        };
        assert!(ProviderRegistry::from_config(&cfg).is_err());
    }
}
