//! Capability-driven LLM router.
//!
//! Selects a provider/model pair per role from the configured [`RoleRouting`]
//! and walks the fallback chain when the primary fails with a retriable
//! error or doesn't satisfy the role's capability requirements.

use std::sync::Arc;
use std::time::Instant;

use thinksuit_core::capability::ToolSupport;
use thinksuit_core::config::{ProvidersConfig, RoleRouting};
use thinksuit_core::error::{EngineError, Result};
use thinksuit_core::stream::LlmResponse;

use crate::registry::ProviderRegistry;
use crate::traits::{ChatRequest, LlmProvider};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Router
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A capability-driven router that selects a provider per role and handles
/// fallback on transient failures.
pub struct LlmRouter {
    registry: ProviderRegistry,
    roles: std::collections::HashMap<String, RoleRouting>,
    default_timeout_ms: u64,
}

impl LlmRouter {
    /// Construct the router from the full providers config.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let registry = ProviderRegistry::from_config(config)?;
        Ok(Self {
            registry,
            roles: config.roles.clone(),
            default_timeout_ms: config.default_timeout_ms,
        })
    }

    /// Build from an already-constructed registry (useful for testing).
    pub fn new(
        registry: ProviderRegistry,
        roles: std::collections::HashMap<String, RoleRouting>,
        default_timeout_ms: u64,
    ) -> Self {
        Self { registry, roles, default_timeout_ms }
    }

    /// Get a reference to the underlying registry.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    // ── Public routing API ─────────────────────────────────────────

    /// Send a chat request for a named role.
    ///
    /// 1. Resolves the primary model from the role's [`RoleRouting`].
    /// 2. Validates that the provider satisfies the role's required
    ///    capabilities.
    /// 3. Sends the request, with a timeout.
    /// 4. On a retriable failure, walks the fallback chain in order.
    pub async fn chat_for_role(&self, role: &str, mut req: ChatRequest) -> Result<LlmResponse> {
        let routing = self
            .roles
            .get(role)
            .ok_or_else(|| EngineError::Config(format!("no role routing configured for '{role}'")))?;

        if let Some((provider, model_name)) = self.registry.resolve_model(&routing.model) {
            if capabilities_satisfy(
                provider.as_ref(),
                routing.require_tools,
                routing.require_json,
                routing.require_streaming,
            ) {
                req.model = model_name.to_string();
                let result = self.try_chat(&provider, req.clone()).await;
                match result {
                    Ok(resp) => return Ok(resp),
                    Err(e) if Self::is_retriable(&e) => {
                        tracing::warn!(
                            model = %routing.model,
                            role = %role,
                            error = %e,
                            "primary model failed, trying fallbacks"
                        );
                    }
                    Err(e) => return Err(e),
                }
            } else {
                tracing::warn!(
                    model = %routing.model,
                    role = %role,
                    "primary model does not satisfy required capabilities, trying fallbacks"
                );
            }
        } else {
            tracing::warn!(model = %routing.model, role = %role, "primary provider not found, trying fallbacks");
        }

        for (idx, fallback) in routing.fallbacks.iter().enumerate() {
            let (provider, model_name) = match self.registry.resolve_model(&fallback.model) {
                Some(p) => p,
                None => {
                    tracing::warn!(model = %fallback.model, "fallback provider not found, skipping");
                    continue;
                }
            };

            if !capabilities_satisfy(provider.as_ref(), fallback.require_tools, fallback.require_json, false) {
                tracing::warn!(model = %fallback.model, "fallback does not satisfy required capabilities, skipping");
                continue;
            }

            req.model = model_name.to_string();
            let result = self.try_chat(&provider, req.clone()).await;
            match result {
                Ok(resp) => return Ok(resp),
                Err(e) if Self::is_retriable(&e) => {
                    tracing::warn!(
                        model = %fallback.model,
                        role = %role,
                        fallback_index = %idx,
                        error = %e,
                        "fallback model failed, trying next"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(EngineError::Provider(format!(
            "all models for role '{role}' failed or were unavailable"
        )))
    }

    // ── Internal helpers ───────────────────────────────────────────

    async fn try_chat(&self, provider: &Arc<dyn LlmProvider>, req: ChatRequest) -> Result<LlmResponse> {
        let timeout = std::time::Duration::from_millis(self.default_timeout_ms);
        match tokio::time::timeout(timeout, provider.chat(req)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Provider(format!(
                "provider '{}' timed out after {}ms",
                provider.provider_id(),
                self.default_timeout_ms
            ))),
        }
    }

    /// Determine if an error is retriable: timeouts and 5xx-like provider errors.
    fn is_retriable(err: &EngineError) -> bool {
        match err {
            EngineError::Provider(message) => {
                message.contains("timed out")
                    || message.contains("HTTP 500")
                    || message.contains("HTTP 502")
                    || message.contains("HTTP 503")
                    || message.contains("HTTP 504")
                    || message.contains("HTTP 529")
            }
            _ => false,
        }
    }
}

fn capabilities_satisfy(
    provider: &dyn LlmProvider,
    require_tools: bool,
    require_json: bool,
    require_streaming: bool,
) -> bool {
    let cap = provider.capabilities();
    if require_tools && cap.supports_tools == ToolSupport::None {
        return false;
    }
    if require_json && !cap.supports_json_mode {
        return false;
    }
    if require_streaming && !cap.supports_streaming {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_errors_match_timeouts_and_5xx() {
        assert!(LlmRouter::is_retriable(&EngineError::Provider("timed out after 30000ms".into())));
        assert!(LlmRouter::is_retriable(&EngineError::Provider("x: HTTP 503 - unavailable".into())));
        assert!(!LlmRouter::is_retriable(&EngineError::Provider("x: HTTP 401 - unauthorized".into())));
        assert!(!LlmRouter::is_retriable(&EngineError::Config("bad config".into())));
    }
}
