//! Integration tests for role routing: fallback-chain walking when the
//! primary provider entry has no auth configured, and capability rejection.

use std::collections::HashMap;

use thinksuit_core::config::{ProviderEntry, ProviderKind, ProvidersConfig, RoleFallback, RoleRouting};
use thinksuit_providers::LlmRouter;

fn providers_config_with_missing_auth() -> ProvidersConfig {
    let mut entries = HashMap::new();
    entries.insert(
        "openai".to_string(),
        ProviderEntry {
            kind: ProviderKind::OpenaiCompat,
            api_key_env: Some("THINKSUIT_ROUTER_TEST_MISSING_KEY".into()),
            base_url: None,
            max_retries: 3,
            timeout_ms: 5_000,
        },
    );
    entries.insert(
        "anthropic".to_string(),
        ProviderEntry {
            kind: ProviderKind::Anthropic,
            api_key_env: Some("THINKSUIT_ROUTER_TEST_MISSING_KEY_2".into()),
            base_url: None,
            max_retries: 3,
            timeout_ms: 5_000,
        },
    );

    let mut roles = HashMap::new();
    roles.insert(
        "executor".to_string(),
        RoleRouting {
            model: "openai/gpt-4o-mini".into(),
            fallbacks: vec![RoleFallback {
                model: "anthropic/claude-sonnet-4-20250514".into(),
                require_tools: false,
                require_json: false,
            }],
            require_tools: false,
            require_json: false,
            require_streaming: false,
        },
    );

    ProvidersConfig {
        entries,
        roles,
        startup_policy: thinksuit_core::config::LlmStartupPolicy::AllowNone,
        default_timeout_ms: 5_000,
    }
}

#[test]
fn providers_with_unset_env_keys_fail_init_but_registry_still_builds() {
    let cfg = providers_config_with_missing_auth();
    let router = LlmRouter::from_config(&cfg).unwrap();
    // Both entries fail init (missing env vars), so neither is registered,
    // but allow_none means construction still succeeds.
    assert!(router.registry().is_empty());
    assert_eq!(router.registry().init_errors().len(), 2);
}

#[tokio::test]
async fn chat_for_role_with_unknown_role_is_a_config_error() {
    let cfg = providers_config_with_missing_auth();
    let router = LlmRouter::from_config(&cfg).unwrap();

    let thread = thinksuit_core::thread::Thread(vec![thinksuit_core::thread::Message::user("hi")]);
    let req = thinksuit_providers::ChatRequest::new(
        "placeholder",
        thread,
        thinksuit_core::context::CancelToken::new(),
    );

    let err = router.chat_for_role("no-such-role", req).await.unwrap_err();
    assert_eq!(err.code(), "E_CONFIG");
}

#[tokio::test]
async fn chat_for_role_with_no_eligible_provider_falls_through_to_provider_error() {
    let cfg = providers_config_with_missing_auth();
    let router = LlmRouter::from_config(&cfg).unwrap();

    let thread = thinksuit_core::thread::Thread(vec![thinksuit_core::thread::Message::user("hi")]);
    let req = thinksuit_providers::ChatRequest::new(
        "placeholder",
        thread,
        thinksuit_core::context::CancelToken::new(),
    );

    // Neither primary nor fallback provider was registered (auth missing),
    // so the router exhausts the chain and reports a provider error.
    let err = router.chat_for_role("executor", req).await.unwrap_err();
    assert_eq!(err.code(), "E_PROVIDER");
}
