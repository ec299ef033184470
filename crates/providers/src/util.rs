//! Shared utility functions for provider adapters.

use thinksuit_core::error::EngineError;

/// Convert a [`reqwest::Error`] into the domain [`EngineError`] type.
pub(crate) fn from_reqwest(e: reqwest::Error) -> EngineError {
    EngineError::Provider(e.to_string())
}

/// Resolve the API key for a provider entry from its configured environment
/// variable. Returns an error if the entry names no variable, or the
/// variable is unset.
pub fn resolve_api_key(api_key_env: Option<&str>) -> Result<String, EngineError> {
    let env_var = api_key_env.ok_or_else(|| {
        EngineError::Config("provider entry has no api_key_env configured".into())
    })?;

    std::env::var(env_var).map_err(|_| {
        EngineError::Config(format!(
            "environment variable '{env_var}' not set or not valid UTF-8"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_key_reads_env_var() {
        let var_name = "THINKSUIT_TEST_RESOLVE_ENV_KEY_1234";
        std::env::set_var(var_name, "env-secret-value");
        let result = resolve_api_key(Some(var_name)).unwrap();
        assert_eq!(result, "env-secret-value");
        std::env::remove_var(var_name);
    }

    #[test]
    fn resolve_api_key_missing_env_var() {
        let err = resolve_api_key(Some("THINKSUIT_TEST_NONEXISTENT_VAR_8888")).unwrap_err();
        assert!(err.to_string().contains("THINKSUIT_TEST_NONEXISTENT_VAR_8888"));
    }

    #[test]
    fn resolve_api_key_no_config() {
        let err = resolve_api_key(None).unwrap_err();
        assert!(err.to_string().contains("no api_key_env"));
    }
}
