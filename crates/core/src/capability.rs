//! Model capability advertisement, used by the provider router to pick a
//! concrete `{provider, model}` pair for a module-defined role.

use serde::{Deserialize, Serialize};

/// Capabilities a `{provider, model}` pair advertises. The router selects
/// models by capability, never by provider name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCapabilities {
    pub supports_tools: ToolSupport,
    pub supports_streaming: bool,
    pub supports_json_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for LlmCapabilities {
    fn default() -> Self {
        Self {
            supports_tools: ToolSupport::None,
            supports_streaming: false,
            supports_json_mode: false,
            context_window_tokens: None,
            max_output_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSupport {
    None,
    Basic,
    StrictJson,
}

/// A candidate `{provider, model}` the router can pick for a role, along
/// with the capabilities that determine whether it's eligible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub provider: String,
    pub model: String,
    pub capabilities: LlmCapabilities,
}

/// What a role requires of a candidate. Modules only name roles as plain
/// strings (`roles[].name`); the router resolves each named role to a
/// candidate whose capabilities satisfy these requirements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleRequirements {
    #[serde(default)]
    pub needs_tools: bool,
    #[serde(default)]
    pub needs_json_mode: bool,
    #[serde(default)]
    pub min_context_window_tokens: Option<u32>,
}

impl RoleRequirements {
    pub fn is_satisfied_by(&self, caps: &LlmCapabilities) -> bool {
        if self.needs_tools && caps.supports_tools == ToolSupport::None {
            return false;
        }
        if self.needs_json_mode && !caps.supports_json_mode {
            return false;
        }
        if let Some(min) = self.min_context_window_tokens {
            if caps.context_window_tokens.unwrap_or(0) < min {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_reject_candidates_without_tools() {
        let reqs = RoleRequirements {
            needs_tools: true,
            ..Default::default()
        };
        let caps = LlmCapabilities::default();
        assert!(!reqs.is_satisfied_by(&caps));
    }

    #[test]
    fn requirements_accept_satisfying_candidate() {
        let reqs = RoleRequirements {
            needs_tools: true,
            ..Default::default()
        };
        let caps = LlmCapabilities {
            supports_tools: ToolSupport::Basic,
            ..Default::default()
        };
        assert!(reqs.is_satisfied_by(&caps));
    }
}
