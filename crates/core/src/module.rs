//! The module data shape: a TOML-defined bundle of roles, prompts, rules,
//! and classifier wiring that the engine loads by `namespace/name/version`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One role a module exposes (e.g. `assistant`, `critic`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    pub name: String,
    pub temperature: f32,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The prompt fragments a module contributes, keyed by role within each
/// family (`system.<role>`, `primary.<role>`, `adapt.<name>`, `length.<name>`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prompts {
    #[serde(default)]
    pub system: HashMap<String, String>,
    #[serde(default)]
    pub primary: HashMap<String, String>,
    #[serde(default)]
    pub adapt: HashMap<String, String>,
    #[serde(default)]
    pub length: HashMap<String, String>,
}

/// A module's self-declared dependency on a tool the Tool Mediator must be
/// able to discover before the module can run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDependency {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

/// Per-module token budget, read by the Plan Executor's `direct`/`task`
/// calls when the plan itself doesn't override `maxTokens`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensConfig {
    pub default: u32,
}

/// Named classifier wiring: which built-in or registered classifier
/// implementation handles a given dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Classifiers {
    #[serde(default)]
    pub dimensions: HashMap<String, String>,
}

/// A fully-loaded, validated module definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub roles: Vec<RoleConfig>,
    pub prompts: Prompts,
    #[serde(default)]
    pub rules: Vec<crate::rule::Rule>,
    #[serde(default)]
    pub classifiers: Classifiers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_dependencies: Option<Vec<ToolDependency>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokensConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<serde_json::Value>,
}

impl Module {
    /// `<namespace>/<name>/<version>`, the key modules are registered under.
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.name, self.version)
    }

    pub fn role(&self, name: &str) -> Option<&RoleConfig> {
        self.roles.iter().find(|r| r.name == name)
    }

    pub fn default_role(&self) -> Option<&RoleConfig> {
        self.roles.iter().find(|r| r.is_default).or_else(|| self.roles.first())
    }

    /// Eager structural validation, run once at registry construction time
    /// so a malformed module fails fast rather than at first use.
    pub fn validate(&self) -> Result<(), String> {
        if self.roles.is_empty() {
            return Err(format!("module {} declares no roles", self.key()));
        }
        for role in &self.roles {
            if !self.prompts.system.contains_key(&role.name) {
                return Err(format!(
                    "module {} missing system prompt for role {}",
                    self.key(),
                    role.name
                ));
            }
            if !self.prompts.primary.contains_key(&role.name) {
                return Err(format!(
                    "module {} missing primary prompt for role {}",
                    self.key(),
                    role.name
                ));
            }
        }
        if self.roles.iter().filter(|r| r.is_default).count() > 1 {
            return Err(format!("module {} declares more than one default role", self.key()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_module() -> Module {
        let mut system = HashMap::new();
        system.insert("assistant".to_string(), "be helpful".to_string());
        let mut primary = HashMap::new();
        primary.insert("assistant".to_string(), "{{thread}}".to_string());
        Module {
            namespace: "thinksuit".into(),
            name: "core-chat".into(),
            version: "1".into(),
            roles: vec![RoleConfig {
                name: "assistant".into(),
                temperature: 0.7,
                is_default: true,
                description: None,
            }],
            prompts: Prompts {
                system,
                primary,
                adapt: HashMap::new(),
                length: HashMap::new(),
            },
            rules: vec![],
            classifiers: Classifiers::default(),
            tool_dependencies: None,
            tokens: None,
            presets: None,
            frames: None,
        }
    }

    #[test]
    fn valid_module_passes() {
        assert!(valid_module().validate().is_ok());
    }

    #[test]
    fn missing_prompt_fails_validation() {
        let mut module = valid_module();
        module.prompts.primary.clear();
        assert!(module.validate().is_err());
    }

    #[test]
    fn key_is_slash_joined() {
        assert_eq!(valid_module().key(), "thinksuit/core-chat/1");
    }
}
