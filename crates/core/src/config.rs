//! The layered `Configuration` type: CLI args → `~/.thinksuit.json` →
//! env vars → built-in defaults. This module only defines the shape and
//! its defaults; the layering/merge itself lives in `thinksuit-cli`, the
//! one place that actually sees CLI args and the process environment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ─── Journal ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default = "d_home_thinksuit")]
    pub base_dir: String,
    #[serde(default = "d_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            base_dir: d_home_thinksuit(),
            heartbeat_ms: d_heartbeat_ms(),
        }
    }
}

fn d_home_thinksuit() -> String {
    dirs::home_dir()
        .map(|h| h.join(".thinksuit").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".thinksuit".to_string())
}

fn d_heartbeat_ms() -> u64 {
    30_000
}

// ─── Providers ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub entries: HashMap<String, ProviderEntry>,
    /// Per-role routing: which `provider_id/model` to call, and the
    /// fallback chain to walk if the primary is missing or fails.
    #[serde(default)]
    pub roles: HashMap<String, RoleRouting>,
    #[serde(default = "d_startup_policy")]
    pub startup_policy: LlmStartupPolicy,
    #[serde(default = "d_30000")]
    pub default_timeout_ms: u64,
}

fn d_startup_policy() -> LlmStartupPolicy {
    LlmStartupPolicy::AllowNone
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmStartupPolicy {
    /// Start with zero configured providers; fail lazily when a role has
    /// no eligible candidate at call time.
    AllowNone,
    /// Refuse to start unless at least one provider initialized.
    RequireOne,
}

/// Which wire protocol a configured provider entry speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenaiCompat,
    Anthropic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "d_3")]
    pub max_retries: u32,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
}

fn d_3() -> u32 {
    3
}

fn d_30000() -> u64 {
    30_000
}

/// How a role resolves to a concrete model, with a fallback chain for
/// when the primary is unavailable or fails with a retriable error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRouting {
    /// `"provider_id/model_name"`.
    pub model: String,
    #[serde(default)]
    pub fallbacks: Vec<RoleFallback>,
    #[serde(default)]
    pub require_tools: bool,
    #[serde(default)]
    pub require_json: bool,
    #[serde(default)]
    pub require_streaming: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleFallback {
    /// `"provider_id/model_name"`.
    pub model: String,
    #[serde(default)]
    pub require_tools: bool,
    #[serde(default)]
    pub require_json: bool,
}

// ─── MCP ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpConfig {
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
    /// Directories the baked-in filesystem server is allowed to touch.
    /// Always merged into the server list ahead of `servers` at startup,
    /// even when this is empty.
    #[serde(default)]
    pub allowed_directories: Vec<String>,
}

impl McpConfig {
    /// The server list actually started at startup: the baked-in
    /// filesystem server, ahead of whatever the user configured under
    /// `servers`. The filesystem server's id (`filesystem`) can still be
    /// shadowed by an explicit entry of the same id further down the
    /// list, since `McpManager` keys servers by id and later entries win.
    pub fn effective_servers(&self) -> Vec<McpServerConfig> {
        let dirs = if self.allowed_directories.is_empty() {
            vec![".".to_string()]
        } else {
            self.allowed_directories.clone()
        };
        let mut args = vec!["-y".to_string(), "@modelcontextprotocol/server-filesystem@latest".to_string()];
        args.extend(dirs);

        let filesystem = McpServerConfig {
            id: "filesystem".into(),
            command: "npx".into(),
            args,
            transport: McpTransportKind::Stdio,
            url: None,
            env: HashMap::new(),
        };

        let mut servers = vec![filesystem];
        servers.extend(self.servers.clone());
        servers
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Identifier used in tool naming: `mcp:{id}:{tool}`.
    pub id: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub transport: McpTransportKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum McpTransportKind {
    #[default]
    Stdio,
    Sse,
}

// ─── Tools ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub policy: ToolPolicy,
    /// Tools that bypass the approval gate entirely.
    #[serde(default)]
    pub auto_approve: Vec<String>,
    #[serde(default = "d_approval_timeout_ms")]
    pub approval_timeout_ms: u64,
}

fn d_approval_timeout_ms() -> u64 {
    30_000
}

/// Allow/deny prefix matching over tool names. Deny always wins over
/// allow; an empty (or `["*"]`) allow list means unrestricted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolPolicy {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

impl ToolPolicy {
    /// Matching is case-insensitive; a policy entry matches a tool name
    /// exactly or as a `.`-delimited prefix.
    pub fn allows(&self, tool_name: &str) -> bool {
        let name = tool_name.to_ascii_lowercase();

        for d in &self.deny {
            let d_lower = d.to_ascii_lowercase();
            if d_lower == "*" || name == d_lower || name.starts_with(&format!("{d_lower}.")) {
                return false;
            }
        }
        if self.allow.is_empty() || self.allow.iter().any(|a| a == "*") {
            return true;
        }
        for a in &self.allow {
            let a_lower = a.to_ascii_lowercase();
            if name == a_lower || name.starts_with(&format!("{a_lower}.")) {
                return true;
            }
        }
        false
    }
}

// ─── Resources ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default = "d_max_fanout")]
    pub max_fanout: usize,
    #[serde(default = "d_max_depth")]
    pub max_depth: u32,
    /// Cumulative cap on children spawned across a turn's whole recursive
    /// tree, not just one node's immediate fanout.
    #[serde(default = "d_max_children")]
    pub max_children: usize,
    #[serde(default)]
    pub perception: PerceptionConfig,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            max_fanout: d_max_fanout(),
            max_depth: d_max_depth(),
            max_children: d_max_children(),
            perception: PerceptionConfig::default(),
        }
    }
}

fn d_max_fanout() -> usize {
    8
}

fn d_max_depth() -> u32 {
    4
}

fn d_max_children() -> usize {
    50
}

/// How much signal-detection budget a turn gets, and which dimensions are
/// enabled/thresholded. Mirrors `thinksuit_modules::signals::Profile` in
/// shape, without `thinksuit-core` taking a dependency on that crate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PerceptionConfig {
    #[serde(default)]
    pub profile: Option<PerceptionProfile>,
    #[serde(default)]
    pub budget_ms: Option<u64>,
    #[serde(default)]
    pub dimensions: HashMap<String, DimensionPolicyConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerceptionProfile {
    Fast,
    Balanced,
    Thorough,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionPolicyConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default)]
    pub min_confidence: f64,
}

impl Default for DimensionPolicyConfig {
    fn default() -> Self {
        Self { enabled: true, min_confidence: 0.0 }
    }
}

fn d_true() -> bool {
    true
}

// ─── Logging ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "d_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: d_log_level(),
            json: false,
        }
    }
}

fn d_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_has_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.resources.max_fanout, 8);
        assert_eq!(cfg.tools.approval_timeout_ms, 30_000);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn deny_wins_over_allow() {
        let policy = ToolPolicy {
            allow: vec!["fs".into()],
            deny: vec!["fs.delete".into()],
        };
        assert!(policy.allows("fs.read"));
        assert!(!policy.allows("fs.delete"));
    }

    #[test]
    fn allows_is_case_insensitive() {
        let policy = ToolPolicy {
            allow: vec!["FS".into()],
            deny: vec![],
        };
        assert!(policy.allows("fs.read"));
    }

    #[test]
    fn wildcard_deny_blocks_everything() {
        let policy = ToolPolicy {
            allow: vec!["*".into()],
            deny: vec!["*".into()],
        };
        assert!(!policy.allows("anything"));
    }

    #[test]
    fn mcp_server_config_deserializes_with_defaults() {
        let raw = r#"{ "id": "filesystem", "command": "npx", "args": ["-y"] }"#;
        let cfg: McpServerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.transport, McpTransportKind::Stdio);
        assert_eq!(cfg.id, "filesystem");
    }

    #[test]
    fn role_routing_deserializes_with_fallback() {
        let raw = r#"{
            "model": "anthropic/claude-sonnet",
            "fallbacks": [{ "model": "openai/gpt-4o-mini", "require_tools": true }],
            "require_tools": true
        }"#;
        let routing: RoleRouting = serde_json::from_str(raw).unwrap();
        assert_eq!(routing.model, "anthropic/claude-sonnet");
        assert_eq!(routing.fallbacks.len(), 1);
        assert!(routing.fallbacks[0].require_tools);
    }

    #[test]
    fn provider_entry_requires_kind() {
        let raw = r#"{ "kind": "openai_compat", "api_key_env": "OPENAI_API_KEY" }"#;
        let entry: ProviderEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.kind, ProviderKind::OpenaiCompat);
        assert_eq!(entry.max_retries, 3);
    }
}
