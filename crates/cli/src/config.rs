//! Layered configuration resolution: CLI args → `~/.thinksuit.json` →
//! `THINKSUIT_*` environment variables → built-in defaults.
//!
//! This is the one place that actually sees CLI args and the process
//! environment; everything below `thinksuit-engine` only ever sees the
//! resolved [`Config`].

use std::path::PathBuf;

use anyhow::Context;
use thinksuit_core::config::Config;

/// The fully-resolved configuration plus the two paths it was loaded
/// relative to, so subcommands can report where settings came from.
pub struct ResolvedConfig {
    pub config: Config,
    pub home: PathBuf,
    pub config_path: PathBuf,
}

pub fn load(cli_config_path: Option<String>, cli_home: Option<String>) -> anyhow::Result<ResolvedConfig> {
    let config_path = cli_config_path
        .map(PathBuf::from)
        .or_else(|| std::env::var("THINKSUIT_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(default_config_path);

    let mut config = if config_path.exists() {
        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", config_path.display()))?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    let home = cli_home
        .map(PathBuf::from)
        .or_else(|| std::env::var("THINKSUIT_HOME").ok().map(PathBuf::from))
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(ResolvedConfig { config, home, config_path })
}

fn default_config_path() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".thinksuit.json")
}

fn apply_env_overrides(config: &mut Config) {
    if let Some(n) = env_usize("THINKSUIT_MAX_FANOUT") {
        config.resources.max_fanout = n;
    }
    if let Some(n) = env_u32("THINKSUIT_MAX_DEPTH") {
        config.resources.max_depth = n;
    }
    if let Some(n) = env_usize("THINKSUIT_MAX_CHILDREN") {
        config.resources.max_children = n;
    }
    if let Some(n) = env_u64("THINKSUIT_APPROVAL_TIMEOUT_MS") {
        config.tools.approval_timeout_ms = n;
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
