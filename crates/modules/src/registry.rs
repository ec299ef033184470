//! Loads modules from a directory of TOML documents and resolves them by
//! key. One `module.toml` per `<namespace>/<name>/<version>` directory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use thinksuit_core::error::{EngineError, Result};
use thinksuit_core::module::Module;

/// Holds every loaded module, keyed by its full `namespace/name/version`.
///
/// Validation happens once here, at construction, so a malformed module
/// fails fast instead of surfacing mid-turn.
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<Module>>,
}

impl ModuleRegistry {
    /// An empty registry with just the built-in `thinksuit/core-chat` module.
    pub fn with_builtin() -> Self {
        let mut registry = Self { modules: HashMap::new() };
        registry
            .register(crate::builtin::core_chat_module())
            .expect("built-in module must be valid");
        registry
    }

    /// Load every `module.toml` found under `root`, laid out as
    /// `root/<namespace>/<name>/<version>/module.toml`, in addition to the
    /// built-in module.
    pub fn from_dir(root: &Path) -> Result<Self> {
        let mut registry = Self::with_builtin();
        if !root.exists() {
            return Ok(registry);
        }

        for namespace_entry in read_subdirs(root)? {
            for name_entry in read_subdirs(&namespace_entry)? {
                for version_entry in read_subdirs(&name_entry)? {
                    let toml_path = version_entry.join("module.toml");
                    if !toml_path.exists() {
                        continue;
                    }
                    let module = load_module(&toml_path)?;
                    tracing::info!(module = %module.key(), path = %toml_path.display(), "loaded module");
                    registry.register(module)?;
                }
            }
        }

        Ok(registry)
    }

    /// Validate and insert a module, keyed by its full `key()`.
    pub fn register(&mut self, module: Module) -> Result<()> {
        module.validate().map_err(EngineError::Module)?;
        self.modules.insert(module.key(), Arc::new(module));
        Ok(())
    }

    /// Exact lookup by `namespace/name/version`.
    pub fn get(&self, key: &str) -> Option<Arc<Module>> {
        self.modules.get(key).cloned()
    }

    /// Resolve by `namespace/name`, picking the lexicographically highest
    /// version among matches (module versions are plain strings; this
    /// registry does not parse semver).
    pub fn resolve(&self, namespace_name: &str) -> Option<Arc<Module>> {
        let prefix = format!("{namespace_name}/");
        self.modules
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, module)| module.clone())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Sorted list of every registered module's full key.
    pub fn list_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.modules.keys().cloned().collect();
        keys.sort();
        keys
    }
}

fn load_module(path: &Path) -> Result<Module> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| EngineError::Module(format!("{}: {e}", path.display())))
}

/// Immediate subdirectories of `dir`, sorted for deterministic load order.
fn read_subdirs(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_builtin_contains_core_chat() {
        let registry = ModuleRegistry::with_builtin();
        assert!(registry.resolve("thinksuit/core-chat").is_some());
    }

    #[test]
    fn from_dir_loads_nested_module_toml() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("acme").join("greeter").join("1.0.0");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(
            module_dir.join("module.toml"),
            r#"
namespace = "acme"
name = "greeter"
version = "1.0.0"

[[roles]]
name = "assistant"
temperature = 0.5
is_default = true

[prompts.system]
assistant = "be nice"

[prompts.primary]
assistant = "{{thread}}"
"#,
        )
        .unwrap();

        let registry = ModuleRegistry::from_dir(dir.path()).unwrap();
        assert!(registry.get("acme/greeter/1.0.0").is_some());
        // built-in module is still present alongside the loaded one.
        assert!(registry.resolve("thinksuit/core-chat").is_some());
    }

    #[test]
    fn from_dir_missing_root_yields_builtin_only() {
        let registry = ModuleRegistry::from_dir(Path::new("/does/not/exist")).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_picks_highest_version_string() {
        let mut registry = ModuleRegistry { modules: HashMap::new() };
        for version in ["1.0.0", "2.0.0", "1.5.0"] {
            let mut module = crate::builtin::core_chat_module();
            module.version = version.to_string();
            registry.register(module).unwrap();
        }
        let resolved = registry.resolve("thinksuit/core-chat").unwrap();
        assert_eq!(resolved.version, "2.0.0");
    }

    #[test]
    fn invalid_module_is_rejected() {
        let mut registry = ModuleRegistry { modules: HashMap::new() };
        let mut module = crate::builtin::core_chat_module();
        module.roles.clear();
        assert!(registry.register(module).is_err());
    }
}
