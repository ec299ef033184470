//! `thinksuit module validate` — run the Module Registry's structural
//! validation against a single `module.toml` in isolation, without
//! loading it into a running engine.

use thinksuit_core::module::Module;

pub fn validate(path: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    let module: Module = toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))?;

    match module.validate() {
        Ok(()) => {
            println!("{} is valid", module.key());
            Ok(())
        }
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    }
}
