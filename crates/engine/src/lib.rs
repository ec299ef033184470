//! The ThinkSuit orchestration engine: wires the Tool Mediator (C7), the
//! State Machine Interpreter (C9), the Plan Executor (C8), the Approval
//! Registry (C12), and the Session Scheduler (C10) into one runnable
//! whole over a loaded module and config.
//!
//! Everything above this crate (the CLI, a future server front end) talks
//! to a [`Scheduler`] and never touches the chart, handlers, or mediator
//! directly.

pub mod approval;
pub mod chart;
pub mod mediator;
pub mod scheduler;
pub mod turn;

use std::collections::HashMap;
use std::sync::Arc;

use thinksuit_core::config::{Config, PerceptionProfile};
use thinksuit_core::entry::{Entry, Event};
use thinksuit_core::error::{EngineError, Result};
use thinksuit_core::module::Module;
use thinksuit_core::{DimensionPolicy, PathService};
use thinksuit_journal::Journal;
use thinksuit_mcp::McpManager;
use thinksuit_modules::{Classifier, ClassifierRegistry, Profile};
use thinksuit_providers::LlmRouter;

/// Session id used for journal entries emitted before any real session
/// exists, such as MCP server startup.
const SYSTEM_SESSION_ID: &str = "system";

pub use approval::ApprovalRegistry;
pub use chart::{Interpreter, TaskHandler};
pub use mediator::Mediator;
pub use scheduler::{ScheduleRequest, Scheduled, Scheduler, SessionMetadata};
pub use turn::{TurnServices, TurnState};

/// Assembles a [`Scheduler`] for one module over one home directory.
///
/// This is the one place production code (the CLI) and tests both go to
/// get a fully wired engine instead of hand-assembling `TurnServices`
/// themselves; `Scheduler::new`'s constituent parts stay public for
/// anyone who needs to substitute a piece (a fake `Mediator` in tests, a
/// different `Classifier`).
pub struct EngineBuilder {
    config: Config,
    module: Module,
    home: std::path::PathBuf,
}

impl EngineBuilder {
    pub fn new(config: Config, module: Module, home: std::path::PathBuf) -> Self {
        Self { config, module, home }
    }

    /// Start every configured MCP server (plus the always-on filesystem
    /// server), build the router and mediator over them, validate the
    /// module's declared tool dependencies, and return a `Scheduler`
    /// ready to accept turns.
    pub async fn build(self) -> Result<Scheduler> {
        let config = Arc::new(self.config);
        let module = Arc::new(self.module);

        let paths = PathService::new(self.home);
        let journal = Arc::new(Journal::new(paths.clone()));

        let router = Arc::new(LlmRouter::from_config(&config.providers)?);

        let manager = McpManager::from_config(&config.mcp).await;
        journal
            .append(
                SYSTEM_SESSION_ID,
                Entry::new(SYSTEM_SESSION_ID, Event::McpStartup, "startup").with_data(serde_json::json!({
                    "servers": manager.server_count(),
                    "tools": manager.tool_count(),
                })),
            )
            .ok();

        let mediator = Mediator::new(manager, config.tools.policy.clone());
        validate_tool_dependencies(&module, &mediator)?;
        let mediator = Arc::new(mediator);

        let classifier: Arc<dyn Classifier> = ClassifierRegistry::with_builtin().for_module(&module);
        let approvals = Arc::new(ApprovalRegistry::new(config.tools.approval_timeout_ms));

        let dimension_policies: HashMap<String, DimensionPolicy> = config
            .resources
            .perception
            .dimensions
            .iter()
            .map(|(dim, policy)| {
                (dim.clone(), DimensionPolicy { enabled: policy.enabled, min_confidence: policy.min_confidence })
            })
            .collect();
        let profile = config.resources.perception.profile.map(|p| match p {
            PerceptionProfile::Fast => Profile::Fast,
            PerceptionProfile::Balanced => Profile::Balanced,
            PerceptionProfile::Thorough => Profile::Thorough,
        });

        let services = Arc::new(TurnServices {
            router,
            mediator,
            approvals,
            classifier,
            dimension_policies,
            profile,
            budget_ms: config.resources.perception.budget_ms,
            max_depth: config.resources.max_depth,
            max_fanout: config.resources.max_fanout,
            max_children: config.resources.max_children,
            auto_approve: config.tools.auto_approve.clone(),
        });

        let interpreter = turn::build_interpreter();

        Ok(Scheduler::new(journal, paths, interpreter, services, config, module))
    }
}

/// A module's declared `toolDependencies` must all be discoverable (after
/// policy filtering) before the engine will serve turns for it — a
/// misconfigured server or an overly strict deny policy fails fast at
/// startup instead of surfacing as a confusing tool-call failure mid-turn.
fn validate_tool_dependencies(module: &Module, mediator: &Mediator) -> Result<()> {
    let Some(deps) = &module.tool_dependencies else { return Ok(()) };
    let discovered = mediator.discover_tools();

    let missing: Vec<&str> = deps
        .iter()
        .filter(|dep| dep.required)
        .filter(|dep| {
            !discovered.iter().any(|handle| {
                handle.name == dep.name || handle.name.rsplit(':').next() == Some(dep.name.as_str())
            })
        })
        .map(|dep| dep.name.as_str())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Module(format!(
            "module {} declares unmet tool dependencies: {}",
            module.key(),
            missing.join(", ")
        )))
    }
}
