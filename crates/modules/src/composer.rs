//! Instruction Composer: turns a plan, a module's prompts, and the role
//! being executed into the `systemInstructions` + final user message a
//! provider call needs. Side-effect-free.

use thinksuit_core::error::{EngineError, Result};
use thinksuit_core::module::Module;
use thinksuit_core::thread::{Role, Thread};

/// The composed output of one role's instruction assembly.
#[derive(Debug, Clone)]
pub struct ComposedInstructions {
    pub system_instructions: String,
    pub user_message: String,
}

/// Compose instructions for `role`, applying `adaptations` in order.
///
/// Each adaptation name is looked up first in `prompts.adapt`, then in
/// `prompts.length`, and appended to the system prompt if found; an
/// adaptation naming neither is logged and skipped rather than failing
/// the turn. The primary prompt template is applied to the thread's
/// last user turn via a `{{thread}}` substitution; templates without the
/// placeholder have the turn appended instead.
pub fn compose(module: &Module, role: &str, adaptations: &[String], thread: &Thread) -> Result<ComposedInstructions> {
    let system_template = module
        .prompts
        .system
        .get(role)
        .ok_or_else(|| EngineError::Module(format!("module {} has no system prompt for role '{role}'", module.key())))?;

    let mut system_instructions = system_template.clone();
    for name in adaptations {
        if let Some(fragment) = module.prompts.adapt.get(name).or_else(|| module.prompts.length.get(name)) {
            system_instructions.push_str("\n\n");
            system_instructions.push_str(fragment);
        } else {
            tracing::warn!(adaptation = %name, module = %module.key(), "unknown adaptation fragment, skipping");
        }
    }

    let primary_template = module
        .prompts
        .primary
        .get(role)
        .ok_or_else(|| EngineError::Module(format!("module {} has no primary prompt for role '{role}'", module.key())))?;

    let user_message = render_primary(primary_template, thread);

    Ok(ComposedInstructions { system_instructions, user_message })
}

/// Substitute `{{thread}}` with the last user turn's content, or append
/// the turn if the template doesn't reference it.
fn render_primary(template: &str, thread: &Thread) -> String {
    let tail = thread
        .messages()
        .iter()
        .rev()
        .find(|m| matches!(m.role, Role::User))
        .map(|m| m.content.as_str())
        .unwrap_or("");

    if template.contains("{{thread}}") {
        template.replace("{{thread}}", tail)
    } else if template.is_empty() {
        tail.to_string()
    } else {
        format!("{template}\n\n{tail}")
    }
}
