//! The `thinksuit/core-chat` module that ships with the binary, so the
//! engine is runnable with zero external module configuration.

use std::collections::HashMap;

use thinksuit_core::fact::Fact;
use thinksuit_core::module::{Classifiers, Module, Prompts, RoleConfig};
use thinksuit_core::plan::ExecutionPlan;
use thinksuit_core::rule::{Condition, Rule};

/// Build a fresh instance of the built-in chat module. Cheap enough to
/// call on every registry construction rather than caching a singleton.
pub fn core_chat_module() -> Module {
    let mut system = HashMap::new();
    system.insert(
        "assistant".to_string(),
        "You are a helpful, direct assistant. Answer the user's request as clearly as possible.".to_string(),
    );

    let mut primary = HashMap::new();
    primary.insert("assistant".to_string(), "{{thread}}".to_string());

    let mut length = HashMap::new();
    length.insert("brief".to_string(), "Keep the response to two or three sentences.".to_string());
    length.insert("thorough".to_string(), "Give a complete answer; don't truncate for brevity.".to_string());

    let mut dimensions = HashMap::new();
    dimensions.insert("task".to_string(), "builtin/keyword".to_string());
    dimensions.insert("tone".to_string(), "builtin/keyword".to_string());

    Module {
        namespace: "thinksuit".into(),
        name: "core-chat".into(),
        version: "1".into(),
        roles: vec![RoleConfig {
            name: "assistant".into(),
            temperature: 0.7,
            is_default: true,
            description: Some("General-purpose conversational role.".into()),
        }],
        prompts: Prompts { system, primary, adapt: HashMap::new(), length },
        rules: vec![tool_request_rule(), direct_reply_fallback_rule()],
        classifiers: Classifiers { dimensions },
        tool_dependencies: None,
        tokens: None,
        presets: None,
        frames: None,
    }
}

/// When the classifier flags an explicit tool request, prefer a `task`
/// plan so the turn can actually call tools.
fn tool_request_rule() -> Rule {
    Rule {
        name: "tool-request-implies-task".into(),
        condition: Condition::HasFact {
            fact_type: "signal".into(),
            dimension: Some("task".into()),
            signal: Some("tool_request".into()),
        },
        confidence: 0.75,
        emits_facts: Vec::<Fact>::new(),
        emits_plan: Some(ExecutionPlan::Task {
            name: "core-chat/task".into(),
            role: "assistant".into(),
            tools: Vec::new(),
            adaptations: Vec::new(),
            resolution: None,
        }),
    }
}

/// Always satisfied (vacuous `All` over zero conditions), so there is
/// always at least one candidate plan: a direct reply.
fn direct_reply_fallback_rule() -> Rule {
    Rule {
        name: "default-direct-reply".into(),
        condition: Condition::All { conditions: Vec::new() },
        confidence: 0.3,
        emits_facts: Vec::new(),
        emits_plan: Some(ExecutionPlan::Direct {
            name: "core-chat/direct".into(),
            role: "assistant".into(),
            adaptations: Vec::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_chat_module_is_valid() {
        assert!(core_chat_module().validate().is_ok());
    }

    #[test]
    fn fallback_rule_always_fires() {
        let module = core_chat_module();
        let candidates = crate::signals::evaluate_rules(&[], &module);
        assert!(candidates.iter().any(|c| c.plan.name() == "core-chat/direct"));
    }

    #[test]
    fn tool_request_outranks_fallback_when_present() {
        let module = core_chat_module();
        let facts = vec![Fact {
            fact_type: "signal".into(),
            dimension: Some("task".into()),
            signal: Some("tool_request".into()),
            name: None,
            confidence: 0.75,
        }];
        let candidates = crate::signals::evaluate_rules(&facts, &module);
        let winner = thinksuit_core::plan::select_plan(candidates).unwrap();
        assert_eq!(winner.name(), "core-chat/task");
    }
}
