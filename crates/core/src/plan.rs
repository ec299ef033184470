//! Execution plans: the tagged shape `selectPlan` produces and the Plan
//! Executor consumes.

use serde::{Deserialize, Serialize};

/// How a branch's results combine when more than one runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStrategy {
    Last,
    Concat,
}

/// Per-cycle/token/call/time caps applied to the `task` strategy's
/// tool-calling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_max_cycles() -> u32 {
    8
}
fn default_max_tokens() -> u64 {
    32_000
}
fn default_max_tool_calls() -> u32 {
    16
}
fn default_timeout_ms() -> u64 {
    120_000
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            max_cycles: default_max_cycles(),
            max_tokens: default_max_tokens(),
            max_tool_calls: default_max_tool_calls(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// A single step within a `sequential` or `parallel` plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub role: String,
    pub strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adaptations: Vec<String>,
}

/// A plan the Plan Executor can run. The shape matches the tag: each
/// variant carries exactly the fields its strategy uses, so a malformed
/// plan (e.g. a `direct` plan with a `sequence`) is a deserialization
/// error rather than a runtime surprise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum ExecutionPlan {
    Direct {
        name: String,
        role: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        adaptations: Vec<String>,
    },
    Task {
        name: String,
        role: String,
        tools: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        adaptations: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resolution: Option<Resolution>,
    },
    Sequential {
        name: String,
        sequence: Vec<Step>,
        result_strategy: ResultStrategy,
        build_thread: bool,
    },
    Parallel {
        name: String,
        roles: Vec<Step>,
        result_strategy: ResultStrategy,
    },
}

impl ExecutionPlan {
    pub fn name(&self) -> &str {
        match self {
            ExecutionPlan::Direct { name, .. }
            | ExecutionPlan::Task { name, .. }
            | ExecutionPlan::Sequential { name, .. }
            | ExecutionPlan::Parallel { name, .. } => name,
        }
    }

    /// Strategy priority used as a tiebreaker in `selectPlan`: simpler
    /// strategies win ties (`direct < task < sequential < parallel`).
    pub fn priority(&self) -> u8 {
        match self {
            ExecutionPlan::Direct { .. } => 0,
            ExecutionPlan::Task { .. } => 1,
            ExecutionPlan::Sequential { .. } => 2,
            ExecutionPlan::Parallel { .. } => 3,
        }
    }

    /// The fanout this plan would require, used to enforce `maxFanout`.
    pub fn fanout(&self) -> usize {
        match self {
            ExecutionPlan::Parallel { roles, .. } => roles.len(),
            _ => 1,
        }
    }
}

/// A scored candidate plan produced by rule evaluation, before
/// `selectPlan` picks a winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub plan: ExecutionPlan,
    pub confidence: f64,
    pub rule_order: u32,
}

/// Highest confidence wins; ties broken by rule order, then strategy
/// priority (prefer the simpler strategy).
pub fn select_plan(candidates: Vec<Candidate>) -> Option<ExecutionPlan> {
    candidates
        .into_iter()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.rule_order.cmp(&a.rule_order))
                .then(b.plan.priority().cmp(&a.plan.priority()))
        })
        .map(|c| c.plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(name: &str) -> ExecutionPlan {
        ExecutionPlan::Direct {
            name: name.into(),
            role: "assistant".into(),
            adaptations: vec![],
        }
    }

    #[test]
    fn shape_matches_tag_on_deserialize() {
        let json = serde_json::json!({
            "strategy": "direct",
            "name": "p1",
            "role": "assistant"
        });
        let plan: ExecutionPlan = serde_json::from_value(json).unwrap();
        assert!(matches!(plan, ExecutionPlan::Direct { .. }));
    }

    #[test]
    fn highest_confidence_wins() {
        let candidates = vec![
            Candidate { plan: direct("low"), confidence: 0.2, rule_order: 0 },
            Candidate { plan: direct("high"), confidence: 0.9, rule_order: 1 },
        ];
        let winner = select_plan(candidates).unwrap();
        assert_eq!(winner.name(), "high");
    }

    #[test]
    fn ties_broken_by_rule_order_then_simplicity() {
        let task_plan = ExecutionPlan::Task {
            name: "task".into(),
            role: "assistant".into(),
            tools: vec![],
            adaptations: vec![],
            resolution: None,
        };
        let candidates = vec![
            Candidate { plan: direct("simple"), confidence: 0.5, rule_order: 2 },
            Candidate { plan: task_plan, confidence: 0.5, rule_order: 2 },
        ];
        let winner = select_plan(candidates).unwrap();
        assert_eq!(winner.name(), "simple");
    }
}
