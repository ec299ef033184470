//! The rule-condition AST modules declare to drive `evaluateRules`.
//!
//! Deliberately not a general scripting language — a small, closed set of
//! boolean combinators over fact lookups, matching the module system's
//! "pure value" framing.

use serde::{Deserialize, Serialize};

use crate::plan::ExecutionPlan;

/// A boolean condition evaluated against the aggregated fact set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
    HasFact {
        #[serde(rename = "type")]
        fact_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dimension: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal: Option<String>,
    },
    ConfidenceAtLeast {
        #[serde(rename = "type")]
        fact_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal: Option<String>,
        min: f64,
    },
}

impl Condition {
    pub fn evaluate(&self, facts: &[crate::fact::Fact]) -> bool {
        match self {
            Condition::All { conditions } => conditions.iter().all(|c| c.evaluate(facts)),
            Condition::Any { conditions } => conditions.iter().any(|c| c.evaluate(facts)),
            Condition::Not { condition } => !condition.evaluate(facts),
            Condition::HasFact { fact_type, dimension, signal } => facts.iter().any(|f| {
                f.fact_type == *fact_type
                    && dimension.as_ref().map_or(true, |d| f.dimension.as_deref() == Some(d.as_str()))
                    && signal.as_ref().map_or(true, |s| f.signal.as_deref() == Some(s.as_str()))
            }),
            Condition::ConfidenceAtLeast { fact_type, signal, min } => facts.iter().any(|f| {
                f.fact_type == *fact_type
                    && signal.as_ref().map_or(true, |s| f.signal.as_deref() == Some(s.as_str()))
                    && f.confidence >= *min
            }),
        }
    }
}

/// A single module rule: if `condition` holds against the aggregated fact
/// set, emit `emits_facts` and/or propose `emits_plan` as a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub condition: Condition,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emits_facts: Vec<crate::fact::Fact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emits_plan: Option<ExecutionPlan>,
}
