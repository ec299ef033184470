//! Facts produced by classifiers and rules, and the aggregation step that
//! dedups them before rule evaluation.

use serde::{Deserialize, Serialize};

/// A single observation about the turn, produced by a classifier or a rule.
///
/// `dimension`/`signal`/`name` are all optional because different producers
/// populate different subsets: a signal classifier sets `dimension` +
/// `signal`, a rule-emitted fact may only set `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    #[serde(rename = "type")]
    pub fact_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub confidence: f64,
}

impl Fact {
    /// The dedup key: `(type, dimension||'', signal||name||'')`.
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.fact_type.clone(),
            self.dimension.clone().unwrap_or_default(),
            self.signal
                .clone()
                .or_else(|| self.name.clone())
                .unwrap_or_default(),
        )
    }
}

/// A special fact describing the turn itself (thread length, role hints,
/// recursion depth), always appended once by `aggregate_facts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnContext {
    pub thread_length: usize,
    pub depth: u32,
}

impl TurnContext {
    pub fn into_fact(self) -> Fact {
        Fact {
            fact_type: "turn_context".into(),
            dimension: None,
            signal: None,
            name: Some(format!(
                "thread_length={},depth={}",
                self.thread_length, self.depth
            )),
            confidence: 1.0,
        }
    }
}

/// Per-dimension policy applied during aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionPolicy {
    pub enabled: bool,
    pub min_confidence: f64,
}

impl Default for DimensionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.0,
        }
    }
}

/// Dedup by `(type, dimension, signal/name)` keeping the max confidence,
/// filter by per-dimension policy, then append one `TurnContext` fact.
pub fn aggregate_facts(
    signals: Vec<Fact>,
    policies: &std::collections::HashMap<String, DimensionPolicy>,
    turn_context: TurnContext,
) -> Vec<Fact> {
    let mut best: std::collections::HashMap<(String, String, String), Fact> =
        std::collections::HashMap::new();

    for fact in signals {
        if let Some(dimension) = &fact.dimension {
            if let Some(policy) = policies.get(dimension) {
                if !policy.enabled || fact.confidence < policy.min_confidence {
                    continue;
                }
            }
        }
        let key = fact.dedup_key();
        match best.get(&key) {
            Some(existing) if existing.confidence >= fact.confidence => {}
            _ => {
                best.insert(key, fact);
            }
        }
    }

    let mut facts: Vec<Fact> = best.into_values().collect();
    facts.push(turn_context.into_fact());
    facts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(dimension: &str, signal: &str, confidence: f64) -> Fact {
        Fact {
            fact_type: "signal".into(),
            dimension: Some(dimension.into()),
            signal: Some(signal.into()),
            name: None,
            confidence,
        }
    }

    #[test]
    fn dedup_keeps_max_confidence() {
        let facts = vec![fact("tone", "urgent", 0.4), fact("tone", "urgent", 0.9)];
        let out = aggregate_facts(facts, &Default::default(), TurnContext { thread_length: 1, depth: 0 });
        let survivor = out.iter().find(|f| f.signal.as_deref() == Some("urgent")).unwrap();
        assert_eq!(survivor.confidence, 0.9);
    }

    #[test]
    fn min_confidence_policy_filters() {
        let mut policies = std::collections::HashMap::new();
        policies.insert(
            "tone".to_string(),
            DimensionPolicy {
                enabled: true,
                min_confidence: 0.5,
            },
        );
        let facts = vec![fact("tone", "urgent", 0.2)];
        let out = aggregate_facts(facts, &policies, TurnContext { thread_length: 1, depth: 0 });
        assert!(out.iter().all(|f| f.signal.as_deref() != Some("urgent")));
    }

    #[test]
    fn always_appends_turn_context() {
        let out = aggregate_facts(vec![], &Default::default(), TurnContext { thread_length: 3, depth: 1 });
        assert!(out.iter().any(|f| f.fact_type == "turn_context"));
    }
}
