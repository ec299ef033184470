//! `detectSignals` and `evaluateRules`: the pure-ish functions that sit
//! between a classifier and `selectPlan`. (`aggregateFacts` and
//! `selectPlan` themselves are plain functions in `thinksuit-core` and are
//! re-exported from the crate root.)

use std::time::{Duration, Instant};

use thinksuit_core::fact::Fact;
use thinksuit_core::module::Module;
use thinksuit_core::plan::Candidate;
use thinksuit_core::thread::Thread;

use crate::classifier::Classifier;

/// How much time budget to give the classifier when the caller doesn't
/// pass an explicit `budget_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Fast,
    Balanced,
    Thorough,
}

impl Profile {
    pub fn default_budget_ms(self) -> u64 {
        match self {
            Profile::Fast => 150,
            Profile::Balanced => 400,
            Profile::Thorough => 1_500,
        }
    }
}

/// Timing metadata returned alongside the detected facts.
#[derive(Debug, Clone, Copy)]
pub struct SignalMetrics {
    pub elapsed_ms: u64,
    pub timed_out: bool,
}

/// Run the classifier against `thread` under a soft time budget. A
/// timeout is not an error: it yields an empty fact set so the turn can
/// still fall through to a default plan.
pub async fn detect_signals(
    thread: &Thread,
    classifier: &dyn Classifier,
    profile: Option<Profile>,
    budget_ms: Option<u64>,
) -> (Vec<Fact>, SignalMetrics) {
    let budget = budget_ms
        .or_else(|| profile.map(Profile::default_budget_ms))
        .unwrap_or_else(|| Profile::Balanced.default_budget_ms());
    let start = Instant::now();

    match tokio::time::timeout(Duration::from_millis(budget), classifier.classify(thread)).await {
        Ok(facts) => (
            facts,
            SignalMetrics { elapsed_ms: start.elapsed().as_millis() as u64, timed_out: false },
        ),
        Err(_) => {
            tracing::warn!(budget_ms = budget, "classifier exceeded signal detection budget");
            (Vec::new(), SignalMetrics { elapsed_ms: start.elapsed().as_millis() as u64, timed_out: true })
        }
    }
}

/// Forward-chain the module's rules against the aggregated fact set.
///
/// A single pass: rules are tried in declaration order, and facts a rule
/// emits become visible to every rule that follows it in the same pass
/// (but not to rules already evaluated). Each satisfied rule with an
/// `emits_plan` becomes one candidate, scored by the rule's own
/// confidence and its declaration order (used later as a tiebreaker).
pub fn evaluate_rules(facts: &[Fact], module: &Module) -> Vec<Candidate> {
    let mut working_facts: Vec<Fact> = facts.to_vec();
    let mut candidates = Vec::new();

    for (rule_order, rule) in module.rules.iter().enumerate() {
        if !rule.condition.evaluate(&working_facts) {
            continue;
        }
        working_facts.extend(rule.emits_facts.iter().cloned());
        if let Some(plan) = &rule.emits_plan {
            candidates.push(Candidate {
                plan: plan.clone(),
                confidence: rule.confidence,
                rule_order: rule_order as u32,
            });
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{KeywordClassifier, NullClassifier};
    use thinksuit_core::fact::TurnContext;
    use thinksuit_core::plan::ExecutionPlan;
    use thinksuit_core::rule::{Condition, Rule};
    use thinksuit_core::thread::Message;

    #[tokio::test]
    async fn detect_signals_returns_classifier_facts() {
        let thread = Thread(vec![Message::user("please run a tool now")]);
        let classifier = KeywordClassifier::default_rules();
        let (facts, metrics) = detect_signals(&thread, &classifier, Some(Profile::Fast), None).await;
        assert!(!facts.is_empty());
        assert!(!metrics.timed_out);
    }

    #[tokio::test]
    async fn detect_signals_empty_on_null_classifier() {
        let thread = Thread(vec![Message::user("hello")]);
        let (facts, _) = detect_signals(&thread, &NullClassifier, None, None).await;
        assert!(facts.is_empty());
    }

    fn module_with_rules(rules: Vec<Rule>) -> Module {
        let mut module = crate::builtin::core_chat_module();
        module.rules = rules;
        module
    }

    #[test]
    fn evaluate_rules_emits_candidate_when_condition_holds() {
        let rule = Rule {
            name: "tool-request".into(),
            condition: Condition::HasFact {
                fact_type: "signal".into(),
                dimension: Some("task".into()),
                signal: Some("tool_request".into()),
            },
            confidence: 0.9,
            emits_facts: vec![],
            emits_plan: Some(ExecutionPlan::Task {
                name: "run-tool".into(),
                role: "assistant".into(),
                tools: vec![],
                adaptations: vec![],
                resolution: None,
            }),
        };
        let module = module_with_rules(vec![rule]);
        let facts = vec![Fact {
            fact_type: "signal".into(),
            dimension: Some("task".into()),
            signal: Some("tool_request".into()),
            name: None,
            confidence: 0.75,
        }];
        let candidates = evaluate_rules(&facts, &module);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].plan.name(), "run-tool");
    }

    #[test]
    fn evaluate_rules_skips_unsatisfied_condition() {
        let rule = Rule {
            name: "never".into(),
            condition: Condition::HasFact { fact_type: "signal".into(), dimension: None, signal: Some("nope".into()) },
            confidence: 0.9,
            emits_facts: vec![],
            emits_plan: Some(ExecutionPlan::Direct { name: "x".into(), role: "assistant".into(), adaptations: vec![] }),
        };
        let module = module_with_rules(vec![rule]);
        let facts = vec![TurnContext { thread_length: 1, depth: 0 }.into_fact()];
        assert!(evaluate_rules(&facts, &module).is_empty());
    }

    #[test]
    fn later_rule_sees_facts_emitted_by_earlier_rule() {
        let first = Rule {
            name: "seed".into(),
            condition: Condition::All { conditions: vec![] },
            confidence: 0.1,
            emits_facts: vec![Fact {
                fact_type: "derived".into(),
                dimension: None,
                signal: None,
                name: Some("seeded".into()),
                confidence: 1.0,
            }],
            emits_plan: None,
        };
        let second = Rule {
            name: "depends-on-seed".into(),
            condition: Condition::HasFact { fact_type: "derived".into(), dimension: None, signal: None },
            confidence: 0.5,
            emits_facts: vec![],
            emits_plan: Some(ExecutionPlan::Direct { name: "chained".into(), role: "assistant".into(), adaptations: vec![] }),
        };
        let module = module_with_rules(vec![first, second]);
        let candidates = evaluate_rules(&[], &module);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].plan.name(), "chained");
    }
}
