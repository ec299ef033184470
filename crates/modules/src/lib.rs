//! Module Registry, signal detection, rule evaluation, and instruction
//! composition (the parts of the engine that are driven by pure,
//! TOML-declared module data rather than code).

pub mod builtin;
pub mod classifier;
pub mod composer;
pub mod registry;
pub mod signals;

pub use classifier::{Classifier, ClassifierRegistry, KeywordClassifier};
pub use composer::{compose, ComposedInstructions};
pub use registry::ModuleRegistry;
pub use signals::{detect_signals, evaluate_rules, Profile, SignalMetrics};

// Re-export the pure fact/plan helpers modules consume, so callers don't
// need to depend on `thinksuit-core` directly for the common path.
pub use thinksuit_core::fact::{aggregate_facts, DimensionPolicy, Fact, TurnContext};
pub use thinksuit_core::plan::{select_plan, Candidate, ExecutionPlan};
