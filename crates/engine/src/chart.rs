//! State Machine Interpreter (C9): a turn is driven by a declarative
//! chart of named states rather than hand-written control flow, so the
//! chart's shape can be dry-run and unit-tested independent of what its
//! handlers actually do.
//!
//! Generic over the context type `T` threaded through every handler, so
//! this module has no dependency on what a "turn" is.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::{try_join_all, BoxFuture};
use serde::Deserialize;
use thinksuit_core::error::{EngineError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Chart {
    pub start_at: String,
    pub states: HashMap<String, State>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum State {
    Choice {
        #[serde(default)]
        choices: Vec<ChoiceRule>,
        default: String,
    },
    /// Copies/derives a value into the context with no other side
    /// effects. `op` names a registered synchronous mutation; a `Pass`
    /// with no `op` is a pure no-op advance to `next`.
    Pass {
        #[serde(default)]
        op: Option<String>,
        next: String,
    },
    Task {
        handler: String,
        next: String,
    },
    Parallel {
        branches: Vec<String>,
        next: String,
    },
    Succeed,
    Fail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceRule {
    pub predicate: String,
    pub next: String,
}

/// The canonical per-turn chart, compiled into the binary rather than
/// read from `~/.thinksuit/` at runtime: the spec frames it as a small
/// document internal to the interpreter, not user configuration.
pub const TURN_CHART_JSON: &str = r#"{
  "start_at": "CheckSelectedPlan",
  "states": {
    "CheckSelectedPlan":  { "kind": "Choice", "choices": [ { "predicate": "selected_plan_present", "next": "UseSelectedPlan" } ], "default": "DetectSignals" },
    "UseSelectedPlan":    { "kind": "Pass", "op": "UseSelectedPlan", "next": "ComposeInstructions" },
    "DetectSignals":      { "kind": "Task", "handler": "DetectSignals", "next": "AggregateFacts" },
    "AggregateFacts":     { "kind": "Task", "handler": "AggregateFacts", "next": "EvaluateRules" },
    "EvaluateRules":      { "kind": "Task", "handler": "EvaluateRules", "next": "SelectPlan" },
    "SelectPlan":         { "kind": "Task", "handler": "SelectPlan", "next": "ComposeInstructions" },
    "ComposeInstructions":{ "kind": "Task", "handler": "ComposeInstructions", "next": "GuardDepthFanout" },
    "GuardDepthFanout":   { "kind": "Task", "handler": "GuardDepthFanout", "next": "CheckLimits" },
    "CheckLimits":        { "kind": "Choice", "choices": [ { "predicate": "exceeds_limits", "next": "Fail" } ], "default": "ExecutePlan" },
    "ExecutePlan":        { "kind": "Task", "handler": "ExecutePlan", "next": "EmitResponse" },
    "EmitResponse":       { "kind": "Task", "handler": "EmitResponse", "next": "Succeed" },
    "Succeed":            { "kind": "Succeed" },
    "Fail":               { "kind": "Fail" }
  }
}"#;

pub fn turn_chart() -> Chart {
    serde_json::from_str(TURN_CHART_JSON).expect("canonical turn chart is valid JSON")
}

#[async_trait]
pub trait TaskHandler<T: Send>: Send + Sync {
    async fn run(&self, ctx: &mut T) -> Result<()>;
}

pub type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;
pub type PassOp<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Resolves named `Task` handlers, `Choice` predicates, and `Pass`
/// mutations once at construction; the interpreter itself has no
/// knowledge of what `DetectSignals` or `ExecutePlan` actually do.
pub struct Interpreter<T: Clone + Send> {
    chart: Chart,
    handlers: HashMap<String, Arc<dyn TaskHandler<T>>>,
    predicates: HashMap<String, Predicate<T>>,
    pass_ops: HashMap<String, PassOp<T>>,
}

impl<T: Clone + Send + 'static> Interpreter<T> {
    pub fn new(
        chart: Chart,
        handlers: HashMap<String, Arc<dyn TaskHandler<T>>>,
        predicates: HashMap<String, Predicate<T>>,
        pass_ops: HashMap<String, PassOp<T>>,
    ) -> Self {
        Self { chart, handlers, predicates, pass_ops }
    }

    /// Build an interpreter over `chart` with every named handler,
    /// predicate, and pass op stubbed to a no-op/false. Proves the
    /// chart's shape — every `next`/`default`/`branches` target resolves
    /// to a real state — without any engine wiring.
    pub fn dry_run(chart: Chart) -> Self {
        let mut handlers: HashMap<String, Arc<dyn TaskHandler<T>>> = HashMap::new();
        let mut predicates: HashMap<String, Predicate<T>> = HashMap::new();
        let mut pass_ops: HashMap<String, PassOp<T>> = HashMap::new();
        for state in chart.states.values() {
            match state {
                State::Task { handler, .. } => {
                    handlers.entry(handler.clone()).or_insert_with(|| Arc::new(NoopHandler));
                }
                State::Choice { choices, .. } => {
                    for choice in choices {
                        predicates.entry(choice.predicate.clone()).or_insert_with(|| Box::new(|_| false));
                    }
                }
                State::Pass { op: Some(op), .. } => {
                    pass_ops.entry(op.clone()).or_insert_with(|| Box::new(|_| {}));
                }
                _ => {}
            }
        }
        Self::new(chart, handlers, predicates, pass_ops)
    }

    /// Run the chart to completion from `start_at`. Returns `Ok(true)` if
    /// it reached `Succeed`, `Ok(false)` if it reached `Fail`.
    pub async fn run(&self, ctx: &mut T) -> Result<bool> {
        let start = self.chart.start_at.clone();
        self.run_from(&start, ctx).await
    }

    fn run_from<'a>(&'a self, start: &'a str, ctx: &'a mut T) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let mut current = start.to_string();
            loop {
                let state = self
                    .chart
                    .states
                    .get(&current)
                    .ok_or_else(|| EngineError::Internal(format!("chart references unknown state '{current}'")))?;

                match state {
                    State::Succeed => return Ok(true),
                    State::Fail => return Ok(false),
                    State::Pass { op, next } => {
                        if let Some(op_name) = op {
                            let f = self
                                .pass_ops
                                .get(op_name)
                                .ok_or_else(|| EngineError::Internal(format!("no pass op registered for '{op_name}'")))?;
                            f(ctx);
                        }
                        current = next.clone();
                    }
                    State::Task { handler, next } => {
                        let h = self
                            .handlers
                            .get(handler)
                            .ok_or_else(|| EngineError::Internal(format!("no handler registered for '{handler}'")))?;
                        h.run(ctx).await?;
                        current = next.clone();
                    }
                    State::Choice { choices, default } => {
                        let mut matched = None;
                        for choice in choices {
                            let pred = self.predicates.get(&choice.predicate).ok_or_else(|| {
                                EngineError::Internal(format!("no predicate registered for '{}'", choice.predicate))
                            })?;
                            if pred(ctx) {
                                matched = Some(choice.next.clone());
                                break;
                            }
                        }
                        current = matched.unwrap_or_else(|| default.clone());
                    }
                    State::Parallel { branches, next } => {
                        let mut forked: Vec<T> = branches.iter().map(|_| ctx.clone()).collect();
                        let futs = branches.iter().zip(forked.iter_mut()).map(|(b, c)| self.run_from(b, c));
                        try_join_all(futs).await?;
                        current = next.clone();
                    }
                }
            }
        })
    }
}

struct NoopHandler;

#[async_trait]
impl<T: Send> TaskHandler<T> for NoopHandler {
    async fn run(&self, _ctx: &mut T) -> Result<()> {
        Ok(())
    }
}
