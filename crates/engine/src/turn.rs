//! Plan Executor (C8) and the Task handlers that back the canonical turn
//! chart (C9): `TurnState` is the "ctx record" threaded through every
//! handler, `TurnServices` bundles the shared collaborators (provider
//! router, tool mediator, approval registry) every handler may need.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::json;
use thinksuit_core::context::MachineContext;
use thinksuit_core::entry::{Entry, Event};
use thinksuit_core::error::{EngineError, Result};
use thinksuit_core::fact::{aggregate_facts, DimensionPolicy, Fact, TurnContext};
use thinksuit_core::plan::{select_plan, Candidate, ExecutionPlan, Resolution, ResultStrategy, Step};
use thinksuit_core::stream::{FinishReason, Usage};
use thinksuit_core::thread::{Message, Role, Thread};
use thinksuit_core::tool::{ToolCall, ToolDefinition, ToolHandle, ToolResult};
use thinksuit_core::ApprovalDecision;
use thinksuit_modules::{compose, detect_signals, evaluate_rules, Classifier, ComposedInstructions, Profile};
use thinksuit_providers::{ChatRequest, LlmRouter};

use crate::approval::ApprovalRegistry;
use crate::chart::{Interpreter, PassOp, Predicate, TaskHandler};
use crate::mediator::Mediator;

/// The turn-independent collaborators every handler may reach for. Shared
/// across every turn and every recursive child via `Arc`.
pub struct TurnServices {
    pub router: Arc<LlmRouter>,
    pub mediator: Arc<Mediator>,
    pub approvals: Arc<ApprovalRegistry>,
    pub classifier: Arc<dyn Classifier>,
    pub dimension_policies: HashMap<String, DimensionPolicy>,
    pub profile: Option<Profile>,
    pub budget_ms: Option<u64>,
    pub max_depth: u32,
    pub max_fanout: usize,
    pub max_children: usize,
    pub auto_approve: Vec<String>,
}

/// The mutable record threaded through the state machine for one turn
/// (or one recursive child plan). Each chart `Task` reads and writes a
/// slice of it.
pub struct TurnState {
    pub ctx: MachineContext,
    pub thread: Thread,
    pub selected_plan: Option<ExecutionPlan>,
    pub facts: Vec<Fact>,
    pub candidates: Vec<Candidate>,
    pub plan: Option<ExecutionPlan>,
    pub composed: Option<ComposedInstructions>,
    pub response: Option<String>,
    pub usage: Usage,
    pub reason: Option<String>,
    pub exceeds_limits: bool,
    /// Cumulative count of child turns spawned anywhere in this turn's
    /// tree so far, shared by `Arc` across every recursive child — unlike
    /// `ctx.fanout`, which only sees one node's immediate branch count.
    pub children: Arc<AtomicUsize>,
    pub services: Arc<TurnServices>,
}

impl TurnState {
    pub fn new(ctx: MachineContext, thread: Thread, selected_plan: Option<ExecutionPlan>, services: Arc<TurnServices>) -> Self {
        Self {
            ctx,
            thread,
            selected_plan,
            facts: Vec::new(),
            candidates: Vec::new(),
            plan: None,
            composed: None,
            response: None,
            usage: Usage::default(),
            reason: None,
            exceeds_limits: false,
            children: Arc::new(AtomicUsize::new(0)),
            services,
        }
    }

    fn child(&self, span_id: impl Into<String>, fanout: usize, thread: Thread, selected_plan: Option<ExecutionPlan>) -> Self {
        Self {
            ctx: self.ctx.child(span_id, fanout),
            thread,
            selected_plan,
            facts: Vec::new(),
            candidates: Vec::new(),
            plan: None,
            composed: None,
            response: None,
            usage: Usage::default(),
            reason: None,
            exceeds_limits: false,
            children: self.children.clone(),
            services: self.services.clone(),
        }
    }

    /// Reserve `count` slots in the turn-wide child budget, returning
    /// whether the reservation fit under `max_children`. Always advances
    /// the counter, even on failure, so a caller that proceeds anyway
    /// doesn't need to unwind the reservation.
    fn reserve_children(&self, count: usize) -> bool {
        let before = self.children.fetch_add(count, Ordering::SeqCst);
        before + count <= self.services.max_children
    }
}

impl Clone for TurnState {
    fn clone(&self) -> Self {
        Self {
            ctx: clone_machine_context(&self.ctx),
            thread: self.thread.clone(),
            selected_plan: self.selected_plan.clone(),
            facts: self.facts.clone(),
            candidates: self.candidates.clone(),
            plan: self.plan.clone(),
            composed: self.composed.clone(),
            response: self.response.clone(),
            usage: self.usage,
            reason: self.reason.clone(),
            exceeds_limits: self.exceeds_limits,
            children: self.children.clone(),
            services: self.services.clone(),
        }
    }
}

fn clone_machine_context(ctx: &MachineContext) -> MachineContext {
    MachineContext {
        config: ctx.config.clone(),
        module: ctx.module.clone(),
        exec_logger: ctx.exec_logger.clone(),
        abort_signal: ctx.abort_signal.clone(),
        discovered_tools: ctx.discovered_tools.clone(),
        session_id: ctx.session_id.clone(),
        trace_id: ctx.trace_id.clone(),
        parent_span_id: ctx.parent_span_id.clone(),
        depth: ctx.depth,
        fanout: ctx.fanout,
    }
}

fn log_event(turn: &TurnState, event: Event, data: Option<serde_json::Value>) {
    let mut entry = Entry::new(turn.ctx.session_id.as_str(), event, turn.ctx.trace_id.as_str());
    if let Some(parent) = &turn.ctx.parent_span_id {
        entry = entry.with_parent_span(parent.clone());
    }
    if let Some(d) = data {
        entry = entry.with_data(d);
    }
    turn.ctx.exec_logger.log(entry);
}

// ─── Task handlers backing the canonical turn chart (C9) ──────────────

pub struct DetectSignalsHandler;
#[async_trait]
impl TaskHandler<TurnState> for DetectSignalsHandler {
    async fn run(&self, turn: &mut TurnState) -> Result<()> {
        let (facts, metrics) =
            detect_signals(&turn.thread, turn.services.classifier.as_ref(), turn.services.profile, turn.services.budget_ms).await;
        log_event(
            turn,
            Event::SignalsDetected,
            Some(json!({"count": facts.len(), "timedOut": metrics.timed_out, "elapsedMs": metrics.elapsed_ms})),
        );
        turn.facts = facts;
        Ok(())
    }
}

pub struct AggregateFactsHandler;
#[async_trait]
impl TaskHandler<TurnState> for AggregateFactsHandler {
    async fn run(&self, turn: &mut TurnState) -> Result<()> {
        let turn_context = TurnContext { thread_length: turn.thread.messages().len(), depth: turn.ctx.depth };
        turn.facts = aggregate_facts(turn.facts.clone(), &turn.services.dimension_policies, turn_context);
        Ok(())
    }
}

pub struct EvaluateRulesHandler;
#[async_trait]
impl TaskHandler<TurnState> for EvaluateRulesHandler {
    async fn run(&self, turn: &mut TurnState) -> Result<()> {
        turn.candidates = evaluate_rules(&turn.facts, &turn.ctx.module);
        log_event(turn, Event::RuleEvaluated, Some(json!({"candidates": turn.candidates.len()})));
        Ok(())
    }
}

pub struct SelectPlanHandler;
#[async_trait]
impl TaskHandler<TurnState> for SelectPlanHandler {
    async fn run(&self, turn: &mut TurnState) -> Result<()> {
        let plan = select_plan(turn.candidates.clone())
            .ok_or_else(|| EngineError::Internal("rule evaluation produced no candidate plan".into()))?;
        log_event(turn, Event::PlanSelected, Some(json!({"name": plan.name()})));
        turn.plan = Some(plan);
        Ok(())
    }
}

pub struct ComposeInstructionsHandler;
#[async_trait]
impl TaskHandler<TurnState> for ComposeInstructionsHandler {
    async fn run(&self, turn: &mut TurnState) -> Result<()> {
        let plan = turn.plan.clone().ok_or_else(|| EngineError::Internal("no plan to compose instructions for".into()))?;
        if let Some((role, adaptations)) = plan_role_and_adaptations(&plan) {
            let composed = compose(&turn.ctx.module, role, adaptations, &turn.thread)?;
            log_event(turn, Event::InstructionsComposed, Some(json!({"role": role})));
            turn.composed = Some(composed);
        }
        Ok(())
    }
}

pub struct GuardDepthFanoutHandler;
#[async_trait]
impl TaskHandler<TurnState> for GuardDepthFanoutHandler {
    async fn run(&self, turn: &mut TurnState) -> Result<()> {
        let plan = turn.plan.clone().ok_or_else(|| EngineError::Internal("no plan to guard".into()))?;
        let fanout = plan.fanout();
        if turn.ctx.depth > turn.services.max_depth {
            turn.exceeds_limits = true;
            turn.reason = Some("resource_exhausted".into());
            log_event(
                turn,
                Event::SessionError,
                Some(json!({"code": "E_RESOURCE_EXHAUSTED", "reason": "max depth exceeded", "depth": turn.ctx.depth})),
            );
        } else if fanout > turn.services.max_fanout {
            turn.exceeds_limits = true;
            turn.reason = Some("resource_exhausted".into());
            log_event(
                turn,
                Event::SessionError,
                Some(json!({"code": "E_RESOURCE_FANOUT", "requested": fanout, "max": turn.services.max_fanout})),
            );
        } else {
            turn.exceeds_limits = false;
        }
        Ok(())
    }
}

/// Dispatches to the recursive interpreter for `sequential`/`parallel`
/// steps, so it's constructed with a handle back to the interpreter that
/// owns it (filled in once, after the interpreter itself exists).
pub struct ExecutePlanHandler {
    pub interpreter: Arc<OnceLock<Arc<Interpreter<TurnState>>>>,
}

#[async_trait]
impl TaskHandler<TurnState> for ExecutePlanHandler {
    async fn run(&self, turn: &mut TurnState) -> Result<()> {
        if turn.ctx.is_aborted() {
            turn.reason = Some("aborted".into());
            return Err(EngineError::Aborted("abort signal observed before plan execution".into()));
        }

        let plan = turn.plan.clone().ok_or_else(|| EngineError::Internal("no plan to execute".into()))?;
        let interpreter = self.interpreter.get().map(Arc::clone);

        let (response, usage, reason) = match &plan {
            ExecutionPlan::Direct { role, .. } => execute_direct(role, turn).await?,
            ExecutionPlan::Task { role, tools, resolution, .. } => {
                execute_task(role, tools, resolution.clone().unwrap_or_default(), turn).await?
            }
            ExecutionPlan::Sequential { sequence, result_strategy, build_thread, .. } => {
                let interpreter = interpreter.ok_or_else(|| EngineError::Internal("interpreter not yet initialized".into()))?;
                execute_sequential(sequence, *result_strategy, *build_thread, turn, &interpreter).await?
            }
            ExecutionPlan::Parallel { roles, result_strategy, .. } => {
                let interpreter = interpreter.ok_or_else(|| EngineError::Internal("interpreter not yet initialized".into()))?;
                execute_parallel(roles, *result_strategy, turn, &interpreter).await?
            }
        };

        turn.response = Some(response);
        turn.usage = usage;
        turn.reason = reason;
        Ok(())
    }
}

pub struct EmitResponseHandler;
#[async_trait]
impl TaskHandler<TurnState> for EmitResponseHandler {
    async fn run(&self, turn: &mut TurnState) -> Result<()> {
        let response = turn.response.clone().unwrap_or_default();
        let mut data = json!({"response": response, "usage": {"prompt": turn.usage.prompt, "completion": turn.usage.completion}});
        if let Some(reason) = &turn.reason {
            data["reason"] = json!(reason);
        }
        let event = if turn.ctx.depth == 0 { Event::SessionResponse } else { Event::BranchCompleted };
        log_event(turn, event, Some(data));
        Ok(())
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn plan_role_and_adaptations(plan: &ExecutionPlan) -> Option<(&str, &[String])> {
    match plan {
        ExecutionPlan::Direct { role, adaptations, .. } => Some((role.as_str(), adaptations.as_slice())),
        ExecutionPlan::Task { role, adaptations, .. } => Some((role.as_str(), adaptations.as_slice())),
        _ => None,
    }
}

/// Substitutes the composed primary-prompt rendering for the thread's
/// last user turn, preserving everything before it.
fn thread_for_request(original: &Thread, composed_user_message: &str) -> Thread {
    let mut messages = original.messages().to_vec();
    if let Some(idx) = messages.iter().rposition(|m| matches!(m.role, Role::User)) {
        messages[idx] = Message::user(composed_user_message.to_string());
    } else {
        messages.push(Message::user(composed_user_message.to_string()));
    }
    Thread(messages)
}

fn role_temperature(turn: &TurnState, role: &str) -> Option<f32> {
    turn.ctx.module.role(role).map(|r| r.temperature)
}

fn module_max_tokens(turn: &TurnState) -> Option<u32> {
    turn.ctx.module.tokens.as_ref().map(|t| t.default)
}

async fn execute_direct(role: &str, turn: &mut TurnState) -> Result<(String, Usage, Option<String>)> {
    let composed = turn.composed.clone().ok_or_else(|| EngineError::Internal("direct plan missing composed instructions".into()))?;
    let call_thread = thread_for_request(&turn.thread, &composed.user_message);

    let mut req = ChatRequest::new(role.to_string(), call_thread, turn.ctx.abort_signal.clone());
    req.system_instructions = Some(composed.system_instructions.clone());
    req.temperature = role_temperature(turn, role);
    req.max_tokens = module_max_tokens(turn);

    log_event(turn, Event::LlmRequested, Some(json!({"role": role})));
    let resp = turn.services.router.chat_for_role(role, req).await;
    match resp {
        Ok(resp) => {
            log_event(turn, Event::LlmResponded, Some(json!({"finishReason": resp.finish_reason})));
            Ok((resp.output, resp.usage, None))
        }
        Err(e) => {
            log_event(turn, Event::LlmFailed, Some(json!({"error": e.to_string()})));
            Err(e)
        }
    }
}

async fn execute_task(role: &str, tool_filter: &[String], resolution: Resolution, turn: &mut TurnState) -> Result<(String, Usage, Option<String>)> {
    let composed = turn.composed.clone().ok_or_else(|| EngineError::Internal("task plan missing composed instructions".into()))?;
    let mut working_thread = thread_for_request(&turn.thread, &composed.user_message);

    let available: Vec<ToolHandle> = turn
        .ctx
        .discovered_tools
        .iter()
        .filter(|h| tool_filter.is_empty() || tool_filter.iter().any(|t| t == &h.name))
        .cloned()
        .collect();
    let tool_defs: Vec<ToolDefinition> = available.iter().map(|h| h.as_definition()).collect();

    let mut cumulative = Usage::default();
    let mut tool_calls_made: u32 = 0;
    let mut last_output = String::new();
    let deadline = Instant::now() + Duration::from_millis(resolution.timeout_ms);

    for _cycle in 0..resolution.max_cycles {
        if turn.ctx.is_aborted() {
            return Ok((last_output, cumulative, Some("aborted".into())));
        }
        if Instant::now() >= deadline || cumulative.total() >= resolution.max_tokens {
            return Ok((last_output, cumulative, Some("resource_exhausted".into())));
        }

        let mut req = ChatRequest::new(role.to_string(), working_thread.clone(), turn.ctx.abort_signal.clone());
        req.system_instructions = Some(composed.system_instructions.clone());
        req.tools = tool_defs.clone();
        req.temperature = role_temperature(turn, role);
        req.max_tokens = module_max_tokens(turn);

        log_event(turn, Event::LlmRequested, Some(json!({"role": role})));
        let resp = turn.services.router.chat_for_role(role, req).await;
        let resp = match resp {
            Ok(resp) => {
                log_event(turn, Event::LlmResponded, Some(json!({"finishReason": resp.finish_reason})));
                resp
            }
            Err(e) => {
                log_event(turn, Event::LlmFailed, Some(json!({"error": e.to_string()})));
                return Err(e);
            }
        };

        cumulative.prompt += resp.usage.prompt;
        cumulative.completion += resp.usage.completion;
        last_output = resp.output.clone();

        if resp.finish_reason != FinishReason::ToolUse {
            return Ok((resp.output, cumulative, None));
        }

        let calls = resp.tool_calls.clone().unwrap_or_default();
        if calls.is_empty() {
            return Ok((resp.output, cumulative, None));
        }

        tool_calls_made += calls.len() as u32;
        if tool_calls_made > resolution.max_tool_calls {
            return Ok((resp.output, cumulative, Some("resource_exhausted".into())));
        }

        working_thread.push(Message::assistant_with_tool_calls(resp.output.clone(), calls.clone()));

        let results: Vec<ToolResult> = join_all(calls.iter().map(|call| dispatch_gated(call, turn))).await;
        for result in results {
            working_thread.push(Message::tool_result(result.call_id.clone(), result.content.clone()));
        }
    }

    Ok((last_output, cumulative, Some("resource_exhausted".into())))
}

/// Gate one tool call behind approval (unless auto-approved) and dispatch
/// it through the Mediator. Never propagates an error: a denial, a dead
/// server, or an abort all come back as a failed `ToolResult`.
async fn dispatch_gated(call: &ToolCall, turn: &TurnState) -> ToolResult {
    log_event(turn, Event::ToolCallRequested, Some(json!({"tool": call.tool_name, "callId": call.call_id})));

    if turn.ctx.is_aborted() {
        log_event(turn, Event::ToolCallDenied, Some(json!({"reason": "aborted"})));
        return ToolResult { call_id: call.call_id.clone(), content: "aborted".into(), is_error: true };
    }

    let auto_approved = turn.services.auto_approve.iter().any(|t| t == &call.tool_name);
    let approved = if auto_approved {
        true
    } else {
        log_event(turn, Event::ApprovalRequested, Some(json!({"tool": call.tool_name})));
        let (_id, pending) = turn.services.approvals.request(&call.tool_name, call.arguments.clone());
        pending.await == ApprovalDecision::Approved
    };

    if !approved {
        log_event(turn, Event::ToolCallDenied, None);
        return ToolResult { call_id: call.call_id.clone(), content: "tool call denied".into(), is_error: true };
    }
    log_event(turn, Event::ToolCallApproved, None);

    let result = turn.services.mediator.call(call).await;
    let data = if result.is_error {
        json!({"success": false, "error": result.content})
    } else {
        json!({"success": true})
    };
    log_event(turn, Event::ToolCallResult, Some(data));
    result
}

fn step_to_plan(step: &Step, name: String) -> Result<ExecutionPlan> {
    match step.strategy.as_str() {
        "direct" => Ok(ExecutionPlan::Direct { name, role: step.role.clone(), adaptations: step.adaptations.clone() }),
        "task" => Ok(ExecutionPlan::Task {
            name,
            role: step.role.clone(),
            tools: step.tools.clone().unwrap_or_default(),
            adaptations: step.adaptations.clone(),
            resolution: None,
        }),
        other => Err(EngineError::Internal(format!("unsupported step strategy '{other}'"))),
    }
}

fn combine(outputs: Vec<String>, strategy: ResultStrategy) -> String {
    match strategy {
        ResultStrategy::Last => outputs.into_iter().last().unwrap_or_default(),
        ResultStrategy::Concat => outputs.join("\n\n"),
    }
}

async fn run_child(interpreter: &Interpreter<TurnState>, mut child: TurnState) -> Result<(String, Usage)> {
    interpreter.run(&mut child).await?;
    let usage = child.usage;
    Ok((child.response.unwrap_or_default(), usage))
}

async fn execute_sequential(
    sequence: &[Step],
    result_strategy: ResultStrategy,
    build_thread: bool,
    turn: &mut TurnState,
    interpreter: &Interpreter<TurnState>,
) -> Result<(String, Usage, Option<String>)> {
    let mut thread = turn.thread.clone();
    let mut outputs = Vec::with_capacity(sequence.len());
    let mut total = Usage::default();

    for (idx, step) in sequence.iter().enumerate() {
        if turn.ctx.is_aborted() {
            return Ok((combine(outputs, result_strategy), total, Some("aborted".into())));
        }
        if !turn.reserve_children(1) {
            log_event(
                turn,
                Event::SessionError,
                Some(json!({"code": "E_RESOURCE_EXHAUSTED", "reason": "max children exceeded", "max": turn.services.max_children})),
            );
            return Ok((combine(outputs, result_strategy), total, Some("resource_exhausted".into())));
        }
        let plan = step_to_plan(step, format!("{}/step-{idx}", turn.plan.as_ref().map(|p| p.name()).unwrap_or("sequential")))?;
        let child = turn.child(format!("seq-{idx}"), 1, thread.clone(), Some(plan));
        log_event(&child, Event::BranchStarted, Some(json!({"index": idx, "role": step.role})));
        let (output, usage) = run_child(interpreter, child).await?;
        total.prompt += usage.prompt;
        total.completion += usage.completion;
        if build_thread {
            thread.push(Message::assistant(output.clone()));
        }
        outputs.push(output);
    }

    Ok((combine(outputs, result_strategy), total, None))
}

async fn execute_parallel(
    roles: &[Step],
    result_strategy: ResultStrategy,
    turn: &mut TurnState,
    interpreter: &Interpreter<TurnState>,
) -> Result<(String, Usage, Option<String>)> {
    let fanout = roles.len();
    let plan_name = turn.plan.as_ref().map(|p| p.name().to_string()).unwrap_or_else(|| "parallel".into());

    if !turn.reserve_children(fanout) {
        log_event(
            turn,
            Event::SessionError,
            Some(json!({"code": "E_RESOURCE_EXHAUSTED", "reason": "max children exceeded", "max": turn.services.max_children})),
        );
        return Ok((String::new(), Usage::default(), Some("resource_exhausted".into())));
    }

    // Fork every branch's context up front (each gets its own clone of
    // the input thread, per declaration order) before awaiting any of
    // them, so `join_all` only ever holds owned `TurnState`s.
    let mut children = Vec::with_capacity(fanout);
    for (idx, step) in roles.iter().enumerate() {
        let name = format!("{plan_name}/branch-{idx}");
        let plan = step_to_plan(step, name)?;
        let child = turn.child(format!("par-{idx}"), fanout, turn.thread.clone(), Some(plan));
        log_event(&child, Event::BranchStarted, Some(json!({"index": idx, "role": step.role})));
        children.push(child);
    }

    // `join_all` preserves declaration order in its returned `Vec`
    // regardless of completion order, which is what makes `concat`
    // branch-declaration-order for free.
    let results: Vec<Result<(String, Usage)>> =
        join_all(children.into_iter().map(|child| run_child(interpreter, child))).await;

    let mut outputs = Vec::with_capacity(results.len());
    let mut total = Usage::default();
    for result in results {
        let (output, usage) = result?;
        total.prompt += usage.prompt;
        total.completion += usage.completion;
        outputs.push(output);
    }

    Ok((combine(outputs, result_strategy), total, None))
}

// ─── Interpreter construction ───────────────────────────────────────

/// Build the canonical turn interpreter with every handler, predicate,
/// and pass op wired in, including `ExecutePlan`'s self-reference for
/// recursive `sequential`/`parallel`/`task` children.
pub fn build_interpreter() -> Arc<Interpreter<TurnState>> {
    let cell: Arc<OnceLock<Arc<Interpreter<TurnState>>>> = Arc::new(OnceLock::new());

    let mut handlers: HashMap<String, Arc<dyn TaskHandler<TurnState>>> = HashMap::new();
    handlers.insert("DetectSignals".into(), Arc::new(DetectSignalsHandler));
    handlers.insert("AggregateFacts".into(), Arc::new(AggregateFactsHandler));
    handlers.insert("EvaluateRules".into(), Arc::new(EvaluateRulesHandler));
    handlers.insert("SelectPlan".into(), Arc::new(SelectPlanHandler));
    handlers.insert("ComposeInstructions".into(), Arc::new(ComposeInstructionsHandler));
    handlers.insert("GuardDepthFanout".into(), Arc::new(GuardDepthFanoutHandler));
    handlers.insert("ExecutePlan".into(), Arc::new(ExecutePlanHandler { interpreter: cell.clone() }));
    handlers.insert("EmitResponse".into(), Arc::new(EmitResponseHandler));

    let mut predicates: HashMap<String, Predicate<TurnState>> = HashMap::new();
    predicates.insert("selected_plan_present".into(), Box::new(|turn: &TurnState| turn.selected_plan.is_some()));
    predicates.insert("exceeds_limits".into(), Box::new(|turn: &TurnState| turn.exceeds_limits));

    let mut pass_ops: HashMap<String, PassOp<TurnState>> = HashMap::new();
    pass_ops.insert(
        "UseSelectedPlan".into(),
        Box::new(|turn: &mut TurnState| {
            turn.plan = turn.selected_plan.clone();
            if let Some(plan) = &turn.plan {
                log_event(turn, Event::PlanSelected, Some(json!({"name": plan.name()})));
            }
        }),
    );

    let interpreter = Arc::new(Interpreter::new(crate::chart::turn_chart(), handlers, predicates, pass_ops));
    let _ = cell.set(interpreter.clone());
    interpreter
}
