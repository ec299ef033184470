//! The event journal's unit of record: one `Entry` per line of a session's
//! JSONL stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::SortableId;

/// Severity of a journal entry, independent of its event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// The closed set of events a session's journal can contain. Each variant
/// carries its own dotted wire name, since Rust identifiers can't contain
/// dots; `event` round-trips as one of those dotted strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    #[serde(rename = "session.started")]
    SessionStarted,
    #[serde(rename = "session.resumed")]
    SessionResumed,
    #[serde(rename = "session.forked")]
    SessionForked,
    #[serde(rename = "session.input")]
    SessionInput,
    #[serde(rename = "session.response")]
    SessionResponse,
    #[serde(rename = "session.error")]
    SessionError,
    #[serde(rename = "session.message.appended")]
    MessageAppended,
    #[serde(rename = "session.interrupted")]
    Interrupted,
    #[serde(rename = "processing.signals.detected")]
    SignalsDetected,
    #[serde(rename = "processing.rule.evaluated")]
    RuleEvaluated,
    #[serde(rename = "processing.plan.selected")]
    PlanSelected,
    #[serde(rename = "processing.instructions.composed")]
    InstructionsComposed,
    #[serde(rename = "execution.branch.started")]
    BranchStarted,
    #[serde(rename = "execution.branch.completed")]
    BranchCompleted,
    #[serde(rename = "processing.tool.requested")]
    ToolCallRequested,
    #[serde(rename = "processing.tool.approved")]
    ToolCallApproved,
    #[serde(rename = "processing.tool.denied")]
    ToolCallDenied,
    #[serde(rename = "processing.tool.call")]
    ToolCallResult,
    #[serde(rename = "processing.llm.request")]
    LlmRequested,
    #[serde(rename = "processing.llm.response")]
    LlmResponded,
    #[serde(rename = "processing.llm.failed")]
    LlmFailed,
    #[serde(rename = "processing.approval.requested")]
    ApprovalRequested,
    #[serde(rename = "processing.approval.resolved")]
    ApprovalResolved,
    #[serde(rename = "processing.approval.timedout")]
    ApprovalTimedOut,
    #[serde(rename = "system.mcp.startup")]
    McpStartup,
}

/// One line of a session's append-only journal.
///
/// `data` carries event-specific structured payload; `msg` is a short
/// human-readable summary. Both are optional since not every event needs
/// both forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub time: DateTime<Utc>,
    pub session_id: String,
    pub event: Event,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub level: Level,
    pub trace_id: String,
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
}

impl Entry {
    pub fn new(session_id: impl Into<String>, event: Event, trace_id: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            session_id: session_id.into(),
            event,
            entry_type: None,
            msg: None,
            data: None,
            level: Level::Info,
            trace_id: trace_id.into(),
            span_id: SortableId::new().as_str().to_string(),
            parent_span_id: None,
        }
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_parent_span(mut self, parent_span_id: impl Into<String>) -> Self {
        self.parent_span_id = Some(parent_span_id.into());
        self
    }
}
