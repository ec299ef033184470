//! Approval data shapes. The registry that tracks pending approvals and
//! resolves them (C12) lives in `thinksuit-engine`; this module only
//! defines the value types it passes around.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved,
    Denied,
}

/// A request to run a gated tool call, awaiting a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub approval_id: String,
    pub tool: String,
    pub args: serde_json::Value,
    pub state: ApprovalState,
    /// Identifiers of whoever is waiting on this approval (e.g. subscriber
    /// connection IDs), surfaced so a UI can show who's blocked.
    #[serde(default)]
    pub waiters: Vec<String>,
}

impl Approval {
    pub fn new(approval_id: impl Into<String>, tool: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            approval_id: approval_id.into(),
            tool: tool.into(),
            args,
            state: ApprovalState::Pending,
            waiters: Vec::new(),
        }
    }
}

/// The caller's decision on a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Denied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_approval_starts_pending() {
        let approval = Approval::new("a1", "exec", serde_json::json!({"cmd": "ls"}));
        assert_eq!(approval.state, ApprovalState::Pending);
    }
}
