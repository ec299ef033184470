//! Approval Registry (C12): gates tool calls behind an explicit
//! approve/deny decision, with a bounded wait so a silent caller never
//! stalls a turn forever.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use thinksuit_core::approval::{Approval, ApprovalDecision, ApprovalState};
use tokio::sync::oneshot;

struct PendingApproval {
    approval: Approval,
    sender: Option<oneshot::Sender<ApprovalDecision>>,
}

/// Keyed by `approvalId`. Requests not resolved within `timeout` expire to
/// `denied`, matching the teacher's `ApprovalStore` shape: a lock-guarded
/// map of oneshot senders, one per pending request.
pub struct ApprovalRegistry {
    pending: Arc<RwLock<HashMap<String, PendingApproval>>>,
    timeout: Duration,
}

impl ApprovalRegistry {
    pub fn new(timeout_ms: u64) -> Self {
        Self { pending: Arc::new(RwLock::new(HashMap::new())), timeout: Duration::from_millis(timeout_ms) }
    }

    /// Register a pending approval, returning its id and a future that
    /// resolves once `resolve` is called or the timeout elapses.
    pub fn request(&self, tool: &str, args: Value) -> (String, impl std::future::Future<Output = ApprovalDecision>) {
        let approval_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        let approval = Approval::new(approval_id.clone(), tool, args);
        self.pending.write().insert(approval_id.clone(), PendingApproval { approval, sender: Some(tx) });

        let timeout = self.timeout;
        let pending = self.pending.clone();
        let expiring_id = approval_id.clone();
        let fut = async move {
            match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(decision)) => decision,
                // Timed out, or the sender was dropped without sending: deny,
                // and mark the entry expired so a late `resolve` is a no-op
                // and `info` keeps reporting it accurately instead of
                // `Pending` forever.
                _ => {
                    if let Some(entry) = pending.write().get_mut(&expiring_id) {
                        entry.sender = None;
                        entry.approval.state = ApprovalState::Denied;
                    }
                    ApprovalDecision::Denied
                }
            }
        };
        (approval_id, fut)
    }

    /// Resolve a pending approval. Returns whether a pending request was
    /// actually resolved by this call (`false` if already resolved,
    /// expired, or unknown) — a resolve after timeout is a no-op.
    pub fn resolve(&self, approval_id: &str, approved: bool) -> bool {
        let mut pending = self.pending.write();
        let Some(entry) = pending.get_mut(approval_id) else { return false };
        let Some(sender) = entry.sender.take() else { return false };

        entry.approval.state = if approved { ApprovalState::Approved } else { ApprovalState::Denied };
        let decision = if approved { ApprovalDecision::Approved } else { ApprovalDecision::Denied };
        let _ = sender.send(decision);
        pending.remove(approval_id);
        true
    }

    pub fn info(&self, approval_id: &str) -> Option<Approval> {
        self.pending.read().get(approval_id).map(|e| e.approval.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_approved_unblocks_the_waiter() {
        let registry = ApprovalRegistry::new(30_000);
        let (id, fut) = registry.request("roll_dice", serde_json::json!({"notation": "d20"}));
        assert!(registry.resolve(&id, true));
        assert_eq!(fut.await, ApprovalDecision::Approved);
    }

    #[tokio::test]
    async fn resolve_is_exactly_once() {
        let registry = ApprovalRegistry::new(30_000);
        let (id, _fut) = registry.request("roll_dice", serde_json::json!({}));
        assert!(registry.resolve(&id, true));
        assert!(!registry.resolve(&id, true));
    }

    #[tokio::test]
    async fn unresolved_request_expires_to_denied() {
        let registry = ApprovalRegistry::new(20);
        let (_id, fut) = registry.request("roll_dice", serde_json::json!({}));
        assert_eq!(fut.await, ApprovalDecision::Denied);
    }

    #[test]
    fn info_reports_pending_state() {
        let registry = ApprovalRegistry::new(30_000);
        let (id, _fut) = registry.request("roll_dice", serde_json::json!({}));
        let info = registry.info(&id).unwrap();
        assert_eq!(info.state, ApprovalState::Pending);
    }

    #[tokio::test]
    async fn resolve_after_timeout_is_a_no_op() {
        let registry = ApprovalRegistry::new(20);
        let (id, fut) = registry.request("roll_dice", serde_json::json!({}));
        assert_eq!(fut.await, ApprovalDecision::Denied);

        assert!(!registry.resolve(&id, true));
        let info = registry.info(&id).unwrap();
        assert_eq!(info.state, ApprovalState::Denied);
    }
}
