//! `MachineContext`: the per-turn bag carried through every state-machine
//! handler. Constructed once per turn and never mutated afterward except
//! for metrics bookkeeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::entry::Entry;
use crate::module::Module;
use crate::tool::ToolHandle;

/// A cooperative cancellation flag shared between the turn that owns it
/// and everything it spawns. Checked at loop boundaries, not preemptive.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Anything that can receive journal entries during a turn. Implemented
/// by the real journal writer in `thinksuit-engine`; a no-op or
/// in-memory recorder suffices for tests.
pub trait ExecLogger: Send + Sync {
    fn log(&self, entry: Entry);
}

/// A logger that discards everything, useful for unit tests that don't
/// care about the journal side effect.
#[derive(Debug, Default)]
pub struct NullLogger;

impl ExecLogger for NullLogger {
    fn log(&self, _entry: Entry) {}
}

/// The per-turn context threaded through every state-machine handler.
pub struct MachineContext {
    pub config: Arc<Config>,
    pub module: Arc<Module>,
    pub exec_logger: Arc<dyn ExecLogger>,
    pub abort_signal: CancelToken,
    pub discovered_tools: Vec<ToolHandle>,
    pub session_id: String,
    pub trace_id: String,
    pub parent_span_id: Option<String>,
    pub depth: u32,
    pub fanout: usize,
}

impl MachineContext {
    pub fn is_aborted(&self) -> bool {
        self.abort_signal.is_cancelled()
    }

    /// A child context for a recursive plan step: same turn identity, one
    /// level deeper, with this turn's span as the new parent.
    pub fn child(&self, span_id: impl Into<String>, fanout: usize) -> Self {
        Self {
            config: self.config.clone(),
            module: self.module.clone(),
            exec_logger: self.exec_logger.clone(),
            abort_signal: self.abort_signal.clone(),
            discovered_tools: self.discovered_tools.clone(),
            session_id: self.session_id.clone(),
            trace_id: self.trace_id.clone(),
            parent_span_id: Some(span_id.into()),
            depth: self.depth + 1,
            fanout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_starts_clear() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_propagates_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
