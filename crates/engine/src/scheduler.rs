//! Session Scheduler (C10): enforces single-writer-per-session, drives
//! fork/resume, and is the read surface everything else (CLI, a future
//! UI) goes through to inspect sessions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thinksuit_core::config::Config;
use thinksuit_core::context::{CancelToken, ExecLogger, MachineContext};
use thinksuit_core::entry::{Entry, Event};
use thinksuit_core::error::{EngineError, Result};
use thinksuit_core::module::Module;
use thinksuit_core::plan::ExecutionPlan;
use thinksuit_core::thread::{Message, Thread};
use thinksuit_core::{PathBase, PathService, SortableId};
use thinksuit_journal::{build_thread, derive_status, Journal, JournalError, SessionStatus};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::chart::Interpreter;
use crate::turn::{TurnServices, TurnState};

fn jerr(e: JournalError) -> EngineError {
    EngineError::Internal(e.to_string())
}

/// Bridges `MachineContext::exec_logger` to the real per-session journal,
/// so every handler's `log_event` call lands on disk and on the
/// Subscription Bus without any handler knowing the journal exists.
struct JournalLogger {
    journal: Arc<Journal>,
    session_id: String,
}

impl ExecLogger for JournalLogger {
    fn log(&self, entry: Entry) {
        if let Err(e) = self.journal.append(&self.session_id, entry) {
            tracing::warn!(session_id = %self.session_id, error = %e, "failed to append journal entry");
        }
    }
}

/// A session's fork lineage — the one thing the Scheduler persists
/// outside the append-only journal stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forked_at_index: Option<usize>,
}

#[derive(Debug, Default)]
pub struct ScheduleRequest {
    pub input: String,
    pub session_id: Option<String>,
    pub source_session_id: Option<String>,
    pub fork_from_index: Option<usize>,
    pub selected_plan: Option<ExecutionPlan>,
}

/// The outcome of one `schedule` call: either a running turn (with a
/// join handle and an interrupt switch), or an immediate rejection.
pub struct Scheduled {
    pub session_id: String,
    pub scheduled: bool,
    pub is_new: bool,
    pub reason: Option<String>,
    handle: Option<JoinHandle<Result<()>>>,
    cancel: Option<CancelToken>,
}

impl Scheduled {
    /// Trip the turn's abort signal. A no-op if the turn never started
    /// (schedule was rejected as busy) or has already finished.
    pub fn interrupt(&self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    pub async fn join(self) -> Result<()> {
        match self.handle {
            Some(handle) => handle.await.map_err(|e| EngineError::Internal(e.to_string()))?,
            None => Ok(()),
        }
    }
}

pub struct Scheduler {
    journal: Arc<Journal>,
    paths: PathService,
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
    interpreter: Arc<Interpreter<TurnState>>,
    services: Arc<TurnServices>,
    config: Arc<Config>,
    module: Arc<Module>,
}

impl Scheduler {
    pub fn new(
        journal: Arc<Journal>,
        paths: PathService,
        interpreter: Arc<Interpreter<TurnState>>,
        services: Arc<TurnServices>,
        config: Arc<Config>,
        module: Arc<Module>,
    ) -> Self {
        Self { journal, paths, locks: Mutex::new(HashMap::new()), interpreter, services, config, module }
    }

    fn lock_for(&self, session_id: &str) -> Arc<Semaphore> {
        self.locks.lock().entry(session_id.to_string()).or_insert_with(|| Arc::new(Semaphore::new(1))).clone()
    }

    /// `acquire` never waits: a busy session is rejected immediately
    /// rather than queued, so a caller always gets an answer in bounded
    /// time.
    pub fn schedule(&self, req: ScheduleRequest) -> Result<Scheduled> {
        let (session_id, is_new) = self.resolve_session(&req)?;

        let sem = self.lock_for(&session_id);
        let permit = match sem.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                return Ok(Scheduled {
                    session_id,
                    scheduled: false,
                    is_new,
                    reason: Some("session busy".into()),
                    handle: None,
                    cancel: None,
                });
            }
        };

        let trace_id = SortableId::new().to_string();
        let mut thread = self.load_thread(&session_id)?;
        thread.push(Message::user(req.input.clone()));

        self.journal
            .append(
                &session_id,
                Entry::new(session_id.as_str(), Event::SessionInput, trace_id.as_str())
                    .with_data(serde_json::json!({"input": req.input})),
            )
            .map_err(jerr)?;
        self.append_message(&session_id, &trace_id, thread.messages().last().expect("just pushed"))?;

        let cancel = CancelToken::new();
        let ctx = MachineContext {
            config: self.config.clone(),
            module: self.module.clone(),
            exec_logger: Arc::new(JournalLogger { journal: self.journal.clone(), session_id: session_id.clone() }),
            abort_signal: cancel.clone(),
            discovered_tools: self.services.mediator.discover_tools(),
            session_id: session_id.clone(),
            trace_id: trace_id.clone(),
            parent_span_id: None,
            depth: 0,
            fanout: 1,
        };

        let mut turn = TurnState::new(ctx, thread, req.selected_plan, self.services.clone());
        let interpreter = self.interpreter.clone();
        let journal = self.journal.clone();
        let session_for_task = session_id.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            let outcome = interpreter.run(&mut turn).await;
            let trace_id = turn.ctx.trace_id.clone();

            match &outcome {
                Ok(true) => {
                    let response = Message::assistant(turn.response.clone().unwrap_or_default());
                    let data = serde_json::to_value(&response).unwrap_or(serde_json::Value::Null);
                    let _ = journal.append(
                        &session_for_task,
                        Entry::new(session_for_task.as_str(), Event::MessageAppended, trace_id.as_str()).with_data(data),
                    );
                }
                Ok(false) => {
                    let _ = journal.append(
                        &session_for_task,
                        Entry::new(session_for_task.as_str(), Event::SessionError, trace_id.as_str())
                            .with_data(serde_json::json!({"reason": turn.reason})),
                    );
                }
                Err(e) => {
                    let _ = journal.append(
                        &session_for_task,
                        Entry::new(session_for_task.as_str(), Event::SessionError, trace_id.as_str())
                            .with_data(serde_json::json!({"error": e.to_string(), "code": e.code()})),
                    );
                }
            }

            journal.cleanup_if_idle(&session_for_task, false);
            outcome.map(|_| ())
        });

        Ok(Scheduled { session_id, scheduled: true, is_new, reason: None, handle: Some(handle), cancel: Some(cancel) })
    }

    fn append_message(&self, session_id: &str, trace_id: &str, message: &Message) -> Result<()> {
        let data = serde_json::to_value(message)?;
        self.journal
            .append(session_id, Entry::new(session_id, Event::MessageAppended, trace_id).with_data(data))
            .map_err(jerr)
    }

    fn resolve_session(&self, req: &ScheduleRequest) -> Result<(String, bool)> {
        if let (Some(source), Some(from_index)) = (&req.source_session_id, req.fork_from_index) {
            let source_entries = self.journal.read_all(source).map_err(jerr)?;
            let prefix: Vec<Entry> = source_entries.into_iter().take(from_index).collect();
            let new_id = SortableId::new().to_string();
            for mut entry in prefix {
                entry.session_id = new_id.clone();
                self.journal.append(&new_id, entry).map_err(jerr)?;
            }
            self.journal
                .append(&new_id, Entry::new(new_id.as_str(), Event::SessionForked, new_id.as_str()))
                .map_err(jerr)?;
            self.write_metadata(&new_id, &SessionMetadata { parent: Some(source.clone()), forked_at_index: Some(from_index) })?;
            Ok((new_id, true))
        } else if let Some(session_id) = &req.session_id {
            let is_new = self.journal.read_all(session_id).map_err(jerr)?.is_empty();
            let event = if is_new { Event::SessionStarted } else { Event::SessionResumed };
            self.journal.append(session_id, Entry::new(session_id.as_str(), event, session_id.as_str())).map_err(jerr)?;
            Ok((session_id.clone(), is_new))
        } else {
            let new_id = SortableId::new().to_string();
            self.journal
                .append(&new_id, Entry::new(new_id.as_str(), Event::SessionStarted, new_id.as_str()))
                .map_err(jerr)?;
            Ok((new_id, true))
        }
    }

    fn load_thread(&self, session_id: &str) -> Result<Thread> {
        Ok(build_thread(&self.journal.read_all(session_id).map_err(jerr)?))
    }

    fn write_metadata(&self, session_id: &str, metadata: &SessionMetadata) -> Result<()> {
        let id = SortableId::from_existing(session_id);
        let path = self.paths.ensure_path_for(PathBase::SessionMetadata, &id)?;
        std::fs::write(path, serde_json::to_vec_pretty(metadata)?)?;
        Ok(())
    }

    fn read_metadata(&self, session_id: &str) -> Result<SessionMetadata> {
        let id = SortableId::from_existing(session_id);
        let path = self.paths.path_for(PathBase::SessionMetadata, &id);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SessionMetadata::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_session(&self, session_id: &str) -> Result<Vec<Entry>> {
        self.journal.read_all(session_id).map_err(jerr)
    }

    pub fn get_session_status(&self, session_id: &str) -> Result<SessionStatus> {
        Ok(derive_status(&self.journal.read_all(session_id).map_err(jerr)?))
    }

    pub fn get_session_metadata(&self, session_id: &str) -> Result<SessionMetadata> {
        self.read_metadata(session_id)
    }

    pub fn get_trace(&self, trace_id: &str) -> Result<Vec<Entry>> {
        let id = SortableId::from_existing(trace_id);
        let path = self.paths.path_for(PathBase::Traces, &id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(raw.lines().filter(|l| !l.trim().is_empty()).filter_map(|l| serde_json::from_str(l).ok()).collect())
    }

    pub fn read_session_lines_from(&self, session_id: &str, from_index: usize) -> Result<Vec<Entry>> {
        self.journal.read_from(session_id, from_index).map_err(jerr)
    }

    /// Every session whose metadata names `session_id` as its parent.
    /// Walks the metadata tree rather than maintaining a separate index,
    /// since forks are rare relative to turns.
    pub fn get_session_forks(&self, session_id: &str) -> Result<Vec<String>> {
        let root = self.paths.base_dir_public(PathBase::SessionMetadata);
        let mut forks = Vec::new();
        for path in walk_files(&root) {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            let Ok(bytes) = std::fs::read(&path) else { continue };
            let Ok(metadata) = serde_json::from_slice::<SessionMetadata>(&bytes) else { continue };
            if metadata.parent.as_deref() == Some(session_id) {
                forks.push(stem.to_string());
            }
        }
        forks.sort();
        Ok(forks)
    }

    /// Every session ID that has a stream file on disk, newest first.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let root = self.paths.base_dir_public(PathBase::SessionStreams);
        let mut ids: Vec<String> =
            walk_files(&root).into_iter().filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string)).collect();
        ids.sort();
        ids.reverse();
        Ok(ids)
    }

    pub fn subscribe(&self, session_id: &str) -> tokio::sync::broadcast::Receiver<Entry> {
        self.journal.subscribe(session_id)
    }
}

fn walk_files(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(root) else { return out };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(walk_files(&path));
        } else {
            out.push(path);
        }
    }
    out
}
