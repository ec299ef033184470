//! Pure projections over a session's entries: `deriveStatus` and
//! `buildThread`.

use thinksuit_core::{Entry, Event, Message, Thread};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Initialized,
    Ready,
    Busy,
    Error,
}

/// Compute session status from the last status-affecting event. Entries
/// that don't affect status (tool calls, provider requests, etc.) are
/// skipped when scanning backward.
pub fn derive_status(entries: &[Entry]) -> SessionStatus {
    for entry in entries.iter().rev() {
        match entry.event {
            Event::SessionInput => return SessionStatus::Busy,
            Event::SessionError => return SessionStatus::Error,
            Event::SessionResponse | Event::Interrupted => return SessionStatus::Ready,
            Event::SessionStarted | Event::SessionResumed | Event::SessionForked => {
                return SessionStatus::Ready
            }
            _ => continue,
        }
    }
    SessionStatus::Initialized
}

/// Project `message.appended` entries back into a `Thread`. Entries whose
/// `data` doesn't decode as a `Message` are skipped rather than failing
/// the whole projection — a session's thread should be best-effort
/// reconstructable even if one entry was written by an older version.
pub fn build_thread(entries: &[Entry]) -> Thread {
    entries
        .iter()
        .filter(|e| matches!(e.event, Event::MessageAppended))
        .filter_map(|e| e.data.clone())
        .filter_map(|data| serde_json::from_value::<Message>(data).ok())
        .collect()
}
