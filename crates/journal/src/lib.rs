//! The event journal: append-only per-session JSONL storage with live
//! subscription fan-out, plus pure projection helpers.

pub mod bus;
pub mod derive;
pub mod writer;

use thinksuit_core::{Entry, PathService};

pub use bus::SubscriptionBus;
pub use derive::{build_thread, derive_status, SessionStatus};
pub use writer::{JournalError, JournalWriter};

/// The Journal: owns the write side of every session's file and the live
/// subscription bus. A session's entries are always appended here and
/// nowhere else.
pub struct Journal {
    writer: JournalWriter,
    bus: SubscriptionBus,
}

impl Journal {
    pub fn new(paths: PathService) -> Self {
        Self {
            writer: JournalWriter::new(paths),
            bus: SubscriptionBus::new(),
        }
    }

    /// Append an entry, then publish it to any live subscribers. This
    /// ordering matters: a subscriber that joins between the disk write
    /// and the publish will still see the entry exactly once, via either
    /// the publish or a subsequent `read_from`.
    pub fn append(&self, session_id: &str, entry: Entry) -> Result<(), JournalError> {
        self.writer.append(session_id, &entry)?;
        self.bus.publish(session_id, &entry);
        Ok(())
    }

    pub fn read_all(&self, session_id: &str) -> Result<Vec<Entry>, JournalError> {
        self.writer.read_all(session_id)
    }

    pub fn read_from(&self, session_id: &str, from_index: usize) -> Result<Vec<Entry>, JournalError> {
        self.writer.read_from(session_id, from_index)
    }

    pub fn subscribe(&self, session_id: &str) -> tokio::sync::broadcast::Receiver<Entry> {
        self.bus.subscribe(session_id)
    }

    pub fn cleanup_if_idle(&self, session_id: &str, session_busy: bool) {
        self.bus.cleanup_if_idle(session_id, session_busy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thinksuit_core::{Event, SortableId};

    #[tokio::test]
    async fn append_persists_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(PathService::new(dir.path().to_path_buf()));
        let id = SortableId::new();
        let mut rx = journal.subscribe(id.as_str());

        journal
            .append(id.as_str(), Entry::new(id.as_str(), Event::SessionStarted, "t"))
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert!(matches!(received.event, Event::SessionStarted));

        let persisted = journal.read_all(id.as_str()).unwrap();
        assert_eq!(persisted.len(), 1);
    }

    #[test]
    fn subscribe_then_read_from_covers_exactly_the_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(PathService::new(dir.path().to_path_buf()));
        let id = SortableId::new();

        journal
            .append(id.as_str(), Entry::new(id.as_str(), Event::SessionStarted, "t"))
            .unwrap();
        journal
            .append(id.as_str(), Entry::new(id.as_str(), Event::SessionInput, "t"))
            .unwrap();

        let len_at_t = journal.read_all(id.as_str()).unwrap().len();

        journal
            .append(id.as_str(), Entry::new(id.as_str(), Event::SessionResponse, "t"))
            .unwrap();

        let suffix = journal.read_from(id.as_str(), len_at_t).unwrap();
        assert_eq!(suffix.len(), 1);
        assert!(matches!(suffix[0].event, Event::SessionResponse));
    }
}
