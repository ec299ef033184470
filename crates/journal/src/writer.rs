//! Append-only per-session JSONL writer.
//!
//! Each session's stream file lives at the path its own session ID
//! partitions to, so no separate index is needed to find it again.

use std::io::Write;

use thinksuit_core::{Entry, PathBase, PathService, SortableId};

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub struct JournalWriter {
    paths: PathService,
}

impl JournalWriter {
    pub fn new(paths: PathService) -> Self {
        Self { paths }
    }

    /// Append one entry to the session's stream file, creating the
    /// partitioned directory on first write. Flushed synchronously so a
    /// process crash loses at most this one in-flight entry.
    pub fn append(&self, session_id: &str, entry: &Entry) -> Result<(), JournalError> {
        let id = parse_session_id(session_id)?;
        let path = self.paths.ensure_path_for(PathBase::SessionStreams, &id)?;
        let line = serde_json::to_string(entry)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        writeln!(file, "{line}")?;
        file.sync_data()?;
        Ok(())
    }

    /// Tolerant read: malformed lines are skipped with a warning rather
    /// than failing the whole read.
    pub fn read_all(&self, session_id: &str) -> Result<Vec<Entry>, JournalError> {
        let id = parse_session_id(session_id)?;
        let path = self.paths.path_for(PathBase::SessionStreams, &id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&path)?;
        let mut entries = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Entry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(session_id, error = %e, "skipping malformed journal line");
                }
            }
        }
        Ok(entries)
    }

    /// Read the suffix of a session's entries starting at `from_index`.
    pub fn read_from(&self, session_id: &str, from_index: usize) -> Result<Vec<Entry>, JournalError> {
        let all = self.read_all(session_id)?;
        Ok(all.into_iter().skip(from_index).collect())
    }
}

fn parse_session_id(session_id: &str) -> Result<SortableId, JournalError> {
    let id = SortableId::from_existing(session_id);
    if id.date_parts().is_none() {
        return Err(JournalError::InvalidSessionId(session_id.to_string()));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use thinksuit_core::Event;

    fn writer() -> (tempfile::TempDir, JournalWriter) {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathService::new(dir.path().to_path_buf());
        (dir, JournalWriter::new(paths))
    }

    #[test]
    fn append_then_read_round_trips() {
        let (_dir, writer) = writer();
        let id = SortableId::new();
        let entry = Entry::new(id.as_str(), Event::SessionStarted, "trace-1");
        writer.append(id.as_str(), &entry).unwrap();

        let entries = writer.read_all(id.as_str()).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0].event, Event::SessionStarted));
    }

    #[test]
    fn read_from_offset_returns_suffix() {
        let (_dir, writer) = writer();
        let id = SortableId::new();
        for _ in 0..3 {
            writer
                .append(id.as_str(), &Entry::new(id.as_str(), Event::SessionInput, "t"))
                .unwrap();
        }
        let suffix = writer.read_from(id.as_str(), 2).unwrap();
        assert_eq!(suffix.len(), 1);
    }

    #[test]
    fn read_nonexistent_session_is_empty() {
        let (_dir, writer) = writer();
        let id = SortableId::new();
        assert!(writer.read_all(id.as_str()).unwrap().is_empty());
    }

    #[test]
    fn tolerant_read_skips_malformed_lines() {
        let (dir, writer) = writer();
        let id = SortableId::new();
        writer
            .append(id.as_str(), &Entry::new(id.as_str(), Event::SessionStarted, "t"))
            .unwrap();

        let paths = PathService::new(dir.path().to_path_buf());
        let path = paths.path_for(PathBase::SessionStreams, &id);
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json").unwrap();
        writer
            .append(id.as_str(), &Entry::new(id.as_str(), Event::SessionInput, "t"))
            .unwrap();

        let entries = writer.read_all(id.as_str()).unwrap();
        assert_eq!(entries.len(), 2);
    }
}
