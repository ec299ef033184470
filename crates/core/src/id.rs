//! Lexicographically-sortable session/trace IDs and the path partitioning
//! scheme used to lay them out on disk.

use std::path::PathBuf;

use chrono::{DateTime, Datelike, Timelike, Utc};

/// The three storage bases an ID can be partitioned under (see the
/// persisted state layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathBase {
    SessionStreams,
    SessionMetadata,
    Traces,
}

/// A sortable identifier of the form `YYYYMMDDThhmmssSSSZ-<8-char-random>`.
///
/// ASCII-sortable: two IDs minted in order compare in minting order because
/// the timestamp prefix dominates the comparison and ties are broken by the
/// (non-sortable) random suffix, which only matters for same-millisecond
/// collisions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SortableId(String);

impl SortableId {
    /// Mint a new ID from the current wall-clock time.
    pub fn new() -> Self {
        Self::from_time(Utc::now())
    }

    /// Mint an ID from a specific instant (used in tests for determinism).
    pub fn from_time(time: DateTime<Utc>) -> Self {
        let stamp = time.format("%Y%m%dT%H%M%S%3fZ");
        let suffix = random_suffix();
        Self(format!("{stamp}-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an already-minted ID string (e.g. a session ID read back from
    /// disk or supplied by a caller) without minting a new one.
    pub fn from_existing(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse the `{year, month, day, hour}` quadruple out of the ID's
    /// timestamp prefix, used to partition it into a directory path.
    pub fn date_parts(&self) -> Option<(i32, u32, u32, u32)> {
        let stamp = self.0.split('-').next()?;
        // "YYYYMMDDThhmmssSSSZ"
        if stamp.len() < 19 {
            return None;
        }
        let year: i32 = stamp.get(0..4)?.parse().ok()?;
        let month: u32 = stamp.get(4..6)?.parse().ok()?;
        let day: u32 = stamp.get(6..8)?.parse().ok()?;
        let hour: u32 = stamp.get(9..11)?.parse().ok()?;
        Some((year, month, day, hour))
    }
}

impl Default for SortableId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SortableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DateTime<Utc>> for SortableId {
    fn from(time: DateTime<Utc>) -> Self {
        Self::from_time(time)
    }
}

/// An 8-character lowercase base32-ish random suffix, derived from a fresh
/// UUIDv4 so we don't pull in a dedicated RNG dependency for something this
/// small (see DESIGN.md Open Question decisions).
fn random_suffix() -> String {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";
    bytes[..8]
        .iter()
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect()
}

/// Resolve an ID to its partitioned path under `<home>/.thinksuit/<base>/YYYY/MM/DD/HH/<id>.<ext>`.
#[derive(Clone)]
pub struct PathService {
    home: PathBuf,
}

impl PathService {
    pub fn new(home: PathBuf) -> Self {
        Self { home }
    }

    /// The directory a given base is rooted under, for callers that need
    /// to walk every session (`listSessions`, fork-graph reconstruction)
    /// rather than resolve one ID at a time.
    pub fn base_dir_public(&self, base: PathBase) -> PathBuf {
        self.base_dir(base)
    }

    fn base_dir(&self, base: PathBase) -> PathBuf {
        match base {
            PathBase::SessionStreams => self.home.join(".thinksuit/sessions/streams"),
            PathBase::SessionMetadata => self.home.join(".thinksuit/sessions/metadata"),
            PathBase::Traces => self.home.join(".thinksuit/traces"),
        }
    }

    fn extension(base: PathBase) -> &'static str {
        match base {
            PathBase::SessionStreams | PathBase::Traces => "jsonl",
            PathBase::SessionMetadata => "json",
        }
    }

    /// The full file path for this ID under the given base. Does not touch
    /// the filesystem.
    pub fn path_for(&self, base: PathBase, id: &SortableId) -> PathBuf {
        let (year, month, day, hour) = id.date_parts().unwrap_or((1970, 1, 1, 0));
        self.base_dir(base)
            .join(format!("{year:04}"))
            .join(format!("{month:02}"))
            .join(format!("{day:02}"))
            .join(format!("{hour:02}"))
            .join(format!("{}.{}", id.as_str(), Self::extension(base)))
    }

    /// Resolve the path, creating any missing parent directories.
    pub fn ensure_path_for(&self, base: PathBase, id: &SortableId) -> std::io::Result<PathBuf> {
        let path = self.path_for(base, id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}
