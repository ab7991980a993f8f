use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted import progress for one entry of one source.
///
/// `marker` identifies the entry revision the progress belongs to (content
/// hash, etag, size and mtime). Progress recorded against a different marker
/// is stale and the entry starts over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub source: String,
    pub entry: String,
    pub marker: String,
    pub committed_records: usize,
    pub complete: bool,
    pub updated_at: DateTime<Utc>,
}

impl ImportProgress {
    pub fn new(
        source: impl Into<String>,
        entry: impl Into<String>,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            entry: entry.into(),
            marker: marker.into(),
            committed_records: 0,
            complete: false,
            updated_at: Utc::now(),
        }
    }

    /// `true` when the entry at `marker` has been fully imported.
    pub fn is_done_for(&self, marker: &str) -> bool {
        self.complete && self.marker == marker
    }

    /// Progress to continue from for the entry at `marker`. Progress of
    /// another revision starts over at record 0.
    pub fn resume_for(self, marker: &str) -> Self {
        if self.marker == marker {
            self
        } else {
            Self::new(self.source, self.entry, marker)
        }
    }
}
