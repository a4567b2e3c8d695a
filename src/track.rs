use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, info};

/// Tag attached to each observability entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Debug,
    Explain,
    Statement,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            TrackKind::Debug => "[DEBUG]",
            TrackKind::Explain => "[EXPLAIN]",
            TrackKind::Statement => "[STATEMENT]",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    pub kind: TrackKind,
    pub text: String,
}

impl fmt::Display for TrackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.text)
    }
}

/// Bounded, most-recent-first log of statements a connection ran.
///
/// Every entry is also forwarded to `tracing`, so subscribers see the same
/// stream without polling the container.
#[derive(Debug, Clone)]
pub struct TrackContainer {
    entries: VecDeque<TrackEntry>,
    capacity: usize,
}

impl TrackContainer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn push(&mut self, kind: TrackKind, text: impl Into<String>) {
        let text = text.into();
        match kind {
            TrackKind::Statement => info!(target: "mysql_middleware::sql", "{kind} {text}"),
            _ => debug!(target: "mysql_middleware::sql", "{kind} {text}"),
        }
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(TrackEntry { kind, text });
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &TrackEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&TrackEntry> {
        self.entries.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
