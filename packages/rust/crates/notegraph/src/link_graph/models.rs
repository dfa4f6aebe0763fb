use std::fmt;

use serde::{Deserialize, Serialize};

use super::parser::NoteId;

/// Note record: identity only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteRecord {
    /// Primary key.
    pub note_id: NoteId,
}

impl NoteRecord {
    /// Record for `note_id`.
    pub fn new(note_id: impl Into<NoteId>) -> Self {
        Self {
            note_id: note_id.into(),
        }
    }
}

/// Directed reference from `source` to `target`.
///
/// `target` may name a note that does not exist (dangling edge).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Referencing note.
    pub source: NoteId,
    /// Referenced note.
    pub target: NoteId,
}

impl Edge {
    /// Edge `source -> target`.
    pub fn new(source: impl Into<NoteId>, target: impl Into<NoteId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Store-assigned edge key. Keys are never reused, even after a clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeKey(pub i64);

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Edge together with its store key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedEdge {
    /// Store key.
    pub key: EdgeKey,
    /// Edge payload.
    #[serde(flatten)]
    pub edge: Edge,
}

/// Collection sizes of the graph index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Note records.
    pub total_notes: usize,
    /// Edge records.
    pub total_edges: usize,
    /// Edges whose target has no note record.
    pub dangling_edges: usize,
}
