//! Error types for scanning, reconciliation and graph index access.

use std::path::PathBuf;

use thiserror::Error;

use crate::link_graph::EdgeKey;

/// Crate-wide result alias.
pub type Result<T, E = NoteGraphError> = std::result::Result<T, E>;

/// Failure modes of the note graph core.
///
/// A missing workspace descriptor is not an error: entry points return
/// `Ok(None)` for it.
#[derive(Error, Debug)]
pub enum NoteGraphError {
    /// Filesystem failure while listing, reading or writing `path`.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path the operation touched.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Workspace descriptor exists but is not valid JSON for its schema.
    #[error("invalid workspace descriptor {}: {source}", path.display())]
    Descriptor {
        /// Descriptor file.
        path: PathBuf,
        /// Parse or serialize error.
        #[source]
        source: serde_json::Error,
    },

    /// Runtime settings could not be loaded.
    #[error("invalid settings {}: {message}", path.display())]
    Settings {
        /// Settings file (or config home) involved.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// A note identifier could not be turned into a reference pattern.
    #[error("cannot build reference pattern for '{note_id}': {source}")]
    ReferencePattern {
        /// Identifier being renamed.
        note_id: String,
        /// Regex construction error.
        #[source]
        source: regex::Error,
    },

    /// Graph index backend error.
    #[error("graph index error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// `update_edge_target` was given a key with no edge behind it.
    #[error("edge not found for key {0}")]
    EdgeNotFound(EdgeKey),

    /// The graph index lock was poisoned by a panicking writer.
    #[error("graph index lock poisoned")]
    StoreLock,

    /// A blocking graph index task failed to complete.
    #[error("graph index task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl NoteGraphError {
    /// Wrap an `std::io::Error` with the path it concerns.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
