//! Graph index: persisted note and edge collections.

mod memory;
mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::models::{Edge, EdgeKey, GraphStats, KeyedEdge, NoteRecord};
use super::parser::NoteId;
use crate::error::Result;

pub use self::memory::MemoryGraphStore;
pub use self::sqlite::SqliteGraphStore;

/// Backend options for the graph index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphStoreBackend {
    /// In-process maps; contents vanish with the process.
    Memory,
    /// SQLite database file.
    Sqlite {
        /// Database file, created on first open.
        path: PathBuf,
    },
}

/// Runtime config for the graph index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStoreConfig {
    /// Backend mode.
    pub backend: GraphStoreBackend,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            backend: GraphStoreBackend::Memory,
        }
    }
}

impl GraphStoreConfig {
    /// Open the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error when the SQLite file or its schema cannot be created.
    pub fn build_store(&self) -> Result<Arc<dyn GraphStore>> {
        match &self.backend {
            GraphStoreBackend::Memory => {
                tracing::info!(
                    event = "graph_store.initialized",
                    backend = "memory",
                    "graph index backend initialized"
                );
                Ok(Arc::new(MemoryGraphStore::new()))
            }
            GraphStoreBackend::Sqlite { path } => {
                let store = SqliteGraphStore::open(path)?;
                tracing::info!(
                    event = "graph_store.initialized",
                    backend = "sqlite",
                    path = %path.display(),
                    "graph index backend initialized"
                );
                Ok(Arc::new(store))
            }
        }
    }

    /// Human-readable backend name for logs.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            GraphStoreBackend::Memory => "memory",
            GraphStoreBackend::Sqlite { .. } => "sqlite",
        }
    }
}

/// Note and edge collections with a composite `(source, target)` index.
///
/// Notes and edges are keyed independently; edge endpoints are opaque and
/// never checked against the note collection.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Remove every note record.
    async fn clear_notes(&self) -> Result<()>;

    /// Remove every edge record.
    async fn clear_edges(&self) -> Result<()>;

    /// Insert or overwrite by `note_id`.
    async fn put_note(&self, note: &NoteRecord) -> Result<()>;

    /// Append an edge and return its new key. Duplicates are not rejected.
    async fn put_edge(&self, edge: &Edge) -> Result<EdgeKey>;

    /// Exact-match lookup; the lowest key wins when several edges match.
    async fn find_edge_key(&self, source: &NoteId, target: &NoteId) -> Result<Option<EdgeKey>>;

    /// Point `key` at `new_target`, leaving its source unchanged.
    ///
    /// Fails with [`crate::NoteGraphError::EdgeNotFound`] for an unknown key.
    async fn update_edge_target(&self, key: EdgeKey, new_target: &NoteId) -> Result<()>;

    /// All note records, ordered by id.
    async fn list_notes(&self) -> Result<Vec<NoteRecord>>;

    /// All edge records, ordered by key.
    async fn list_edges(&self) -> Result<Vec<KeyedEdge>>;

    /// Edges pointing at `target`.
    async fn backlinks(&self, target: &NoteId) -> Result<Vec<KeyedEdge>>;

    /// Edges leaving `source`.
    async fn outlinks(&self, source: &NoteId) -> Result<Vec<KeyedEdge>>;

    /// Collection sizes.
    async fn stats(&self) -> Result<GraphStats>;
}
