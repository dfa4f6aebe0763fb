//! Clear-then-rebuild of the graph index from the storage tree.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::models::{Edge, NoteRecord};
use super::parser::{NoteId, NoteKind, extract_edges};
use super::store::GraphStore;
use super::walker::{TreeVisitor, WalkEntry, walk_tree};
use crate::error::{NoteGraphError, Result};

/// Counters of one full scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Note records written.
    pub notes: usize,
    /// Edge records written.
    pub edges: usize,
    /// Directories visited.
    pub directories: usize,
    /// Non-hidden files without a recognized note extension.
    pub skipped_files: usize,
    /// `lastScanTime` recorded for this scan (ms since epoch).
    pub scanned_at: Option<i64>,
}

struct ScanVisitor<'a> {
    root: &'a Path,
    store: &'a dyn GraphStore,
    report: ScanReport,
}

#[async_trait]
impl TreeVisitor for ScanVisitor<'_> {
    async fn visit_file(&mut self, entry: &WalkEntry) -> Result<()> {
        let Some(kind) = NoteKind::from_path(&entry.path) else {
            self.report.skipped_files += 1;
            return Ok(());
        };
        let note_id = NoteId::from_path(&entry.path, self.root);
        self.store.put_note(&NoteRecord::new(note_id.clone())).await?;
        self.report.notes += 1;

        if !kind.carries_links() {
            return Ok(());
        }
        let content = tokio::fs::read_to_string(&entry.path)
            .await
            .map_err(|e| NoteGraphError::io(&entry.path, e))?;
        // Collected first: the regex iterator must not live across an await.
        let outbound: Vec<Edge> = extract_edges(&note_id, &content, self.root).collect();
        let edges = outbound.len();
        for edge in &outbound {
            self.store.put_edge(edge).await?;
        }
        self.report.edges += edges;
        tracing::trace!(
            event = "scan.note_indexed",
            note_id = %note_id,
            edges,
            "note indexed"
        );
        Ok(())
    }

    async fn visit_directory(&mut self, entry: &WalkEntry) -> Result<()> {
        // Directories carry no index records yet.
        self.report.directories += 1;
        tracing::trace!(
            event = "scan.directory_visited",
            path = %entry.path.display(),
            "directory visited"
        );
        Ok(())
    }
}

/// Clear both collections and repopulate them from the tree under `root`.
///
/// # Errors
///
/// The first I/O or store error aborts the rebuild. The collections are
/// already cleared at that point and stay partial until the next run.
pub async fn rebuild_index(root: &Path, store: &dyn GraphStore) -> Result<ScanReport> {
    store.clear_notes().await?;
    store.clear_edges().await?;

    let mut visitor = ScanVisitor {
        root,
        store,
        report: ScanReport::default(),
    };
    walk_tree(root, &mut visitor).await?;
    Ok(visitor.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link_graph::store::MemoryGraphStore;
    use std::fs;

    #[tokio::test]
    async fn test_diagrams_are_indexed_without_links()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        fs::write(tmp.path().join("board.excalidraw"), "[x](a.md)")?;
        fs::write(tmp.path().join("paper.pdf"), "%PDF")?;

        let store = MemoryGraphStore::new();
        let report = rebuild_index(tmp.path(), &store).await?;

        assert_eq!(report.notes, 1);
        assert_eq!(report.edges, 0);
        assert_eq!(report.skipped_files, 1);
        assert_eq!(
            store.list_notes().await?,
            vec![NoteRecord::new("board.excalidraw")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_read_failure_aborts_and_leaves_index_cleared()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        // Not valid UTF-8, so reading it as text fails.
        fs::write(tmp.path().join("broken.md"), [0xff_u8, 0xfe, 0x00])?;

        let store = MemoryGraphStore::new();
        store.put_note(&NoteRecord::new("stale.md")).await?;
        store.put_edge(&Edge::new("stale.md", "other.md")).await?;

        let outcome = rebuild_index(tmp.path(), &store).await;

        assert!(matches!(outcome, Err(NoteGraphError::Io { .. })));
        assert!(store.list_edges().await?.is_empty());
        let notes = store.list_notes().await?;
        assert!(!notes.contains(&NoteRecord::new("stale.md")));
        Ok(())
    }
}
