//! Engine tying the descriptor, graph index and event bus together.

use std::path::PathBuf;
use std::sync::Arc;

use notegraph_events::{EventBus, GraphEvent, SOURCE_NOTEGRAPH, topics};
use serde_json::json;
use tokio::sync::{Mutex, broadcast};

use crate::error::Result;
use crate::link_graph::{
    GraphStore, NoteId, RenameReport, ScanReport, rebuild_index, reconcile_rename,
};
use crate::runtime_config::NoteGraphSettings;
use crate::workspace::{WorkspaceDescriptor, WorkspaceDescriptorFile};

/// Entry points for full scans and rename reconciliation.
///
/// Both operations hold the operation lock for their whole run, so they
/// never interleave within one engine.
pub struct NoteGraph {
    descriptor: WorkspaceDescriptorFile,
    store: Arc<dyn GraphStore>,
    bus: EventBus,
    op_lock: Mutex<()>,
}

impl NoteGraph {
    /// Engine over explicit parts.
    #[must_use]
    pub fn new(descriptor: WorkspaceDescriptorFile, store: Arc<dyn GraphStore>, bus: EventBus) -> Self {
        Self {
            descriptor,
            store,
            bus,
            op_lock: Mutex::new(()),
        }
    }

    /// Engine from resolved settings; opens the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error when the graph index cannot be opened.
    pub fn from_settings(settings: &NoteGraphSettings) -> Result<Self> {
        let store = settings.store.build_store()?;
        Ok(Self::new(
            WorkspaceDescriptorFile::new(&settings.descriptor_path),
            store,
            EventBus::new(settings.event_capacity),
        ))
    }

    /// Graph index handle for read queries.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Descriptor file location.
    #[must_use]
    pub fn descriptor_file(&self) -> &WorkspaceDescriptorFile {
        &self.descriptor
    }

    /// Receive `graph/*` events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.bus.subscribe()
    }

    /// Point the descriptor at `storage_path`, keeping any other fields.
    ///
    /// # Errors
    ///
    /// Returns an error when the descriptor cannot be read or written.
    pub async fn initialize(&self, storage_path: impl Into<PathBuf>) -> Result<WorkspaceDescriptor> {
        let _guard = self.op_lock.lock().await;
        let storage_path = storage_path.into();
        let descriptor = match self.descriptor.load().await? {
            Some(mut existing) => {
                existing.storage_path = storage_path;
                existing
            }
            None => WorkspaceDescriptor::new(storage_path),
        };
        self.descriptor.save(&descriptor).await?;
        tracing::info!(
            event = "workspace.initialized",
            storage_path = %descriptor.storage_path.display(),
            descriptor = %self.descriptor.path().display(),
            "workspace descriptor written"
        );
        Ok(descriptor)
    }

    /// Rebuild the graph index from the storage tree.
    ///
    /// Returns `Ok(None)` without touching anything when no descriptor has
    /// been written yet.
    ///
    /// # Errors
    ///
    /// The first I/O, descriptor or store error aborts the scan.
    pub async fn run_full_scan(&self) -> Result<Option<ScanReport>> {
        let _guard = self.op_lock.lock().await;
        let Some(mut descriptor) = self.descriptor.load().await? else {
            tracing::debug!(event = "scan.skipped", "no workspace descriptor; scan skipped");
            return Ok(None);
        };

        tracing::info!(
            event = "scan.started",
            storage_path = %descriptor.storage_path.display(),
            "full scan started"
        );
        let mut report = rebuild_index(&descriptor.storage_path, self.store.as_ref()).await?;
        report.scanned_at = Some(descriptor.touch_scan_time());
        self.descriptor.save(&descriptor).await?;

        tracing::info!(
            event = "scan.completed",
            notes = report.notes,
            edges = report.edges,
            directories = report.directories,
            skipped_files = report.skipped_files,
            "full scan completed"
        );
        self.bus.emit(
            SOURCE_NOTEGRAPH,
            topics::SCAN_COMPLETE,
            serde_json::to_value(&report).unwrap_or_default(),
        );
        Ok(Some(report))
    }

    /// Rewrite references from `old_id` to `new_id` in files and edges.
    ///
    /// Returns `Ok(None)` without touching anything when no descriptor has
    /// been written yet.
    ///
    /// # Errors
    ///
    /// The first I/O or store error aborts; files already rewritten stay
    /// rewritten.
    pub async fn rename_note(
        &self,
        old_id: &NoteId,
        new_id: &NoteId,
    ) -> Result<Option<RenameReport>> {
        let _guard = self.op_lock.lock().await;
        let Some(descriptor) = self.descriptor.load().await? else {
            tracing::debug!(event = "rename.skipped", "no workspace descriptor; rename skipped");
            return Ok(None);
        };

        let report =
            reconcile_rename(&descriptor.storage_path, self.store.as_ref(), old_id, new_id).await?;
        tracing::info!(
            event = "rename.completed",
            old_id = %report.old_id,
            new_id = %report.new_id,
            files_rewritten = report.files_rewritten,
            edges_updated = report.edges_updated,
            "links updated"
        );
        self.bus.emit(
            SOURCE_NOTEGRAPH,
            topics::LINKS_UPDATED,
            json!({
                "old_id": report.old_id,
                "new_id": report.new_id,
                "files_rewritten": report.files_rewritten,
                "occurrences_replaced": report.occurrences_replaced,
                "edges_updated": report.edges_updated,
                "message_key": topics::LINKS_UPDATED_MESSAGE_KEY,
            }),
        );
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link_graph::MemoryGraphStore;

    fn engine_at(descriptor: PathBuf) -> NoteGraph {
        NoteGraph::new(
            WorkspaceDescriptorFile::new(descriptor),
            Arc::new(MemoryGraphStore::new()),
            EventBus::default(),
        )
    }

    #[tokio::test]
    async fn test_initialize_keeps_foreign_fields() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let tmp = tempfile::TempDir::new()?;
        let path = tmp.path().join("workspace.json");
        std::fs::write(&path, r#"{"storagePath":"/old","theme":"dark"}"#)?;

        let engine = engine_at(path.clone());
        let descriptor = engine.initialize(tmp.path().join("notes")).await?;

        assert_eq!(descriptor.storage_path, tmp.path().join("notes"));
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(raw["theme"], "dark");
        Ok(())
    }

    #[tokio::test]
    async fn test_operations_without_descriptor_return_none() -> Result<()> {
        let engine = engine_at(PathBuf::from("/nonexistent/notegraph/workspace.json"));
        assert!(engine.run_full_scan().await?.is_none());
        assert!(
            engine
                .rename_note(&NoteId::new("a.md"), &NoteId::new("b.md"))
                .await?
                .is_none()
        );
        Ok(())
    }
}
