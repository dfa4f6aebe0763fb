//! Integration tests for full scans through the `NoteGraph` engine.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use notegraph::{
    Edge, EventBus, GraphStore, MemoryGraphStore, NoteGraph, NoteRecord, WorkspaceDescriptor,
    WorkspaceDescriptorFile, topics,
};
use serde_json::Value;
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

async fn engine_for(
    tmp: &TempDir,
) -> Result<(NoteGraph, Arc<MemoryGraphStore>), Box<dyn std::error::Error>> {
    let descriptor = WorkspaceDescriptorFile::new(tmp.path().join("config/workspace.json"));
    descriptor
        .save(&WorkspaceDescriptor::new(tmp.path().join("notes")))
        .await?;
    let store = Arc::new(MemoryGraphStore::new());
    let engine = NoteGraph::new(descriptor, store.clone(), EventBus::default());
    Ok((engine, store))
}

fn sorted_edges(edges: Vec<notegraph::KeyedEdge>) -> Vec<Edge> {
    let mut edges: Vec<Edge> = edges.into_iter().map(|keyed| keyed.edge).collect();
    edges.sort();
    edges
}

#[tokio::test]
async fn test_scan_indexes_visible_notes_and_links() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let notes = tmp.path().join("notes");
    write_file(
        &notes.join("index.md"),
        "[Plan](projects/plan.md#todo) [Site](https://example.com) [Top](#top)\n",
    )?;
    write_file(&notes.join("projects/plan.md"), "[Home](index.md)\n")?;
    write_file(&notes.join("board.excalidraw"), "{}")?;
    write_file(&notes.join("paper.pdf"), "%PDF")?;
    write_file(&notes.join(".secret.md"), "[x](index.md)")?;
    write_file(&notes.join(".trash/old.md"), "[x](index.md)")?;

    let (engine, store) = engine_for(&tmp).await?;
    let report = engine.run_full_scan().await?.ok_or("scan skipped")?;

    assert_eq!(report.notes, 3);
    assert_eq!(report.edges, 2);
    assert_eq!(report.skipped_files, 1);
    assert_eq!(
        store.list_notes().await?,
        vec![
            NoteRecord::new("board.excalidraw"),
            NoteRecord::new("index.md"),
            NoteRecord::new("projects/plan.md"),
        ]
    );
    assert_eq!(
        sorted_edges(store.list_edges().await?),
        vec![
            Edge::new("index.md", "projects/plan.md"),
            Edge::new("projects/plan.md", "index.md"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_rescan_is_idempotent_and_keeps_dangling_edges()
-> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let notes = tmp.path().join("notes");
    write_file(&notes.join("a.md"), "[Gone](missing.md) [B](b.md) [B](b.md)")?;
    write_file(&notes.join("b.md"), "no links")?;

    let (engine, store) = engine_for(&tmp).await?;
    engine.run_full_scan().await?;
    let first_notes = store.list_notes().await?;
    let first_edges = sorted_edges(store.list_edges().await?);
    engine.run_full_scan().await?;

    assert_eq!(store.list_notes().await?, first_notes);
    assert_eq!(sorted_edges(store.list_edges().await?), first_edges);
    assert_eq!(first_edges.len(), 3);

    let stats = store.stats().await?;
    assert_eq!(stats.total_notes, 2);
    assert_eq!(stats.dangling_edges, 1);
    Ok(())
}

#[tokio::test]
async fn test_scan_clears_records_of_deleted_files() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let notes = tmp.path().join("notes");
    write_file(&notes.join("a.md"), "[B](b.md)")?;
    write_file(&notes.join("b.md"), "")?;

    let (engine, store) = engine_for(&tmp).await?;
    engine.run_full_scan().await?;
    fs::remove_file(notes.join("a.md"))?;
    engine.run_full_scan().await?;

    assert_eq!(store.list_notes().await?, vec![NoteRecord::new("b.md")]);
    assert!(store.list_edges().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_scan_without_descriptor_touches_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let store = Arc::new(MemoryGraphStore::new());
    store.put_note(&NoteRecord::new("kept.md")).await?;
    let engine = NoteGraph::new(
        WorkspaceDescriptorFile::new(tmp.path().join("workspace.json")),
        store.clone(),
        EventBus::default(),
    );

    assert!(engine.run_full_scan().await?.is_none());
    assert_eq!(store.list_notes().await?, vec![NoteRecord::new("kept.md")]);
    assert!(!tmp.path().join("workspace.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_scan_stamps_descriptor_and_publishes_event() -> Result<(), Box<dyn std::error::Error>>
{
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("notes/a.md"), "[B](b.md)")?;
    let (engine, _store) = engine_for(&tmp).await?;
    let mut events = engine.subscribe();

    let before = now_ms();
    let report = engine.run_full_scan().await?.ok_or("scan skipped")?;

    let descriptor = engine
        .descriptor_file()
        .load()
        .await?
        .ok_or("descriptor missing")?;
    let stamped = descriptor.last_scan_time.ok_or("lastScanTime missing")?;
    assert!(stamped >= before);
    assert_eq!(report.scanned_at, Some(stamped));

    let event = events.recv().await?;
    assert!(event.is(topics::SCAN_COMPLETE));
    assert_eq!(event.payload.get("edges").and_then(Value::as_u64), Some(1));
    Ok(())
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}
