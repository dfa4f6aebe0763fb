use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::GraphStore;
use crate::error::{NoteGraphError, Result};
use crate::link_graph::models::{Edge, EdgeKey, GraphStats, KeyedEdge, NoteRecord};
use crate::link_graph::parser::NoteId;

#[derive(Debug, Default)]
struct MemoryState {
    notes: BTreeSet<NoteId>,
    links: BTreeMap<EdgeKey, Edge>,
    by_pair: HashMap<(NoteId, NoteId), BTreeSet<EdgeKey>>,
    next_key: i64,
}

impl MemoryState {
    fn unindex(&mut self, key: EdgeKey, edge: &Edge) {
        let pair = (edge.source.clone(), edge.target.clone());
        if let Some(keys) = self.by_pair.get_mut(&pair) {
            keys.remove(&key);
            if keys.is_empty() {
                self.by_pair.remove(&pair);
            }
        }
    }

    fn index(&mut self, key: EdgeKey, edge: &Edge) {
        self.by_pair
            .entry((edge.source.clone(), edge.target.clone()))
            .or_default()
            .insert(key);
    }

    fn keyed_where(&self, keep: impl Fn(&Edge) -> bool) -> Vec<KeyedEdge> {
        self.links
            .iter()
            .filter(|(_, edge)| keep(edge))
            .map(|(key, edge)| KeyedEdge {
                key: *key,
                edge: edge.clone(),
            })
            .collect()
    }
}

/// In-process graph index (single process only, not persisted).
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    state: Mutex<MemoryState>,
}

impl MemoryGraphStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn clear_notes(&self) -> Result<()> {
        self.state.lock().await.notes.clear();
        Ok(())
    }

    async fn clear_edges(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.links.clear();
        state.by_pair.clear();
        Ok(())
    }

    async fn put_note(&self, note: &NoteRecord) -> Result<()> {
        self.state.lock().await.notes.insert(note.note_id.clone());
        Ok(())
    }

    async fn put_edge(&self, edge: &Edge) -> Result<EdgeKey> {
        let mut state = self.state.lock().await;
        state.next_key += 1;
        let key = EdgeKey(state.next_key);
        state.index(key, edge);
        state.links.insert(key, edge.clone());
        Ok(key)
    }

    async fn find_edge_key(&self, source: &NoteId, target: &NoteId) -> Result<Option<EdgeKey>> {
        let state = self.state.lock().await;
        Ok(state
            .by_pair
            .get(&(source.clone(), target.clone()))
            .and_then(|keys| keys.first().copied()))
    }

    async fn update_edge_target(&self, key: EdgeKey, new_target: &NoteId) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(previous) = state.links.get(&key).cloned() else {
            return Err(NoteGraphError::EdgeNotFound(key));
        };
        state.unindex(key, &previous);
        let updated = Edge::new(previous.source, new_target.clone());
        state.index(key, &updated);
        state.links.insert(key, updated);
        Ok(())
    }

    async fn list_notes(&self) -> Result<Vec<NoteRecord>> {
        let state = self.state.lock().await;
        Ok(state.notes.iter().cloned().map(NoteRecord::new).collect())
    }

    async fn list_edges(&self) -> Result<Vec<KeyedEdge>> {
        Ok(self.state.lock().await.keyed_where(|_| true))
    }

    async fn backlinks(&self, target: &NoteId) -> Result<Vec<KeyedEdge>> {
        Ok(self
            .state
            .lock()
            .await
            .keyed_where(|edge| &edge.target == target))
    }

    async fn outlinks(&self, source: &NoteId) -> Result<Vec<KeyedEdge>> {
        Ok(self
            .state
            .lock()
            .await
            .keyed_where(|edge| &edge.source == source))
    }

    async fn stats(&self) -> Result<GraphStats> {
        let state = self.state.lock().await;
        let dangling_edges = state
            .links
            .values()
            .filter(|edge| !state.notes.contains(&edge.target))
            .count();
        Ok(GraphStats {
            total_notes: state.notes.len(),
            total_edges: state.links.len(),
            dangling_edges,
        })
    }
}
