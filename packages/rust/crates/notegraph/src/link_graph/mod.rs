//! Markdown note link graph: identity, parsing, traversal, index, rebuild
//! and rename reconciliation.

mod models;
mod parser;
mod rename;
mod scan;
mod store;
mod walker;

pub use models::{Edge, EdgeKey, GraphStats, KeyedEdge, NoteRecord};
pub use parser::{NoteId, NoteKind, RawLink, extract_edges, scan_links};
pub use rename::{ReferencePattern, ReferenceRewrite, RenameReport, reconcile_rename};
pub use scan::{ScanReport, rebuild_index};
pub use store::{
    GraphStore, GraphStoreBackend, GraphStoreConfig, MemoryGraphStore, SqliteGraphStore,
};
pub use walker::{TreeVisitor, WalkEntry, is_hidden_name, walk_tree};
