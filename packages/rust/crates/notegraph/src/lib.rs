//! notegraph - Workspace scanner and backlink graph index for markdown note trees.
//!
//! Module layout (by domain):
//! - `link_graph`: note identity, link grammar, tree walk, graph index, full
//!   rebuild and rename reconciliation
//! - `workspace`: `workspace.json` descriptor (storage root, last scan time)
//! - `runtime_config`: YAML settings merged from defaults, user file and env
//! - `engine`: `NoteGraph`, the serialized entry points plus event publishing
//!
//! # Examples
//!
//! ```rust
//! use std::path::Path;
//! use notegraph::{NoteId, extract_edges};
//!
//! let source = NoteId::new("index.md");
//! let edges: Vec<_> = extract_edges(&source, "see [Plan](projects/plan.md#todo)", Path::new("/notes"))
//!     .collect();
//! assert_eq!(edges.len(), 1);
//! assert_eq!(edges[0].target.as_str(), "projects/plan.md");
//! ```

mod engine;
mod error;
pub mod link_graph;
pub mod runtime_config;
pub mod workspace;

pub use engine::NoteGraph;
pub use error::{NoteGraphError, Result};
pub use link_graph::{
    Edge, EdgeKey, GraphStats, GraphStore, GraphStoreBackend, GraphStoreConfig, KeyedEdge,
    MemoryGraphStore, NoteId, NoteKind, NoteRecord, RawLink, ReferencePattern, ReferenceRewrite,
    RenameReport, ScanReport, SqliteGraphStore, TreeVisitor, WalkEntry, extract_edges,
    is_hidden_name, rebuild_index, reconcile_rename, scan_links, walk_tree,
};
pub use runtime_config::{NoteGraphSettings, SettingsSources};
pub use workspace::{DEFAULT_DESCRIPTOR_FILE, WorkspaceDescriptor, WorkspaceDescriptorFile};

pub use notegraph_events::{EventBus, GraphEvent, topics};
