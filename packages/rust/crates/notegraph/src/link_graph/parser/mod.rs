//! Note identity and markdown link parsing.

mod links;
mod paths;

pub(crate) use self::paths::encode_link_target;
pub use self::links::{RawLink, extract_edges, scan_links};
pub use self::paths::{NoteId, NoteKind};
