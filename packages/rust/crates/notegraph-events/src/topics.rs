//! Event topic constants for type-safe routing.

/// Full scan finished and the graph index was rebuilt.
pub const SCAN_COMPLETE: &str = "graph/scan_complete";
/// Rename reconciliation finished rewriting references.
pub const LINKS_UPDATED: &str = "graph/links_updated";

/// Localization key the UI resolves for the links-updated notification.
pub const LINKS_UPDATED_MESSAGE_KEY: &str = "links-updated";
