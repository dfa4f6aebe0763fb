//! Note identity derived from paths and link targets.

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// Encoded form of a space inside a markdown link target.
const SPACE_ENCODED: &str = "%20";

pub(crate) fn normalize_slashes(raw: &str) -> String {
    raw.replace('\\', "/")
}

/// Stable note identifier: the note's path relative to the storage root,
/// `/`-separated, extension kept as the file has it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Wrap an already canonical identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Derive the identifier of a file found under `root`.
    ///
    /// Paths outside `root` keep their normal components; root and prefix
    /// components are dropped.
    #[must_use]
    pub fn from_path(path: &Path, root: &Path) -> Self {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let joined = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<String>>()
            .join("/");
        Self(joined)
    }

    /// Resolve the path portion of a link target into an identifier.
    ///
    /// Targets are workspace-relative, not relative to the referencing note.
    /// A leading `<root>/` and any leading `./` segments are dropped.
    #[must_use]
    pub fn from_link_target(raw: &str, root: &Path) -> Self {
        let normalized = normalize_slashes(raw);
        let root_prefix = format!(
            "{}/",
            normalize_slashes(&root.to_string_lossy()).trim_end_matches('/')
        );
        let mut relative = normalized
            .strip_prefix(root_prefix.as_str())
            .unwrap_or(normalized.as_str());
        while let Some(rest) = relative.strip_prefix("./") {
            relative = rest;
        }
        Self(relative.replace(SPACE_ENCODED, " "))
    }

    /// Form used inside `(...)` of a markdown link: spaces percent-encoded.
    #[must_use]
    pub fn to_link_target(&self) -> String {
        encode_link_target(&self.0)
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the identifier text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

pub(crate) fn encode_link_target(raw: &str) -> String {
    raw.replace(' ', SPACE_ENCODED)
}

/// Kind of note file recognized by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// Markdown text note; the only kind scanned for links.
    Text,
    /// Excalidraw diagram; indexed for identity only.
    Diagram,
}

impl NoteKind {
    /// Classify by file extension (ASCII case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("md") {
            Some(Self::Text)
        } else if ext.eq_ignore_ascii_case("excalidraw") {
            Some(Self::Diagram)
        } else {
            None
        }
    }

    /// Whether content of this kind goes through the link extractor.
    #[must_use]
    pub const fn carries_links(self) -> bool {
        matches!(self, Self::Text)
    }
}
