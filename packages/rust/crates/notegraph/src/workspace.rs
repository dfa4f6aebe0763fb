//! Workspace descriptor persisted as `workspace.json` in the config home.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NoteGraphError, Result};

/// Default descriptor file name.
pub const DEFAULT_DESCRIPTOR_FILE: &str = "workspace.json";

/// Location of the note tree plus last full scan time.
///
/// Keys the core does not own are kept in `extra` and written back as read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDescriptor {
    /// Absolute root of the note tree.
    pub storage_path: PathBuf,
    /// Milliseconds since the Unix epoch of the last successful full scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scan_time: Option<i64>,
    /// Fields owned by other components.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkspaceDescriptor {
    /// Descriptor for a tree that was never scanned.
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            last_scan_time: None,
            extra: Map::new(),
        }
    }

    /// Stamp `last_scan_time` with the current time and return it.
    pub fn touch_scan_time(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_scan_time = Some(now);
        now
    }
}

/// Reads and writes the descriptor file.
#[derive(Debug, Clone)]
pub struct WorkspaceDescriptorFile {
    path: PathBuf,
}

impl WorkspaceDescriptorFile {
    /// Descriptor at an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Descriptor file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the descriptor; `Ok(None)` when the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<Option<WorkspaceDescriptor>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(NoteGraphError::io(&self.path, e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| NoteGraphError::Descriptor {
                path: self.path.clone(),
                source,
            })
    }

    /// Persist the descriptor, creating the config home if needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory or file cannot be written.
    pub async fn save(&self, descriptor: &WorkspaceDescriptor) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| NoteGraphError::io(parent, e))?;
        }
        let content =
            serde_json::to_string(descriptor).map_err(|source| NoteGraphError::Descriptor {
                path: self.path.clone(),
                source,
            })?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| NoteGraphError::io(&self.path, e))
    }
}
