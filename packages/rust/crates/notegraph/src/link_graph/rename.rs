//! Rewrite references to a renamed note across files and the graph index.

use std::path::Path;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::parser::{NoteId, NoteKind, encode_link_target};
use super::store::GraphStore;
use super::walker::{TreeVisitor, WalkEntry, walk_tree};
use crate::error::{NoteGraphError, Result};

/// Counters of one rename reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameReport {
    /// Identifier that was renamed.
    pub old_id: NoteId,
    /// Identifier references now point at.
    pub new_id: NoteId,
    /// Text notes inspected.
    pub files_scanned: usize,
    /// Text notes whose content was written back.
    pub files_rewritten: usize,
    /// Link occurrences replaced across all files.
    pub occurrences_replaced: usize,
    /// Edge records retargeted.
    pub edges_updated: usize,
}

impl RenameReport {
    fn new(old_id: &NoteId, new_id: &NoteId) -> Self {
        Self {
            old_id: old_id.clone(),
            new_id: new_id.clone(),
            files_scanned: 0,
            files_rewritten: 0,
            occurrences_replaced: 0,
            edges_updated: 0,
        }
    }
}

/// Result of rewriting one file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRewrite {
    /// Updated content.
    pub content: String,
    /// Link text that was replaced.
    pub replaced: String,
    /// Link text it was replaced with.
    pub replacement: String,
    /// How many occurrences were replaced.
    pub occurrences: usize,
}

/// Matches `[<old>#frag?](<encoded old>#frag?)` for one identifier.
///
/// A fragment is `#` followed by word characters or `^`, so block
/// references (`#^id`) are rewritten along with headings.
#[derive(Debug, Clone)]
pub struct ReferencePattern {
    regex: Regex,
    new_label: String,
    new_target: String,
}

impl ReferencePattern {
    /// Build the pattern for renaming `old_id` to `new_id`.
    ///
    /// # Errors
    ///
    /// Only fails if the escaped identifier exceeds the regex size limit.
    pub fn new(old_id: &NoteId, new_id: &NoteId) -> std::result::Result<Self, regex::Error> {
        let pattern = format!(
            r"\[({})(#[\w^]*)?\]\(({})(#[\w^]*)?\)",
            regex::escape(old_id.as_str()),
            regex::escape(&old_id.to_link_target()),
        );
        Ok(Self {
            regex: Regex::new(&pattern)?,
            new_label: new_id.as_str().to_string(),
            new_target: encode_link_target(new_id.as_str()),
        })
    }

    /// Rewrite `content`, or `None` when it holds no reference.
    ///
    /// The first reference found fixes the exact text that is replaced; every
    /// occurrence of that text is rewritten with fragments kept. References
    /// to the same note in another shape (different fragment) stay as they are.
    #[must_use]
    pub fn rewrite(&self, content: &str) -> Option<ReferenceRewrite> {
        let caps = self.regex.captures(content)?;
        let replaced = caps.get(0)?.as_str().to_string();
        let label_fragment = caps.get(2).map_or("", |m| m.as_str());
        let target_fragment = caps.get(4).map_or("", |m| m.as_str());
        let replacement = format!(
            "[{}{label_fragment}]({}{target_fragment})",
            self.new_label, self.new_target
        );
        let occurrences = content.matches(replaced.as_str()).count();
        Some(ReferenceRewrite {
            content: content.replace(replaced.as_str(), &replacement),
            replaced,
            replacement,
            occurrences,
        })
    }
}

struct RenameVisitor<'a> {
    root: &'a Path,
    store: &'a dyn GraphStore,
    pattern: ReferencePattern,
    report: RenameReport,
}

#[async_trait]
impl TreeVisitor for RenameVisitor<'_> {
    async fn visit_file(&mut self, entry: &WalkEntry) -> Result<()> {
        if NoteKind::from_path(&entry.path) != Some(NoteKind::Text) {
            return Ok(());
        }
        self.report.files_scanned += 1;
        let content = tokio::fs::read_to_string(&entry.path)
            .await
            .map_err(|e| NoteGraphError::io(&entry.path, e))?;
        let Some(rewrite) = self.pattern.rewrite(&content) else {
            return Ok(());
        };

        if rewrite.content != content {
            tokio::fs::write(&entry.path, &rewrite.content)
                .await
                .map_err(|e| NoteGraphError::io(&entry.path, e))?;
            self.report.files_rewritten += 1;
        }
        self.report.occurrences_replaced += rewrite.occurrences;

        let source = NoteId::from_path(&entry.path, self.root);
        let mut retargeted = 0_usize;
        for _ in 0..rewrite.occurrences {
            let Some(key) = self
                .store
                .find_edge_key(&source, &self.report.old_id)
                .await?
            else {
                break;
            };
            self.store
                .update_edge_target(key, &self.report.new_id)
                .await?;
            retargeted += 1;
        }
        self.report.edges_updated += retargeted;

        tracing::debug!(
            event = "rename.file_rewritten",
            note_id = %source,
            replaced = %rewrite.replaced,
            replacement = %rewrite.replacement,
            occurrences = rewrite.occurrences,
            edges = retargeted,
            "references rewritten"
        );
        Ok(())
    }
}

/// Rewrite every reference to `old_id` under `root` and retarget the
/// matching edges in `store`.
///
/// Files without a reference are left untouched. Renaming an identifier to
/// itself touches nothing and reports zero counts.
///
/// # Errors
///
/// The first I/O or store error aborts; files already rewritten stay
/// rewritten.
pub async fn reconcile_rename(
    root: &Path,
    store: &dyn GraphStore,
    old_id: &NoteId,
    new_id: &NoteId,
) -> Result<RenameReport> {
    if old_id == new_id {
        return Ok(RenameReport::new(old_id, new_id));
    }
    let pattern =
        ReferencePattern::new(old_id, new_id).map_err(|source| NoteGraphError::ReferencePattern {
            note_id: old_id.to_string(),
            source,
        })?;
    let mut visitor = RenameVisitor {
        root,
        store,
        pattern,
        report: RenameReport::new(old_id, new_id),
    };
    walk_tree(root, &mut visitor).await?;
    Ok(visitor.report)
}
