//! Sequential storage tree traversal.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{NoteGraphError, Result};

/// A visited file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Absolute path as listed.
    pub path: PathBuf,
    /// Final path component.
    pub name: String,
}

/// Callbacks invoked by [`walk_tree`].
///
/// Every callback is awaited before the walk moves on, so no two callbacks
/// of one walk ever run concurrently.
#[async_trait]
pub trait TreeVisitor: Send {
    /// Called for each non-hidden file.
    async fn visit_file(&mut self, entry: &WalkEntry) -> Result<()>;

    /// Called for each non-hidden directory before its children are walked.
    ///
    /// No-op by default: the hook for per-directory indexing.
    async fn visit_directory(&mut self, _entry: &WalkEntry) -> Result<()> {
        Ok(())
    }
}

/// Whether a file name denotes a hidden entry.
#[must_use]
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Recursively visit every non-hidden descendant of `root`.
///
/// Hidden entries (name starting with `.`) are skipped with their subtree.
/// Order follows the directory listing. A symlink to a file is visited as a
/// file; symlinked directories are not descended and broken symlinks are
/// skipped with a warning.
///
/// # Errors
///
/// The first listing, metadata or callback error aborts the walk.
pub async fn walk_tree<V>(root: &Path, visitor: &mut V) -> Result<()>
where
    V: TreeVisitor + ?Sized,
{
    walk_dir(root, visitor).await
}

fn walk_dir<'a, V>(dir: &'a Path, visitor: &'a mut V) -> BoxFuture<'a, Result<()>>
where
    V: TreeVisitor + ?Sized + 'a,
{
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| NoteGraphError::io(dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| NoteGraphError::io(dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden_name(&name) {
                continue;
            }
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| NoteGraphError::io(&path, e))?;
            let walk_entry = WalkEntry { path, name };

            if file_type.is_dir() {
                visitor.visit_directory(&walk_entry).await?;
                walk_dir(&walk_entry.path, &mut *visitor).await?;
            } else if file_type.is_file() {
                visitor.visit_file(&walk_entry).await?;
            } else if file_type.is_symlink() {
                match tokio::fs::metadata(&walk_entry.path).await {
                    Ok(resolved) if resolved.is_file() => {
                        visitor.visit_file(&walk_entry).await?;
                    }
                    Ok(_) => {
                        tracing::debug!(
                            event = "walk.symlink_skipped",
                            path = %walk_entry.path.display(),
                            "symlinked directory not descended"
                        );
                    }
                    Err(error) => {
                        tracing::warn!(
                            event = "walk.symlink_unresolved",
                            path = %walk_entry.path.display(),
                            error = %error,
                            "unresolvable symlink skipped"
                        );
                    }
                }
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[derive(Default)]
    struct Recorder {
        files: Vec<String>,
        dirs: Vec<String>,
    }

    #[async_trait]
    impl TreeVisitor for Recorder {
        async fn visit_file(&mut self, entry: &WalkEntry) -> Result<()> {
            self.files.push(entry.name.clone());
            Ok(())
        }

        async fn visit_directory(&mut self, entry: &WalkEntry) -> Result<()> {
            self.dirs.push(entry.name.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hidden_entries_are_skipped() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let tmp = tempfile::TempDir::new()?;
        fs::create_dir_all(tmp.path().join("visible/inner"))?;
        fs::create_dir_all(tmp.path().join(".hidden"))?;
        fs::write(tmp.path().join("visible/inner/a.md"), "a")?;
        fs::write(tmp.path().join("visible/.secret.md"), "s")?;
        fs::write(tmp.path().join(".hidden/b.md"), "b")?;
        fs::write(tmp.path().join("top.md"), "t")?;

        let mut recorder = Recorder::default();
        walk_tree(tmp.path(), &mut recorder).await?;

        recorder.files.sort();
        recorder.dirs.sort();
        assert_eq!(recorder.files, vec!["a.md", "top.md"]);
        assert_eq!(recorder.dirs, vec!["inner", "visible"]);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_policy() -> std::result::Result<(), Box<dyn std::error::Error>> {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::TempDir::new()?;
        let outside = tempfile::TempDir::new()?;
        fs::write(outside.path().join("target.md"), "t")?;
        fs::create_dir_all(outside.path().join("linked_dir"))?;
        fs::write(outside.path().join("linked_dir/inner.md"), "i")?;
        fs::write(tmp.path().join("real.md"), "r")?;
        symlink(outside.path().join("target.md"), tmp.path().join("alias.md"))?;
        symlink(outside.path().join("linked_dir"), tmp.path().join("dir_link"))?;
        symlink(tmp.path().join("gone.pdf"), tmp.path().join("broken.pdf"))?;
        // A link back to the root would loop if followed.
        symlink(tmp.path(), tmp.path().join("cycle"))?;

        let mut recorder = Recorder::default();
        walk_tree(tmp.path(), &mut recorder).await?;

        recorder.files.sort();
        assert_eq!(recorder.files, vec!["alias.md", "real.md"]);
        assert!(recorder.dirs.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_root_is_io_error() {
        let mut recorder = Recorder::default();
        let outcome = walk_tree(Path::new("/definitely/not/here"), &mut recorder).await;
        assert!(matches!(outcome, Err(NoteGraphError::Io { .. })));
    }

    #[test]
    fn test_hidden_name() {
        assert!(is_hidden_name(".git"));
        assert!(!is_hidden_name("notes.md"));
    }
}
