use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};

use super::GraphStore;
use crate::error::{NoteGraphError, Result};
use crate::link_graph::models::{Edge, EdgeKey, GraphStats, KeyedEdge, NoteRecord};
use crate::link_graph::parser::NoteId;

// AUTOINCREMENT keeps edge keys unique across clears.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS notes (
    note_id TEXT PRIMARY KEY NOT NULL
);
CREATE TABLE IF NOT EXISTS links (
    key INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    target TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS links_source_target ON links (source, target);
";

const EDGE_COLUMNS: &str = "SELECT key, source, target FROM links";

/// SQLite-backed graph index.
///
/// Statements run on the blocking pool; the connection is shared behind a
/// mutex so calls are serialized.
#[derive(Debug, Clone)]
pub struct SqliteGraphStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGraphStore {
    /// Open or create the database at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory, file or schema cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| NoteGraphError::io(parent, e))?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error when the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| NoteGraphError::StoreLock)?;
            op(&guard)
        })
        .await?
    }
}

fn query_edges(conn: &Connection, sql: &str, arg: Option<&str>) -> Result<Vec<KeyedEdge>> {
    let mut stmt = conn.prepare(sql)?;
    let map_row = |row: &rusqlite::Row<'_>| {
        Ok(KeyedEdge {
            key: EdgeKey(row.get(0)?),
            edge: Edge::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
        })
    };
    let rows = match arg {
        Some(value) => stmt
            .query_map(params![value], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        None => stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
    };
    Ok(rows)
}

fn count(conn: &Connection, sql: &str) -> Result<usize> {
    let value: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(usize::try_from(value).unwrap_or(0))
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn clear_notes(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM notes", [])?;
            Ok(())
        })
        .await
    }

    async fn clear_edges(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM links", [])?;
            Ok(())
        })
        .await
    }

    async fn put_note(&self, note: &NoteRecord) -> Result<()> {
        let note_id = note.note_id.as_str().to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO notes (note_id) VALUES (?1)",
                params![note_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn put_edge(&self, edge: &Edge) -> Result<EdgeKey> {
        let source = edge.source.as_str().to_string();
        let target = edge.target.as_str().to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO links (source, target) VALUES (?1, ?2)",
                params![source, target],
            )?;
            Ok(EdgeKey(conn.last_insert_rowid()))
        })
        .await
    }

    async fn find_edge_key(&self, source: &NoteId, target: &NoteId) -> Result<Option<EdgeKey>> {
        let source = source.as_str().to_string();
        let target = target.as_str().to_string();
        self.with_conn(move |conn| {
            let key = conn
                .query_row(
                    "SELECT key FROM links WHERE source = ?1 AND target = ?2 ORDER BY key LIMIT 1",
                    params![source, target],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(key.map(EdgeKey))
        })
        .await
    }

    async fn update_edge_target(&self, key: EdgeKey, new_target: &NoteId) -> Result<()> {
        let new_target = new_target.as_str().to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE links SET target = ?2 WHERE key = ?1",
                params![key.0, new_target],
            )?;
            if changed == 0 {
                return Err(NoteGraphError::EdgeNotFound(key));
            }
            Ok(())
        })
        .await
    }

    async fn list_notes(&self) -> Result<Vec<NoteRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT note_id FROM notes ORDER BY note_id")?;
            let notes = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(notes.into_iter().map(NoteRecord::new).collect())
        })
        .await
    }

    async fn list_edges(&self) -> Result<Vec<KeyedEdge>> {
        self.with_conn(|conn| query_edges(conn, &format!("{EDGE_COLUMNS} ORDER BY key"), None))
            .await
    }

    async fn backlinks(&self, target: &NoteId) -> Result<Vec<KeyedEdge>> {
        let target = target.as_str().to_string();
        self.with_conn(move |conn| {
            query_edges(
                conn,
                &format!("{EDGE_COLUMNS} WHERE target = ?1 ORDER BY key"),
                Some(&target),
            )
        })
        .await
    }

    async fn outlinks(&self, source: &NoteId) -> Result<Vec<KeyedEdge>> {
        let source = source.as_str().to_string();
        self.with_conn(move |conn| {
            query_edges(
                conn,
                &format!("{EDGE_COLUMNS} WHERE source = ?1 ORDER BY key"),
                Some(&source),
            )
        })
        .await
    }

    async fn stats(&self) -> Result<GraphStats> {
        self.with_conn(|conn| {
            Ok(GraphStats {
                total_notes: count(conn, "SELECT COUNT(*) FROM notes")?,
                total_edges: count(conn, "SELECT COUNT(*) FROM links")?,
                dangling_edges: count(
                    conn,
                    "SELECT COUNT(*) FROM links WHERE target NOT IN (SELECT note_id FROM notes)",
                )?,
            })
        })
        .await
    }
}
