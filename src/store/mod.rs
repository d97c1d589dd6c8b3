//! SQLite-backed embedding store keyed by repository snapshot

use crate::domain::{Embedding, FileRecord};
use crate::error::Result;
use git2::Repository;
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// One indexed state of a repository: `(repo_id, commit_sha)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSnapshot {
    pub repo_id: String,
    pub commit_sha: String,
}

impl RepoSnapshot {
    pub fn new(repo_id: impl Into<String>, commit_sha: impl Into<String>) -> Self {
        Self { repo_id: repo_id.into(), commit_sha: commit_sha.into() }
    }

    /// Fill unspecified parts from the directory: its name and its git HEAD.
    pub fn discover(root: &Path, repo_id: Option<&str>, commit_sha: Option<&str>) -> Self {
        let repo_id = repo_id
            .map(str::to_string)
            .or_else(|| {
                let canonical = root.canonicalize().ok()?;
                canonical.file_name()?.to_str().map(str::to_string)
            })
            .unwrap_or_else(|| "local".to_string());
        let commit_sha = commit_sha
            .map(str::to_string)
            .or_else(|| discover_git_commit(root))
            .unwrap_or_else(|| "workdir".to_string());
        Self { repo_id, commit_sha }
    }
}

pub fn discover_git_commit(root_path: &Path) -> Option<String> {
    Repository::discover(root_path).ok()?.head().ok()?.target().map(|oid| oid.to_string())
}

/// A freshly encoded file ready to be written.
#[derive(Debug, Clone)]
pub struct IndexedFile {
    pub record: FileRecord,
    pub content_hash: String,
}

/// What a single [`EmbeddingStore::apply`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub files_written: usize,
    pub embeddings_written: usize,
    pub files_removed: usize,
}

pub struct EmbeddingStore {
    conn: Connection,
}

impl EmbeddingStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Content hash and encoder fingerprint of every stored file of the snapshot.
    pub fn file_hashes(&self, snapshot: &RepoSnapshot) -> Result<HashMap<String, (String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT route, content_hash, encoder FROM files WHERE repo_id = ?1 AND commit_sha = ?2",
        )?;
        let rows = stmt.query_map(params![snapshot.repo_id, snapshot.commit_sha], |row| {
            Ok((row.get::<_, String>(0)?, (row.get::<_, String>(1)?, row.get::<_, String>(2)?)))
        })?;
        let mut map = HashMap::new();
        for row in rows {
            let (route, value) = row?;
            map.insert(route, value);
        }
        Ok(map)
    }

    /// Write `files` (replacing any previous embeddings wholesale) and delete every
    /// stored route of the snapshot not in `present`, in one transaction.
    pub fn apply(
        &mut self,
        snapshot: &RepoSnapshot,
        encoder: &str,
        files: &[IndexedFile],
        present: &HashSet<String>,
    ) -> Result<ApplySummary> {
        let tx = self.conn.transaction()?;
        let mut summary = ApplySummary::default();

        let stored: Vec<String> = {
            let mut stmt = tx.prepare("SELECT route FROM files WHERE repo_id = ?1 AND commit_sha = ?2")?;
            let rows = stmt.query_map(params![snapshot.repo_id, snapshot.commit_sha], |row| row.get::<_, String>(0))?;
            rows.collect::<std::result::Result<_, _>>()?
        };
        for route in stored.iter().filter(|r| !present.contains(*r)) {
            delete_file(&tx, snapshot, route)?;
            summary.files_removed += 1;
        }

        let indexed_at = chrono::Utc::now().to_rfc3339();
        for file in files {
            let route = &file.record.route;
            delete_file(&tx, snapshot, route)?;
            tx.execute(
                "
                INSERT INTO files (repo_id, commit_sha, route, content_hash, encoder, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
                params![snapshot.repo_id, snapshot.commit_sha, route, file.content_hash, encoder, indexed_at],
            )?;
            for (ordinal, embedding) in file.record.embeddings.iter().enumerate() {
                tx.execute(
                    "
                    INSERT INTO embeddings (repo_id, commit_sha, route, ordinal, vector_json)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ",
                    params![
                        snapshot.repo_id,
                        snapshot.commit_sha,
                        route,
                        ordinal as i64,
                        serde_json::to_string(&embedding.vector)?,
                    ],
                )?;
                summary.embeddings_written += 1;
            }
            summary.files_written += 1;
        }

        tx.commit()?;
        tracing::debug!(
            repo = %snapshot.repo_id,
            written = summary.files_written,
            removed = summary.files_removed,
            "store updated"
        );
        Ok(summary)
    }

    /// Load the stored corpus of a snapshot, ordered by route.
    ///
    /// With `routes`, only those files are returned; `None` loads everything.
    pub fn load_corpus(&self, snapshot: &RepoSnapshot, routes: Option<&HashSet<String>>) -> Result<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "
            SELECT f.route, e.vector_json
            FROM files f
            LEFT JOIN embeddings e
                ON e.repo_id = f.repo_id AND e.commit_sha = f.commit_sha AND e.route = f.route
            WHERE f.repo_id = ?1 AND f.commit_sha = ?2
            ORDER BY f.route, e.ordinal
            ",
        )?;
        let rows = stmt.query_map(params![snapshot.repo_id, snapshot.commit_sha], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut corpus: Vec<FileRecord> = Vec::new();
        for row in rows {
            let (route, vector_json) = row?;
            if routes.is_some_and(|keep| !keep.contains(&route)) {
                continue;
            }
            if corpus.last().map(|r| r.route.as_str()) != Some(route.as_str()) {
                corpus.push(FileRecord::new(route.clone(), Vec::new()));
            }
            if let (Some(json), Some(record)) = (vector_json, corpus.last_mut()) {
                let vector: Vec<f32> = serde_json::from_str(&json)?;
                record.embeddings.push(Embedding::new(vector).owned_by(&route));
            }
        }
        Ok(corpus)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }
}

fn delete_file(tx: &rusqlite::Transaction<'_>, snapshot: &RepoSnapshot, route: &str) -> Result<()> {
    tx.execute(
        "DELETE FROM embeddings WHERE repo_id = ?1 AND commit_sha = ?2 AND route = ?3",
        params![snapshot.repo_id, snapshot.commit_sha, route],
    )?;
    tx.execute(
        "DELETE FROM files WHERE repo_id = ?1 AND commit_sha = ?2 AND route = ?3",
        params![snapshot.repo_id, snapshot.commit_sha, route],
    )?;
    Ok(())
}

fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;

        CREATE TABLE IF NOT EXISTS files (
            repo_id TEXT NOT NULL,
            commit_sha TEXT NOT NULL,
            route TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            encoder TEXT NOT NULL,
            indexed_at TEXT NOT NULL,
            PRIMARY KEY (repo_id, commit_sha, route)
        );

        CREATE TABLE IF NOT EXISTS embeddings (
            repo_id TEXT NOT NULL,
            commit_sha TEXT NOT NULL,
            route TEXT NOT NULL,
            ordinal INTEGER NOT NULL,
            vector_json TEXT NOT NULL,
            PRIMARY KEY (repo_id, commit_sha, route, ordinal)
        );

        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_embeddings_file ON embeddings(repo_id, commit_sha, route);
        ",
    )?;
    Ok(())
}
