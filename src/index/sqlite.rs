//! SQLite-backed report index.
//!
//! The database holds one row per scanned Kotlin file with the
//! serialized `FileReport` produced for it:
//!
//! - `meta(key TEXT PRIMARY KEY, value TEXT NOT NULL)`
//! - `files(id INTEGER PRIMARY KEY, path TEXT UNIQUE, language TEXT, mtime INTEGER,
//!          size INTEGER, spec_count INTEGER, test_count INTEGER, report TEXT)`
//!
//! A stored report is only handed back when the caller's modification
//! time and size match the row. Opening an index written by another
//! tool or schema version empties `files`. The connection is configured with:
//!
//! - `journal_mode = WAL` for concurrent readers and a single writer.
//! - `synchronous = NORMAL` as a balance between safety and speed.
//! - `busy_timeout` to avoid transient `database is locked` errors.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use crate::index::current_epoch_seconds;
use crate::index::models::{FileRecord, FileStamp, IndexMeta};
use crate::models::FileReport;

pub(crate) const SCHEMA_VERSION: &str = "1";

/// Report cache stored in a single SQLite database file.
pub struct SpecIndex {
    path: PathBuf,
    conn: Connection,
}

const FILE_COLUMNS: &str = "id, path, language, mtime, size, spec_count, test_count";

fn file_record(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let id: i64 = row.get(0)?;
    let path: String = row.get(1)?;
    let size: i64 = row.get(4)?;
    let spec_count: i64 = row.get(5)?;
    let test_count: i64 = row.get(6)?;

    Ok(FileRecord {
        id: id as u64,
        path: PathBuf::from(path),
        language: row.get(2)?,
        mtime: row.get(3)?,
        size: size as u64,
        spec_count: spec_count as u64,
        test_count: test_count as u64,
    })
}

impl SpecIndex {
    /// Open (or create) an index at the given path.
    pub fn open(index_path: &Path) -> Result<Self> {
        if let Some(parent) = index_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create index directory {}", parent.display())
                })?;
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(index_path, flags)
            .with_context(|| format!("failed to open index {}", index_path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(5000))?;

        Self::initialize_schema(&conn)?;
        Self::discard_stale_reports(&conn)?;

        Ok(Self {
            path: index_path.to_path_buf(),
            conn,
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS files (
                id         INTEGER PRIMARY KEY,
                path       TEXT NOT NULL UNIQUE,
                language   TEXT NOT NULL,
                mtime      INTEGER NOT NULL,
                size       INTEGER NOT NULL,
                spec_count INTEGER NOT NULL,
                test_count INTEGER NOT NULL,
                report     TEXT NOT NULL
            );
        "#,
        )?;

        Ok(())
    }

    /// Drop every stored report when the index was written by another
    /// tool or schema version, then stamp the current versions.
    fn discard_stale_reports(conn: &Connection) -> Result<()> {
        let stored = |key: &str| -> Result<Option<String>> {
            Ok(conn
                .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?)
        };
        let schema_version = stored("schema_version")?;
        let tool_version = stored("tool_version")?;
        if schema_version.is_none() && tool_version.is_none() {
            return Ok(());
        }

        let current_tool = env!("CARGO_PKG_VERSION");
        if schema_version.as_deref() == Some(SCHEMA_VERSION)
            && tool_version.as_deref() == Some(current_tool)
        {
            return Ok(());
        }

        tracing::info!(
            schema_version = schema_version.as_deref().unwrap_or("unknown"),
            tool_version = tool_version.as_deref().unwrap_or("unknown"),
            "discarding reports from another index version"
        );
        conn.execute_batch(&format!(
            "BEGIN;
             DELETE FROM files;
             INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', '{SCHEMA_VERSION}');
             INSERT OR REPLACE INTO meta (key, value) VALUES ('tool_version', '{current_tool}');
             COMMIT;"
        ))?;
        Ok(())
    }

    pub fn index_path(&self) -> &Path {
        &self.path
    }

    /// Stored metadata, or fresh metadata for an empty index.
    pub fn load_meta(&self) -> Result<IndexMeta> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM meta")?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let value: String = row.get(1)?;
            Ok((key, value))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }

        if map.is_empty() {
            let now = current_epoch_seconds();
            return Ok(IndexMeta {
                schema_version: SCHEMA_VERSION.to_string(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                root_path: String::new(),
                created_at: now,
                updated_at: now,
            });
        }

        let schema_version = map
            .get("schema_version")
            .cloned()
            .unwrap_or_else(|| SCHEMA_VERSION.to_string());

        if schema_version != SCHEMA_VERSION {
            bail!(
                "unsupported index schema version {}; expected {}",
                schema_version,
                SCHEMA_VERSION
            );
        }

        let created_at = map
            .get("created_at")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        let updated_at = map
            .get("updated_at")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(created_at);

        Ok(IndexMeta {
            schema_version,
            tool_version: map
                .get("tool_version")
                .cloned()
                .unwrap_or_else(|| "unknown".to_string()),
            root_path: map.get("root_path").cloned().unwrap_or_default(),
            created_at,
            updated_at,
        })
    }

    pub fn save_meta(&mut self, meta: &IndexMeta) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM meta", [])?;

        {
            let mut stmt = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;

            let rows = [
                ("schema_version", meta.schema_version.as_str()),
                ("tool_version", meta.tool_version.as_str()),
                ("root_path", meta.root_path.as_str()),
                ("created_at", &meta.created_at.to_string()),
                ("updated_at", &meta.updated_at.to_string()),
            ];

            for (key, value) in rows {
                stmt.execute(params![key, value])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn list_files(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FILE_COLUMNS} FROM files ORDER BY id ASC"))?;
        let rows = stmt.query_map([], file_record)?;

        let mut files = Vec::new();
        for row in rows {
            files.push(row?);
        }
        Ok(files)
    }

    pub fn get_file_by_path(&self, path: &Path) -> Result<Option<FileRecord>> {
        let path_str = path.to_string_lossy().to_string();
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FILE_COLUMNS} FROM files WHERE path = ?1"))?;
        Ok(stmt.query_row(params![path_str], file_record).optional()?)
    }

    /// The stored report for `path`, if it was recorded with `stamp`.
    pub fn cached_report(&self, path: &Path, stamp: FileStamp) -> Result<Option<FileReport>> {
        let path_str = path.to_string_lossy().to_string();
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT report FROM files WHERE path = ?1 AND mtime = ?2 AND size = ?3",
                params![path_str, stamp.mtime, stamp.size as i64],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => {
                let report = serde_json::from_str(&json).with_context(|| {
                    format!("corrupt index entry for {}", path.display())
                })?;
                Ok(Some(report))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace the report recorded for `path`.
    pub fn store_report(
        &mut self,
        path: &Path,
        stamp: FileStamp,
        report: &FileReport,
    ) -> Result<FileRecord> {
        let path_str = path.to_string_lossy().to_string();
        let json = serde_json::to_string(report)?;
        let spec_count = report.specs.len() as u64;
        let test_count: u64 = report.specs.iter().map(|s| s.test_count()).sum();
        let language = "kotlin";

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO files (path, language, mtime, size, spec_count, test_count, report)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(path) DO UPDATE SET
                language = excluded.language,
                mtime = excluded.mtime,
                size = excluded.size,
                spec_count = excluded.spec_count,
                test_count = excluded.test_count,
                report = excluded.report",
            params![
                path_str,
                language,
                stamp.mtime,
                stamp.size as i64,
                spec_count as i64,
                test_count as i64,
                json
            ],
        )?;
        let id: i64 = tx.query_row(
            "SELECT id FROM files WHERE path = ?1",
            params![path_str],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(FileRecord {
            id: id as u64,
            path: PathBuf::from(path_str),
            language: language.to_string(),
            mtime: stamp.mtime,
            size: stamp.size,
            spec_count,
            test_count,
        })
    }

    pub fn remove_file_by_path(&mut self, path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy().to_string();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM files WHERE path = ?1", params![path_str])?;
        tx.commit()?;
        Ok(())
    }
}
