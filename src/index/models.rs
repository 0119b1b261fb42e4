//! Records persisted by the report index.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Metadata for the entire index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Schema version for the index on disk.
    pub schema_version: String,
    /// Version of the specscan tool that wrote the index.
    pub tool_version: String,
    /// Canonical project root for this index, stored as an absolute path.
    #[serde(default)]
    pub root_path: String,
    /// Unix timestamp (seconds since epoch) when the index was created.
    pub created_at: u64,
    /// Unix timestamp (seconds since epoch) when the index was last updated.
    pub updated_at: u64,
}

/// Change-detection key for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    /// Last modification time, in seconds since Unix epoch.
    pub mtime: i64,
    /// File size in bytes.
    pub size: u64,
}

/// Logical record for a single file in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stable numeric identifier for this file within the index.
    pub id: u64,
    /// Path to the file, as stored by the index.
    pub path: PathBuf,
    /// Logical language identifier (e.g., "kotlin").
    pub language: String,
    pub mtime: i64,
    pub size: u64,
    /// Number of specs in the stored report.
    pub spec_count: u64,
    /// Number of tests (at any depth) in the stored report.
    pub test_count: u64,
}

impl FileRecord {
    pub fn stamp(&self) -> FileStamp {
        FileStamp {
            mtime: self.mtime,
            size: self.size,
        }
    }
}
