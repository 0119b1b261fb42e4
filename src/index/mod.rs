//! Persistent report index.
//!
//! The index is a consumer-side cache: it maps each scanned Kotlin file
//! (keyed by path, modification time and size) to the `FileReport`
//! built for it, so `scan --use-index` only re-parses files that
//! changed. It is populated by `specscan index` and by indexed scans.

pub mod models;
mod sqlite;

pub use models::{FileRecord, FileStamp, IndexMeta};
pub use sqlite::SpecIndex;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet};

use crate::models::{IndexConfig, IndexSummary};
use crate::scan::{report_for_source, walk_source_files};
use crate::spec::TreeOptions;

/// Build or refresh the index for the given configuration.
pub fn run_index(config: IndexConfig) -> Result<IndexSummary> {
    let mut index = SpecIndex::open(&config.index_path)?;
    build_index(&mut index, &config)
}

/// Read-only helper to inspect an existing index without modifying it.
pub fn get_index_info(config: &IndexConfig) -> Result<IndexSummary> {
    if !config.index_path.exists() {
        bail!("index not found at {}", config.index_path.display());
    }
    if !config.index_path.is_file() {
        bail!(
            "index_path must be a file; got {}",
            config.index_path.display()
        );
    }

    let index = SpecIndex::open(&config.index_path)?;
    let meta = index.load_meta()?;
    let files = index.list_files()?;

    Ok(summary(
        &config.index_path,
        meta,
        files.len() as u64,
        files.iter().map(|f| f.spec_count).sum(),
        files.iter().map(|f| f.test_count).sum(),
    ))
}

pub(crate) fn build_index(index: &mut SpecIndex, config: &IndexConfig) -> Result<IndexSummary> {
    let files = walk_source_files(&config.paths, &config.globs, &config.exclude_globs)?;

    let canonical_root = config.paths[0]
        .canonicalize()
        .unwrap_or_else(|_| config.paths[0].clone());

    let mut meta = index.load_meta()?;

    if meta.root_path.is_empty() {
        meta.root_path = canonical_root.to_string_lossy().to_string();
    } else if let Ok(stored_root) = PathBuf::from(&meta.root_path).canonicalize() {
        if stored_root != canonical_root {
            bail!(
                "index root_path mismatch: index was created with root {}, but {} was requested",
                stored_root.display(),
                canonical_root.display()
            );
        }
    }

    let existing = index.list_files()?;
    let mut seen_paths = HashSet::new();

    let mut files_indexed: u64 = 0;
    let mut specs_indexed: u64 = 0;
    let mut tests_indexed: u64 = 0;

    for path in files {
        let stamp = match file_stamp(&path) {
            Ok(stamp) => stamp,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };
        seen_paths.insert(path.clone());

        let unchanged = existing
            .iter()
            .any(|record| record.path == path && record.stamp() == stamp);
        if unchanged {
            tracing::debug!(path = %path.display(), "index entry up to date");
            continue;
        }

        let source = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };

        let report = match report_for_source(&path, &source, TreeOptions::default()) {
            Ok(r) => r,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "skipping unparsable file");
                continue;
            }
        };

        let record = index.store_report(&path, stamp, &report)?;

        files_indexed += 1;
        specs_indexed += record.spec_count;
        tests_indexed += record.test_count;
    }

    // Remove stale entries for files that no longer exist under the
    // indexed paths.
    for record in existing {
        if !seen_paths.contains(&record.path) && path_within_any(&record.path, &config.paths) {
            tracing::debug!(path = %record.path.display(), "removing stale index entry");
            index.remove_file_by_path(&record.path)?;
        }
    }

    meta.updated_at = current_epoch_seconds();
    index.save_meta(&meta)?;

    Ok(summary(
        index.index_path(),
        meta,
        files_indexed,
        specs_indexed,
        tests_indexed,
    ))
}

fn summary(
    index_path: &Path,
    meta: IndexMeta,
    files_indexed: u64,
    specs_indexed: u64,
    tests_indexed: u64,
) -> IndexSummary {
    IndexSummary {
        index_path: index_path.to_path_buf(),
        files_indexed,
        specs_indexed,
        tests_indexed,
        root_path: Some(meta.root_path).filter(|root| !root.is_empty()),
        schema_version: Some(meta.schema_version),
        tool_version: Some(meta.tool_version),
        created_at: format_timestamp_rfc3339(meta.created_at),
        updated_at: format_timestamp_rfc3339(meta.updated_at),
    }
}

/// Modification time and size used to decide whether a cached report
/// is still valid.
pub fn file_stamp(path: &Path) -> Result<FileStamp> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    Ok(FileStamp {
        mtime,
        size: metadata.len(),
    })
}

fn path_within_any(path: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| path.starts_with(root))
}

pub(crate) fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = globset::GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
    }
    Ok(Some(builder.build()?))
}

pub(crate) fn current_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn format_timestamp_rfc3339(secs: u64) -> Option<String> {
    use time::{format_description::well_known::Rfc3339, OffsetDateTime};

    let dt = OffsetDateTime::from_unix_timestamp(secs as i64).ok()?;
    Some(dt.format(&Rfc3339).unwrap_or_else(|_| dt.to_string()))
}
