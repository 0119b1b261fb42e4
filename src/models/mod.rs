//! Shared data models for scan configs, reports, and the index.
//!
//! These types form the stable JSON API surface used by the CLI
//! and the HTTP daemon.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::spec::{CallbackKind, IncludeKind};

/// Schema version for `ScanResult` JSON payloads.
///
/// This version follows semver semantics (MAJOR.MINOR.PATCH):
/// - MAJOR: Breaking changes to required fields or field semantics.
/// - MINOR: Backward-compatible additions (new optional fields).
/// - PATCH: Documentation or internal changes only.
///
/// Clients consuming `--format=json` output should check this version
/// to ensure compatibility and handle newer minor versions
/// conservatively.
pub const SCAN_RESULT_VERSION: &str = "1.0.0";

/// A half-open range in a source file, expressed as 1-based
/// line/column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    /// 1-based starting line (inclusive).
    pub start_line: u32,
    /// 1-based starting column (inclusive, byte offset).
    pub start_column: u32,
    /// 1-based ending line (inclusive).
    pub end_line: u32,
    /// 1-based ending column (exclusive, byte offset).
    pub end_column: u32,
}

impl TextRange {
    /// Whether the 1-based `line`/`column` position falls inside the range.
    pub fn contains(&self, line: u32, column: u32) -> bool {
        let after_start =
            line > self.start_line || (line == self.start_line && column >= self.start_column);
        let before_end =
            line < self.end_line || (line == self.end_line && column < self.end_column);
        after_start && before_end
    }
}

/// Core configuration for a scan.
///
/// Built from CLI or daemon inputs and consumed by the scan engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Files or directories to scan.
    pub paths: Vec<PathBuf>,
    /// Inclusion globs applied to candidate files.
    #[serde(default)]
    pub globs: Vec<String>,
    /// Exclusion globs applied to candidate files.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Leave lifecycle callbacks out of the reports.
    #[serde(default)]
    pub hide_callbacks: bool,
    /// Leave includes out of the reports.
    #[serde(default)]
    pub hide_includes: bool,
    /// Optional report cache. When present, files whose modification
    /// time and size are unchanged reuse their cached report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexConfig>,
}

/// A discovered test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    /// Display name, including the style's keyword prefix.
    pub name: String,
    /// Space-joined names from the outermost enclosing test down to
    /// this one. Passed verbatim as `--testpath` to the launcher.
    pub path: String,
    pub enabled: bool,
    /// False when a sibling carries the same name.
    pub unique: bool,
    pub range: TextRange,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TestReport>,
}

impl TestReport {
    /// Number of tests in this subtree, including this one.
    pub fn count(&self) -> u64 {
        1 + self.children.iter().map(TestReport::count).sum::<u64>()
    }

    /// Number of disabled tests in this subtree.
    pub fn disabled_count(&self) -> u64 {
        u64::from(!self.enabled)
            + self
                .children
                .iter()
                .map(TestReport::disabled_count)
                .sum::<u64>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackReport {
    pub kind: CallbackKind,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeReport {
    /// Name of the included factory or value.
    pub name: String,
    pub kind: IncludeKind,
    pub range: TextRange,
}

/// A spec class and everything discovered in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecReport {
    /// Simple class name.
    pub name: String,
    /// Package-qualified class name.
    pub fqn: String,
    /// Style id (`feature`, `fun`, ...).
    pub style: String,
    /// Human readable style label.
    pub style_label: String,
    pub range: TextRange,
    #[serde(default)]
    pub tests: Vec<TestReport>,
    #[serde(default)]
    pub callbacks: Vec<CallbackReport>,
    #[serde(default)]
    pub includes: Vec<IncludeReport>,
}

impl SpecReport {
    pub fn test_count(&self) -> u64 {
        self.tests.iter().map(TestReport::count).sum()
    }
}

/// Scan result for a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Declared package, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// True when the parser had to recover from syntax errors.
    #[serde(default)]
    pub has_errors: bool,
    #[serde(default)]
    pub specs: Vec<SpecReport>,
}

/// Summary information for a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Kotlin files parsed or loaded from the cache.
    pub files_scanned: u64,
    pub specs: u64,
    pub tests: u64,
    pub disabled_tests: u64,
    /// Files whose report came from the index without re-parsing.
    #[serde(default)]
    pub cached_files: u64,
}

/// Top-level result for a scan invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Schema version for this result payload.
    pub version: String,
    /// Files that declare at least one spec, in walk order.
    #[serde(default)]
    pub files: Vec<FileReport>,
    pub summary: ScanSummary,
}

/// Request to resolve the test at a source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAtRequest {
    pub path: PathBuf,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
    /// Only report a test when the position sits on its introducing
    /// token (line-marker semantics) instead of anywhere in its body.
    #[serde(default)]
    pub leaf: bool,
}

/// The spec and test found at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAtResult {
    pub path: PathBuf,
    /// Package-qualified name of the enclosing spec, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    /// Style id of the enclosing spec, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<TestReport>,
}

/// Registry entry describing a supported spec style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleInfo {
    pub id: String,
    pub fqn: String,
    pub label: String,
    pub keywords: Vec<String>,
    /// Skeleton for a new test, with `{name}` as the placeholder.
    pub template: String,
}

/// Arguments for launching the console runner on a spec or test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchCommand {
    pub main_class: String,
    pub args: Vec<String>,
}

/// Configuration for building or reading the report index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Filesystem roots to index.
    pub paths: Vec<PathBuf>,
    /// Inclusion globs applied to candidate files.
    #[serde(default)]
    pub globs: Vec<String>,
    /// Exclusion globs applied to candidate files.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Location of the SQLite database file.
    pub index_path: PathBuf,
}

/// Summary information about an index operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSummary {
    /// Location of the index on disk.
    pub index_path: PathBuf,
    /// Number of files recorded (or re-recorded) by this operation.
    pub files_indexed: u64,
    /// Number of specs across the recorded files.
    pub specs_indexed: u64,
    /// Number of tests across the recorded files.
    pub tests_indexed: u64,
    /// Canonical project root for this index (absolute path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
    /// Logical schema version for the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Version of the specscan tool that wrote the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    /// RFC 3339 creation timestamp for this index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// RFC 3339 last-updated timestamp for this index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}
