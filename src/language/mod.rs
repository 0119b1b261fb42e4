//! Language backend registry and implementations.
//!
//! This module defines the `LanguageBackend` trait plus a small
//! registry that maps file extensions and logical language IDs to
//! backend implementations. The spec engine only ever sees the
//! `ParsedFile` produced here and borrows nodes from its tree.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tree_sitter::{Node, Point, Tree};

use crate::models::TextRange;

pub(crate) mod kotlin;

/// Errors raised while turning source text into a syntax tree.
///
/// Partial trees (with `ERROR` nodes) are not errors: the engine
/// analyzes whatever structure the parser recovered.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("language backend error: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("language backend error: parser produced no tree for {path}")]
    NoTree { path: PathBuf },
}

/// Convenience result type used throughout the language layer.
pub type BackendResult<T> = Result<T, BackendError>;

/// Parsed representation of a single source file.
#[derive(Debug)]
pub struct ParsedFile {
    /// Stable logical language identifier (e.g., "kotlin").
    pub language_id: &'static str,
    /// Path of the parsed file, if known.
    pub path: PathBuf,
    /// The underlying tree-sitter syntax tree.
    pub tree: Tree,
    /// Full source text for this file.
    pub source: String,
}

impl ParsedFile {
    /// Helper to construct a new `ParsedFile`.
    pub fn new(language_id: &'static str, path: &Path, tree: Tree, source: String) -> Self {
        Self {
            language_id,
            path: path.to_path_buf(),
            tree,
            source,
        }
    }

    /// Kind of the root node in the syntax tree.
    pub fn root_kind(&self) -> String {
        self.tree.root_node().kind().to_string()
    }

    /// Whether the root node (or its descendants) contain parse errors.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Borrow the underlying source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Source text covered by `node`, or an empty string when the
    /// node's byte range does not fall on character boundaries.
    pub fn text(&self, node: Node) -> &str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    /// Smallest node covering the given 1-based line/column position.
    pub fn node_at(&self, line: u32, column: u32) -> Option<Node<'_>> {
        let point = position_to_point(line, column);
        self.tree
            .root_node()
            .descendant_for_point_range(point, point)
    }
}

/// Convert a tree-sitter `Point` (0-based row/column) into a
/// user-facing 1-based line/column pair.
fn point_to_position(p: Point) -> (u32, u32) {
    (p.row as u32 + 1, p.column as u32 + 1)
}

/// Convert a 1-based line/column pair back into a tree-sitter point.
fn position_to_point(line: u32, column: u32) -> Point {
    Point {
        row: line.saturating_sub(1) as usize,
        column: column.saturating_sub(1) as usize,
    }
}

/// Compute a `TextRange` for a given syntax node.
pub(crate) fn node_text_range(node: &Node) -> TextRange {
    let (start_line, start_column) = point_to_position(node.start_position());
    let (end_line, end_column) = point_to_position(node.end_position());

    TextRange {
        start_line,
        start_column,
        end_line,
        end_column,
    }
}

/// Common interface implemented by all language backends.
pub trait LanguageBackend: Sync + Send {
    /// Stable language identifier (e.g., "kotlin").
    fn id(&self) -> &'static str;

    /// File extensions (without leading dots) handled by this backend.
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse a file's source into a `ParsedFile`.
    ///
    /// Implementations return an error only when no tree at all could
    /// be produced; recoverable syntax errors stay inside the tree.
    fn parse_file(&self, path: &Path, source: &str) -> BackendResult<ParsedFile>;

    /// Whether `path` carries one of this backend's extensions.
    fn handles(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.file_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// All statically-registered backends.
static BACKENDS: [&'static dyn LanguageBackend; 1] = [&kotlin::BACKEND];

/// Look up a backend by file path, using the extension to infer
/// language.
///
/// The lookup is case-insensitive and only considers the last
/// component of the file name.
pub fn backend_for_path(path: &Path) -> Option<&'static dyn LanguageBackend> {
    BACKENDS.iter().copied().find(|backend| backend.handles(path))
}

/// Look up a backend by logical language identifier.
///
/// Identifiers are compared case-insensitively; `"kt"` and `"kts"` are
/// normalized to `"kotlin"`.
pub fn backend_for_language(id: &str) -> Option<&'static dyn LanguageBackend> {
    let id = id.to_ascii_lowercase();
    let canonical = match id.as_str() {
        "kt" | "kts" => "kotlin",
        other => other,
    };

    BACKENDS
        .iter()
        .copied()
        .find(|backend| backend.id().eq_ignore_ascii_case(canonical))
}
