//! Core scan entry points.
//!
//! These functions provide the "scan as a function" API used by the
//! CLI and the HTTP daemon: walk the configured paths, parse each
//! Kotlin file, and turn the discovered spec trees into serializable
//! reports.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use ignore::WalkBuilder;

use crate::index::{build_globset, current_epoch_seconds, file_stamp, SpecIndex};
use crate::language::kotlin::package_name;
use crate::language::{backend_for_path, node_text_range, ParsedFile};
use crate::launch::LaunchSelectors;
use crate::models::{
    CallbackReport, FileReport, IncludeReport, LaunchCommand, ScanConfig, ScanResult,
    ScanSummary, SpecReport, StyleInfo, TestAtRequest, TestAtResult, TestReport, TextRange,
    SCAN_RESULT_VERSION,
};
use crate::spec::{self, Spec, SpecStyle, SpecTree, Test, TreeOptions};

/// Execute a scan based on the provided configuration.
pub fn run_scan(config: ScanConfig) -> Result<ScanResult> {
    let files = walk_source_files(&config.paths, &config.globs, &config.exclude_globs)?;
    let options = TreeOptions {
        hide_callbacks: config.hide_callbacks,
        hide_includes: config.hide_includes,
    };

    let mut index = match &config.index {
        Some(index_config) => Some(SpecIndex::open(&index_config.index_path)?),
        None => None,
    };

    let mut summary = ScanSummary::default();
    let mut reports = Vec::new();

    for path in files {
        let Some((report, cached)) = scan_file(&path, options, index.as_mut())? else {
            continue;
        };

        summary.files_scanned += 1;
        if cached {
            summary.cached_files += 1;
        }
        for spec in &report.specs {
            summary.specs += 1;
            summary.tests += spec.test_count();
            summary.disabled_tests += spec
                .tests
                .iter()
                .map(TestReport::disabled_count)
                .sum::<u64>();
        }

        if !report.specs.is_empty() {
            reports.push(report);
        }
    }

    // Stamp the versions that wrote the cached reports.
    if let Some(index) = index.as_mut() {
        let mut meta = index.load_meta()?;
        meta.updated_at = current_epoch_seconds();
        index.save_meta(&meta)?;
    }

    Ok(ScanResult {
        version: SCAN_RESULT_VERSION.to_string(),
        files: reports,
        summary,
    })
}

/// Report for one file, reusing the index entry when the file is
/// unchanged. Returns `None` for files that are skipped.
fn scan_file(
    path: &Path,
    options: TreeOptions,
    index: Option<&mut SpecIndex>,
) -> Result<Option<(FileReport, bool)>> {
    let Some(index) = index else {
        return Ok(read_report(path, options));
    };

    let stamp = match file_stamp(path) {
        Ok(stamp) => stamp,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "skipping unreadable file");
            return Ok(None);
        }
    };

    if let Some(report) = index.cached_report(path, stamp)? {
        tracing::debug!(path = %path.display(), "reusing cached report");
        return Ok(Some((hide(report, options), true)));
    }

    // The index always stores complete reports; hiding happens on the way out.
    let Some((report, _)) = read_report(path, TreeOptions::default()) else {
        return Ok(None);
    };
    index.store_report(path, stamp, &report)?;
    Ok(Some((hide(report, options), false)))
}

fn read_report(path: &Path, options: TreeOptions) -> Option<(FileReport, bool)> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "skipping unreadable file");
            return None;
        }
    };

    match report_for_source(path, &source, options) {
        Ok(report) => Some((report, false)),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "skipping unparsable file");
            None
        }
    }
}

fn hide(mut report: FileReport, options: TreeOptions) -> FileReport {
    for spec in &mut report.specs {
        if options.hide_callbacks {
            spec.callbacks.clear();
        }
        if options.hide_includes {
            spec.includes.clear();
        }
    }
    report
}

/// Parse `source` as the file at `path` and build its report.
pub fn report_for_source(path: &Path, source: &str, options: TreeOptions) -> Result<FileReport> {
    let parsed = parse_source(path, source)?;
    Ok(file_report(&parsed, options))
}

fn parse_source(path: &Path, source: &str) -> Result<ParsedFile> {
    let backend = backend_for_path(path)
        .ok_or_else(|| anyhow!("unsupported file type: {}", path.display()))?;
    Ok(backend.parse_file(path, source)?)
}

fn parse_path(path: &Path) -> Result<ParsedFile> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_source(path, &source)
}

fn file_report(parsed: &ParsedFile, options: TreeOptions) -> FileReport {
    let specs = spec::spec_trees(parsed, options)
        .iter()
        .map(spec_report)
        .collect();

    FileReport {
        path: parsed.path.clone(),
        package: package_name(parsed),
        has_errors: parsed.has_errors(),
        specs,
    }
}

fn spec_report(tree: &SpecTree<'_>) -> SpecReport {
    let style = tree.spec.style;
    SpecReport {
        name: tree.spec.name.clone(),
        fqn: tree.spec.fqn(),
        style: style.id().to_string(),
        style_label: style.label().to_string(),
        range: node_text_range(&tree.spec.node),
        tests: test_reports(&tree.tests),
        callbacks: tree
            .callbacks
            .iter()
            .map(|callback| CallbackReport {
                kind: callback.kind,
                range: node_text_range(&callback.node),
            })
            .collect(),
        includes: tree
            .includes
            .iter()
            .map(|include| IncludeReport {
                name: include.name.clone(),
                kind: include.kind,
                range: node_text_range(&include.node),
            })
            .collect(),
    }
}

/// Convert sibling tests, marking names that occur more than once.
fn test_reports(tests: &[Test<'_>]) -> Vec<TestReport> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for test in tests {
        *counts.entry(test.name.as_str()).or_default() += 1;
    }

    tests
        .iter()
        .map(|test| TestReport {
            name: test.name.clone(),
            path: test.path.clone(),
            enabled: test.enabled,
            unique: counts.get(test.name.as_str()) == Some(&1),
            range: node_text_range(&test.node),
            children: test_reports(&test.children),
        })
        .collect()
}

fn find_report(reports: &[TestReport], range: TextRange) -> Option<TestReport> {
    reports.iter().find_map(|report| {
        if report.range == range {
            Some(report.clone())
        } else {
            find_report(&report.children, range)
        }
    })
}

/// Resolve the spec and test at a source position.
pub fn test_at(request: &TestAtRequest) -> Result<TestAtResult> {
    let parsed = parse_path(&request.path)?;
    let node = parsed
        .node_at(request.line, request.column)
        .ok_or_else(|| {
            anyhow!(
                "position {}:{} is outside {}",
                request.line,
                request.column,
                request.path.display()
            )
        })?;

    let spec = spec::enclosing_class(node).and_then(|class| spec::spec_for_class(&parsed, class));
    let test = if request.leaf {
        spec::test_for_leaf(&parsed, node)
    } else {
        spec::enclosing_test(&parsed, node)
    };

    let test = match (&spec, test) {
        (Some(spec), Some(test)) => Some(report_in_tree(&parsed, spec.clone(), &test)),
        _ => None,
    };

    Ok(TestAtResult {
        path: request.path.clone(),
        spec: spec.as_ref().map(Spec::fqn),
        style: spec.as_ref().map(|s| s.style.id().to_string()),
        test,
    })
}

/// Report for `test` as it appears in its spec's tree, so uniqueness
/// reflects its siblings.
fn report_in_tree(parsed: &ParsedFile, spec: Spec<'_>, test: &Test<'_>) -> TestReport {
    let tree = spec::spec_tree(parsed, spec, TreeOptions::default());
    let range = node_text_range(&test.node);
    find_report(&test_reports(&tree.tests), range).unwrap_or_else(|| {
        let mut reports = test_reports(std::slice::from_ref(test));
        reports.remove(0)
    })
}

/// Console runner arguments for a spec file (optionally narrowed to the
/// test at a position) or for a whole package.
pub fn launch_command(
    path: Option<&Path>,
    position: Option<(u32, u32)>,
    package: Option<String>,
) -> Result<LaunchCommand> {
    let Some(path) = path else {
        let package = package.filter(|p| !p.trim().is_empty());
        if package.is_none() {
            bail!("either a spec file or a package is required");
        }
        let selectors = LaunchSelectors {
            package,
            ..LaunchSelectors::default()
        };
        return Ok(selectors.command());
    };

    let parsed = parse_path(path)?;

    let (spec, test_path) = match position {
        Some((line, column)) => {
            let node = parsed
                .node_at(line, column)
                .ok_or_else(|| anyhow!("position {line}:{column} is outside {}", path.display()))?;
            let spec = spec::enclosing_class(node)
                .and_then(|class| spec::spec_for_class(&parsed, class))
                .ok_or_else(|| anyhow!("no spec at {}:{line}:{column}", path.display()))?;
            let test_path = spec::enclosing_test(&parsed, node).map(|test| test.path);
            (spec, test_path)
        }
        None => {
            let spec = spec::specs(&parsed)
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("no spec found in {}", path.display()))?;
            (spec, None)
        }
    };

    let selectors = LaunchSelectors {
        package: None,
        spec: Some(spec.fqn()),
        test_path,
    };
    Ok(selectors.command())
}

/// Registry entries for every supported style.
pub fn style_infos() -> Vec<StyleInfo> {
    SpecStyle::all()
        .iter()
        .map(|style| StyleInfo {
            id: style.id().to_string(),
            fqn: style.fqn().to_string(),
            label: style.label().to_string(),
            keywords: style.keywords().into_iter().map(str::to_string).collect(),
            template: style.generate_test("{name}"),
        })
        .collect()
}

/// Kotlin source files under `paths`, filtered by include/exclude
/// globs, in a stable order.
pub fn walk_source_files(
    paths: &[PathBuf],
    globs: &[String],
    exclude_globs: &[String],
) -> Result<Vec<PathBuf>> {
    if paths.is_empty() {
        bail!("at least one path is required");
    }
    for path in paths {
        if !path.exists() {
            bail!("path does not exist: {}", path.display());
        }
    }

    let include_globs = build_globset(globs)?;
    let exclude_globs = build_globset(exclude_globs)?;

    let mut builder = WalkBuilder::new(&paths[0]);
    for path in paths.iter().skip(1) {
        builder.add(path);
    }
    builder.sort_by_file_name(|a, b| a.cmp(b));

    let mut files = Vec::new();
    for entry_result in builder.build() {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                tracing::debug!(error = %err, "skipping walk entry");
                continue;
            }
        };

        let path = entry.path();

        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        if let Some(set) = &include_globs {
            if !set.is_match(path) {
                continue;
            }
        }
        if let Some(set) = &exclude_globs {
            if set.is_match(path) {
                continue;
            }
        }

        if backend_for_path(path).is_none() {
            continue;
        }

        files.push(path.to_path_buf());
    }

    Ok(files)
}
