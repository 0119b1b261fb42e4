use std::cmp;
use std::fmt::Write as _;

use anyhow::Result;

use crate::models::{
    IndexSummary, LaunchCommand, ScanResult, StyleInfo, TestAtResult, TestReport, TextRange,
};
use crate::spec::IncludeKind;

/// One test flattened out of a spec tree for table output.
struct DisplayRow {
    file: String,
    line: u32,
    spec: String,
    path: String,
    enabled: bool,
}

/// Render a `ScanResult` in human-readable text form.
///
/// Each file is printed as a header followed by its specs; tests are
/// indented by nesting depth as `line:col name`, then callbacks and
/// includes. A one-line summary closes the output.
pub fn print_text(result: &ScanResult) -> Result<()> {
    print!("{}", render_scan_text(result));
    Ok(())
}

fn render_scan_text(result: &ScanResult) -> String {
    let mut out = String::new();

    for file in &result.files {
        let _ = writeln!(out, "{}", file.path.display());
        for spec in &file.specs {
            let _ = writeln!(
                out,
                "  {} [{}] {}",
                spec.fqn,
                spec.style_label,
                position(&spec.range)
            );
            for test in &spec.tests {
                render_test(&mut out, test, 2);
            }
            for callback in &spec.callbacks {
                let _ = writeln!(
                    out,
                    "    {} {}: {}",
                    position(&callback.range),
                    callback.kind.label(),
                    callback.kind.keyword()
                );
            }
            for include in &spec.includes {
                let _ = writeln!(
                    out,
                    "    {} Include: {} ({})",
                    position(&include.range),
                    include.name,
                    include_kind(include.kind)
                );
            }
        }
    }

    let summary = &result.summary;
    let _ = write!(
        out,
        "{} specs, {} tests ({} disabled) in {} files",
        summary.specs, summary.tests, summary.disabled_tests, summary.files_scanned
    );
    if summary.cached_files > 0 {
        let _ = write!(out, ", {} from index", summary.cached_files);
    }
    out.push('\n');
    out
}

fn render_test(out: &mut String, test: &TestReport, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut markers = Vec::new();
    if !test.enabled {
        markers.push("disabled");
    }
    if !test.unique {
        markers.push("duplicate");
    }
    let suffix = if markers.is_empty() {
        String::new()
    } else {
        format!(" ({})", markers.join(", "))
    };

    let _ = writeln!(
        out,
        "{indent}{} {}{suffix}",
        position(&test.range),
        test.name
    );
    for child in &test.children {
        render_test(out, child, depth + 1);
    }
}

/// Render a `ScanResult` as a table with one row per test.
///
/// Columns:
/// - FILE
/// - LINE
/// - SPEC
/// - TEST (the full test path)
/// - ENABLED
pub fn print_table(result: &ScanResult) -> Result<()> {
    print!("{}", render_scan_table(result));
    Ok(())
}

fn render_scan_table(result: &ScanResult) -> String {
    let rows = build_rows(result);
    let mut out = String::new();

    if rows.is_empty() {
        return out;
    }

    const MAX_FILE_WIDTH: usize = 40;
    const MAX_SPEC_WIDTH: usize = 40;
    const MAX_PATH_WIDTH: usize = 60;

    let file_header = "FILE";
    let line_header = "LINE";
    let spec_header = "SPEC";
    let path_header = "TEST";
    let enabled_header = "ENABLED";

    let max_file_len = rows.iter().map(|r| r.file.chars().count()).max().unwrap_or(0);
    let max_line_len = rows
        .iter()
        .map(|r| r.line.to_string().len())
        .max()
        .unwrap_or(0);
    let max_spec_len = rows.iter().map(|r| r.spec.chars().count()).max().unwrap_or(0);
    let max_path_len = rows.iter().map(|r| r.path.chars().count()).max().unwrap_or(0);

    let file_width = cmp::min(cmp::max(file_header.len(), max_file_len), MAX_FILE_WIDTH);
    let line_width = cmp::max(line_header.len(), max_line_len);
    let spec_width = cmp::min(cmp::max(spec_header.len(), max_spec_len), MAX_SPEC_WIDTH);
    let path_width = cmp::min(cmp::max(path_header.len(), max_path_len), MAX_PATH_WIDTH);

    let _ = writeln!(
        out,
        "{:<file_width$} {:>line_width$} {:<spec_width$} {:<path_width$} {}",
        file_header, line_header, spec_header, path_header, enabled_header
    );

    for row in rows {
        let _ = writeln!(
            out,
            "{:<file_width$} {:>line_width$} {:<spec_width$} {:<path_width$} {}",
            truncate(&row.file, file_width),
            row.line,
            truncate(&row.spec, spec_width),
            truncate(&row.path, path_width),
            if row.enabled { "yes" } else { "no" }
        );
    }

    out
}

fn build_rows(result: &ScanResult) -> Vec<DisplayRow> {
    fn visit(rows: &mut Vec<DisplayRow>, file: &str, spec: &str, test: &TestReport) {
        rows.push(DisplayRow {
            file: file.to_string(),
            line: test.range.start_line,
            spec: spec.to_string(),
            path: test.path.clone(),
            enabled: test.enabled,
        });
        for child in &test.children {
            visit(rows, file, spec, child);
        }
    }

    let mut rows = Vec::new();
    for file in &result.files {
        let file_name = file.path.display().to_string();
        for spec in &file.specs {
            for test in &spec.tests {
                visit(&mut rows, &file_name, &spec.fqn, test);
            }
        }
    }
    rows
}

/// Render a `TestAtResult` in human-readable text form.
pub fn print_test_at_text(result: &TestAtResult) -> Result<()> {
    print!("{}", render_test_at_text(result));
    Ok(())
}

fn render_test_at_text(result: &TestAtResult) -> String {
    let mut out = String::new();

    match (&result.spec, &result.style) {
        (Some(spec), Some(style)) => {
            let _ = writeln!(out, "spec    : {spec} ({style})");
        }
        (Some(spec), None) => {
            let _ = writeln!(out, "spec    : {spec}");
        }
        _ => {
            let _ = writeln!(out, "spec    : (none)");
        }
    }

    match &result.test {
        Some(test) => {
            let _ = writeln!(out, "test    : {}", test.name);
            let _ = writeln!(out, "path    : {}", test.path);
            let _ = writeln!(out, "enabled : {}", test.enabled);
            let _ = writeln!(
                out,
                "range   : {}-{}:{}",
                position(&test.range),
                test.range.end_line,
                test.range.end_column
            );
        }
        None => {
            let _ = writeln!(out, "test    : (none)");
        }
    }

    out
}

/// Render a `LaunchCommand` as a single shell-ready line.
pub fn print_launch_text(command: &LaunchCommand) -> Result<()> {
    println!("{}", render_launch_text(command));
    Ok(())
}

fn render_launch_text(command: &LaunchCommand) -> String {
    std::iter::once(command.main_class.as_str())
        .chain(command.args.iter().map(String::as_str))
        .map(shell_quote)
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,:/=@+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Render the style registry in human-readable text form.
pub fn print_styles_text(styles: &[StyleInfo]) -> Result<()> {
    print!("{}", render_styles_text(styles));
    Ok(())
}

fn render_styles_text(styles: &[StyleInfo]) -> String {
    let mut out = String::new();
    for style in styles {
        let _ = writeln!(out, "{}: {} ({})", style.id, style.label, style.fqn);
        let _ = writeln!(out, "    keywords : {}", style.keywords.join(", "));
        let _ = writeln!(out, "    template : {}", style.template);
    }
    out
}

/// Render the style registry as a table.
pub fn print_styles_table(styles: &[StyleInfo]) -> Result<()> {
    let id_width = styles
        .iter()
        .map(|s| s.id.len())
        .chain(std::iter::once("ID".len()))
        .max()
        .unwrap_or(0);
    let label_width = styles
        .iter()
        .map(|s| s.label.len())
        .chain(std::iter::once("LABEL".len()))
        .max()
        .unwrap_or(0);

    println!("{:<id_width$} {:<label_width$} KEYWORDS", "ID", "LABEL");
    for style in styles {
        println!(
            "{:<id_width$} {:<label_width$} {}",
            style.id,
            style.label,
            style.keywords.join(",")
        );
    }
    Ok(())
}

/// Render an `IndexSummary` in human-readable text form.
pub fn print_index_summary_text(summary: &IndexSummary) -> Result<()> {
    println!("index_path   : {}", summary.index_path.display());

    if let Some(root) = &summary.root_path {
        println!("root_path    : {root}");
    }
    if let Some(schema) = &summary.schema_version {
        println!("schema       : {schema}");
    }
    if let Some(tool) = &summary.tool_version {
        println!("tool_version : {tool}");
    }
    if let Some(created) = &summary.created_at {
        println!("created_at   : {created}");
    }
    if let Some(updated) = &summary.updated_at {
        println!("updated_at   : {updated}");
    }

    println!("files        : {}", summary.files_indexed);
    println!("specs        : {}", summary.specs_indexed);
    println!("tests        : {}", summary.tests_indexed);

    Ok(())
}

fn position(range: &TextRange) -> String {
    format!("{}:{}", range.start_line, range.start_column)
}

fn include_kind(kind: IncludeKind) -> &'static str {
    match kind {
        IncludeKind::Value => "value",
        IncludeKind::Function => "function",
    }
}

fn truncate(s: &str, max_width: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_width {
        s.to_string()
    } else if max_width <= 1 {
        "…".to_string()
    } else {
        s.chars()
            .take(max_width.saturating_sub(1))
            .collect::<String>()
            + "…"
    }
}
