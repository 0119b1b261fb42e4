use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::models::{IndexConfig, ScanConfig, TestAtRequest};
use crate::spec::SpecStyle;

/// Default location of the report index, relative to the working
/// directory.
pub const DEFAULT_INDEX_PATH: &str = ".specscan/index.sqlite";

/// Top-level CLI entrypoint for `specscan`.
#[derive(Parser, Debug)]
#[command(
    name = "specscan",
    version,
    about = "Discover Kotest specs and tests in Kotlin sources",
    subcommand_required = false,
    arg_required_else_help = false
)]
pub struct Cli {
    /// Print the JSON schema version used for `scan --format=json`
    /// output and exit.
    #[arg(long = "schema-version")]
    pub schema_version: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan Kotlin sources and report specs, tests, callbacks and includes.
    Scan(ScanArgs),
    /// Show the test at a source position.
    TestAt(TestAtArgs),
    /// Print console runner arguments for a spec, a test, or a package.
    Command(CommandArgs),
    /// Print the source template for a new test in a given style.
    Skeleton(SkeletonArgs),
    /// List the supported spec styles.
    Styles(StylesArgs),
    /// Build or update the report index.
    Index(IndexArgs),
    /// Inspect an existing index without modifying it.
    IndexInfo(IndexInfoArgs),
    /// Run a long-lived HTTP+JSON daemon.
    Serve(ServeArgs),
}

/// Arguments specific to the `scan` subcommand.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Paths to scan (defaults to current directory if omitted).
    #[arg(short = 'p', long = "path")]
    pub paths: Vec<PathBuf>,

    /// Inclusion globs applied to candidate files.
    #[arg(long = "glob")]
    pub globs: Vec<String>,

    /// Exclusion globs applied to candidate files.
    #[arg(long = "exclude")]
    pub exclude_globs: Vec<String>,

    /// Leave lifecycle callbacks (beforeTest, afterSpec, ...) out of
    /// the report.
    #[arg(long = "hide-callbacks")]
    pub hide_callbacks: bool,

    /// Leave `include(...)` entries out of the report.
    #[arg(long = "hide-includes")]
    pub hide_includes: bool,

    /// Reuse cached reports for files unchanged since they were last
    /// indexed, and record fresh reports for the rest.
    #[arg(long = "use-index")]
    pub use_index: bool,

    /// Location of the SQLite index used with `--use-index`.
    ///
    /// Defaults to ".specscan/index.sqlite".
    #[arg(long = "index-path")]
    pub index_path: Option<PathBuf>,

    /// Output format (text, table, or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Optional server URL for delegating the scan to a daemon.
    ///
    /// When set (either via this flag or the `SPECSCAN_SERVER_URL`
    /// environment variable), the CLI sends the scan configuration to
    /// the HTTP server instead of scanning locally. Use `--no-server`
    /// to override this and force local execution.
    #[arg(long = "server", env = "SPECSCAN_SERVER_URL")]
    pub server: Option<String>,

    /// Disable use of any configured server and force a local scan.
    #[arg(long = "no-server")]
    pub no_server: bool,
}

/// Arguments specific to the `test-at` subcommand.
#[derive(Args, Debug)]
pub struct TestAtArgs {
    /// Kotlin source file to inspect.
    #[arg(long = "file")]
    pub file: PathBuf,

    /// 1-based line.
    #[arg(long = "line")]
    pub line: u32,

    /// 1-based column.
    #[arg(long = "column", default_value_t = 1)]
    pub column: u32,

    /// Only report a test when the position is on the token that
    /// introduces it (the keyword, the string literal, or the `.` of
    /// a `.config` call), the way an editor gutter marker would.
    #[arg(long = "leaf")]
    pub leaf: bool,

    /// Output format (text or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Optional server URL for delegating the lookup to a daemon.
    #[arg(long = "server", env = "SPECSCAN_SERVER_URL")]
    pub server: Option<String>,

    /// Disable use of any configured server and force a local lookup.
    #[arg(long = "no-server")]
    pub no_server: bool,
}

/// Arguments specific to the `command` subcommand.
#[derive(Args, Debug)]
pub struct CommandArgs {
    /// Spec file. When omitted, `--package` selects what to run.
    #[arg(long = "file")]
    pub file: Option<PathBuf>,

    /// 1-based line of the test to run. Without it the first spec in
    /// the file is selected.
    #[arg(long = "line", requires = "file")]
    pub line: Option<u32>,

    /// 1-based column, used together with `--line`.
    #[arg(long = "column", requires = "line")]
    pub column: Option<u32>,

    /// Package whose specs should all run.
    #[arg(long = "package")]
    pub package: Option<String>,

    /// Output format (text or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments specific to the `skeleton` subcommand.
#[derive(Args, Debug)]
pub struct SkeletonArgs {
    /// Style id (`fun`), base class name (`FunSpec`) or its fully
    /// qualified name.
    #[arg(long = "style")]
    pub style: SpecStyle,

    /// Name of the new test.
    #[arg(long = "name")]
    pub name: String,
}

/// Arguments specific to the `styles` subcommand.
#[derive(Args, Debug)]
pub struct StylesArgs {
    /// Output format (text, table, or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// CLI representation of output format.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Table,
    Json,
}

/// Arguments specific to the `index` subcommand.
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Paths to index (defaults to current directory if omitted).
    #[arg(short = 'p', long = "path")]
    pub paths: Vec<PathBuf>,

    /// Inclusion globs applied to candidate files.
    #[arg(long = "glob")]
    pub globs: Vec<String>,

    /// Exclusion globs applied to candidate files.
    #[arg(long = "exclude")]
    pub exclude_globs: Vec<String>,

    /// Location of the SQLite index file.
    ///
    /// Defaults to ".specscan/index.sqlite".
    #[arg(long = "index-path")]
    pub index_path: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Optional server URL for delegating indexing to a daemon.
    ///
    /// When set (either via this flag or the `SPECSCAN_SERVER_URL`
    /// environment variable), the CLI sends the index configuration
    /// to the HTTP server instead of running local indexing. Use
    /// `--no-server` to override this and force local execution.
    #[arg(long = "server", env = "SPECSCAN_SERVER_URL")]
    pub server: Option<String>,

    /// Disable use of any configured server and force local indexing.
    #[arg(long = "no-server")]
    pub no_server: bool,
}

/// Arguments specific to the `index-info` subcommand.
#[derive(Args, Debug)]
pub struct IndexInfoArgs {
    /// Paths the index was built for (defaults to current directory).
    #[arg(short = 'p', long = "path")]
    pub paths: Vec<PathBuf>,

    /// Location of the SQLite index file.
    ///
    /// Defaults to ".specscan/index.sqlite".
    #[arg(long = "index-path")]
    pub index_path: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Optional server URL for delegating index introspection to a daemon.
    #[arg(long = "server", env = "SPECSCAN_SERVER_URL")]
    pub server: Option<String>,

    /// Disable use of any configured server and force local index introspection.
    #[arg(long = "no-server")]
    pub no_server: bool,
}

/// Arguments specific to the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to, e.g. "127.0.0.1:7878".
    #[arg(long = "addr", default_value = "127.0.0.1:7878")]
    pub addr: String,
}

fn paths_or_current_dir(paths: &[PathBuf]) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    }
}

fn index_path_or_default(index_path: &Option<PathBuf>) -> PathBuf {
    index_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH))
}

/// Build a core `ScanConfig` from CLI `ScanArgs`.
pub fn scan_config_from_args(args: &ScanArgs) -> Result<ScanConfig> {
    let paths = paths_or_current_dir(&args.paths);

    if args.index_path.is_some() && !args.use_index {
        tracing::debug!("--index-path has no effect without --use-index");
    }

    let index = args.use_index.then(|| IndexConfig {
        paths: paths.clone(),
        globs: args.globs.clone(),
        exclude_globs: args.exclude_globs.clone(),
        index_path: index_path_or_default(&args.index_path),
    });

    Ok(ScanConfig {
        paths,
        globs: args.globs.clone(),
        exclude_globs: args.exclude_globs.clone(),
        hide_callbacks: args.hide_callbacks,
        hide_includes: args.hide_includes,
        index,
    })
}

/// Build a `TestAtRequest` from CLI `TestAtArgs`.
pub fn test_at_request_from_args(args: &TestAtArgs) -> Result<TestAtRequest> {
    if args.line == 0 || args.column == 0 {
        bail!("--line and --column are 1-based");
    }

    Ok(TestAtRequest {
        path: args.file.clone(),
        line: args.line,
        column: args.column,
        leaf: args.leaf,
    })
}

/// Position selected by `CommandArgs`, if any.
pub fn command_position_from_args(args: &CommandArgs) -> Result<Option<(u32, u32)>> {
    match (args.line, args.column) {
        (None, _) => Ok(None),
        (Some(0), _) | (Some(_), Some(0)) => bail!("--line and --column are 1-based"),
        (Some(line), column) => Ok(Some((line, column.unwrap_or(1)))),
    }
}

/// Build a core `IndexConfig` from CLI `IndexArgs`.
pub fn index_config_from_args(args: &IndexArgs) -> Result<IndexConfig> {
    Ok(IndexConfig {
        paths: paths_or_current_dir(&args.paths),
        globs: args.globs.clone(),
        exclude_globs: args.exclude_globs.clone(),
        index_path: index_path_or_default(&args.index_path),
    })
}

/// Build a core `IndexConfig` from CLI `IndexInfoArgs`.
pub fn index_info_config_from_args(args: &IndexInfoArgs) -> Result<IndexConfig> {
    Ok(IndexConfig {
        paths: paths_or_current_dir(&args.paths),
        globs: Vec::new(),
        exclude_globs: Vec::new(),
        index_path: index_path_or_default(&args.index_path),
    })
}
