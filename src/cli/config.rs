use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::args::OutputFormat;
use crate::cli::{IndexArgs, IndexInfoArgs, ScanArgs, ServeArgs, TestAtArgs};

/// Top-level representation of `.specscan/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub scan: Option<ScanSection>,

    #[serde(default)]
    pub index: Option<IndexSection>,

    #[serde(default, rename = "index_info")]
    pub index_info: Option<IndexInfoSection>,

    #[serde(default)]
    pub serve: Option<ServeSection>,

    #[serde(default)]
    pub http: Option<HttpSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanSection {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub globs: Vec<String>,
    #[serde(default, alias = "exclude")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub hide_callbacks: Option<bool>,
    #[serde(default)]
    pub hide_includes: Option<bool>,
    #[serde(default)]
    pub use_index: Option<bool>,
    #[serde(default)]
    pub index_path: Option<PathBuf>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub no_server: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexSection {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub globs: Vec<String>,
    #[serde(default, alias = "exclude")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub index_path: Option<PathBuf>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub no_server: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexInfoSection {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub index_path: Option<PathBuf>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub no_server: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServeSection {
    #[serde(default)]
    pub addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HttpSection {
    #[serde(default)]
    pub server_url: Option<String>,
}

/// Discover and load a project-local `.specscan/config.toml` starting
/// from the current working directory and walking up parent
/// directories.
pub fn load_cli_config() -> Result<Option<CliConfig>> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;

    let Some(path) = find_project_config(&cwd) else {
        return Ok(None);
    };

    tracing::debug!(path = %path.display(), "loading project config");
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: CliConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse TOML config at {}", path.display()))?;

    Ok(Some(config))
}

fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(".specscan").join("config.toml"))
        .find(|candidate| candidate.is_file())
}

/// Fill `server` from the section value, else from `[http]`.
fn default_server(config: &CliConfig, server: &mut Option<String>, section: Option<&String>) {
    if server.is_some() {
        return;
    }
    *server = section.cloned().or_else(|| {
        config
            .http
            .as_ref()
            .and_then(|http| http.server_url.clone())
    });
}

fn default_flag(flag: &mut bool, section: Option<bool>) {
    if !*flag && section == Some(true) {
        *flag = true;
    }
}

fn default_format(format: &mut OutputFormat, section: Option<OutputFormat>) {
    if matches!(format, OutputFormat::Text) {
        if let Some(value) = section {
            *format = value;
        }
    }
}

fn default_list<T: Clone>(list: &mut Vec<T>, section: &[T]) {
    if list.is_empty() && !section.is_empty() {
        *list = section.to_vec();
    }
}

pub fn apply_scan_config_defaults(config: &CliConfig, args: &mut ScanArgs) {
    let Some(scan) = &config.scan else {
        default_server(config, &mut args.server, None);
        return;
    };

    default_list(&mut args.paths, &scan.paths);
    default_list(&mut args.globs, &scan.globs);
    default_list(&mut args.exclude_globs, &scan.exclude_globs);
    default_flag(&mut args.hide_callbacks, scan.hide_callbacks);
    default_flag(&mut args.hide_includes, scan.hide_includes);
    default_flag(&mut args.use_index, scan.use_index);

    if args.index_path.is_none() {
        args.index_path = scan.index_path.clone();
    }

    default_format(&mut args.format, scan.format);
    default_server(config, &mut args.server, scan.server.as_ref());
    default_flag(&mut args.no_server, scan.no_server);
}

/// `test-at` has no section of its own; it only picks up `[http]`.
pub fn apply_test_at_config_defaults(config: &CliConfig, args: &mut TestAtArgs) {
    default_server(config, &mut args.server, None);
}

pub fn apply_index_config_defaults(config: &CliConfig, args: &mut IndexArgs) {
    let Some(index) = &config.index else {
        default_server(config, &mut args.server, None);
        return;
    };

    default_list(&mut args.paths, &index.paths);
    default_list(&mut args.globs, &index.globs);
    default_list(&mut args.exclude_globs, &index.exclude_globs);

    if args.index_path.is_none() {
        args.index_path = index.index_path.clone();
    }

    default_server(config, &mut args.server, index.server.as_ref());
    default_flag(&mut args.no_server, index.no_server);
}

pub fn apply_index_info_config_defaults(config: &CliConfig, args: &mut IndexInfoArgs) {
    let Some(info) = &config.index_info else {
        default_server(config, &mut args.server, None);
        return;
    };

    default_list(&mut args.paths, &info.paths);

    if args.index_path.is_none() {
        args.index_path = info.index_path.clone();
    }

    default_format(&mut args.format, info.format);
    default_server(config, &mut args.server, info.server.as_ref());
    default_flag(&mut args.no_server, info.no_server);
}

pub fn apply_serve_config_defaults(config: &CliConfig, args: &mut ServeArgs) {
    if let Some(serve) = &config.serve {
        if args.addr == "127.0.0.1:7878" {
            if let Some(addr) = &serve.addr {
                args.addr = addr.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scan_args() -> ScanArgs {
        ScanArgs {
            paths: Vec::new(),
            globs: Vec::new(),
            exclude_globs: Vec::new(),
            hide_callbacks: false,
            hide_includes: false,
            use_index: false,
            index_path: None,
            format: OutputFormat::Text,
            server: None,
            no_server: false,
        }
    }

    #[test]
    fn find_project_config_walks_up_parents() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(".specscan");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.toml"), "").unwrap();
        let nested = dir.path().join("module/src/test/kotlin");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            find_project_config(&nested),
            Some(config_dir.join("config.toml"))
        );
    }

    #[test]
    fn scan_section_fills_unset_arguments_only() {
        let config: CliConfig = toml::from_str(
            r#"
[scan]
paths = ["src/test/kotlin"]
exclude = ["build/**"]
hide_callbacks = true
format = "json"

[http]
server_url = "http://127.0.0.1:9999"
"#,
        )
        .unwrap();

        let mut args = scan_args();
        args.paths = vec![PathBuf::from("cli/path")];
        apply_scan_config_defaults(&config, &mut args);

        assert_eq!(args.paths, vec![PathBuf::from("cli/path")]);
        assert_eq!(args.exclude_globs, vec!["build/**".to_string()]);
        assert!(args.hide_callbacks);
        assert!(!args.hide_includes);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.server.as_deref(), Some("http://127.0.0.1:9999"));
    }

    #[test]
    fn http_section_applies_without_command_section() {
        let config: CliConfig =
            toml::from_str("[http]\nserver_url = \"http://localhost:7878\"\n").unwrap();

        let mut args = scan_args();
        apply_scan_config_defaults(&config, &mut args);
        assert_eq!(args.server.as_deref(), Some("http://localhost:7878"));
    }
}
