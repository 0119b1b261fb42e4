//! Command-line assembly for the Kotest console runner.
//!
//! Selectors are passed verbatim; nothing here interprets a test path
//! or checks that a spec exists.

use crate::models::LaunchCommand;

/// Entry point of the console runner executed for a run configuration.
pub const LAUNCHER_MAIN_CLASS: &str = "io.kotest.runner.console.LauncherKt";

/// What to run. Each selector is optional; blank selectors are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchSelectors {
    /// Package to run every spec of.
    pub package: Option<String>,
    /// Spec class to run. Callers pass the fully qualified name rather
    /// than the simple class name, since the console runner loads the
    /// class by that name.
    pub spec: Option<String>,
    /// Display path of a single test inside `spec`.
    pub test_path: Option<String>,
}

impl LaunchSelectors {
    /// Runner arguments in `--package`, `--spec`, `--testpath` order.
    pub fn program_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let selectors = [
            ("--package", &self.package),
            ("--spec", &self.spec),
            ("--testpath", &self.test_path),
        ];
        for (flag, value) in selectors {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                args.push(flag.to_string());
                args.push(value.to_string());
            }
        }
        args
    }

    pub fn command(&self) -> LaunchCommand {
        LaunchCommand {
            main_class: LAUNCHER_MAIN_CLASS.to_string(),
            args: self.program_args(),
        }
    }
}
