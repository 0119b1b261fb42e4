//! Scan entry points: walking source trees, building per-file reports,
//! and the single-position queries built on top of them.

mod engine;

pub use engine::{
    launch_command, report_for_source, run_scan, style_infos, test_at, walk_source_files,
};
