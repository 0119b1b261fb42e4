//! Kotest spec discovery for Kotlin sources.
//!
//! The `spec` module holds the analysis engine: given a parsed Kotlin
//! file it recognizes spec classes, their style, the tests they declare
//! (with display paths), and their lifecycle callbacks and includes.
//! The remaining modules wrap it for consumers: a scan service with an
//! optional SQLite report cache, launcher argument assembly, an HTTP
//! daemon and the `specscan` CLI.

pub mod cli;
pub mod index;
pub mod language;
pub mod launch;
pub mod models;
pub mod scan;
pub mod server;
pub mod spec;
