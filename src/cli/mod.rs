use std::net::SocketAddr;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use serde::Serialize;

use crate::index;
use crate::models::SCAN_RESULT_VERSION;
use crate::scan;
use crate::server;

mod args;
mod config;
mod format;
mod http_backend;

pub use args::{
    Cli, CommandArgs, Commands, IndexArgs, IndexInfoArgs, OutputFormat, ScanArgs, ServeArgs,
    SkeletonArgs, StylesArgs, TestAtArgs,
};

use config::{
    apply_index_config_defaults, apply_index_info_config_defaults, apply_scan_config_defaults,
    apply_serve_config_defaults, apply_test_at_config_defaults, load_cli_config,
};
use http_backend::HttpBackend;

/// Entry point for the CLI binary.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.schema_version {
        println!("Scan result JSON schema version: {SCAN_RESULT_VERSION}");
        return Ok(());
    }

    let cli_config = load_cli_config()?;

    match cli.command {
        Some(Commands::Scan(mut scan_args)) => {
            if let Some(ref config) = cli_config {
                apply_scan_config_defaults(config, &mut scan_args);
            }

            let config = args::scan_config_from_args(&scan_args)?;
            let result = if let Some(server_url) =
                effective_server_url(scan_args.server.as_deref(), scan_args.no_server)
            {
                HttpBackend::new(server_url)?.scan(config)?
            } else {
                scan::run_scan(config)?
            };

            match scan_args.format {
                OutputFormat::Text => format::print_text(&result),
                OutputFormat::Table => format::print_table(&result),
                OutputFormat::Json => print_json(&result),
            }
        }
        Some(Commands::TestAt(mut test_at_args)) => {
            if let Some(ref config) = cli_config {
                apply_test_at_config_defaults(config, &mut test_at_args);
            }

            let request = args::test_at_request_from_args(&test_at_args)?;
            let result = if let Some(server_url) =
                effective_server_url(test_at_args.server.as_deref(), test_at_args.no_server)
            {
                HttpBackend::new(server_url)?.test_at(request)?
            } else {
                scan::test_at(&request)?
            };

            match test_at_args.format {
                OutputFormat::Text | OutputFormat::Table => format::print_test_at_text(&result),
                OutputFormat::Json => print_json(&result),
            }
        }
        Some(Commands::Command(command_args)) => {
            let position = args::command_position_from_args(&command_args)?;
            let command = scan::launch_command(
                command_args.file.as_deref(),
                position,
                command_args.package.clone(),
            )?;

            match command_args.format {
                OutputFormat::Text | OutputFormat::Table => format::print_launch_text(&command),
                OutputFormat::Json => print_json(&command),
            }
        }
        Some(Commands::Skeleton(skeleton_args)) => {
            println!("{}", skeleton_args.style.generate_test(&skeleton_args.name));
            Ok(())
        }
        Some(Commands::Styles(styles_args)) => {
            let styles = scan::style_infos();
            match styles_args.format {
                OutputFormat::Text => format::print_styles_text(&styles),
                OutputFormat::Table => format::print_styles_table(&styles),
                OutputFormat::Json => print_json(&styles),
            }
        }
        Some(Commands::Index(mut index_args)) => {
            if let Some(ref config) = cli_config {
                apply_index_config_defaults(config, &mut index_args);
            }

            let config = args::index_config_from_args(&index_args)?;
            let summary = if let Some(server_url) =
                effective_server_url(index_args.server.as_deref(), index_args.no_server)
            {
                HttpBackend::new(server_url)?.index(config)?
            } else {
                index::run_index(config)?
            };

            match index_args.format {
                OutputFormat::Text | OutputFormat::Table => {
                    println!(
                        "Indexed {} files, {} specs and {} tests at {}",
                        summary.files_indexed,
                        summary.specs_indexed,
                        summary.tests_indexed,
                        summary.index_path.display()
                    );
                    Ok(())
                }
                OutputFormat::Json => print_json(&summary),
            }
        }
        Some(Commands::IndexInfo(mut info_args)) => {
            if let Some(ref config) = cli_config {
                apply_index_info_config_defaults(config, &mut info_args);
            }

            let config = args::index_info_config_from_args(&info_args)?;
            let summary = if let Some(server_url) =
                effective_server_url(info_args.server.as_deref(), info_args.no_server)
            {
                HttpBackend::new(server_url)?.index_info(config)?
            } else {
                index::get_index_info(&config)?
            };

            match info_args.format {
                OutputFormat::Text | OutputFormat::Table => {
                    format::print_index_summary_text(&summary)
                }
                OutputFormat::Json => print_json(&summary),
            }
        }
        Some(Commands::Serve(mut serve_args)) => {
            if let Some(ref config) = cli_config {
                apply_serve_config_defaults(config, &mut serve_args);
            }

            let addr: SocketAddr = serve_args.addr.parse()?;
            println!("Starting specscan HTTP server on http://{addr}");

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(server::run(addr))?;
            Ok(())
        }
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    serde_json::to_writer(std::io::stdout(), value)?;
    println!();
    Ok(())
}

fn effective_server_url(server_flag: Option<&str>, no_server: bool) -> Option<String> {
    if no_server {
        None
    } else {
        server_flag.map(|s| s.to_string())
    }
}
