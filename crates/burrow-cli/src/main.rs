//! # burrow — minimal Linux container runtime.
//!
//! Single binary with two roles: `run` launches a container from the host,
//! and the hidden `child` subcommand is the re-entered in-namespace half of
//! the lifecycle. Must be run as root.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod commands;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use burrow_common::constants;

fn main() -> ExitCode {
    init_tracing();

    // Render clap's own output but keep the documented exit codes:
    // 0 for help/version, 1 for anything malformed.
    let cli = match commands::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let failed = e.use_stderr();
            let _ = e.print();
            return if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match commands::execute(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so container stdout stays untouched. A non-empty
/// `DEBUG` variable forces the debug level; otherwise `RUST_LOG` applies
/// with an `info` fallback.
fn init_tracing() {
    let debug = std::env::var_os(constants::ENV_DEBUG).is_some_and(|v| !v.is_empty());
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
