use std::process::ExitCode;

use clap::Parser;
use trackscan::cli::{Arguments, ExitStatus};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the log filter.
const LOG_ENV: &str = "TRACKSCAN_LOG";

fn main() -> ExitCode {
    let args = Arguments::parse();

    // Logs go to stderr; stdout carries only the report.
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if args.verbose() {
            EnvFilter::new("warn,trackscan=debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match trackscan::cli::run_cli(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitStatus::Error.into()
        }
    }
}
