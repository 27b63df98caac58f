use std::env;

use anyhow::{Context, Result, bail};

use super::{
    args::{Arguments, Command},
    commands::{CommandResult, init::init, scan::scan},
};

/// Dispatches to the appropriate command handler based on the parsed arguments.
///
/// # Returns
/// - `Ok(CommandResult)` with error/warning counts
/// - `Err` for invalid configuration or I/O failures
pub fn run(Arguments { command }: Arguments) -> Result<CommandResult> {
    match command {
        Some(Command::Scan(cmd)) => scan(cmd),
        Some(Command::Init) => {
            let cwd = env::current_dir().context("Failed to read current directory")?;
            init(&cwd)
        }
        None => bail!("No command provided. Use --help to see available commands."),
    }
}
