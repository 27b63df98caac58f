use std::path::PathBuf;

use crate::{cli::args::OutputFormat, core::ScanOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Scan,
    Init,
}

#[derive(Debug)]
pub enum CommandSummary {
    Scan(ScanSummary),
    Init(InitSummary),
}

#[derive(Debug)]
pub struct ScanSummary {
    pub output: ScanOutput,
    pub format: OutputFormat,
    /// Report file, or stdout when `None`.
    pub output_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct InitSummary {
    pub created: bool,
}

/// Result of running trackscan commands
#[derive(Debug)]
pub struct CommandResult {
    pub kind: CommandKind,
    pub summary: CommandSummary,
    pub error_count: usize,
    pub warning_count: usize,
    /// Number of files that failed to parse.
    pub parse_error_count: usize,
}

impl CommandResult {
    pub fn init(created: bool) -> Self {
        Self {
            kind: CommandKind::Init,
            summary: CommandSummary::Init(InitSummary { created }),
            error_count: 0,
            warning_count: 0,
            parse_error_count: 0,
        }
    }
}
