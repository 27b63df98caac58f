//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `scan`: Find tracking call sites and report them
//! - `init`: Write a default `.trackscanrc.json`

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }

    pub fn verbose(&self) -> bool {
        match &self.command {
            Some(Command::Scan(cmd)) => cmd.args.verbose,
            Some(Command::Init) | None => false,
        }
    }
}

/// Output format of a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Cargo-style blocks, one per tracking call
    #[default]
    Text,
    /// Records and diagnostics as JSON
    Json,
    /// YAML tracking schema grouped by event
    Schema,
}

#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Custom tracking function, e.g. 'track(userId, EVENT_NAME, PROPERTIES)'
    /// or a bare name whose argument roles are inferred (repeatable)
    #[arg(long = "custom-function", value_name = "SIG")]
    pub custom_functions: Vec<String>,

    /// Regex matched against dotted callee names of custom functions (repeatable)
    #[arg(long = "custom-pattern", value_name = "REGEX")]
    pub custom_patterns: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of worker threads (overrides config file)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Report a warning for every call whose event name is not a literal
    #[arg(long)]
    pub include_unmatched_diagnostics: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct ScanCommand {
    #[command(flatten)]
    pub args: ScanArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find analytics tracking calls in a source tree
    Scan(ScanCommand),
    /// Create a default .trackscanrc.json in the current directory
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Arguments {
        Arguments::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_scan_defaults() {
        let args = parse(&["trackscan", "scan"]);
        let Some(Command::Scan(cmd)) = args.command else {
            panic!("expected scan");
        };
        assert_eq!(cmd.args.path, PathBuf::from("."));
        assert_eq!(cmd.args.format, OutputFormat::Text);
        assert!(cmd.args.custom_functions.is_empty());
        assert!(!cmd.args.include_unmatched_diagnostics);
    }

    #[test]
    fn test_scan_repeatable_options() {
        let args = parse(&[
            "trackscan",
            "scan",
            "services",
            "--custom-function",
            "track(EVENT_NAME, PROPERTIES)",
            "--custom-function",
            "customTrackFunction0",
            "--custom-pattern",
            "^log",
            "--format",
            "json",
            "-j",
            "2",
            "-v",
        ]);
        assert!(args.verbose());
        let Some(Command::Scan(cmd)) = args.command else {
            panic!("expected scan");
        };
        assert_eq!(cmd.args.path, PathBuf::from("services"));
        assert_eq!(cmd.args.custom_functions.len(), 2);
        assert_eq!(cmd.args.custom_patterns, vec!["^log"]);
        assert_eq!(cmd.args.format, OutputFormat::Json);
        assert_eq!(cmd.args.jobs, Some(2));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Arguments::try_parse_from(["trackscan", "scan", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_arguments_are_consistent() {
        Arguments::command().debug_assert();
    }
}
