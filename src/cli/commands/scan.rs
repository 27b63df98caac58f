use anyhow::Result;

use super::super::args::ScanCommand;
use super::{CommandKind, CommandResult, CommandSummary, ScanSummary};
use crate::{core::ScanContext, issues::Severity};

pub fn scan(cmd: ScanCommand) -> Result<CommandResult> {
    let args = cmd.args;
    let ctx = ScanContext::new(&args)?;
    let output = ctx.into_output();

    let error_count = output
        .issues
        .iter()
        .filter(|i| i.severity() == Severity::Error)
        .count();
    let warning_count = output.issues.len() - error_count;
    let parse_error_count = output.files_failed;

    tracing::debug!(
        records = output.records.len(),
        errors = error_count,
        warnings = warning_count,
        "scan finished"
    );

    Ok(CommandResult {
        kind: CommandKind::Scan,
        summary: CommandSummary::Scan(ScanSummary {
            output,
            format: args.format,
            output_path: args.output,
        }),
        error_count,
        warning_count,
        parse_error_count,
    })
}
