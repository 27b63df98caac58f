//! Report formatting and printing utilities.
//!
//! Records and issues are printed in cargo-style blocks. The JSON and schema
//! renderings live in `core::output` so the scanner can be used as a library.

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use anyhow::{Context, Result};
use colored::Colorize;
use unicode_width::UnicodeWidthStr;

use super::{
    args::OutputFormat,
    commands::{CommandResult, CommandSummary, InitSummary, ScanSummary},
};
use crate::config::CONFIG_FILE_NAME;
use crate::core::{
    ScanOutput, SourceContext,
    extract::{EventName, TrackingRecord},
    output::{render_json, render_schema},
};
use crate::issues::{Issue, Report, ReportLocation, Severity};

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓

/// Failure mark for consistent output formatting.
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

/// Print records, issues and a summary to a writer.
pub fn report_to<W: Write>(output: &ScanOutput, writer: &mut W) {
    let max_line_width = calculate_max_line_width(output);

    for record in &output.records {
        print_record(record, writer, max_line_width);
    }
    for issue in &output.issues {
        print_issue(issue, writer, max_line_width);
    }

    print_summary(output, writer);
}

/// Print a warning about files that could not be parsed.
pub fn print_parse_warning(count: usize, verbose: bool) {
    print_parse_warning_to(count, verbose, &mut io::stderr().lock());
}

/// Print a parse warning to a custom writer.
pub fn print_parse_warning_to<W: Write>(count: usize, verbose: bool, writer: &mut W) {
    if count > 0 && !verbose {
        let _ = writeln!(
            writer,
            "{} {} file(s) could not be parsed (use {} for details)",
            "warning:".bold().yellow(),
            count,
            "-v".cyan()
        );
    }
}

pub fn print(result: &CommandResult, verbose: bool) -> Result<()> {
    match &result.summary {
        CommandSummary::Scan(summary) => {
            print_scan(summary)?;
            print_parse_warning(result.parse_error_count, verbose);
        }
        CommandSummary::Init(summary) => print_init(summary),
    }
    Ok(())
}

// ============================================================
// Internal Functions
// ============================================================

fn print_scan(summary: &ScanSummary) -> Result<()> {
    let Some(path) = &summary.output_path else {
        let stdout = &mut io::stdout().lock();
        return match summary.format {
            OutputFormat::Text => {
                report_to(&summary.output, stdout);
                Ok(())
            }
            format => write_rendered(&render(&summary.output, format)?, stdout),
        };
    };

    // Report files never carry ANSI colors.
    colored::control::set_override(false);
    let rendered = render(&summary.output, summary.format);
    colored::control::unset_override();
    let rendered = rendered?;
    write_file(path, &rendered)?;
    eprintln!(
        "{} {}",
        SUCCESS_MARK.green(),
        format!(
            "Wrote {} tracking call(s) to {}",
            summary.output.records.len(),
            path.display()
        )
        .green()
    );
    Ok(())
}

fn render(output: &ScanOutput, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(output),
        OutputFormat::Schema => render_schema(&output.records),
        OutputFormat::Text => {
            let mut buffer = Vec::new();
            report_to(output, &mut buffer);
            Ok(String::from_utf8_lossy(&buffer).into_owned())
        }
    }
}

fn write_rendered<W: Write>(rendered: &str, writer: &mut W) -> Result<()> {
    writer
        .write_all(rendered.as_bytes())
        .context("Failed to write report")
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_record<W: Write>(record: &TrackingRecord, writer: &mut W, max_line_width: usize) {
    let event = match &record.event {
        EventName::Resolved(name) => format!("\"{}\"", name).bold(),
        unresolved => unresolved.to_string().yellow(),
    };
    let _ = writeln!(
        writer,
        "{}: {}",
        record.source.to_string().bold().green(),
        event
    );

    print_snippet(&record.context, "^".green(), writer, max_line_width);

    let mut notes: Vec<String> = Vec::new();
    if let Some(user_id) = &record.user_id {
        notes.push(format!("user id {}", user_id));
    }
    if !record.properties.is_empty() {
        notes.push(format!("properties {}", record.properties));
    }
    if let Some(unresolved) = &record.unresolved_properties {
        notes.push(format!("properties from `{}`", unresolved.expression));
    }
    for argument in &record.incidental {
        let label = match &argument.name {
            Some(name) => format!("{} (argument {})", name, argument.position + 1),
            None => format!("argument {}", argument.position + 1),
        };
        notes.push(format!("{} {}", label, argument.value));
    }
    notes.push(format!("in {}", record.function));

    for note in notes {
        let _ = writeln!(
            writer,
            "{:>width$} {} {} {}",
            "",
            "=".blue(),
            "note:".bold(),
            note,
            width = max_line_width
        );
    }

    let _ = writeln!(writer);
}

fn print_issue<W: Write>(issue: &Issue, writer: &mut W, max_line_width: usize) {
    let loc = issue.location();

    // Print severity and message (cargo-style)
    let severity = issue.report_severity();
    let severity_str = match severity {
        Severity::Error => "error".bold().red(),
        Severity::Warning => "warning".bold().yellow(),
    };

    let _ = writeln!(
        writer,
        "{}: {}  {}",
        severity_str,
        issue.message(),
        issue.report_rule().to_string().dimmed().cyan()
    );

    match loc {
        ReportLocation::Source(ctx) => {
            let caret = match severity {
                Severity::Error => "^".red(),
                Severity::Warning => "^".yellow(),
            };
            print_snippet(ctx, caret, writer, max_line_width);
        }
        ReportLocation::File { path } => {
            let _ = writeln!(writer, "  {} {}", "-->".blue(), path);
        }
    }

    // Print details if present (cargo-style note)
    if let Some(details) = issue.details() {
        let _ = writeln!(
            writer,
            "{:>width$} {} {} {}",
            "",
            "=".blue(),
            "note:".bold(),
            details,
            width = max_line_width
        );
    }

    // Print hint if present
    if let Some(hint) = issue.hint() {
        let _ = writeln!(
            writer,
            "{:>width$} {} {} {}",
            "",
            "=".blue(),
            "hint:".bold().cyan(),
            hint,
            width = max_line_width
        );
    }

    let _ = writeln!(writer); // Empty line between blocks
}

/// Clickable location, the source line and a caret under the column.
fn print_snippet<W: Write>(
    ctx: &SourceContext,
    caret: colored::ColoredString,
    writer: &mut W,
    max_line_width: usize,
) {
    let (line, col) = (ctx.line(), ctx.col());
    let _ = writeln!(
        writer,
        "  {} {}:{}:{}",
        "-->".blue(),
        ctx.file_path(),
        line,
        col
    );

    let source_line = ctx.source_line.as_str();
    if source_line.is_empty() {
        return;
    }

    let _ = writeln!(
        writer,
        "{:>width$} {}",
        "",
        "|".blue(),
        width = max_line_width
    );
    let _ = writeln!(
        writer,
        "{:>width$} {} {}",
        line.to_string().blue(),
        "|".blue(),
        source_line,
        width = max_line_width
    );

    // Caret pointing to the column (col is 1-based)
    let prefix = if col > 1 {
        source_line.chars().take(col - 1).collect::<String>()
    } else {
        String::new()
    };
    let caret_padding = UnicodeWidthStr::width(prefix.as_str());
    let _ = writeln!(
        writer,
        "{:>width$} {} {:>padding$}{}",
        "",
        "|".blue(),
        "",
        caret,
        width = max_line_width,
        padding = caret_padding
    );
}

fn print_summary<W: Write>(output: &ScanOutput, writer: &mut W) {
    let total_errors = output
        .issues
        .iter()
        .filter(|i| i.report_severity() == Severity::Error)
        .count();
    let total_warnings = output.issues.len() - total_errors;
    let total_problems = total_errors + total_warnings;

    if total_problems > 0 {
        let _ = writeln!(
            writer,
            "{} {} problems ({} {}, {} {})",
            FAILURE_MARK.red(),
            total_problems,
            total_errors,
            if total_errors == 1 { "error" } else { "errors" }.red(),
            total_warnings,
            if total_warnings == 1 {
                "warning"
            } else {
                "warnings"
            }
            .yellow()
        );
    }

    let files = output.files_scanned;
    let _ = writeln!(
        writer,
        "{} {}",
        SUCCESS_MARK.green(),
        format!(
            "Found {} tracking {} in {} {}",
            output.records.len(),
            if output.records.len() == 1 {
                "call"
            } else {
                "calls"
            },
            files,
            if files == 1 { "file" } else { "files" }
        )
        .green()
    );
}

fn calculate_max_line_width(output: &ScanOutput) -> usize {
    let record_lines = output.records.iter().map(|r| r.location().line);
    let issue_lines = output
        .issues
        .iter()
        .filter_map(|i| i.location().position().map(|(line, _)| line));
    record_lines
        .chain(issue_lines)
        .max()
        .map(|n| n.to_string().len())
        .unwrap_or(1)
}

fn print_init(summary: &InitSummary) {
    if summary.created {
        println!(
            "{} {}",
            SUCCESS_MARK.green(),
            format!("Created {}", CONFIG_FILE_NAME).green()
        );
    }
}

// ============================================================
// Tests
// ============================================================
