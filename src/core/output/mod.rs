//! Machine-readable renderings of a scan.
//!
//! - [`render_json`]: records and diagnostics as pretty-printed JSON
//! - [`schema::render_schema`]: YAML tracking schema grouped by event
//!
//! The cargo-style text report lives in the CLI layer.

pub mod schema;

use anyhow::{Context, Result};
use serde::Serialize;

pub use schema::{TrackingSchema, render_schema};

use crate::{
    core::{context::ScanOutput, extract::TrackingRecord},
    issues::{Issue, Report},
};

/// A diagnostic as written to JSON.
#[derive(Debug, Serialize)]
pub struct Diagnostic<'a> {
    pub rule: String,
    pub severity: String,
    pub file: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl<'a> From<&'a Issue> for Diagnostic<'a> {
    fn from(issue: &'a Issue) -> Self {
        let location = issue.location();
        let position = location.position();
        Self {
            rule: issue.rule().to_string(),
            severity: issue.severity().to_string(),
            file: match issue {
                Issue::ParseError(i) => &i.file_path,
                Issue::AmbiguousSignature(i) => i.context.file_path(),
                Issue::UnresolvedEvent(i) => i.context.file_path(),
            },
            line: position.map(|(line, _)| line),
            column: position.map(|(_, col)| col),
            message: issue.message(),
            note: issue.details(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    records: &'a [TrackingRecord],
    diagnostics: Vec<Diagnostic<'a>>,
    files_scanned: usize,
    files_failed: usize,
}

/// Render a scan as pretty-printed JSON.
pub fn render_json(output: &ScanOutput) -> Result<String> {
    let report = JsonReport {
        records: &output.records,
        diagnostics: output.issues.iter().map(Diagnostic::from).collect(),
        files_scanned: output.files_scanned,
        files_failed: output.files_failed,
    };
    let mut json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    json.push('\n');
    Ok(json)
}
