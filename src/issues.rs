//! Diagnostics produced while scanning.
//!
//! Analysis problems never abort a scan. They are collected as [`Issue`]s and
//! rendered next to the tracking records by every output format.

use enum_dispatch::enum_dispatch;

use crate::core::{SourceContext, SourceLocation};

// ============================================================
// Severity and Rule
// ============================================================

/// Severity level of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Rule identifier for each issue type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rule {
    ParseError,
    AmbiguousSignature,
    UnresolvedEvent,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::ParseError => write!(f, "parse-error"),
            Rule::AmbiguousSignature => write!(f, "ambiguous-signature"),
            Rule::UnresolvedEvent => write!(f, "unresolved-event"),
        }
    }
}

// ============================================================
// Issue Types
// ============================================================

/// File could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrorIssue {
    pub file_path: String,
    pub error: String,
}

impl ParseErrorIssue {
    pub fn severity() -> Severity {
        Severity::Error
    }

    pub fn rule() -> Rule {
        Rule::ParseError
    }
}

/// Custom-function call site whose argument roles disagree with the
/// mapping recorded at the function's first call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousSignatureIssue {
    pub context: SourceContext,
    /// Dotted name of the custom function.
    pub function: String,
    /// Role mapping inferred at this call site.
    pub found: String,
    /// Role mapping of the first call site.
    pub expected: String,
    pub first_seen: SourceLocation,
}

impl AmbiguousSignatureIssue {
    pub fn severity() -> Severity {
        Severity::Error
    }

    pub fn rule() -> Rule {
        Rule::AmbiguousSignature
    }
}

/// Tracking call whose event name is not a static literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedEventIssue {
    pub context: SourceContext,
    /// Provider id, or `custom`.
    pub destination: String,
    pub expression: String,
}

impl UnresolvedEventIssue {
    pub fn severity() -> Severity {
        Severity::Warning
    }

    pub fn rule() -> Rule {
        Rule::UnresolvedEvent
    }
}

// ============================================================
// Issue Enum
// ============================================================

/// A diagnostic found during a scan.
#[enum_dispatch(Report)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    ParseError(ParseErrorIssue),
    AmbiguousSignature(AmbiguousSignatureIssue),
    UnresolvedEvent(UnresolvedEventIssue),
}

impl Issue {
    pub fn severity(&self) -> Severity {
        match self {
            Issue::ParseError(_) => ParseErrorIssue::severity(),
            Issue::AmbiguousSignature(_) => AmbiguousSignatureIssue::severity(),
            Issue::UnresolvedEvent(_) => UnresolvedEventIssue::severity(),
        }
    }

    pub fn rule(&self) -> Rule {
        match self {
            Issue::ParseError(_) => ParseErrorIssue::rule(),
            Issue::AmbiguousSignature(_) => AmbiguousSignatureIssue::rule(),
            Issue::UnresolvedEvent(_) => UnresolvedEventIssue::rule(),
        }
    }
}

// ============================================================
// Report Trait (for CLI output)
// ============================================================

/// Location information for report output.
pub enum ReportLocation<'a> {
    /// Source code location (has source_line for context display).
    Source(&'a SourceContext),
    /// File-level only (for ParseError - no line context).
    File { path: &'a str },
}

impl ReportLocation<'_> {
    pub fn file_path(&self) -> &str {
        match self {
            ReportLocation::Source(ctx) => ctx.file_path(),
            ReportLocation::File { path } => path,
        }
    }

    /// Line and column, when the issue points into a file.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            ReportLocation::Source(ctx) => Some((ctx.line(), ctx.col())),
            ReportLocation::File { .. } => None,
        }
    }
}

/// Trait for types that can be reported to CLI.
///
/// Implemented by all issue types; `enum_dispatch` forwards the calls on the
/// `Issue` enum without dynamic dispatch.
#[enum_dispatch]
pub trait Report {
    /// Get the location for this issue.
    fn location(&self) -> ReportLocation<'_>;

    /// Primary message to display.
    fn message(&self) -> String;

    /// Severity level.
    fn report_severity(&self) -> Severity;

    /// Rule identifier.
    fn report_rule(&self) -> Rule;

    /// Optional hint for fixing the issue.
    fn hint(&self) -> Option<String> {
        None
    }

    /// Optional details for the "= note:" line.
    fn details(&self) -> Option<String> {
        None
    }
}

// ============================================================
// Report Implementations
// ============================================================

impl Report for ParseErrorIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::File {
            path: &self.file_path,
        }
    }

    fn message(&self) -> String {
        self.error.clone()
    }

    fn report_severity(&self) -> Severity {
        Self::severity()
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }
}

impl Report for AmbiguousSignatureIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::Source(&self.context)
    }

    fn message(&self) -> String {
        format!("ambiguous argument roles for `{}`", self.function)
    }

    fn report_severity(&self) -> Severity {
        Self::severity()
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }

    fn hint(&self) -> Option<String> {
        Some(format!(
            "declare the signature explicitly, e.g. `--custom-function '{}(userId, EVENT_NAME, PROPERTIES)'`",
            self.function
        ))
    }

    fn details(&self) -> Option<String> {
        Some(format!(
            "found {}, but {}:{}:{} has {}",
            self.found,
            self.first_seen.file_path,
            self.first_seen.line,
            self.first_seen.col,
            self.expected
        ))
    }
}

impl Report for UnresolvedEventIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::Source(&self.context)
    }

    fn message(&self) -> String {
        if self.expression.is_empty() {
            format!("{}: event name is missing", self.destination)
        } else {
            format!(
                "{}: event name `{}` is not a literal",
                self.destination, self.expression
            )
        }
    }

    fn report_severity(&self) -> Severity {
        Self::severity()
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }
}

// ============================================================
// Ordering for Issue (for sorting in reports)
// ============================================================

impl Issue {
    fn sort_position(&self) -> (usize, usize) {
        self.location().position().unwrap_or((0, 0))
    }
}

impl Ord for Issue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: file_path, line, col, rule, message
        self.location()
            .file_path()
            .cmp(other.location().file_path())
            .then_with(|| self.sort_position().cmp(&other.sort_position()))
            .then_with(|| self.rule().cmp(&other.rule()))
            .then_with(|| self.message().cmp(&other.message()))
    }
}

impl PartialOrd for Issue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use crate::issues::*;

    fn context(path: &str, line: usize, col: usize) -> SourceContext {
        SourceContext::new(SourceLocation::new(path, line, col), "track(a, b)")
    }

    #[test]
    fn test_parse_error_issue() {
        let issue = Issue::ParseError(ParseErrorIssue {
            file_path: "./src/broken.go".to_string(),
            error: "syntax error".to_string(),
        });

        assert_eq!(issue.severity(), Severity::Error);
        assert_eq!(issue.rule(), Rule::ParseError);
        assert_eq!(issue.message(), "syntax error");
        assert_eq!(issue.location().file_path(), "./src/broken.go");
        assert_eq!(issue.location().position(), None);
    }

    #[test]
    fn test_ambiguous_signature_issue() {
        let issue = Issue::AmbiguousSignature(AmbiguousSignatureIssue {
            context: context("b.go", 4, 2),
            function: "track".to_string(),
            found: "(EVENT_NAME, userId)".to_string(),
            expected: "(userId, EVENT_NAME)".to_string(),
            first_seen: SourceLocation::new("a.go", 10, 1),
        });

        assert_eq!(issue.severity(), Severity::Error);
        assert_eq!(issue.report_rule().to_string(), "ambiguous-signature");
        assert_eq!(issue.message(), "ambiguous argument roles for `track`");
        assert_eq!(
            issue.details().as_deref(),
            Some("found (EVENT_NAME, userId), but a.go:10:1 has (userId, EVENT_NAME)")
        );
        assert!(issue.hint().is_some());
    }

    #[test]
    fn test_unresolved_event_issue() {
        let issue = UnresolvedEventIssue {
            context: context("app.ts", 3, 5),
            destination: "mixpanel".to_string(),
            expression: "eventName".to_string(),
        };
        assert_eq!(UnresolvedEventIssue::severity(), Severity::Warning);
        assert_eq!(
            issue.message(),
            "mixpanel: event name `eventName` is not a literal"
        );
    }

    #[test]
    fn test_issue_ordering() {
        let parse = Issue::ParseError(ParseErrorIssue {
            file_path: "b.go".to_string(),
            error: "syntax error".to_string(),
        });
        let late = Issue::UnresolvedEvent(UnresolvedEventIssue {
            context: context("a.go", 9, 1),
            destination: "segment".to_string(),
            expression: "name".to_string(),
        });
        let early = Issue::UnresolvedEvent(UnresolvedEventIssue {
            context: context("a.go", 2, 1),
            destination: "segment".to_string(),
            expression: "name".to_string(),
        });

        let mut issues = vec![parse.clone(), late.clone(), early.clone()];
        issues.sort();
        assert_eq!(issues, vec![early, late, parse]);
    }
}
