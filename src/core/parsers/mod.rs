//! Language frontends.
//!
//! - `go`: Go sources, parsed with tree-sitter
//! - `python`: Python sources, parsed with tree-sitter
//! - `script`: JavaScript and TypeScript sources, parsed with swc
//!
//! Each lowers a file into a [`FileUnit`] of call sites.

pub mod go;
pub mod python;
pub mod script;

use anyhow::{Result, anyhow};
use tree_sitter::Node;

use crate::core::syntax::{FileUnit, Language, Value};

/// Parse a source file with the frontend of its language.
pub fn lower_file(code: String, file_path: &str, language: Language) -> Result<FileUnit> {
    match language {
        Language::Go => go::parse_go_source(&code, file_path),
        Language::JavaScript | Language::TypeScript => {
            script::parse_script_source(code, file_path)
        }
        Language::Python => python::parse_python_source(&code, file_path),
    }
}

// ============================================================
// tree-sitter helpers
// ============================================================

/// Fail with the position of the first syntax error in a tree.
pub(crate) fn check_syntax(root: Node<'_>) -> Result<()> {
    if !root.has_error() {
        return Ok(());
    }
    let at = first_error(root).map_or(root.start_position(), |n| n.start_position());
    Err(anyhow!(
        "syntax error at line {}, column {}",
        at.row + 1,
        at.column + 1
    ))
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

pub(crate) fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// An expression kept as source text; multi-line text keeps its first line.
pub(crate) fn opaque(text: &str) -> Value {
    let first = text.lines().next().unwrap_or_default().trim();
    if text.contains('\n') {
        Value::Opaque(format!("{}..", first))
    } else {
        Value::Opaque(first.to_string())
    }
}

/// Resolve backslash escapes of a Go or Python string body.
pub(crate) fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            // Line continuation.
            Some('\n') => continue,
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('a') => '\x07',
            Some('b') => '\x08',
            Some('f') => '\x0c',
            Some('v') => '\x0b',
            Some(quote @ ('\\' | '"' | '\'')) => quote,
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = chars.by_ref().take(width).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => c,
                    None => {
                        out.push('\\');
                        out.push(kind);
                        out.push_str(&hex);
                        continue;
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                other
            }
            None => '\\',
        };
        out.push(escaped);
    }
    out
}

/// Integer or float literal: decimal, `0x`/`0o`/`0b` prefixed, or legacy `0755` octal.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let clean = text.replace('_', "");
    let prefixed = clean.get(..2).and_then(|prefix| {
        let radix = match prefix {
            "0x" | "0X" => 16,
            "0o" | "0O" => 8,
            "0b" | "0B" => 2,
            _ => return None,
        };
        Some((radix, &clean[2..]))
    });
    let integer = match prefixed {
        Some(integer) => Some(integer),
        None if clean.len() > 1
            && clean.starts_with('0')
            && clean.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Some((8, &clean[1..]))
        }
        None => None,
    };
    match integer {
        Some((radix, digits)) => i64::from_str_radix(digits, radix).ok().map(|n| n as f64),
        None => clean.parse::<f64>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_number_prefixes() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("1_000"), Some(1000.0));
        assert_eq!(parse_number("1.99"), Some(1.99));
        assert_eq!(parse_number("0"), Some(0.0));
        assert_eq!(parse_number("0x1F"), Some(31.0));
        assert_eq!(parse_number("0o17"), Some(15.0));
        assert_eq!(parse_number("0O17"), Some(15.0));
        assert_eq!(parse_number("0b101"), Some(5.0));
        assert_eq!(parse_number("0755"), Some(493.0));
        assert_eq!(parse_number("0.5"), Some(0.5));
        assert_eq!(parse_number("089"), None);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\tb"), "a\tb");
        assert_eq!(unescape(r"\u00e9t\u00e9"), "\u{e9}t\u{e9}");
        assert_eq!(unescape("one \\\ntwo"), "one two");
        assert_eq!(unescape(r"\d+"), r"\d+");
    }
}
