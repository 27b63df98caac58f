//! Core analysis engine.
//!
//! - `parsers`: language frontends lowering files into call sites
//! - `syntax`: the language-neutral representation they produce
//! - `catalog`: provider SDK call shapes and the call-site matcher
//! - `custom`: user-declared tracking wrappers and signature inference
//! - `extract`: match records built from matched call sites
//! - `context`: the scan pipeline tying these together
//! - `output`: JSON and schema renderers

pub mod catalog;
pub mod context;
pub mod custom;
pub mod data;
pub mod extract;
pub mod file_scanner;
pub mod output;
pub mod parsers;
pub mod syntax;

pub use context::{ScanContext, ScanOutput};
pub use data::{SourceContext, SourceLocation, ValueType};
