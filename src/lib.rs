//! trackscan - static analysis of analytics tracking calls
//!
//! trackscan walks a Go, JavaScript, TypeScript or Python source tree and
//! reports every analytics tracking call it can recognise: which provider is
//! called, the event name, the user id and the properties sent, as far as
//! they can be determined without running the code.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer (commands, report printing)
//! - `config`: Configuration file loading and parsing
//! - `core`: Core analysis engine (three-phase pipeline)
//! - `issues`: Diagnostic types and reporting

pub mod cli;
pub mod config;
pub mod core;
pub mod issues;
