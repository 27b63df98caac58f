//! Core data types used across all pipeline phases.
//!
//! ## Module Structure
//!
//! - `source`: Source code location types (SourceContext, SourceLocation)
//! - `value_type`: Coarse static type of a value (ValueType)

pub mod source;
pub mod value_type;

pub use source::{SourceContext, SourceLocation};
pub use value_type::ValueType;
