use std::fmt;

use serde::Serialize;

/// Coarse static type of a tracked value.
///
/// Used as the `type` of a property in the tracking schema and as the hint
/// carried by unresolved values whose binding has a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
    Any,
}

impl ValueType {
    /// Map a Go type name (`string`, `float64`, `map[string]any`, ...) to a value type.
    pub fn from_go_type(name: &str) -> Self {
        let name = name.trim().trim_start_matches('*');
        if name.starts_with("map[") {
            return ValueType::Object;
        }
        if name.starts_with('[') {
            return ValueType::Array;
        }
        match name {
            "string" | "rune" | "byte" => ValueType::String,
            "bool" => ValueType::Boolean,
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16"
            | "uint32" | "uint64" | "uintptr" | "float32" | "float64" | "complex64"
            | "complex128" => ValueType::Number,
            _ => ValueType::Any,
        }
    }

    /// Map a Python annotation (`str`, `Dict[str, Any]`, `list[int]`, ...) to a value type.
    pub fn from_python_type(annotation: &str) -> Self {
        let head = annotation.split('[').next().unwrap_or_default().trim();
        let head = head.rsplit('.').next().unwrap_or(head);
        match head {
            "str" | "bytes" => ValueType::String,
            "int" | "float" | "complex" | "Decimal" => ValueType::Number,
            "bool" => ValueType::Boolean,
            "dict" | "Dict" | "Mapping" | "MutableMapping" | "TypedDict" => ValueType::Object,
            "list" | "List" | "tuple" | "Tuple" | "set" | "Set" | "Sequence" => ValueType::Array,
            "None" => ValueType::Null,
            _ => ValueType::Any,
        }
    }

    /// Map a TypeScript keyword type to a value type.
    pub fn from_ts_keyword(name: &str) -> Self {
        match name {
            "string" => ValueType::String,
            "number" | "bigint" => ValueType::Number,
            "boolean" => ValueType::Boolean,
            "object" => ValueType::Object,
            "null" => ValueType::Null,
            _ => ValueType::Any,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
            ValueType::Array => "array",
            ValueType::Null => "null",
            ValueType::Any => "any",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_display() {
        assert_eq!(ValueType::String.to_string(), "string");
        assert_eq!(ValueType::Boolean.to_string(), "boolean");
        assert_eq!(ValueType::Any.to_string(), "any");
    }

    #[test]
    fn test_from_go_type() {
        assert_eq!(ValueType::from_go_type("string"), ValueType::String);
        assert_eq!(ValueType::from_go_type("float64"), ValueType::Number);
        assert_eq!(ValueType::from_go_type("bool"), ValueType::Boolean);
        assert_eq!(ValueType::from_go_type("map[string]any"), ValueType::Object);
        assert_eq!(ValueType::from_go_type("[]string"), ValueType::Array);
        assert_eq!(ValueType::from_go_type("*int"), ValueType::Number);
        assert_eq!(ValueType::from_go_type("context.Context"), ValueType::Any);
    }

    #[test]
    fn test_from_python_type() {
        assert_eq!(ValueType::from_python_type("str"), ValueType::String);
        assert_eq!(ValueType::from_python_type("float"), ValueType::Number);
        assert_eq!(ValueType::from_python_type("Dict[str, Any]"), ValueType::Object);
        assert_eq!(ValueType::from_python_type("typing.List[str]"), ValueType::Array);
        assert_eq!(ValueType::from_python_type("Optional[str]"), ValueType::Any);
    }

    #[test]
    fn test_from_ts_keyword() {
        assert_eq!(ValueType::from_ts_keyword("number"), ValueType::Number);
        assert_eq!(ValueType::from_ts_keyword("unknown"), ValueType::Any);
    }
}
