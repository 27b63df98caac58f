//! Language-neutral call-site representation.
//!
//! Every frontend lowers the call expressions it finds into [`CallSite`]s whose
//! arguments are [`Value`] trees. Provider matching and custom-function
//! inference only ever look at this representation, never at a language AST.
//!
//! Local bindings are captured at lowering time: an identifier carries what
//! the enclosing scope knew about it when the call was visited, so later
//! phases never need scope information.

use std::path::Path;

use serde::Serialize;

use crate::core::data::{SourceContext, ValueType};

/// Name used for call sites outside any function body.
pub const GLOBAL_SCOPE: &str = "global";

/// Source language of a scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    JavaScript,
    TypeScript,
    Python,
}

impl Language {
    /// Detect the language from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            "go" => Some(Language::Go),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "py" | "pyi" => Some(Language::Python),
            _ => None,
        }
    }

    /// Config name of the language (`go`, `javascript`, `typescript`, `python`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
        }
    }
}

/// A static type reference such as `analytics.Client` or `string`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    /// Import path of the declaring package, for qualified types.
    pub package: Option<String>,
    pub name: String,
    pub value_type: ValueType,
}

impl TypeRef {
    pub fn new(package: Option<String>, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            package,
            name: name.into(),
            value_type,
        }
    }
}

/// Largest value tree a binding keeps. Identifiers copy their binding at every
/// reference, so larger initialisers only keep their type.
pub const MAX_BOUND_NODES: usize = 4096;

/// What the enclosing scope knew about a name when it was referenced.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Declared constant: the value is fixed.
    Constant(Box<Value>),
    /// Initialized once in scope (`x := ...`, `let x = ...`).
    Initialized(Box<Value>),
    /// Only the declared type is known (parameters, `var x T`, reassigned names).
    Typed(TypeRef),
    Unknown,
}

impl Binding {
    pub fn constant(value: Value) -> Self {
        Self::bounded(value, |v| Binding::Constant(Box::new(v)))
    }

    pub fn initialized(value: Value) -> Self {
        Self::bounded(value, |v| Binding::Initialized(Box::new(v)))
    }

    fn bounded(value: Value, bind: impl FnOnce(Value) -> Binding) -> Self {
        if value.exceeds(MAX_BOUND_NODES) {
            Binding::Typed(TypeRef::new(None, "", value.value_type()))
        } else {
            bind(value)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub binding: Binding,
}

/// Key/value entry of a map literal or named field of a struct literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: Value,
    pub args: Vec<Value>,
}

/// Typed composite literal with named fields: `analytics.Track{Event: "x"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructLit {
    /// Import path of the package declaring the type.
    pub package: Option<String>,
    pub type_name: String,
    pub fields: Vec<Entry>,
}

/// A lowered argument expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
    Ident(Ident),
    /// Reference to an imported package or module.
    Package { alias: String, path: String },
    Member { object: Box<Value>, property: String },
    Call(Box<Call>),
    Map(Vec<Entry>),
    Struct(StructLit),
    List(Vec<Value>),
    /// Keyword argument of a call: `event="x"`.
    Keyword { name: String, value: Box<Value> },
    /// Any other expression, with its source text.
    Opaque(String),
}

impl Value {
    pub fn ident(name: impl Into<String>, binding: Binding) -> Self {
        Value::Ident(Ident {
            name: name.into(),
            binding,
        })
    }

    pub fn member(object: Value, property: impl Into<String>) -> Self {
        Value::Member {
            object: Box::new(object),
            property: property.into(),
        }
    }

    pub fn call(callee: Value, args: Vec<Value>) -> Self {
        Value::Call(Box::new(Call { callee, args }))
    }

    pub fn keyword(name: impl Into<String>, value: Value) -> Self {
        Value::Keyword {
            name: name.into(),
            value: Box::new(value),
        }
    }

    /// Name of a keyword argument.
    pub fn keyword_name(&self) -> Option<&str> {
        match self {
            Value::Keyword { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Follow constant bindings and constant member lookups.
    ///
    /// `EVENTS.SIGN_UP` resolves to the entry of the constant `EVENTS` map;
    /// anything that is not provably constant is returned unchanged. Keyword
    /// arguments resolve to their value.
    pub fn resolved(&self) -> &Value {
        match self {
            Value::Keyword { value, .. } => value.resolved(),
            Value::Ident(Ident {
                binding: Binding::Constant(value),
                ..
            }) => value.resolved(),
            Value::Member { object, property } => match object.resolved() {
                Value::Map(entries) => entries
                    .iter()
                    .rev()
                    .find(|e| &e.key == property)
                    .map_or(self, |e| e.value.resolved()),
                _ => self,
            },
            _ => self,
        }
    }

    /// Whether the tree, including followed bindings, has more than `limit` nodes.
    pub fn exceeds(&self, limit: usize) -> bool {
        let mut budget = limit;
        !self.fits(&mut budget)
    }

    fn fits(&self, budget: &mut usize) -> bool {
        if *budget == 0 {
            return false;
        }
        *budget -= 1;
        match self {
            Value::Ident(Ident {
                binding: Binding::Constant(value) | Binding::Initialized(value),
                ..
            }) => value.fits(budget),
            Value::Member { object, .. } => object.fits(budget),
            Value::Keyword { value, .. } => value.fits(budget),
            Value::Call(call) => {
                call.callee.fits(budget) && call.args.iter().all(|arg| arg.fits(budget))
            }
            Value::Map(entries) => entries.iter().all(|e| e.value.fits(budget)),
            Value::Struct(lit) => lit.fields.iter().all(|e| e.value.fits(budget)),
            Value::List(items) => items.iter().all(|item| item.fits(budget)),
            _ => true,
        }
    }

    /// Static string value, following constant bindings.
    pub fn as_str(&self) -> Option<&str> {
        match self.resolved() {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The value an identifier was initialized with, if known.
    pub fn origin(&self) -> Option<&Value> {
        match self {
            Value::Ident(Ident {
                binding: Binding::Constant(value) | Binding::Initialized(value),
                ..
            }) => Some(value),
            _ => None,
        }
    }

    /// Declared type of an identifier, if known.
    pub fn declared_type(&self) -> Option<&TypeRef> {
        match self {
            Value::Ident(Ident {
                binding: Binding::Typed(ty),
                ..
            }) => Some(ty),
            _ => None,
        }
    }

    /// Dotted name segments of an identifier or member chain.
    ///
    /// `window.DD_RUM.addAction` yields `["window", "DD_RUM", "addAction"]`;
    /// packages contribute their local alias.
    pub fn path(&self) -> Option<Vec<&str>> {
        match self {
            Value::Ident(ident) => Some(vec![ident.name.as_str()]),
            Value::Package { alias, .. } => Some(vec![alias.as_str()]),
            Value::Member { object, property } => {
                let mut path = object.path()?;
                path.push(property.as_str());
                Some(path)
            }
            _ => None,
        }
    }

    /// Import-qualified name of a module member.
    ///
    /// `Snowplow.create_tracker` with `Snowplow` imported from
    /// `snowplow_tracker` yields `snowplow_tracker.Snowplow.create_tracker`.
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            Value::Package { path, .. } => Some(path.clone()),
            Value::Member { object, property } => object
                .qualified_name()
                .map(|object| format!("{}.{}", object, property)),
            _ => None,
        }
    }

    /// Dotted name of an identifier or member chain.
    pub fn dotted(&self) -> Option<String> {
        self.path().map(|segments| segments.join("."))
    }

    /// The call expression, if this value is one.
    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Value::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Coarse static type, using declared types of bindings when available.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Str(_) => ValueType::String,
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Boolean,
            Value::Null => ValueType::Null,
            Value::Map(_) | Value::Struct(_) => ValueType::Object,
            Value::List(_) => ValueType::Array,
            Value::Ident(ident) => match &ident.binding {
                Binding::Constant(value) | Binding::Initialized(value) => value.value_type(),
                Binding::Typed(ty) => ty.value_type,
                Binding::Unknown => ValueType::Any,
            },
            Value::Member { .. } => match self.resolved() {
                Value::Member { .. } => ValueType::Any,
                resolved => resolved.value_type(),
            },
            Value::Keyword { value, .. } => value.value_type(),
            Value::Package { .. } | Value::Call(_) | Value::Opaque(_) => ValueType::Any,
        }
    }

    /// Short source-like rendering used for unresolved values.
    pub fn describe(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", s),
            Value::Number(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Ident(ident) => ident.name.clone(),
            Value::Package { alias, .. } => alias.clone(),
            Value::Member { object, property } => format!("{}.{}", object.describe(), property),
            Value::Call(call) => format!("{}(..)", call.callee.describe()),
            Value::Map(_) => "{..}".to_string(),
            Value::Struct(lit) => format!("{}{{..}}", lit.type_name),
            Value::List(_) => "[..]".to_string(),
            Value::Keyword { name, value } => format!("{}={}", name, value.describe()),
            Value::Opaque(text) => text.clone(),
        }
    }
}

/// Render a number the way it would be written in source.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A single call expression lowered from a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub callee: Value,
    pub args: Vec<Value>,
    pub context: SourceContext,
    /// Enclosing function name, or [`GLOBAL_SCOPE`].
    pub function: String,
    /// Visit order within the file.
    pub ordinal: usize,
}

impl CallSite {
    /// Dotted callee name, e.g. `client.Enqueue` or `customTrack`.
    pub fn callee_name(&self) -> Option<String> {
        self.callee.dotted()
    }

    /// The method name and receiver of a `receiver.method(...)` call.
    pub fn method(&self) -> Option<(&Value, &str)> {
        match &self.callee {
            Value::Member { object, property } => Some((object.as_ref(), property.as_str())),
            _ => None,
        }
    }
}

/// All call sites of one successfully parsed file, in source order.
#[derive(Debug, Clone)]
pub struct FileUnit {
    pub file_path: String,
    pub language: Language,
    pub call_sites: Vec<CallSite>,
}
