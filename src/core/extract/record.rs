//! Match records produced by the scan.
//!
//! A record is emitted for every recognised call site, even when the event
//! name or some properties could not be resolved statically.

use std::fmt;

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::core::{
    catalog::Provider,
    data::{SourceContext, SourceLocation, ValueType},
    syntax::format_number,
};

/// Who performs the tracking at a call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackingSource {
    Provider(Provider),
    Custom { function: String },
}

impl TrackingSource {
    /// Destination name: the provider id, or `custom`.
    pub fn id(&self) -> &str {
        match self {
            TrackingSource::Provider(provider) => provider.id(),
            TrackingSource::Custom { .. } => "custom",
        }
    }

    pub fn custom_function(&self) -> Option<&str> {
        match self {
            TrackingSource::Custom { function } => Some(function),
            TrackingSource::Provider(_) => None,
        }
    }
}

impl fmt::Display for TrackingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingSource::Provider(provider) => write!(f, "{}", provider.id()),
            TrackingSource::Custom { function } => write!(f, "custom({})", function),
        }
    }
}

/// Why an event name could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvedReason {
    /// The argument is not a static literal.
    NotLiteral,
    /// No argument plays the event-name role.
    Missing,
    /// The custom function's call sites disagree on argument roles.
    AmbiguousSignature,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NotLiteral => write!(f, "not a literal"),
            UnresolvedReason::Missing => write!(f, "no event argument"),
            UnresolvedReason::AmbiguousSignature => write!(f, "ambiguous signature"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventName {
    Resolved(String),
    Unresolved {
        #[serde(rename = "unresolved")]
        expression: String,
        reason: UnresolvedReason,
    },
}

impl EventName {
    pub fn as_resolved(&self) -> Option<&str> {
        match self {
            EventName::Resolved(name) => Some(name),
            EventName::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, EventName::Resolved(_))
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventName::Resolved(name) => write!(f, "{}", name),
            EventName::Unresolved { expression, .. } if expression.is_empty() => {
                write!(f, "<unresolved>")
            }
            EventName::Unresolved { expression, .. } => write!(f, "<unresolved: {}>", expression),
        }
    }
}

/// A value whose content is not statically known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unresolved {
    #[serde(rename = "unresolved")]
    pub expression: String,
    #[serde(rename = "type")]
    pub type_hint: ValueType,
}

/// Resolved-or-unresolved property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    List(Vec<PropertyValue>),
    Object(PropertyMap),
    Unresolved(Unresolved),
}

impl PropertyValue {
    pub fn unresolved(expression: impl Into<String>, type_hint: ValueType) -> Self {
        PropertyValue::Unresolved(Unresolved {
            expression: expression.into(),
            type_hint,
        })
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::String(_) => ValueType::String,
            PropertyValue::Number(_) => ValueType::Number,
            PropertyValue::Bool(_) => ValueType::Boolean,
            PropertyValue::Null => ValueType::Null,
            PropertyValue::List(_) => ValueType::Array,
            PropertyValue::Object(_) => ValueType::Object,
            PropertyValue::Unresolved(u) => u.type_hint,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, PropertyValue::Unresolved(_))
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyValue::String(s) => serializer.serialize_str(s),
            // Integral numbers are written without a fraction, as in source.
            PropertyValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            PropertyValue::Number(n) => serializer.serialize_f64(*n),
            PropertyValue::Bool(b) => serializer.serialize_bool(*b),
            PropertyValue::Null => serializer.serialize_unit(),
            PropertyValue::List(items) => items.serialize(serializer),
            PropertyValue::Object(map) => map.serialize(serializer),
            PropertyValue::Unresolved(u) => u.serialize(serializer),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{:?}", s),
            PropertyValue::Number(n) => write!(f, "{}", format_number(*n)),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            PropertyValue::Object(map) => write!(f, "{}", map),
            PropertyValue::Unresolved(u) => write!(f, "<{}: {}>", u.expression, u.type_hint),
        }
    }
}

/// Insertion-ordered property map.
///
/// Setting an existing key replaces its value in place, so a chain of
/// `.Set(k, v)` calls keeps the order of first assignment while the last
/// assignment wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Merge another map, overriding duplicate keys.
    pub fn extend(&mut self, other: PropertyMap) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Serialize for PropertyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", key, value)?;
        }
        if self.entries.is_empty() {
            write!(f, "}}")
        } else {
            write!(f, " }}")
        }
    }
}

/// Custom-function argument that plays none of the tracked roles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentalArgument {
    pub position: usize,
    /// Parameter name from an explicit signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub value: PropertyValue,
}

/// One recognised tracking call site.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingRecord {
    pub source: TrackingSource,
    pub event: EventName,
    pub user_id: Option<PropertyValue>,
    pub properties: PropertyMap,
    /// Set when the property bag itself is not a static map.
    pub unresolved_properties: Option<Unresolved>,
    pub incidental: Vec<IncidentalArgument>,
    pub context: SourceContext,
    /// Enclosing function name.
    pub function: String,
    /// Visit order of the call site within its file.
    pub ordinal: usize,
}

impl TrackingRecord {
    pub fn location(&self) -> &SourceLocation {
        &self.context.location
    }

    /// Output order: file path, line, column, then visit order.
    pub fn sort_key(&self) -> (&str, usize, usize, usize) {
        let loc = self.location();
        (loc.file_path.as_str(), loc.line, loc.col, self.ordinal)
    }
}

impl Serialize for TrackingRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Repr<'a> {
            source: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            custom_function: Option<&'a str>,
            event: &'a EventName,
            #[serde(skip_serializing_if = "Option::is_none")]
            user_id: Option<&'a PropertyValue>,
            properties: &'a PropertyMap,
            #[serde(skip_serializing_if = "Option::is_none")]
            unresolved_properties: Option<&'a Unresolved>,
            #[serde(skip_serializing_if = "Option::is_none")]
            incidental: Option<&'a [IncidentalArgument]>,
            #[serde(flatten)]
            location: &'a SourceLocation,
            function: &'a str,
        }

        Repr {
            source: self.source.id(),
            custom_function: self.source.custom_function(),
            event: &self.event,
            user_id: self.user_id.as_ref(),
            properties: &self.properties,
            unresolved_properties: self.unresolved_properties.as_ref(),
            incidental: (!self.incidental.is_empty()).then_some(self.incidental.as_slice()),
            location: self.location(),
            function: &self.function,
        }
        .serialize(serializer)
    }
}
