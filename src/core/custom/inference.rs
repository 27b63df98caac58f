//! Role inference for custom tracking functions declared without a signature.
//!
//! Arguments are reduced to coarse [`ValueShape`]s and roles are assigned by
//! the positional [`Convention`] learned from known tracking signatures. The
//! [`SignatureTable`] remembers the first mapping seen for every function and
//! flags later call sites that disagree with it.

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;

use crate::core::{
    catalog::{CallShape, Provider, is_context},
    custom::signature::RoleMapping,
    data::{SourceLocation, ValueType},
    extract::properties::is_property_builder,
    syntax::{Binding, Value},
};

static ID_LIKE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:[^@\s]+@[^@\s]+\.[^@\s]+",
        r"|[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        r"|\d{8,}|[0-9a-fA-F]{16,})$"
    ))
    .unwrap()
});

/// Coarse shape of an argument, as far as role inference cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// Map or object literal, property builder, or a binding typed as a map.
    Map,
    /// String literal or binding typed as a string.
    Text,
    /// String literal that looks like an email, a UUID or a long id.
    IdText,
    /// Nothing is known about the value.
    Unknown,
    Other,
}

impl ValueShape {
    pub fn of(value: &Value) -> Self {
        if is_context(value) {
            return ValueShape::Other;
        }
        match value.resolved() {
            Value::Str(s) if ID_LIKE_REGEX.is_match(s) => ValueShape::IdText,
            Value::Str(_) => ValueShape::Text,
            Value::Map(_) | Value::Struct(_) => ValueShape::Map,
            Value::Call(call) if is_property_builder(call) => ValueShape::Map,
            Value::Number(_)
            | Value::Bool(_)
            | Value::Null
            | Value::List(_)
            | Value::Package { .. } => ValueShape::Other,
            Value::Ident(ident) => match &ident.binding {
                Binding::Constant(value) | Binding::Initialized(value) => Self::of(value),
                Binding::Typed(ty) => match ty.value_type {
                    ValueType::String => ValueShape::Text,
                    ValueType::Object => ValueShape::Map,
                    ValueType::Any => ValueShape::Unknown,
                    _ => ValueShape::Other,
                },
                Binding::Unknown => ValueShape::Unknown,
            },
            Value::Member { .. } | Value::Call(_) | Value::Keyword { .. } | Value::Opaque(_) => {
                ValueShape::Unknown
            }
        }
    }
}

/// Relative order of roles in known tracking signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convention {
    pub event_before_properties: bool,
    pub user_before_event: bool,
}

impl Default for Convention {
    fn default() -> Self {
        Self {
            event_before_properties: true,
            user_before_event: true,
        }
    }
}

impl Convention {
    /// Learn the convention from the catalog's positional shapes and the
    /// explicitly declared custom signatures. Ties keep the default.
    pub fn learn<'a>(explicit: impl IntoIterator<Item = &'a RoleMapping>) -> Self {
        let mut event_first = 0i64;
        let mut user_first = 0i64;

        for shape in Provider::positional_shapes() {
            if let CallShape::Positional {
                event,
                user_id,
                properties,
            } = *shape
            {
                vote(&mut event_first, Some(event), properties);
                vote(&mut user_first, user_id, Some(event));
            }
        }
        for mapping in explicit {
            vote(&mut event_first, mapping.event, mapping.properties);
            vote(&mut user_first, mapping.user_id, mapping.event);
        }

        Self {
            event_before_properties: event_first >= 0,
            user_before_event: user_first >= 0,
        }
    }
}

fn vote(tally: &mut i64, first: Option<usize>, second: Option<usize>) {
    if let (Some(first), Some(second)) = (first, second) {
        *tally += if first < second { 1 } else { -1 };
    }
}

/// Assign roles to the arguments of one call.
pub fn infer(shapes: &[ValueShape], convention: Convention) -> RoleMapping {
    let properties = shapes.iter().rposition(|s| *s == ValueShape::Map);
    let event = find_event(shapes, properties, convention);
    let user_id = event.and_then(|event| {
        let position = if convention.user_before_event {
            event.checked_sub(1)?
        } else {
            event + 1
        };
        let shape = shapes.get(position)?;
        (Some(position) != properties
            && matches!(
                shape,
                ValueShape::Text | ValueShape::IdText | ValueShape::Unknown
            ))
        .then_some(position)
    });

    RoleMapping {
        event,
        user_id,
        properties,
    }
}

fn find_event(
    shapes: &[ValueShape],
    properties: Option<usize>,
    convention: Convention,
) -> Option<usize> {
    let event_like = |i: &usize| matches!(shapes[*i], ValueShape::Text | ValueShape::Unknown);
    match properties {
        Some(p) => {
            let before = (0..p).rev().find(event_like);
            let after = (p + 1..shapes.len()).find(event_like);
            if convention.event_before_properties {
                before.or(after)
            } else {
                after.or(before)
            }
        }
        // Literal text first; untyped values only when no text argument exists.
        None => shapes
            .iter()
            .position(|s| *s == ValueShape::Text)
            .or_else(|| shapes.iter().position(|s| *s == ValueShape::Unknown)),
    }
}

/// Outcome of checking one call site against its function's signature.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Agreed(RoleMapping),
    Conflict(Conflict),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub found: RoleMapping,
    pub arity: usize,
    pub expected: RoleMapping,
    pub expected_arity: usize,
    pub first_seen: SourceLocation,
}

struct SignatureEntry {
    canonical: RoleMapping,
    /// Largest argument count seen among agreeing call sites.
    arity: usize,
    first_seen: SourceLocation,
    inferred: HashMap<(usize, Vec<ValueShape>), RoleMapping>,
}

/// Inferred signatures of custom functions, indexed by function identity.
///
/// Call sites must be fed in output order: the first one seen for a function
/// fixes its mapping.
pub struct SignatureTable {
    convention: Convention,
    entries: Vec<SignatureEntry>,
    index: HashMap<String, usize>,
}

impl SignatureTable {
    pub fn new(convention: Convention) -> Self {
        Self {
            convention,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Number of distinct custom functions seen so far.
    pub fn function_count(&self) -> usize {
        self.entries.len()
    }

    pub fn resolve(&mut self, function: &str, args: &[Value], location: &SourceLocation) -> Resolution {
        let shapes: Vec<ValueShape> = args.iter().map(ValueShape::of).collect();
        let arity = shapes.len();
        let convention = self.convention;

        let Some(&index) = self.index.get(function) else {
            let mapping = infer(&shapes, convention);
            self.entries.push(SignatureEntry {
                canonical: mapping,
                arity,
                first_seen: location.clone(),
                inferred: HashMap::from([((arity, shapes), mapping)]),
            });
            self.index.insert(function.to_string(), self.entries.len() - 1);
            return Resolution::Agreed(mapping);
        };

        let entry = &mut self.entries[index];
        let found = *entry
            .inferred
            .entry((arity, shapes))
            .or_insert_with_key(|(_, shapes)| infer(shapes, convention));

        match merge(entry.canonical, entry.arity, found, arity) {
            Some(merged) => {
                entry.canonical = merged;
                entry.arity = entry.arity.max(arity);
                Resolution::Agreed(found)
            }
            None => Resolution::Conflict(Conflict {
                found,
                arity,
                expected: entry.canonical,
                expected_arity: entry.arity,
                first_seen: entry.first_seen.clone(),
            }),
        }
    }
}

/// Combine two mappings that agree wherever both calls have arguments.
fn merge(
    canonical: RoleMapping,
    canonical_arity: usize,
    found: RoleMapping,
    arity: usize,
) -> Option<RoleMapping> {
    let role = |a: Option<usize>, b: Option<usize>| match (a, b) {
        _ if a == b => Some(a),
        (None, Some(i)) if i >= canonical_arity => Some(b),
        (Some(i), None) if i >= arity => Some(a),
        _ => None,
    };
    Some(RoleMapping {
        event: role(canonical.event, found.event)?,
        user_id: role(canonical.user_id, found.user_id)?,
        properties: role(canonical.properties, found.properties)?,
    })
}
