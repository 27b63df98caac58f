//! Static resolution of argument values into property values.
//!
//! Individual values resolve only through constants: a local variable holding
//! a computed value stays unresolved (with its declared type as a hint).
//! Property *bags* additionally follow single local initialisations, so that
//! a builder assigned to a variable and extended with `.Set(k, v)` statements
//! is read the same way as a fluent chain.

use crate::core::{
    extract::record::{PropertyMap, PropertyValue, Unresolved},
    syntax::{Binding, Call, Entry, Ident, Value},
};

/// Resolve one argument value.
pub fn resolve_value(value: &Value) -> PropertyValue {
    match value.resolved() {
        Value::Str(s) => PropertyValue::String(s.clone()),
        Value::Number(n) => PropertyValue::Number(*n),
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::Null => PropertyValue::Null,
        Value::Map(entries) => PropertyValue::Object(resolve_entries(entries)),
        Value::Struct(lit) => PropertyValue::Object(resolve_entries(&lit.fields)),
        Value::List(items) => PropertyValue::List(items.iter().map(resolve_value).collect()),
        Value::Call(call) if is_property_builder(call) => {
            PropertyValue::Object(resolve_builder(call).unwrap_or_default())
        }
        _ => PropertyValue::Unresolved(unresolved(value)),
    }
}

/// Describe a value that could not be resolved.
pub fn unresolved(value: &Value) -> Unresolved {
    Unresolved {
        expression: value.describe(),
        type_hint: value.value_type(),
    }
}

/// Resolve a property bag argument.
///
/// Returns `None` when the value is not statically a map: a parameter, a call
/// result, or anything else whose keys cannot be known.
pub fn resolve_properties(value: &Value) -> Option<PropertyMap> {
    match bag_origin(value) {
        Value::Map(entries) => Some(resolve_entries(entries)),
        Value::Struct(lit) => Some(resolve_entries(&lit.fields)),
        Value::Null => Some(PropertyMap::new()),
        Value::Call(call) => resolve_builder(call),
        _ => None,
    }
}

/// Resolve a property bag, falling back to an unresolved marker.
pub fn resolve_bag(value: &Value) -> (PropertyMap, Option<Unresolved>) {
    match resolve_properties(value) {
        Some(map) => (map, None),
        None => (PropertyMap::new(), Some(unresolved(value))),
    }
}

fn resolve_entries(entries: &[Entry]) -> PropertyMap {
    entries
        .iter()
        .map(|entry| (entry.key.clone(), resolve_value(&entry.value)))
        .collect()
}

/// Follow constant and single-initialisation bindings of a bag.
fn bag_origin(value: &Value) -> &Value {
    let value = value.resolved();
    match value {
        Value::Ident(Ident {
            binding: Binding::Initialized(origin),
            ..
        }) => bag_origin(origin),
        _ => value,
    }
}

/// Whether a call builds a property container (`NewProperties()`, `.Set(..)` chains).
pub fn is_property_builder(call: &Call) -> bool {
    match &call.callee {
        Value::Member { object, property } if is_setter(property) => {
            setter_key(property, &call.args).is_some()
                && match bag_origin(object) {
                    Value::Call(inner) => is_property_builder(inner),
                    _ => true,
                }
        }
        callee => callee
            .path()
            .and_then(|path| path.last().copied())
            .is_some_and(is_properties_constructor),
    }
}

/// Accumulate the `.Set(k, v)` chain of a builder call.
fn resolve_builder(call: &Call) -> Option<PropertyMap> {
    match &call.callee {
        Value::Member { object, property } if is_setter(property) => {
            let (key, value) = setter_key(property, &call.args)?;
            // Setters on an unknown base still contribute their own keys.
            let mut map = resolve_properties(object).unwrap_or_default();
            map.insert(key, resolve_value(value));
            Some(map)
        }
        callee => {
            let is_constructor = callee
                .path()
                .and_then(|path| path.last().copied())
                .is_some_and(is_properties_constructor);
            // `Object.freeze(x)`-style wrappers are lowered away by frontends.
            is_constructor.then(PropertyMap::new)
        }
    }
}

fn is_setter(method: &str) -> bool {
    method == "Set" || method == "set" || (method.starts_with("Set") && method.len() > 3)
}

/// Key and value of a setter call.
///
/// `Set("plan", v)` sets `plan`; Segment-style typed setters such as
/// `SetRevenue(v)` set the snake-cased suffix (`revenue`).
fn setter_key<'a>(method: &str, args: &'a [Value]) -> Option<(String, &'a Value)> {
    match args {
        [key, value] if method.eq_ignore_ascii_case("set") => {
            Some((key.as_str()?.to_string(), value))
        }
        [value] if method.len() > 3 && method.starts_with("Set") => {
            Some((to_snake_case(&method[3..]), value))
        }
        _ => None,
    }
}

fn is_properties_constructor(name: &str) -> bool {
    name.starts_with("New") && name.ends_with("Properties")
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
