//! Argument-role schemas of provider tracking calls.
//!
//! A [`CallShape`] says where the event name, user id and properties of a
//! tracking call live. Shapes are pure data; [`CallShape::extract`] reads a
//! call's lowered arguments according to the schema.

use crate::core::{
    extract::{
        properties::{resolve_bag, resolve_properties, resolve_value},
        record::{PropertyMap, Unresolved},
    },
    syntax::{Binding, Entry, Ident, Value},
};

/// Named-field schema of a struct or object literal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordShape {
    /// Field holding the event name; the first present one wins.
    pub event: &'static [&'static str],
    pub user_id: &'static [&'static str],
    pub properties: &'static [&'static str],
    /// Nested records whose fields are merged into the properties.
    pub merged: &'static [&'static str],
    /// Every other field becomes a property.
    pub rest_as_properties: bool,
    /// Single-argument wrapper calls around field values (`sp.NewString("x")`).
    pub unwrap: &'static [&'static str],
}

impl RecordShape {
    pub const EMPTY: RecordShape = RecordShape {
        event: &[],
        user_id: &[],
        properties: &[],
        merged: &[],
        rest_as_properties: false,
        unwrap: &[],
    };

    fn extract<'a>(&self, fields: &'a [Entry]) -> Extracted<'a> {
        let field = |names: &[&str]| {
            names.iter().find_map(|name| {
                fields
                    .iter()
                    .rev()
                    .find(|entry| entry.key == *name)
                    .map(|entry| self.unwrap_value(&entry.value))
            })
        };

        let (mut properties, unresolved_properties) = match field(self.properties) {
            Some(bag) => resolve_bag(bag),
            None => (PropertyMap::new(), None),
        };

        for merged in self.merged.iter().filter_map(|name| field(std::slice::from_ref(name))) {
            if let Some(map) = resolve_properties(merged) {
                properties.extend(map);
            }
        }

        if self.rest_as_properties {
            let is_role = |key: &str| {
                [self.event, self.user_id, self.properties, self.merged]
                    .iter()
                    .any(|names| names.contains(&key))
            };
            for entry in fields.iter().filter(|e| !is_role(&e.key)) {
                properties.insert(entry.key.clone(), resolve_value(self.unwrap_value(&entry.value)));
            }
        }

        Extracted {
            event: field(self.event),
            user_id: field(self.user_id),
            properties,
            unresolved_properties,
        }
    }

    fn unwrap_value<'a>(&self, value: &'a Value) -> &'a Value {
        match value.resolved() {
            Value::Call(call)
                if call.args.len() == 1
                    && call
                        .callee
                        .path()
                        .and_then(|path| path.last().copied())
                        .is_some_and(|name| self.unwrap.contains(&name)) =>
            {
                &call.args[0]
            }
            _ => value,
        }
    }
}

/// A parameter that may be passed by position or by keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub index: usize,
    pub name: &'static str,
}

impl Param {
    /// The argument bound to this parameter. Keywords win over positions.
    fn find<'a>(&self, args: &'a [Value]) -> Option<&'a Value> {
        let keyword = args.iter().find_map(|arg| match arg {
            Value::Keyword { name, value } if name == self.name => Some(value.as_ref()),
            _ => None,
        });
        keyword.or_else(|| args.get(self.index).filter(|arg| arg.keyword_name().is_none()))
    }
}

/// Where the roles of a tracking call are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// `track(EVENT, PROPS)` and friends.
    Positional {
        event: usize,
        user_id: Option<usize>,
        properties: Option<usize>,
    },
    /// Positional or keyword parameters: `track(user_id, event, properties=PROPS)`.
    Params {
        event: Param,
        user_id: Option<Param>,
        properties: Option<Param>,
    },
    /// Literal command discriminator first: `gtag('event', NAME, PROPS)`.
    Command {
        command: &'static str,
        event: usize,
        properties: usize,
    },
    /// A single struct or object literal argument.
    ///
    /// With `types` set, only struct literals of those type names match.
    Record {
        types: &'static [&'static str],
        record: RecordShape,
    },
    /// A list of events built by a constructor method:
    /// `Track(ctx, []*Event{client.NewEvent(EVENT, USER, PROPS)})`.
    EventList {
        constructor: &'static str,
        item: RecordShape,
    },
    /// A record passed through a builder function: `track(buildStructEvent({...}))`.
    Wrapped {
        builder: &'static str,
        record: RecordShape,
    },
}

/// Roles read from one tracked event.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<'a> {
    pub event: Option<&'a Value>,
    pub user_id: Option<&'a Value>,
    pub properties: PropertyMap,
    pub unresolved_properties: Option<Unresolved>,
}

impl<'a> Extracted<'a> {
    fn positional(args: &'a [Value], event: usize, user_id: Option<usize>, properties: Option<usize>) -> Self {
        let (properties, unresolved_properties) = match properties.and_then(|i| args.get(i)) {
            Some(bag) => resolve_bag(bag),
            None => (PropertyMap::new(), None),
        };
        Extracted {
            event: args.get(event),
            user_id: user_id.and_then(|i| args.get(i)),
            properties,
            unresolved_properties,
        }
    }

    /// No event at all, e.g. an empty literal event list.
    fn missing() -> Self {
        Extracted {
            event: None,
            user_id: None,
            properties: PropertyMap::new(),
            unresolved_properties: None,
        }
    }

    fn opaque(value: &'a Value) -> Self {
        Extracted {
            event: Some(value),
            user_id: None,
            properties: PropertyMap::new(),
            unresolved_properties: None,
        }
    }
}

impl CallShape {
    /// Struct type names that identify this shape on their own.
    pub fn struct_types(&self) -> &'static [&'static str] {
        match self {
            CallShape::Record { types, .. } => types,
            _ => &[],
        }
    }

    /// Read the events of a call, or `None` when the arguments do not fit.
    pub fn extract<'a>(&self, args: &'a [Value]) -> Option<Vec<Extracted<'a>>> {
        match *self {
            CallShape::Positional {
                event,
                user_id,
                properties,
            } => {
                // A record argument belongs to a `Record` shape of the same method.
                if record_fields(args.get(event)?).is_some() {
                    return None;
                }
                Some(vec![Extracted::positional(args, event, user_id, properties)])
            }
            CallShape::Params {
                event,
                user_id,
                properties,
            } => {
                let event = event.find(args);
                if event.and_then(record_fields).is_some() {
                    return None;
                }
                let (properties, unresolved_properties) =
                    match properties.and_then(|param| param.find(args)) {
                        Some(bag) => resolve_bag(bag),
                        None => (PropertyMap::new(), None),
                    };
                Some(vec![Extracted {
                    event,
                    user_id: user_id.and_then(|param| param.find(args)),
                    properties,
                    unresolved_properties,
                }])
            }
            CallShape::Command {
                command,
                event,
                properties,
            } => {
                if args.first()?.as_str()? != command {
                    return None;
                }
                Some(vec![Extracted::positional(args, event, None, Some(properties))])
            }
            CallShape::Record { types, record } => {
                let arg = args.first()?;
                if !types.is_empty() {
                    match origin(arg) {
                        Value::Struct(lit) if types.contains(&lit.type_name.as_str()) => {}
                        _ => return None,
                    }
                }
                Some(vec![record.extract(record_fields(arg)?)])
            }
            CallShape::EventList { constructor, item } => {
                let arg = args.first()?;
                let Value::List(items) = origin(arg) else {
                    return Some(vec![Extracted::opaque(arg)]);
                };
                if items.is_empty() {
                    return Some(vec![Extracted::missing()]);
                }
                let events = items
                    .iter()
                    .map(|value| match value.resolved() {
                        Value::Call(call)
                            if call
                                .callee
                                .path()
                                .and_then(|path| path.last().copied())
                                == Some(constructor) =>
                        {
                            Extracted::positional(&call.args, 0, Some(1), Some(2))
                        }
                        other => match record_fields(other) {
                            Some(fields) => item.extract(fields),
                            None => Extracted::opaque(value),
                        },
                    })
                    .collect();
                Some(events)
            }
            CallShape::Wrapped { builder, record } => {
                let call = args.first()?.resolved().as_call()?;
                let name = call.callee.path()?;
                if name.last().copied() != Some(builder) {
                    return None;
                }
                Some(vec![record.extract(record_fields(call.args.first()?)?)])
            }
        }
    }
}

/// Named fields of a map or struct literal, following local initialisation.
fn record_fields(value: &Value) -> Option<&[Entry]> {
    match origin(value) {
        Value::Map(entries) => Some(entries),
        Value::Struct(lit) => Some(&lit.fields),
        _ => None,
    }
}

fn origin(value: &Value) -> &Value {
    let value = value.resolved();
    match value {
        Value::Ident(Ident {
            binding: Binding::Initialized(origin),
            ..
        }) => self::origin(origin),
        _ => value,
    }
}
