//! YAML tracking schema.
//!
//! Records with a literal event name are grouped by event. Each event lists
//! where it is tracked and the union of the properties sent with it; when an
//! event is tracked with the same property twice, the later record's type wins.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::core::{
    data::ValueType,
    extract::{PropertyMap, PropertyValue, TrackingRecord},
};

/// Schema format version.
pub const SCHEMA_VERSION: u32 = 1;

/// Property key under which a record's user id is listed.
const USER_ID_PROPERTY: &str = "userId";

#[derive(Debug, Default, Serialize)]
pub struct TrackingSchema {
    pub version: u32,
    pub events: BTreeMap<String, EventSchema>,
}

#[derive(Debug, Default, Serialize)]
pub struct EventSchema {
    pub implementations: Vec<Implementation>,
    pub properties: PropertyTypes,
}

/// One place an event is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Implementation {
    pub path: String,
    pub line: usize,
    pub function: String,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyType {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertyType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyTypes>,
}

impl PropertyType {
    fn of(value: &PropertyValue) -> Self {
        let items = match value {
            PropertyValue::List(items) => items.first().map(|item| Box::new(Self::of(item))),
            _ => None,
        };
        let properties = match value {
            PropertyValue::Object(map) => Some(PropertyTypes::of(map)),
            _ => None,
        };
        Self {
            value_type: value.value_type(),
            items,
            properties,
        }
    }
}

/// Property types in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyTypes {
    entries: Vec<(String, PropertyType)>,
}

impl PropertyTypes {
    fn of(map: &PropertyMap) -> Self {
        let mut types = Self::default();
        for (key, value) in map.iter() {
            types.insert(key, PropertyType::of(value));
        }
        types
    }

    fn insert(&mut self, key: &str, property: PropertyType) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = property,
            None => self.entries.push((key.to_string(), property)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyType> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PropertyTypes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl TrackingSchema {
    /// Group records by event. Records without a literal event name are skipped.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a TrackingRecord>) -> Self {
        let mut events: BTreeMap<String, EventSchema> = BTreeMap::new();

        for record in records {
            let Some(name) = record.event.as_resolved() else {
                continue;
            };
            let event = events.entry(name.to_string()).or_default();

            event.implementations.push(Implementation {
                path: record.location().file_path.clone(),
                line: record.location().line,
                function: record.function.clone(),
                destination: record.source.id().to_string(),
            });

            if let Some(user_id) = &record.user_id {
                event
                    .properties
                    .insert(USER_ID_PROPERTY, PropertyType::of(user_id));
            }
            for (key, value) in record.properties.iter() {
                event.properties.insert(key, PropertyType::of(value));
            }
        }

        Self {
            version: SCHEMA_VERSION,
            events,
        }
    }
}

/// Render records as a YAML tracking schema.
pub fn render_schema(records: &[TrackingRecord]) -> Result<String> {
    let schema = TrackingSchema::from_records(records);
    serde_yaml::to_string(&schema).context("Failed to serialize tracking schema")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::{
        catalog::Provider,
        data::{SourceContext, SourceLocation},
        extract::{EventName, TrackingSource, UnresolvedReason},
    };

    fn record(event: EventName, line: usize, properties: PropertyMap) -> TrackingRecord {
        TrackingRecord {
            source: TrackingSource::Provider(Provider::Mixpanel),
            event,
            user_id: None,
            properties,
            unresolved_properties: None,
            incidental: Vec::new(),
            context: SourceContext::new(SourceLocation::new("main.go", line, 2), ""),
            function: "main".to_string(),
            ordinal: line,
        }
    }

    fn props(entries: Vec<(&str, PropertyValue)>) -> PropertyMap {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_events_are_sorted_and_unresolved_skipped() {
        let records = vec![
            record(EventName::Resolved("b_event".to_string()), 1, PropertyMap::new()),
            record(
                EventName::Unresolved {
                    expression: "name".to_string(),
                    reason: UnresolvedReason::NotLiteral,
                },
                2,
                PropertyMap::new(),
            ),
            record(EventName::Resolved("a_event".to_string()), 3, PropertyMap::new()),
        ];

        let schema = TrackingSchema::from_records(&records);
        let names: Vec<_> = schema.events.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a_event", "b_event"]);
        assert_eq!(
            schema.events["a_event"].implementations,
            vec![Implementation {
                path: "main.go".to_string(),
                line: 3,
                function: "main".to_string(),
                destination: "mixpanel".to_string(),
            }]
        );
    }

    #[test]
    fn test_property_types_merge_across_implementations() {
        let records = vec![
            record(
                EventName::Resolved("Signed Up".to_string()),
                1,
                props(vec![
                    ("plan", PropertyValue::String("Free".to_string())),
                    ("seats", PropertyValue::unresolved("n", ValueType::Any)),
                ]),
            ),
            record(
                EventName::Resolved("Signed Up".to_string()),
                9,
                props(vec![
                    ("seats", PropertyValue::Number(3.0)),
                    (
                        "tags",
                        PropertyValue::List(vec![PropertyValue::String("a".to_string())]),
                    ),
                ]),
            ),
        ];

        let schema = TrackingSchema::from_records(&records);
        let event = &schema.events["Signed Up"];
        assert_eq!(event.implementations.len(), 2);

        let keys: Vec<_> = event.properties.keys().collect();
        assert_eq!(keys, vec!["plan", "seats", "tags"]);
        assert_eq!(
            event.properties.get("seats").map(|p| p.value_type),
            Some(ValueType::Number)
        );
        let tags = event.properties.get("tags").unwrap();
        assert_eq!(tags.value_type, ValueType::Array);
        assert_eq!(
            tags.items.as_ref().map(|i| i.value_type),
            Some(ValueType::String)
        );
    }

    #[test]
    fn test_user_id_is_listed_as_property() {
        let mut tracked = record(
            EventName::Resolved("custom_event4".to_string()),
            4,
            props(vec![("foo", PropertyValue::String("bar".to_string()))]),
        );
        tracked.user_id = Some(PropertyValue::String("user202".to_string()));

        let schema = TrackingSchema::from_records([&tracked]);
        let keys: Vec<_> = schema.events["custom_event4"].properties.keys().collect();
        assert_eq!(keys, vec!["userId", "foo"]);
    }

    #[test]
    fn test_render_schema_yaml() {
        let nested = props(vec![("a", PropertyValue::Number(1.0))]);
        let records = vec![record(
            EventName::Resolved("Signed Up".to_string()),
            7,
            props(vec![
                ("plan", PropertyValue::String("Enterprise".to_string())),
                ("obj", PropertyValue::Object(nested)),
            ]),
        )];

        let yaml = render_schema(&records).unwrap();
        assert!(yaml.starts_with("version: 1\nevents:\n"));
        assert!(yaml.find("plan:").unwrap() < yaml.find("obj:").unwrap());

        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        let event = &value["events"]["Signed Up"];
        assert_eq!(event["implementations"][0]["line"].as_u64(), Some(7));
        assert_eq!(
            event["implementations"][0]["destination"].as_str(),
            Some("mixpanel")
        );
        assert_eq!(event["properties"]["plan"]["type"].as_str(), Some("string"));
        assert_eq!(
            event["properties"]["obj"]["properties"]["a"]["type"].as_str(),
            Some("number")
        );
        assert!(event["properties"]["plan"].get("items").is_none());
    }
}
