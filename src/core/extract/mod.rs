//! Phase 2: Extraction - turning recognised call sites into tracking records.
//!
//! Provider call sites are extracted file by file as soon as their argument
//! roles are known from the catalog. Custom-function call sites need the
//! signature table of the whole scan and are built by `core::custom`.

pub mod properties;
pub mod record;

pub use properties::{resolve_bag, resolve_properties, resolve_value};
pub use record::{
    EventName, IncidentalArgument, PropertyMap, PropertyValue, TrackingRecord, TrackingSource,
    Unresolved, UnresolvedReason,
};

use crate::core::{
    catalog::{Extracted, ProviderMatch},
    syntax::{CallSite, Value},
};

/// Event name of the argument playing the event role.
pub fn event_name(value: Option<&Value>) -> EventName {
    match value {
        Some(value) => match value.as_str() {
            Some(name) => EventName::Resolved(name.to_string()),
            None => EventName::Unresolved {
                expression: value.describe(),
                reason: UnresolvedReason::NotLiteral,
            },
        },
        None => EventName::Unresolved {
            expression: String::new(),
            reason: UnresolvedReason::Missing,
        },
    }
}

/// Records of a provider call site, one per tracked event.
pub fn provider_records(site: &CallSite, matched: ProviderMatch<'_>) -> Vec<TrackingRecord> {
    let source = TrackingSource::Provider(matched.provider);
    matched
        .events
        .into_iter()
        .map(|extracted| build_record(site, source.clone(), extracted))
        .collect()
}

fn build_record(site: &CallSite, source: TrackingSource, extracted: Extracted<'_>) -> TrackingRecord {
    TrackingRecord {
        source,
        event: event_name(extracted.event),
        user_id: extracted.user_id.map(resolve_value),
        properties: extracted.properties,
        unresolved_properties: extracted.unresolved_properties,
        incidental: Vec::new(),
        context: site.context.clone(),
        function: site.function.clone(),
        ordinal: site.ordinal,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::{
        catalog::{Provider, match_call},
        data::{SourceContext, SourceLocation, ValueType},
        syntax::{Binding, Entry, Language, StructLit, TypeRef},
    };

    fn site(callee: Value, args: Vec<Value>) -> CallSite {
        CallSite {
            callee,
            args,
            context: SourceContext::new(SourceLocation::new("main.go", 33, 2), ""),
            function: "segmentTrack".to_string(),
            ordinal: 4,
        }
    }

    fn segment_client() -> Value {
        Value::ident(
            "client",
            Binding::Initialized(Box::new(Value::call(
                Value::member(
                    Value::Package {
                        alias: "analytics".to_string(),
                        path: "github.com/segmentio/analytics-go/v3".to_string(),
                    },
                    "New",
                ),
                vec![Value::Str("key".to_string())],
            ))),
        )
    }

    fn track(fields: Vec<Entry>) -> Value {
        Value::Struct(StructLit {
            package: Some("github.com/segmentio/analytics-go/v3".to_string()),
            type_name: "Track".to_string(),
            fields,
        })
    }

    #[test]
    fn test_event_name() {
        assert_eq!(
            event_name(Some(&Value::Str("Signed Up".to_string()))),
            EventName::Resolved("Signed Up".to_string())
        );
        assert_eq!(
            event_name(Some(&Value::ident("name", Binding::Unknown))),
            EventName::Unresolved {
                expression: "name".to_string(),
                reason: UnresolvedReason::NotLiteral,
            }
        );
        assert_eq!(
            event_name(None),
            EventName::Unresolved {
                expression: String::new(),
                reason: UnresolvedReason::Missing,
            }
        );
    }

    #[test]
    fn test_segment_builder_record() {
        let properties = Value::call(
            Value::member(
                Value::call(
                    Value::member(
                        Value::call(
                            Value::member(
                                Value::Package {
                                    alias: "analytics".to_string(),
                                    path: "github.com/segmentio/analytics-go/v3".to_string(),
                                },
                                "NewProperties",
                            ),
                            vec![],
                        ),
                        "Set",
                    ),
                    vec![
                        Value::Str("plan".to_string()),
                        Value::Str("Enterprise".to_string()),
                    ],
                ),
                "Set",
            ),
            vec![Value::Str("is_free_trial".to_string()), Value::Bool(true)],
        );
        let call = site(
            Value::member(segment_client(), "Enqueue"),
            vec![track(vec![
                Entry::new("UserId", Value::Str("f4ca124298".to_string())),
                Entry::new("Event", Value::Str("Signed Up".to_string())),
                Entry::new("Properties", properties),
            ])],
        );

        let matched = match_call(&call, Language::Go).unwrap();
        let records = provider_records(&call, matched);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.source, TrackingSource::Provider(Provider::Segment));
        assert_eq!(record.event, EventName::Resolved("Signed Up".to_string()));
        assert_eq!(
            record.user_id,
            Some(PropertyValue::String("f4ca124298".to_string()))
        );
        assert_eq!(record.properties.to_string(), "{ plan: \"Enterprise\", is_free_trial: true }");
        assert_eq!(record.function, "segmentTrack");
        assert_eq!(record.ordinal, 4);
    }

    #[test]
    fn test_variable_event_name_keeps_other_fields() {
        let event = Value::ident(
            "eventName",
            Binding::Typed(TypeRef::new(None, "string", ValueType::String)),
        );
        let call = site(
            Value::member(segment_client(), "Enqueue"),
            vec![track(vec![
                Entry::new("UserId", Value::Str("u1".to_string())),
                Entry::new("Event", event),
                Entry::new(
                    "Properties",
                    Value::Map(vec![Entry::new("plan", Value::Str("pro".to_string()))]),
                ),
            ])],
        );

        let records = provider_records(&call, match_call(&call, Language::Go).unwrap());
        let record = &records[0];
        assert_eq!(record.event.to_string(), "<unresolved: eventName>");
        assert_eq!(record.user_id, Some(PropertyValue::String("u1".to_string())));
        assert_eq!(record.properties.len(), 1);
    }

    #[test]
    fn test_missing_event_field() {
        let call = site(
            Value::member(segment_client(), "Enqueue"),
            vec![track(vec![Entry::new(
                "UserId",
                Value::Str("u1".to_string()),
            )])],
        );
        let records = provider_records(&call, match_call(&call, Language::Go).unwrap());
        assert!(matches!(
            records[0].event,
            EventName::Unresolved {
                reason: UnresolvedReason::Missing,
                ..
            }
        ));
    }
}
