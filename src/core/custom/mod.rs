//! Phase 3: Custom tracking functions.
//!
//! Project-defined wrappers are configured by signature string or by name
//! pattern. Their call sites are collected during extraction and turned into
//! records here, sequentially, so every function's first call site (in file
//! path then source order) fixes its argument roles.

pub mod inference;
pub mod signature;

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use regex::Regex;

pub use inference::{Convention, Resolution, SignatureTable, ValueShape};
pub use signature::{CustomSignature, ExplicitRoles, RoleMapping, SignatureError};

use crate::{
    core::{
        extract::{
            EventName, IncidentalArgument, PropertyMap, TrackingRecord, TrackingSource,
            UnresolvedReason, event_name, resolve_bag, resolve_value,
        },
        syntax::CallSite,
    },
    issues::{AmbiguousSignatureIssue, Issue},
};

/// How the roles of a matched custom function are determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomKind<'a> {
    Explicit(&'a ExplicitRoles),
    Inferred,
}

/// The configured custom tracking functions.
#[derive(Debug, Default)]
pub struct CustomFunctions {
    by_name: HashMap<String, CustomSignature>,
    patterns: Vec<Regex>,
}

impl CustomFunctions {
    pub fn new(signatures: &[String], patterns: &[String]) -> Result<Self> {
        let mut by_name = HashMap::new();
        for raw in signatures {
            let signature = CustomSignature::parse(raw)?;
            tracing::debug!(%signature, "registered custom function");
            by_name.insert(signature.name.clone(), signature);
        }
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).with_context(|| format!("invalid custom function pattern `{}`", p))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { by_name, patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty() && self.patterns.is_empty()
    }

    /// Look up a dotted callee name. Exact names win over patterns.
    pub fn lookup(&self, callee: &str) -> Option<CustomKind<'_>> {
        if let Some(signature) = self.by_name.get(callee) {
            return Some(match &signature.explicit {
                Some(roles) => CustomKind::Explicit(roles),
                None => CustomKind::Inferred,
            });
        }
        self.patterns
            .iter()
            .any(|p| p.is_match(callee))
            .then_some(CustomKind::Inferred)
    }

    /// Positional convention learned from the catalog and explicit signatures.
    pub fn convention(&self) -> Convention {
        // Sorted so that the learned convention does not depend on hash order.
        let mut explicit: Vec<_> = self
            .by_name
            .values()
            .filter_map(|s| s.explicit.as_ref())
            .collect();
        explicit.sort_by_key(|roles| roles.params.join(","));
        Convention::learn(explicit.iter().map(|roles| &roles.mapping))
    }
}

/// Records and diagnostics of custom-function call sites.
#[derive(Debug, Default)]
pub struct CustomOutcome {
    pub records: Vec<TrackingRecord>,
    pub issues: Vec<Issue>,
}

/// Build the records of custom call sites, given in file path then source order.
pub fn resolve_custom_calls<'a>(
    functions: &CustomFunctions,
    sites: impl IntoIterator<Item = &'a CallSite>,
) -> CustomOutcome {
    let mut table = SignatureTable::new(functions.convention());
    let mut outcome = CustomOutcome::default();

    for site in sites {
        let Some(name) = site.callee_name() else {
            continue;
        };
        let Some(kind) = functions.lookup(&name) else {
            continue;
        };

        let record = match kind {
            CustomKind::Explicit(roles) => {
                custom_record(site, &name, &roles.mapping, Some(roles.params.as_slice()))
            }
            CustomKind::Inferred => {
                match table.resolve(&name, &site.args, &site.context.location) {
                    Resolution::Agreed(mapping) => custom_record(site, &name, &mapping, None),
                    Resolution::Conflict(conflict) => {
                        tracing::debug!(
                            function = %name,
                            file = %site.context.file_path(),
                            line = site.context.line(),
                            "conflicting custom function signature"
                        );
                        outcome
                            .issues
                            .push(Issue::AmbiguousSignature(AmbiguousSignatureIssue {
                                context: site.context.clone(),
                                function: name.clone(),
                                found: conflict.found.describe(conflict.arity),
                                expected: conflict.expected.describe(conflict.expected_arity),
                                first_seen: conflict.first_seen,
                            }));
                        ambiguous_record(site, &name)
                    }
                }
            }
        };
        outcome.records.push(record);
    }

    tracing::debug!(
        functions = table.function_count(),
        records = outcome.records.len(),
        "resolved custom function calls"
    );
    outcome
}

fn custom_record(
    site: &CallSite,
    name: &str,
    mapping: &RoleMapping,
    params: Option<&[String]>,
) -> TrackingRecord {
    let (properties, unresolved_properties) =
        match mapping.properties.and_then(|i| site.args.get(i)) {
            Some(bag) => resolve_bag(bag),
            None => (PropertyMap::new(), None),
        };

    let incidental = site
        .args
        .iter()
        .enumerate()
        .filter(|(i, _)| mapping.role_at(*i).is_none())
        .map(|(position, value)| IncidentalArgument {
            position,
            name: params.and_then(|p| p.get(position)).cloned(),
            value: resolve_value(value),
        })
        .collect();

    TrackingRecord {
        source: TrackingSource::Custom {
            function: name.to_string(),
        },
        event: event_name(mapping.event.and_then(|i| site.args.get(i))),
        user_id: mapping
            .user_id
            .and_then(|i| site.args.get(i))
            .map(resolve_value),
        properties,
        unresolved_properties,
        incidental,
        context: site.context.clone(),
        function: site.function.clone(),
        ordinal: site.ordinal,
    }
}

/// Record of a call site whose roles could not be agreed on.
fn ambiguous_record(site: &CallSite, name: &str) -> TrackingRecord {
    let mut record = custom_record(site, name, &RoleMapping::default(), None);
    record.event = EventName::Unresolved {
        expression: name.to_string(),
        reason: UnresolvedReason::AmbiguousSignature,
    };
    record
}
