use std::{fmt, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

static SIGNATURE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z0-9_.$]+)\s*(?:\(([^)]*)\))?\s*$").unwrap());

const EVENT_NAME: &str = "EVENT_NAME";
const PROPERTIES: &str = "PROPERTIES";
const USER_ID_PARAMS: &[&str] = &["userId", "user_id", "distinctId", "distinct_id", "USER_ID"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed custom function signature `{0}`")]
    Malformed(String),
    #[error("custom function signature `{0}` has no EVENT_NAME parameter")]
    MissingEventName(String),
    #[error("custom function signature `{signature}` declares {role} more than once")]
    DuplicateRole { signature: String, role: &'static str },
}

/// Argument positions of the tracked roles of a custom function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RoleMapping {
    pub event: Option<usize>,
    pub user_id: Option<usize>,
    pub properties: Option<usize>,
}

impl RoleMapping {
    pub fn role_at(&self, position: usize) -> Option<&'static str> {
        if self.event == Some(position) {
            Some(EVENT_NAME)
        } else if self.properties == Some(position) {
            Some(PROPERTIES)
        } else if self.user_id == Some(position) {
            Some("userId")
        } else {
            None
        }
    }

    /// Render the mapping over `arity` arguments: `(userId, EVENT_NAME, _)`.
    pub fn describe(&self, arity: usize) -> String {
        let params: Vec<_> = (0..arity)
            .map(|i| self.role_at(i).unwrap_or("_"))
            .collect();
        format!("({})", params.join(", "))
    }
}

/// A configured custom tracking function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSignature {
    /// Dotted callee name: `track` or `Analytics.track`.
    pub name: String,
    /// Declared roles, or `None` when they are inferred from call sites.
    pub explicit: Option<ExplicitRoles>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitRoles {
    pub mapping: RoleMapping,
    /// Parameter names, used to label incidental arguments.
    pub params: Vec<String>,
}

impl CustomSignature {
    /// Parse `name` or `name(param, ...)`.
    pub fn parse(signature: &str) -> Result<Self, SignatureError> {
        let caps = SIGNATURE_REGEX
            .captures(signature)
            .ok_or_else(|| SignatureError::Malformed(signature.to_string()))?;
        let name = caps[1].to_string();

        let Some(params) = caps.get(2) else {
            return Ok(Self {
                name,
                explicit: None,
            });
        };

        let params: Vec<String> = params
            .as_str()
            .split(',')
            .map(|p| p.trim().to_string())
            .collect();
        if params.iter().any(String::is_empty) {
            return Err(SignatureError::Malformed(signature.to_string()));
        }

        let position = |role: &'static str| -> Result<Option<usize>, SignatureError> {
            let mut found = params
                .iter()
                .enumerate()
                .filter(|(_, p)| p.eq_ignore_ascii_case(role));
            let first = found.next().map(|(i, _)| i);
            if found.next().is_some() {
                return Err(SignatureError::DuplicateRole {
                    signature: signature.to_string(),
                    role,
                });
            }
            Ok(first)
        };

        let event = position(EVENT_NAME)?
            .ok_or_else(|| SignatureError::MissingEventName(signature.to_string()))?;
        let properties = position(PROPERTIES)?.unwrap_or(params.len());
        let user_id = params
            .iter()
            .position(|p| USER_ID_PARAMS.contains(&p.as_str()));

        Ok(Self {
            name,
            explicit: Some(ExplicitRoles {
                mapping: RoleMapping {
                    event: Some(event),
                    user_id,
                    properties: Some(properties),
                },
                params,
            }),
        })
    }
}

impl fmt::Display for CustomSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.explicit {
            Some(roles) => write!(f, "{}({})", self.name, roles.params.join(", ")),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_bare_name() {
        let sig = CustomSignature::parse("CustomModule.track").unwrap();
        assert_eq!(sig.name, "CustomModule.track");
        assert_eq!(sig.explicit, None);
    }

    #[test]
    fn test_parse_explicit_roles() {
        let sig = CustomSignature::parse("track(userId, EVENT_NAME, PROPERTIES, ctx)").unwrap();
        let roles = sig.explicit.unwrap();
        assert_eq!(
            roles.mapping,
            RoleMapping {
                event: Some(1),
                user_id: Some(0),
                properties: Some(2),
            }
        );
        assert_eq!(roles.params[3], "ctx");
    }

    #[test]
    fn test_role_names_are_case_insensitive() {
        let sig = CustomSignature::parse("track(event_name, Properties)").unwrap();
        let roles = sig.explicit.unwrap();
        assert_eq!(roles.mapping.event, Some(0));
        assert_eq!(roles.mapping.properties, Some(1));
        assert!(matches!(
            CustomSignature::parse("track(EVENT_NAME, event_name)"),
            Err(SignatureError::DuplicateRole { role: "EVENT_NAME", .. })
        ));
    }

    #[test]
    fn test_properties_default_past_last_param() {
        let sig = CustomSignature::parse("trackEvent(EVENT_NAME, source)").unwrap();
        assert_eq!(sig.explicit.unwrap().mapping.properties, Some(2));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            CustomSignature::parse("track(userId, PROPERTIES)"),
            Err(SignatureError::MissingEventName(
                "track(userId, PROPERTIES)".to_string()
            ))
        );
        assert!(matches!(
            CustomSignature::parse("track(EVENT_NAME, EVENT_NAME)"),
            Err(SignatureError::DuplicateRole { role: "EVENT_NAME", .. })
        ));
        assert!(matches!(
            CustomSignature::parse("track()"),
            Err(SignatureError::Malformed(_))
        ));
        assert!(matches!(
            CustomSignature::parse("not a name"),
            Err(SignatureError::Malformed(_))
        ));
    }

    #[test]
    fn test_describe_mapping() {
        let mapping = RoleMapping {
            event: Some(1),
            user_id: Some(0),
            properties: Some(3),
        };
        assert_eq!(
            mapping.describe(5),
            "(userId, EVENT_NAME, _, PROPERTIES, _)"
        );
    }

    #[test]
    fn test_display_normalizes_params() {
        let sig = CustomSignature::parse("track( userId ,EVENT_NAME)").unwrap();
        assert_eq!(sig.to_string(), "track(userId, EVENT_NAME)");
    }
}
