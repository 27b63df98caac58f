//! Catalog of supported analytics providers.
//!
//! Each [`Provider`] carries static descriptions of its Go, JavaScript and
//! Python SDKs: how a client is obtained, and which methods track events with
//! which [`CallShape`]. Matching a call site against the catalog never mutates
//! anything; the tables are plain data.

pub mod shape;

use std::fmt;

use serde::Serialize;

use crate::core::syntax::{CallSite, Language, Value};

pub use shape::{CallShape, Extracted, Param, RecordShape};

/// An analytics vendor whose SDK calls are recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Segment,
    Mixpanel,
    Amplitude,
    #[serde(rename = "posthog")]
    PostHog,
    Snowplow,
    Rudderstack,
    #[serde(rename = "mparticle")]
    MParticle,
    Heap,
    Pendo,
    Datadog,
    #[serde(rename = "googleanalytics")]
    GoogleAnalytics,
    #[serde(rename = "googletagmanager")]
    GoogleTagManager,
}

impl Provider {
    pub const ALL: [Provider; 12] = [
        Provider::Segment,
        Provider::Mixpanel,
        Provider::Amplitude,
        Provider::PostHog,
        Provider::Snowplow,
        Provider::Rudderstack,
        Provider::MParticle,
        Provider::Heap,
        Provider::Pendo,
        Provider::Datadog,
        Provider::GoogleAnalytics,
        Provider::GoogleTagManager,
    ];

    /// Stable identifier used in output.
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Segment => "segment",
            Provider::Mixpanel => "mixpanel",
            Provider::Amplitude => "amplitude",
            Provider::PostHog => "posthog",
            Provider::Snowplow => "snowplow",
            Provider::Rudderstack => "rudderstack",
            Provider::MParticle => "mparticle",
            Provider::Heap => "heap",
            Provider::Pendo => "pendo",
            Provider::Datadog => "datadog",
            Provider::GoogleAnalytics => "googleanalytics",
            Provider::GoogleTagManager => "googletagmanager",
        }
    }

    pub fn go_sdk(&self) -> Option<&'static GoSdk> {
        match self {
            Provider::Segment => Some(&SEGMENT_GO),
            Provider::Mixpanel => Some(&MIXPANEL_GO),
            Provider::Amplitude => Some(&AMPLITUDE_GO),
            Provider::PostHog => Some(&POSTHOG_GO),
            Provider::Snowplow => Some(&SNOWPLOW_GO),
            _ => None,
        }
    }

    pub fn python_sdk(&self) -> Option<&'static PythonSdk> {
        match self {
            Provider::Segment => Some(&SEGMENT_PY),
            Provider::Mixpanel => Some(&MIXPANEL_PY),
            Provider::Amplitude => Some(&AMPLITUDE_PY),
            Provider::PostHog => Some(&POSTHOG_PY),
            Provider::Snowplow => Some(&SNOWPLOW_PY),
            Provider::Rudderstack => Some(&RUDDERSTACK_PY),
            _ => None,
        }
    }

    pub fn script_sdk(&self) -> &'static ScriptSdk {
        match self {
            Provider::Segment => &SEGMENT_JS,
            Provider::Mixpanel => &MIXPANEL_JS,
            Provider::Amplitude => &AMPLITUDE_JS,
            Provider::PostHog => &POSTHOG_JS,
            Provider::Snowplow => &SNOWPLOW_JS,
            Provider::Rudderstack => &RUDDERSTACK_JS,
            Provider::MParticle => &MPARTICLE_JS,
            Provider::Heap => &HEAP_JS,
            Provider::Pendo => &PENDO_JS,
            Provider::Datadog => &DATADOG_JS,
            Provider::GoogleAnalytics => &GOOGLE_ANALYTICS_JS,
            Provider::GoogleTagManager => &GOOGLE_TAG_MANAGER_JS,
        }
    }

    /// Every positional tracking shape in the catalog.
    pub fn positional_shapes() -> impl Iterator<Item = &'static CallShape> {
        Provider::ALL.into_iter().flat_map(|provider| {
            let sdk = provider.script_sdk();
            sdk.methods
                .iter()
                .chain(sdk.functions)
                .map(|method| &method.shape)
                .filter(|shape| matches!(shape, CallShape::Positional { .. }))
        })
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A tracking method (or free function) and the shape of its arguments.
#[derive(Debug, Clone, Copy)]
pub struct Method {
    pub name: &'static str,
    pub shape: CallShape,
}

const fn method(name: &'static str, shape: CallShape) -> Method {
    Method { name, shape }
}

const fn positional(event: usize, properties: usize) -> CallShape {
    CallShape::Positional {
        event,
        user_id: None,
        properties: Some(properties),
    }
}

/// A Go SDK: clients come from package constructors or typed declarations.
#[derive(Debug)]
pub struct GoSdk {
    /// Import path prefixes of the SDK packages.
    pub packages: &'static [&'static str],
    pub constructors: &'static [&'static str],
    pub client_types: &'static [&'static str],
    pub methods: &'static [Method],
}

impl GoSdk {
    pub fn owns(&self, import_path: &str) -> bool {
        self.packages
            .iter()
            .any(|prefix| import_path.starts_with(prefix))
    }
}

/// A JavaScript SDK: clients are well-known globals or constructed instances.
#[derive(Debug)]
pub struct ScriptSdk {
    pub globals: &'static [&'static str],
    /// Dotted callee names that return a client (`new PostHog(..)`, `Mixpanel.init(..)`).
    pub constructors: &'static [&'static str],
    pub methods: &'static [Method],
    /// Free tracking functions (`gtag(..)`).
    pub functions: &'static [Method],
}

/// A Python SDK: module-level functions or methods of constructed clients.
#[derive(Debug)]
pub struct PythonSdk {
    /// Modules whose functions track directly (`segment.analytics.track(..)`).
    pub modules: &'static [&'static str],
    /// Qualified callables returning a client (`mixpanel.Mixpanel`).
    pub constructors: &'static [&'static str],
    pub methods: &'static [Method],
}

const fn params(user_id: &'static str, event: &'static str) -> CallShape {
    CallShape::Params {
        event: Param {
            index: 1,
            name: event,
        },
        user_id: Some(Param {
            index: 0,
            name: user_id,
        }),
        properties: Some(Param {
            index: 2,
            name: "properties",
        }),
    }
}

static SEGMENT_GO: GoSdk = GoSdk {
    packages: &[
        "github.com/segmentio/analytics-go",
        "gopkg.in/segmentio/analytics-go",
    ],
    constructors: &["New", "NewWithConfig"],
    client_types: &["Client"],
    methods: &[method(
        "Enqueue",
        CallShape::Record {
            types: &["Track"],
            record: RecordShape {
                event: &["Event"],
                user_id: &["UserId", "AnonymousId"],
                properties: &["Properties"],
                ..RecordShape::EMPTY
            },
        },
    )],
};

static MIXPANEL_GO: GoSdk = GoSdk {
    packages: &["github.com/mixpanel/mixpanel-go"],
    constructors: &["NewApiClient", "NewClient"],
    client_types: &["ApiClient"],
    methods: &[method(
        "Track",
        CallShape::EventList {
            constructor: "NewEvent",
            item: RecordShape {
                event: &["Name"],
                properties: &["Properties"],
                ..RecordShape::EMPTY
            },
        },
    )],
};

static AMPLITUDE_GO: GoSdk = GoSdk {
    packages: &["github.com/amplitude/analytics-go"],
    constructors: &["NewClient"],
    client_types: &["Client"],
    methods: &[method(
        "Track",
        CallShape::Record {
            types: &["Event"],
            record: RecordShape {
                event: &["EventType"],
                user_id: &["UserID", "DeviceID"],
                properties: &["EventProperties"],
                merged: &["EventOptions"],
                ..RecordShape::EMPTY
            },
        },
    )],
};

static POSTHOG_GO: GoSdk = GoSdk {
    packages: &["github.com/posthog/posthog-go"],
    constructors: &["New", "NewWithConfig"],
    client_types: &["Client"],
    methods: &[method(
        "Enqueue",
        CallShape::Record {
            types: &["Capture"],
            record: RecordShape {
                event: &["Event"],
                user_id: &["DistinctId"],
                properties: &["Properties"],
                ..RecordShape::EMPTY
            },
        },
    )],
};

static SNOWPLOW_GO: GoSdk = GoSdk {
    packages: &["github.com/snowplow/snowplow-golang-tracker"],
    constructors: &["InitTracker"],
    client_types: &["Tracker"],
    methods: &[method(
        "TrackStructEvent",
        CallShape::Record {
            types: &["StructuredEvent"],
            record: SNOWPLOW_STRUCT_EVENT,
        },
    )],
};

const SNOWPLOW_STRUCT_EVENT: RecordShape = RecordShape {
    event: &["Action", "action"],
    rest_as_properties: true,
    unwrap: &["NewString", "NewFloat64", "NewInt64", "NewBool"],
    ..RecordShape::EMPTY
};

static SEGMENT_JS: ScriptSdk = ScriptSdk {
    globals: &["analytics"],
    constructors: &["Analytics", "AnalyticsBrowser.load"],
    methods: &[
        method(
            "track",
            CallShape::Record {
                types: &[],
                record: RecordShape {
                    event: &["event"],
                    user_id: &["userId", "anonymousId"],
                    properties: &["properties"],
                    ..RecordShape::EMPTY
                },
            },
        ),
        method("track", positional(0, 1)),
    ],
    functions: &[],
};

static MIXPANEL_JS: ScriptSdk = ScriptSdk {
    globals: &["mixpanel"],
    constructors: &["Mixpanel.init", "mixpanel.init"],
    methods: &[method("track", positional(0, 1))],
    functions: &[],
};

static AMPLITUDE_JS: ScriptSdk = ScriptSdk {
    globals: &["amplitude"],
    constructors: &["amplitude.getInstance", "createInstance"],
    methods: &[
        method(
            "track",
            CallShape::Record {
                types: &[],
                record: RecordShape {
                    event: &["event_type"],
                    user_id: &["user_id", "device_id"],
                    properties: &["event_properties"],
                    ..RecordShape::EMPTY
                },
            },
        ),
        method("track", positional(0, 1)),
        method("logEvent", positional(0, 1)),
    ],
    functions: &[],
};

static POSTHOG_JS: ScriptSdk = ScriptSdk {
    globals: &["posthog"],
    constructors: &["PostHog"],
    methods: &[
        method(
            "capture",
            CallShape::Record {
                types: &[],
                record: RecordShape {
                    event: &["event"],
                    user_id: &["distinctId"],
                    properties: &["properties"],
                    ..RecordShape::EMPTY
                },
            },
        ),
        method("capture", positional(0, 1)),
    ],
    functions: &[],
};

static SNOWPLOW_JS: ScriptSdk = ScriptSdk {
    globals: &["tracker", "snowplow"],
    constructors: &["newTracker"],
    methods: &[method(
        "track",
        CallShape::Wrapped {
            builder: "buildStructEvent",
            record: SNOWPLOW_STRUCT_EVENT,
        },
    )],
    functions: &[method(
        "trackStructEvent",
        CallShape::Record {
            types: &[],
            record: SNOWPLOW_STRUCT_EVENT,
        },
    )],
};

static RUDDERSTACK_JS: ScriptSdk = ScriptSdk {
    globals: &["rudderanalytics"],
    constructors: &["RudderAnalytics"],
    methods: &[method("track", positional(0, 1))],
    functions: &[],
};

static MPARTICLE_JS: ScriptSdk = ScriptSdk {
    globals: &["mParticle", "mparticle"],
    constructors: &[],
    methods: &[method("logEvent", positional(0, 2))],
    functions: &[],
};

static HEAP_JS: ScriptSdk = ScriptSdk {
    globals: &["heap"],
    constructors: &[],
    methods: &[method("track", positional(0, 1))],
    functions: &[],
};

static PENDO_JS: ScriptSdk = ScriptSdk {
    globals: &["pendo"],
    constructors: &[],
    methods: &[method("track", positional(0, 1))],
    functions: &[],
};

static DATADOG_JS: ScriptSdk = ScriptSdk {
    globals: &["datadogRum", "DD_RUM"],
    constructors: &[],
    methods: &[method("addAction", positional(0, 1))],
    functions: &[],
};

static GOOGLE_ANALYTICS_JS: ScriptSdk = ScriptSdk {
    globals: &[],
    constructors: &[],
    methods: &[],
    functions: &[method(
        "gtag",
        CallShape::Command {
            command: "event",
            event: 1,
            properties: 2,
        },
    )],
};

static GOOGLE_TAG_MANAGER_JS: ScriptSdk = ScriptSdk {
    globals: &["dataLayer"],
    constructors: &[],
    methods: &[method(
        "push",
        CallShape::Record {
            types: &[],
            record: RecordShape {
                event: &["event"],
                rest_as_properties: true,
                ..RecordShape::EMPTY
            },
        },
    )],
    functions: &[],
};

static SEGMENT_PY: PythonSdk = PythonSdk {
    modules: &["segment.analytics", "analytics"],
    constructors: &["segment.analytics.Client", "analytics.Client"],
    methods: &[method("track", params("user_id", "event"))],
};

static MIXPANEL_PY: PythonSdk = PythonSdk {
    modules: &[],
    constructors: &["mixpanel.Mixpanel"],
    methods: &[method("track", params("distinct_id", "event_name"))],
};

static AMPLITUDE_PY: PythonSdk = PythonSdk {
    modules: &[],
    constructors: &["amplitude.Amplitude"],
    methods: &[method(
        "track",
        CallShape::Record {
            types: &["BaseEvent"],
            record: RecordShape {
                event: &["event_type"],
                user_id: &["user_id", "device_id"],
                properties: &["event_properties"],
                ..RecordShape::EMPTY
            },
        },
    )],
};

static POSTHOG_PY: PythonSdk = PythonSdk {
    modules: &["posthog"],
    constructors: &["posthog.Posthog", "posthog.Client"],
    methods: &[method("capture", params("distinct_id", "event"))],
};

static SNOWPLOW_PY: PythonSdk = PythonSdk {
    modules: &[],
    constructors: &[
        "snowplow_tracker.Snowplow.create_tracker",
        "snowplow_tracker.Tracker",
    ],
    methods: &[
        method(
            "track",
            CallShape::Record {
                types: &["StructuredEvent"],
                record: SNOWPLOW_STRUCT_EVENT,
            },
        ),
        method(
            "track_struct_event",
            CallShape::Params {
                event: Param {
                    index: 1,
                    name: "action",
                },
                user_id: None,
                properties: None,
            },
        ),
    ],
};

static RUDDERSTACK_PY: PythonSdk = PythonSdk {
    modules: &["rudderstack.analytics"],
    constructors: &["rudderstack.analytics.Client"],
    methods: &[method("track", params("user_id", "event"))],
};

/// A call site recognized as a provider tracking call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMatch<'a> {
    pub provider: Provider,
    /// One entry per tracked event; batch calls may carry several.
    pub events: Vec<Extracted<'a>>,
}

/// Match a call site against the catalog.
pub fn match_call(site: &CallSite, language: Language) -> Option<ProviderMatch<'_>> {
    match language {
        Language::Go => match_go(site),
        Language::JavaScript | Language::TypeScript => match_script(site),
        Language::Python => match_python(site),
    }
}

fn first_fit<'a>(
    provider: Provider,
    methods: &[Method],
    name: &str,
    args: &'a [Value],
) -> Option<ProviderMatch<'a>> {
    methods
        .iter()
        .filter(|method| method.name == name)
        .find_map(|method| method.shape.extract(args))
        .map(|events| ProviderMatch { provider, events })
}

fn match_go(site: &CallSite) -> Option<ProviderMatch<'_>> {
    let (receiver, name) = site.method()?;
    let args = strip_context(&site.args);

    if let Some(provider) = go_client(receiver) {
        let sdk = provider.go_sdk()?;
        return first_fit(provider, sdk.methods, name, args);
    }

    // Unknown receiver: a provider event struct is evidence enough.
    let Value::Struct(lit) = args.first()?.resolved() else {
        return None;
    };
    let package = lit.package.as_deref()?;
    Provider::ALL.into_iter().find_map(|provider| {
        let sdk = provider.go_sdk().filter(|sdk| sdk.owns(package))?;
        let methods: Vec<Method> = sdk
            .methods
            .iter()
            .filter(|method| method.shape.struct_types().contains(&lit.type_name.as_str()))
            .copied()
            .collect();
        first_fit(provider, &methods, name, args)
    })
}

/// The provider whose client a Go receiver provably is.
fn go_client(receiver: &Value) -> Option<Provider> {
    if let Some(origin) = receiver.origin() {
        let call = origin.as_call()?;
        let Value::Member { object, property } = &call.callee else {
            return None;
        };
        let Value::Package { path, .. } = object.as_ref() else {
            return None;
        };
        return Provider::ALL.into_iter().find(|provider| {
            provider
                .go_sdk()
                .is_some_and(|sdk| sdk.owns(path) && sdk.constructors.contains(&property.as_str()))
        });
    }

    let ty = receiver.declared_type()?;
    let package = ty.package.as_deref()?;
    Provider::ALL.into_iter().find(|provider| {
        provider
            .go_sdk()
            .is_some_and(|sdk| sdk.owns(package) && sdk.client_types.contains(&ty.name.as_str()))
    })
}

/// Drop a leading `context.Context` argument.
pub fn strip_context(args: &[Value]) -> &[Value] {
    match args.split_first() {
        Some((first, rest)) if is_context(first) => rest,
        _ => args,
    }
}

/// Whether a value is a Go `context.Context`.
pub fn is_context(value: &Value) -> bool {
    let from_context_package = |value: &Value| {
        value.as_call().is_some_and(|call| {
            matches!(
                &call.callee,
                Value::Member { object, .. }
                    if matches!(object.as_ref(), Value::Package { path, .. } if path == "context")
            )
        })
    };

    if from_context_package(value) {
        return true;
    }
    if let Some(ty) = value.declared_type() {
        return ty.package.as_deref() == Some("context") && ty.name == "Context";
    }
    match value.origin() {
        Some(origin) => from_context_package(origin),
        None => matches!(value, Value::Ident(ident) if ident.name == "ctx"),
    }
}

fn match_script(site: &CallSite) -> Option<ProviderMatch<'_>> {
    match &site.callee {
        Value::Ident(ident) => Provider::ALL.into_iter().find_map(|provider| {
            first_fit(provider, provider.script_sdk().functions, &ident.name, &site.args)
        }),
        Value::Member { object, property } => {
            let provider = script_client(object)?;
            first_fit(provider, provider.script_sdk().methods, property, &site.args)
        }
        _ => None,
    }
}

/// The provider whose client a JavaScript receiver is.
fn script_client(receiver: &Value) -> Option<Provider> {
    let constructed = receiver
        .origin()
        .and_then(Value::as_call)
        .and_then(|call| call.callee.dotted());
    if let Some(constructor) = constructed
        && let Some(provider) = Provider::ALL
            .into_iter()
            .find(|provider| provider.script_sdk().constructors.contains(&constructor.as_str()))
    {
        return Some(provider);
    }

    let path = receiver.path()?;
    let global = match path.as_slice() {
        ["window" | "globalThis" | "self", rest @ ..] if !rest.is_empty() => rest.join("."),
        _ => path.join("."),
    };
    Provider::ALL
        .into_iter()
        .find(|provider| provider.script_sdk().globals.contains(&global.as_str()))
}

fn match_python(site: &CallSite) -> Option<ProviderMatch<'_>> {
    let (receiver, name) = site.method()?;
    let provider = python_client(receiver)?;
    first_fit(provider, provider.python_sdk()?.methods, name, &site.args)
}

/// The provider whose module or client a Python receiver is.
fn python_client(receiver: &Value) -> Option<Provider> {
    if let Some(module) = receiver.qualified_name() {
        return Provider::ALL.into_iter().find(|provider| {
            provider
                .python_sdk()
                .is_some_and(|sdk| sdk.modules.contains(&module.as_str()))
        });
    }

    let constructor = receiver.origin()?.as_call()?.callee.qualified_name()?;
    Provider::ALL.into_iter().find(|provider| {
        provider
            .python_sdk()
            .is_some_and(|sdk| sdk.constructors.contains(&constructor.as_str()))
    })
}
