use anyhow::Result;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{CliTest, GO_FIXTURE, JS_FIXTURE, PY_FIXTURE, record};

#[test]
fn test_go_segment_builder_chain() -> Result<()> {
    let test = CliTest::with_file("main.go", GO_FIXTURE)?;

    let (output, json) = test.scan_json(&[])?;
    assert!(output.status.success());

    let segment = record(&json, "Signed Up").expect("segment record");
    assert_eq!(segment["source"], json!("segment"));
    assert_eq!(
        segment["properties"],
        json!({ "plan": "Enterprise", "is_free_trial": true })
    );
    assert_eq!(segment["file"], json!("main.go"));
    assert_eq!(segment["line"], json!(29));
    assert_eq!(segment["column"], json!(2));
    assert_eq!(segment["function"], json!("segmentTrack"));

    let posthog = record(&json, "user_signed_up").expect("posthog record");
    assert_eq!(posthog["source"], json!("posthog"));
    assert_eq!(posthog["userId"], json!("distinct_id_of_the_user"));
    let keys: Vec<_> = posthog["properties"]
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    assert_eq!(keys, vec!["login_type", "plan", "is_free_trial"]);

    assert_eq!(json["filesScanned"], json!(1));
    assert_eq!(json["filesFailed"], json!(0));
    Ok(())
}

#[test]
fn test_go_inferred_custom_function_with_incidental_arguments() -> Result<()> {
    let test = CliTest::with_file("main.go", GO_FIXTURE)?;

    let (output, json) = test.scan_json(&["--custom-function", "customTrackFunction4"])?;
    assert!(output.status.success());

    let custom = record(&json, "custom_event4").expect("custom record");
    assert_eq!(custom["source"], json!("custom"));
    assert_eq!(custom["customFunction"], json!("customTrackFunction4"));
    assert_eq!(custom["userId"], json!("user202"));
    assert_eq!(custom["properties"], json!({ "foo": "bar" }));

    let incidental: Vec<_> = custom["incidental"]
        .as_array()
        .unwrap()
        .iter()
        .map(|arg| arg["value"].clone())
        .collect();
    assert_eq!(
        incidental,
        vec![json!({ "city": "San Francisco" }), json!("user@example.com")]
    );
    Ok(())
}

#[test]
fn test_go_explicit_custom_signature_from_config() -> Result<()> {
    let test = CliTest::with_file("main.go", GO_FIXTURE)?;
    test.write_file(
        ".trackscanrc.json",
        r#"{ "customFunctions": ["customTrackFunction(userId, EVENT_NAME, PROPERTIES)"] }"#,
    )?;

    let (output, json) = test.scan_json(&[])?;
    assert!(output.status.success());

    let custom = record(&json, "custom_event").expect("custom record");
    assert_eq!(custom["userId"], json!("user888"));
    assert_eq!(custom["properties"]["foo"], json!("bar"));
    assert!(record(&json, "custom_event0").is_none());
    Ok(())
}

#[test]
fn test_go_fixture_with_every_custom_function() -> Result<()> {
    let test = CliTest::with_file("main.go", GO_FIXTURE)?;

    let (output, json) = test.scan_json(&[
        "--custom-function",
        "customTrackFunction",
        "--custom-function",
        "customTrackFunction0",
        "--custom-function",
        "customTrackFunction1",
        "--custom-function",
        "customTrackFunction2",
        "--custom-function",
        "customTrackFunction3",
        "--custom-function",
        "customTrackFunction4",
    ])?;
    assert!(output.status.success());
    assert_eq!(json["records"].as_array().unwrap().len(), 11);
    assert_eq!(json["diagnostics"], json!([]));

    let amplitude = record(&json, "Button Clicked").expect("amplitude record");
    assert_eq!(amplitude["source"], json!("amplitude"));
    assert_eq!(amplitude["userId"], json!("user-id"));
    assert_eq!(
        amplitude["properties"],
        json!({
            "name": "Checkout",
            "a property": "a value",
            "is_free_trial": { "unresolved": "isFreeTrial", "type": "boolean" },
            "Price": 1.99,
        })
    );

    let mixpanel = record(&json, "some_event").expect("mixpanel record");
    assert_eq!(mixpanel["source"], json!("mixpanel"));
    assert_eq!(mixpanel["line"], json!(41));
    assert_eq!(
        mixpanel["userId"],
        json!({ "unresolved": "userId", "type": "string" })
    );
    assert_eq!(
        mixpanel["properties"],
        json!({
            "plan": "premium",
            "price": { "unresolved": "price", "type": "number" },
        })
    );

    let snowplow = record(&json, "add-to-basket").expect("snowplow record");
    assert_eq!(snowplow["source"], json!("snowplow"));
    assert_eq!(
        snowplow["properties"],
        json!({
            "Category": "test",
            "Property": { "unresolved": "property", "type": "string" },
            "Value": { "unresolved": "value", "type": "number" },
        })
    );

    let custom = record(&json, "custom_event").expect("customTrackFunction record");
    assert_eq!(custom["customFunction"], json!("customTrackFunction"));
    assert_eq!(custom["userId"], json!("user888"));
    assert_eq!(custom["properties"]["foo"], json!("bar"));
    assert_eq!(
        custom["properties"]["baz"],
        json!({ "unresolved": "baz", "type": "number" })
    );

    for (event, function) in [
        ("custom_event0", "customTrackFunction0"),
        ("custom_event1", "customTrackFunction1"),
    ] {
        let custom = record(&json, event).expect("custom record");
        assert_eq!(custom["customFunction"], json!(function));
        assert!(custom["userId"].is_null());
        assert_eq!(custom["properties"], json!({ "foo": "bar" }));
        assert!(custom["incidental"].is_null());
    }

    let custom2 = record(&json, "custom_event2").expect("customTrackFunction2 record");
    assert_eq!(custom2["userId"], json!("user101"));
    assert_eq!(custom2["properties"], json!({ "foo": "bar" }));

    let custom3 = record(&json, "custom_event3").expect("customTrackFunction3 record");
    assert!(custom3["userId"].is_null());
    assert_eq!(custom3["properties"], json!({ "foo": "bar" }));
    assert_eq!(
        custom3["incidental"],
        json!([{ "position": 2, "value": "user@example.com" }])
    );

    let custom4 = record(&json, "custom_event4").expect("customTrackFunction4 record");
    assert_eq!(custom4["userId"], json!("user202"));
    assert_eq!(custom4["line"], json!(125));
    Ok(())
}

#[test]
fn test_go_client_setter_does_not_hide_tracking() -> Result<()> {
    let test = CliTest::with_file(
        "main.go",
        r#"package main

import (
	"context"

	"github.com/mixpanel/mixpanel-go"
)

func track(ctx context.Context) {
	mp := mixpanel.NewApiClient("token")
	mp.SetLogger(nil)
	mp.Track(ctx, []*mixpanel.Event{mp.NewEvent("logger_set", "u1", nil)})
}
"#,
    )?;

    let (output, json) = test.scan_json(&[])?;
    assert!(output.status.success());
    let mixpanel = record(&json, "logger_set").expect("mixpanel record");
    assert_eq!(mixpanel["source"], json!("mixpanel"));
    assert_eq!(mixpanel["userId"], json!("u1"));
    Ok(())
}

#[test]
fn test_go_empty_event_list_is_reported() -> Result<()> {
    let test = CliTest::with_file(
        "main.go",
        r#"package main

import (
	"context"

	"github.com/mixpanel/mixpanel-go"
)

func track(ctx context.Context) {
	mp := mixpanel.NewApiClient("token")
	mp.Track(ctx, []*mixpanel.Event{})
}
"#,
    )?;

    let (output, json) = test.scan_json(&[])?;
    assert!(output.status.success());
    let records = json["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["source"], json!("mixpanel"));
    assert_eq!(
        records[0]["event"],
        json!({ "unresolved": "", "reason": "missing" })
    );
    assert_eq!(records[0]["line"], json!(11));
    Ok(())
}

#[test]
fn test_go_doubling_initializers_finish() -> Result<()> {
    let mut source = String::from("package main\n\nfunc main() {\n\ta0 := map[string]any{\"k\": \"v\"}\n");
    for n in 1..=40 {
        source.push_str(&format!("\ta{n} := []any{{a{}, a{}}}\n", n - 1, n - 1));
    }
    source.push_str("\ttrack(\"doubled\", a40)\n}\n");
    let test = CliTest::with_file("main.go", &source)?;

    let (output, json) = test.scan_json(&["--custom-function", "track(EVENT_NAME, PROPERTIES)"])?;
    assert!(output.status.success());
    let doubled = record(&json, "doubled").expect("custom record");
    assert_eq!(
        doubled["unresolvedProperties"],
        json!({ "unresolved": "a40", "type": "array" })
    );
    Ok(())
}

#[test]
fn test_python_fixture() -> Result<()> {
    let test = CliTest::with_file("app/main.py", PY_FIXTURE)?;

    let (output, json) = test.scan_json(&[
        "--custom-function",
        "customTrackFunction",
        "--custom-function",
        "customTrackFunction3",
    ])?;
    assert!(output.status.success());

    let sources: Vec<_> = json["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["source"].as_str().unwrap())
        .collect();
    assert_eq!(
        sources,
        vec![
            "segment",
            "mixpanel",
            "amplitude",
            "rudderstack",
            "posthog",
            "posthog",
            "snowplow",
            "custom",
            "custom",
        ]
    );

    let segment = record(&json, "User Signed Up").expect("segment record");
    assert_eq!(segment["file"], json!("app/main.py"));
    assert_eq!(segment["line"], json!(11));
    assert_eq!(segment["function"], json!("segment_track"));
    assert_eq!(
        segment["userId"],
        json!({ "unresolved": "user_id", "type": "string" })
    );
    assert_eq!(segment["properties"]["is_free_trial"], json!(true));

    let cancelled = record(&json, "user_cancelled_subscription").expect("posthog record");
    assert_eq!(cancelled["line"], json!(56));
    assert_eq!(
        cancelled["properties"],
        json!({ "method": { "unresolved": "method", "type": "string" } })
    );

    let amplitude = record(&json, "Button Clicked").expect("amplitude record");
    assert_eq!(amplitude["properties"]["color"], json!("red"));

    let snowplow = record(&json, "add-to-basket").expect("snowplow record");
    assert_eq!(snowplow["properties"]["label"], json!("web-shop"));

    let custom = record(&json, "custom_event").expect("custom record");
    assert_eq!(custom["userId"], json!("user999"));
    assert_eq!(custom["properties"]["nested"], json!({ "a": [1, 2, 3] }));

    let custom3 = record(&json, "custom_event3").expect("custom record");
    assert_eq!(
        custom3["incidental"],
        json!([{ "position": 2, "value": "user@example.com" }])
    );
    Ok(())
}

#[test]
fn test_javascript_records_in_source_order() -> Result<()> {
    let test = CliTest::with_file("web/main.js", JS_FIXTURE)?;

    let (output, json) = test.scan_json(&[
        "--custom-function",
        "trackEvent(userId, EVENT_NAME, PROPERTIES)",
    ])?;
    assert!(output.status.success());

    let lines: Vec<_> = json["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| (r["source"].as_str().unwrap(), r["line"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("mixpanel", 11),
            ("googleanalytics", 12),
            ("posthog", 17),
            ("custom", 22),
            ("mixpanel", 26),
        ]
    );

    let signed_up = record(&json, "Signed Up").unwrap();
    assert_eq!(signed_up["file"], json!("web/main.js"));
    assert_eq!(signed_up["function"], json!("onSignUp"));
    assert_eq!(signed_up["properties"]["plan"], json!("pro"));

    let purchase = record(&json, "purchase").unwrap();
    assert_eq!(
        purchase["properties"],
        json!({ "value": 9.99, "currency": "USD" })
    );
    Ok(())
}

#[test]
fn test_variable_event_name_is_unresolved() -> Result<()> {
    let test = CliTest::with_file("main.js", JS_FIXTURE)?;

    let (output, json) = test.scan_json(&[])?;
    assert!(output.status.success());

    let unresolved = json["records"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["event"]["unresolved"] == json!("eventName"))
        .expect("unresolved record");
    assert_eq!(unresolved["source"], json!("mixpanel"));
    assert_eq!(unresolved["properties"], json!({ "source": "web" }));
    assert_eq!(json["diagnostics"], json!([]));
    Ok(())
}

#[test]
fn test_unmatched_diagnostics_are_warnings() -> Result<()> {
    let test = CliTest::with_file("main.js", JS_FIXTURE)?;

    let (output, json) = test.scan_json(&["--include-unmatched-diagnostics"])?;
    assert!(output.status.success());

    let diagnostics = json["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["rule"], json!("unresolved-event"));
    assert_eq!(diagnostics[0]["severity"], json!("warning"));
    assert_eq!(diagnostics[0]["line"], json!(26));
    Ok(())
}

#[test]
fn test_parse_error_does_not_stop_scan() -> Result<()> {
    let test = CliTest::with_file("main.go", GO_FIXTURE)?;
    test.write_file("broken.go", "package main\n\nfunc (\n")?;

    let (output, json) = test.scan_json(&[])?;
    assert_eq!(output.status.code(), Some(1));

    assert!(record(&json, "Signed Up").is_some());
    assert_eq!(json["filesScanned"], json!(2));
    assert_eq!(json["filesFailed"], json!(1));
    assert_eq!(json["diagnostics"][0]["rule"], json!("parse-error"));
    assert_eq!(json["diagnostics"][0]["file"], json!("broken.go"));

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("1 file(s) could not be parsed (use -v for details)"));
    Ok(())
}

#[test]
fn test_text_report() -> Result<()> {
    let test = CliTest::with_file("main.go", GO_FIXTURE)?;

    let output = test.scan_command().output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("segment: \"Signed Up\""));
    assert!(stdout.contains("--> main.go:29:2"));
    assert!(stdout.contains("= note: properties { plan: \"Enterprise\", is_free_trial: true }"));
    assert!(stdout.contains("in 1 file"));
    Ok(())
}

#[test]
fn test_schema_output_file() -> Result<()> {
    let test = CliTest::with_file("main.go", GO_FIXTURE)?;

    let output = test
        .scan_command()
        .args(["--format", "schema", "--output", "out/tracking-schema.yaml"])
        .output()?;
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let yaml: serde_yaml::Value = serde_yaml::from_str(&test.read_file("out/tracking-schema.yaml")?)?;
    assert_eq!(yaml["version"].as_u64(), Some(1));

    let signed_up = &yaml["events"]["Signed Up"];
    assert_eq!(
        signed_up["implementations"][0]["destination"].as_str(),
        Some("segment")
    );
    assert_eq!(
        signed_up["implementations"][0]["function"].as_str(),
        Some("segmentTrack")
    );
    assert_eq!(
        signed_up["properties"]["is_free_trial"]["type"].as_str(),
        Some("boolean")
    );
    Ok(())
}

#[test]
fn test_languages_config_limits_scan() -> Result<()> {
    let test = CliTest::with_file("main.go", GO_FIXTURE)?;
    test.write_file("web/main.js", JS_FIXTURE)?;
    test.write_file(".trackscanrc.json", r#"{ "languages": ["javascript"] }"#)?;

    let (_, json) = test.scan_json(&[])?;
    assert_eq!(json["filesScanned"], json!(1));
    assert!(record(&json, "Signed Up").is_some_and(|r| r["source"] == json!("mixpanel")));
    Ok(())
}

#[test]
fn test_invalid_custom_function_is_a_usage_error() -> Result<()> {
    let test = CliTest::with_file("main.go", GO_FIXTURE)?;

    let output = test
        .scan_command()
        .args(["--custom-function", "track(userId, PROPERTIES)"])
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8(output.stderr)?.contains("customFunctions"));
    Ok(())
}

#[test]
fn test_no_command_prints_help() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.command().output()?;
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)?.contains("Usage: trackscan"));
    Ok(())
}

#[test]
fn test_output_is_deterministic() -> Result<()> {
    let test = CliTest::with_file("main.go", GO_FIXTURE)?;
    test.write_file("web/main.js", JS_FIXTURE)?;

    let first = test.scan_command().args(["--format", "json"]).output()?;
    let second = test.scan_command().args(["--format", "json", "-j", "1"]).output()?;
    assert_eq!(first.stdout, second.stdout);
    Ok(())
}
