//! Integration tests for settings and output serialization.
//!
//! No MongoDB container needed — pure serialization/deserialization tests.

use schemango::bson::DocumentValue;
use schemango::schema::{
    FieldStatistic, SchemaSnapshot, TypeTag, ValidatorStrictness, diff_schemas,
    synthesize_validator,
};
use schemango::settings::EngineSettings;
use serde_json::json;

fn snapshot(collection: &str, fields: Vec<FieldStatistic>) -> SchemaSnapshot {
    SchemaSnapshot::new("shop", collection, 4, fields)
}

// =============================================================================
// Settings files — missing sections and fields use defaults
// =============================================================================

#[test]
fn test_settings_deserialize_missing_sections() {
    let raw = r#"{
        "validator": { "strictness": "relaxed" },
        "cache": { "enabled": false }
    }"#;

    let settings: EngineSettings = serde_json::from_str(raw).expect("should deserialize");
    assert_eq!(settings.validator.strictness, ValidatorStrictness::Relaxed);
    assert!(!settings.cache.enabled);
    assert_eq!(settings.cache.ttl_seconds, 300);
    assert_eq!(settings.sampling.sample_size, 1000);
    assert_eq!(settings.observation.observe_seconds, 10);
}

#[test]
fn test_settings_roundtrip() {
    let mut settings = EngineSettings::default();
    settings.sampling.array_element_samples = 3;
    settings.analysis.slow_query_millis = 25;

    let json = serde_json::to_string(&settings).expect("should serialize");
    let decoded: EngineSettings = serde_json::from_str(&json).expect("should deserialize");

    assert_eq!(decoded.sampling.array_element_samples, 3);
    assert_eq!(decoded.analysis.slow_query_millis, 25);
}

// =============================================================================
// ValidatorStrictness — parse/label roundtrip
// =============================================================================

#[test]
fn test_strictness_label_roundtrip() {
    for strictness in ValidatorStrictness::all() {
        let restored: ValidatorStrictness = strictness.label().parse().expect("should parse");
        assert_eq!(restored, *strictness);
    }
    assert_eq!("STRICT".parse::<ValidatorStrictness>().ok(), Some(ValidatorStrictness::Strict));
    assert!("lenient".parse::<ValidatorStrictness>().is_err());
}

// =============================================================================
// Output field names
// =============================================================================

#[test]
fn test_snapshot_json_field_names() {
    let snapshot = snapshot(
        "users",
        vec![FieldStatistic::new("age", [TypeTag::Number, TypeTag::String], 3, 4, DocumentValue::Number(30.0))],
    );

    let value = serde_json::to_value(&snapshot).expect("should serialize");
    assert_eq!(value["collectionName"], "users");
    assert_eq!(value["sampleSize"], 4);
    assert_eq!(value["depthLimited"], false);
    assert_eq!(
        value["fields"][0],
        json!({
            "path": "age",
            "observedTypes": ["number", "string"],
            "occurrenceCount": 3,
            "coveragePercent": 75,
            "exampleValue": 30,
        })
    );
}

#[test]
fn test_diff_and_validator_json_field_names() {
    let a = snapshot("a", vec![FieldStatistic::new("name", [TypeTag::String], 4, 4, DocumentValue::Null)]);
    let b = snapshot("b", vec![FieldStatistic::new("name", [TypeTag::Number], 4, 4, DocumentValue::Null)]);

    let diff = serde_json::to_value(diff_schemas(&a, &b)).expect("should serialize");
    assert_eq!(diff["sourceName"], "shop.a");
    assert_eq!(diff["typeMismatches"][0]["sourceTypes"], json!(["string"]));
    assert_eq!(diff["summary"]["mismatchCount"], 1);

    let validator =
        serde_json::to_value(synthesize_validator(&a, ValidatorStrictness::Relaxed)).expect("should serialize");
    assert_eq!(validator["strictness"], "relaxed");
    assert_eq!(validator["validationAction"], "warn");
    assert_eq!(validator["validator"]["$jsonSchema"]["required"], json!(["name"]));
}
