//! `$jsonSchema` validator synthesis from inferred snapshots.

use std::collections::BTreeSet;
use std::str::FromStr;

use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::bson::{ARRAY_MARKER, is_top_level};
use crate::error::{Error, Result};

use super::{SchemaSnapshot, TypeTag};

/// How aggressively inferred structure becomes mandatory validation rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorStrictness {
    Strict,
    #[default]
    Moderate,
    Relaxed,
}

impl ValidatorStrictness {
    pub fn label(self) -> &'static str {
        match self {
            ValidatorStrictness::Strict => "strict",
            ValidatorStrictness::Moderate => "moderate",
            ValidatorStrictness::Relaxed => "relaxed",
        }
    }

    pub fn all() -> &'static [ValidatorStrictness] {
        &[ValidatorStrictness::Strict, ValidatorStrictness::Moderate, ValidatorStrictness::Relaxed]
    }

    /// Minimum coverage (inclusive) for a field to be required.
    pub fn required_coverage(self) -> u32 {
        match self {
            ValidatorStrictness::Strict => 90,
            ValidatorStrictness::Moderate => 75,
            ValidatorStrictness::Relaxed => 60,
        }
    }

    pub fn forbids_additional_properties(self) -> bool {
        matches!(self, ValidatorStrictness::Strict)
    }

    /// MongoDB `validationLevel` to pair with the validator.
    pub fn validation_level(self) -> &'static str {
        match self {
            ValidatorStrictness::Strict => "strict",
            ValidatorStrictness::Moderate | ValidatorStrictness::Relaxed => "moderate",
        }
    }

    /// MongoDB `validationAction` to pair with the validator.
    pub fn validation_action(self) -> &'static str {
        match self {
            ValidatorStrictness::Strict | ValidatorStrictness::Moderate => "error",
            ValidatorStrictness::Relaxed => "warn",
        }
    }
}

impl FromStr for ValidatorStrictness {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        ValidatorStrictness::all()
            .iter()
            .copied()
            .find(|s| s.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| Error::Parse(format!("unknown validator strictness '{value}'")))
    }
}

impl std::fmt::Display for ValidatorStrictness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A synthesized document validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorDocument {
    pub collection: String,
    pub strictness: ValidatorStrictness,
    /// `{ "$jsonSchema": { ... } }`
    pub validator: Value,
    pub required: Vec<String>,
    pub validation_level: String,
    pub validation_action: String,
}

impl ValidatorDocument {
    /// The inner `$jsonSchema` object.
    pub fn json_schema(&self) -> &Value {
        &self.validator["$jsonSchema"]
    }

    /// `collMod` command applying this validator to `collection`.
    pub fn to_coll_mod(&self) -> Result<Document> {
        let validator = mongodb::bson::to_document(&self.validator)
            .map_err(|e| Error::Parse(format!("validator is not a BSON document: {e}")))?;
        Ok(doc! {
            "collMod": self.collection.as_str(),
            "validator": validator,
            "validationLevel": self.validation_level.as_str(),
            "validationAction": self.validation_action.as_str(),
        })
    }
}

/// MongoDB `bsonType` identifiers accepted for an observed type. `undefined` has none.
fn bson_types_for_tag(tag: TypeTag) -> &'static [&'static str] {
    match tag {
        TypeTag::Number => &["number", "double", "int"],
        TypeTag::Boolean => &["bool"],
        TypeTag::String => &["string"],
        TypeTag::Array => &["array"],
        TypeTag::Object => &["object"],
        TypeTag::Null => &["null"],
        TypeTag::Timestamp => &["date"],
        TypeTag::ObjectRef => &["objectId"],
        TypeTag::Undefined => &[],
    }
}

/// Map a type set to de-duplicated `bsonType` identifiers.
pub fn schema_types_for(types: &BTreeSet<TypeTag>) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for name in types.iter().flat_map(|tag| bson_types_for_tag(*tag).iter().copied()) {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// Build a document-level validator from the top-level fields of `snapshot`.
///
/// Nested paths are not emitted. A field is required when its coverage reaches the
/// strictness threshold and it was never observed as `null`.
pub fn synthesize_validator(
    snapshot: &SchemaSnapshot,
    strictness: ValidatorStrictness,
) -> ValidatorDocument {
    let threshold = strictness.required_coverage();
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in snapshot.fields().iter().filter(|f| is_top_level(&f.path)) {
        let name = field.path.trim_end_matches(ARRAY_MARKER).to_string();

        let mut property = Map::new();
        match schema_types_for(&field.observed_types).as_slice() {
            [] => {}
            [single] => {
                property.insert("bsonType".into(), (*single).into());
            }
            many => {
                property.insert("bsonType".into(), json!(many));
            }
        }
        properties.insert(name.clone(), Value::Object(property));

        if field.coverage_percent >= threshold && !field.has_type(TypeTag::Null) {
            required.push(name);
        }
    }

    let mut root = Map::new();
    root.insert("bsonType".into(), "object".into());
    if !required.is_empty() {
        root.insert("required".into(), json!(required));
    }
    root.insert("properties".into(), Value::Object(properties));
    if strictness.forbids_additional_properties() {
        root.insert("additionalProperties".into(), Value::Bool(false));
    }

    ValidatorDocument {
        collection: snapshot.collection_name().to_string(),
        strictness,
        validator: json!({ "$jsonSchema": Value::Object(root) }),
        required,
        validation_level: strictness.validation_level().to_string(),
        validation_action: strictness.validation_action().to_string(),
    }
}
