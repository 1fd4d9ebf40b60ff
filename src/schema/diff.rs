//! Snapshot comparison.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::{FieldStatistic, SchemaSnapshot, TypeTag};

/// A common field whose type sets differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMismatch {
    pub path: String,
    pub source_types: BTreeSet<TypeTag>,
    pub target_types: BTreeSet<TypeTag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub source_field_count: usize,
    pub target_field_count: usize,
    pub common_field_count: usize,
    pub mismatch_count: usize,
}

/// Field-level difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDiff {
    pub source_name: String,
    pub target_name: String,
    /// In source discovery order.
    pub common_fields: Vec<String>,
    pub source_only_fields: Vec<String>,
    /// In target discovery order.
    pub target_only_fields: Vec<String>,
    pub type_mismatches: Vec<TypeMismatch>,
    pub summary: DiffSummary,
}

impl SchemaDiff {
    /// Both snapshots have the same paths with the same type sets.
    pub fn is_identical(&self) -> bool {
        self.source_only_fields.is_empty()
            && self.target_only_fields.is_empty()
            && self.type_mismatches.is_empty()
    }
}

/// Compare the field sets of `source` and `target`. Type sets are compared as sets.
pub fn diff_schemas(source: &SchemaSnapshot, target: &SchemaSnapshot) -> SchemaDiff {
    let target_fields: HashMap<&str, &FieldStatistic> =
        target.fields().iter().map(|f| (f.path.as_str(), f)).collect();
    let source_paths: BTreeSet<&str> = source.paths().collect();

    let mut common_fields = Vec::new();
    let mut source_only_fields = Vec::new();
    let mut type_mismatches = Vec::new();

    for field in source.fields() {
        match target_fields.get(field.path.as_str()) {
            Some(other) => {
                common_fields.push(field.path.clone());
                if field.observed_types != other.observed_types {
                    type_mismatches.push(TypeMismatch {
                        path: field.path.clone(),
                        source_types: field.observed_types.clone(),
                        target_types: other.observed_types.clone(),
                    });
                }
            }
            None => source_only_fields.push(field.path.clone()),
        }
    }

    let target_only_fields: Vec<String> = target
        .paths()
        .filter(|path| !source_paths.contains(path))
        .map(str::to_string)
        .collect();

    let summary = DiffSummary {
        source_field_count: source.fields().len(),
        target_field_count: target.fields().len(),
        common_field_count: common_fields.len(),
        mismatch_count: type_mismatches.len(),
    };

    SchemaDiff {
        source_name: source.qualified_name(),
        target_name: target.qualified_name(),
        common_fields,
        source_only_fields,
        target_only_fields,
        type_mismatches,
        summary,
    }
}
