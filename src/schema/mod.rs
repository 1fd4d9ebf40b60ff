//! Schema inference, comparison and validator synthesis.
//!
//! Sampled documents are flattened into dotted field paths, unified into per-path
//! statistics and frozen into a [`SchemaSnapshot`]. Snapshots are never mutated; the
//! differencer and the validator synthesizer only read them.

mod diff;
mod flatten;
mod infer;
mod validator;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bson::{DocumentValue, path_depth};

pub use diff::{DiffSummary, SchemaDiff, TypeMismatch, diff_schemas};
pub use flatten::{FieldPaths, FlattenOptions, collect_field_paths};
pub use infer::build_snapshot;
pub use validator::{
    ValidatorDocument, ValidatorStrictness, schema_types_for, synthesize_validator,
};

/// Observed value kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeTag {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
    ObjectRef,
    Timestamp,
    Undefined,
}

impl TypeTag {
    /// Classify a value. Checked in order: null, undefined, array, object reference,
    /// timestamp, then the primitive kinds.
    pub fn of(value: &DocumentValue) -> Self {
        match value {
            DocumentValue::Null => TypeTag::Null,
            DocumentValue::Undefined => TypeTag::Undefined,
            DocumentValue::Array(_) => TypeTag::Array,
            DocumentValue::ObjectReference(_) => TypeTag::ObjectRef,
            DocumentValue::Timestamp(_) => TypeTag::Timestamp,
            DocumentValue::Bool(_) => TypeTag::Boolean,
            DocumentValue::Number(_) => TypeTag::Number,
            DocumentValue::String(_) => TypeTag::String,
            DocumentValue::Object(_) => TypeTag::Object,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
            TypeTag::ObjectRef => "objectRef",
            TypeTag::Timestamp => "timestamp",
            TypeTag::Undefined => "undefined",
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// `round(100 * occurrences / sample_size)`, half away from zero. Zero for an empty sample.
pub fn coverage_percent(occurrences: u64, sample_size: u64) -> u32 {
    if sample_size == 0 {
        return 0;
    }
    (occurrences as f64 * 100.0 / sample_size as f64).round() as u32
}

/// Inferred statistics for one field path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStatistic {
    pub path: String,
    pub observed_types: BTreeSet<TypeTag>,
    pub occurrence_count: u64,
    pub coverage_percent: u32,
    /// First non-null value seen, `Null` when only nulls were observed.
    pub example_value: DocumentValue,
}

impl FieldStatistic {
    pub fn new(
        path: impl Into<String>,
        observed_types: impl IntoIterator<Item = TypeTag>,
        occurrence_count: u64,
        sample_size: u64,
        example_value: DocumentValue,
    ) -> Self {
        let occurrence_count = occurrence_count.min(sample_size);
        Self {
            path: path.into(),
            observed_types: observed_types.into_iter().collect(),
            occurrence_count,
            coverage_percent: coverage_percent(occurrence_count, sample_size),
            example_value,
        }
    }

    pub fn has_type(&self, tag: TypeTag) -> bool {
        self.observed_types.contains(&tag)
    }

    /// More than one non-null type was observed.
    pub fn is_polymorphic(&self) -> bool {
        self.observed_types.iter().filter(|tag| **tag != TypeTag::Null).count() > 1
    }
}

/// Immutable summary of the inferred fields of one collection at one point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSnapshot {
    database: String,
    collection_name: String,
    sample_size: u64,
    fields: Vec<FieldStatistic>,
    depth_limited: bool,
    timestamp: DateTime<Utc>,
}

impl SchemaSnapshot {
    /// Assemble a snapshot from precomputed statistics. Duplicate paths keep their first entry.
    pub fn new(
        database: impl Into<String>,
        collection_name: impl Into<String>,
        sample_size: u64,
        fields: Vec<FieldStatistic>,
    ) -> Self {
        let mut seen = std::collections::HashSet::new();
        let fields = fields.into_iter().filter(|field| seen.insert(field.path.clone())).collect();
        Self {
            database: database.into(),
            collection_name: collection_name.into(),
            sample_size,
            fields,
            depth_limited: false,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn with_depth_limited(mut self, depth_limited: bool) -> Self {
        self.depth_limited = depth_limited;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// `database.collection`, or the bare collection name when no database is known.
    pub fn qualified_name(&self) -> String {
        if self.database.is_empty() {
            self.collection_name.clone()
        } else {
            format!("{}.{}", self.database, self.collection_name)
        }
    }

    /// Number of documents actually sampled.
    pub fn sample_size(&self) -> u64 {
        self.sample_size
    }

    /// Field statistics in discovery order.
    pub fn fields(&self) -> &[FieldStatistic] {
        &self.fields
    }

    pub fn field(&self, path: &str) -> Option<&FieldStatistic> {
        self.fields.iter().find(|field| field.path == path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.path.as_str())
    }

    /// The recursion guard cut off at least one sampled document.
    pub fn depth_limited(&self) -> bool {
        self.depth_limited
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn summary(&self) -> SnapshotSummary {
        let all_types: BTreeSet<TypeTag> =
            self.fields.iter().flat_map(|f| f.observed_types.iter().copied()).collect();
        SnapshotSummary {
            total_fields: self.fields.len(),
            total_types: all_types.len(),
            polymorphic_count: self.fields.iter().filter(|f| f.is_polymorphic()).count(),
            sparse_count: self.fields.iter().filter(|f| f.coverage_percent < 50).count(),
            complete_count: self
                .fields
                .iter()
                .filter(|f| self.sample_size > 0 && f.occurrence_count == self.sample_size)
                .count(),
            max_depth: self.fields.iter().map(|f| path_depth(&f.path)).max().unwrap_or(0),
        }
    }
}

/// Aggregate counters over a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub total_fields: usize,
    pub total_types: usize,
    pub polymorphic_count: usize,
    /// Fields present in fewer than half of the sampled documents.
    pub sparse_count: usize,
    pub complete_count: usize,
    pub max_depth: usize,
}
