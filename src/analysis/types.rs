//! Index metadata, query samples and analysis report types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bson::DocumentValue;
use crate::schema::TypeTag;

/// Name of the primary identity index, never reported as unused.
pub const PRIMARY_INDEX_NAME: &str = "_id_";

/// Kind of one index key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexKind {
    Ascending,
    Descending,
    Text,
    Hashed,
    #[serde(rename = "2d")]
    Geo2d,
    #[serde(rename = "2dsphere")]
    Geo2dSphere,
    Other(String),
}

impl IndexKind {
    /// Interpret a key-pattern value: numeric direction or index type name.
    pub fn from_spec(value: &DocumentValue) -> Self {
        match value {
            DocumentValue::Number(n) if *n < 0.0 => IndexKind::Descending,
            DocumentValue::Number(_) => IndexKind::Ascending,
            DocumentValue::String(kind) => match kind.as_str() {
                "text" => IndexKind::Text,
                "hashed" => IndexKind::Hashed,
                "2d" => IndexKind::Geo2d,
                "2dsphere" => IndexKind::Geo2dSphere,
                other => IndexKind::Other(other.to_string()),
            },
            other => IndexKind::Other(serde_json::to_string(other).unwrap_or_default()),
        }
    }
}

/// Index access counters as reported by `$indexStats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexUsage {
    pub ops: u64,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexKey {
    pub field: String,
    pub kind: IndexKind,
}

/// An existing index on a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDescriptor {
    pub name: String,
    /// Keys in index order.
    pub key_pattern: Vec<IndexKey>,
    pub unique: bool,
    pub sparse: bool,
    /// `None` when usage statistics are unavailable.
    pub usage: Option<IndexUsage>,
}

impl IndexDescriptor {
    /// Single- or multi-key ascending index without usage data.
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            key_pattern: fields
                .into_iter()
                .map(|field| IndexKey { field: field.into(), kind: IndexKind::Ascending })
                .collect(),
            unique: false,
            sparse: false,
            usage: None,
        }
    }

    pub fn with_usage(mut self, ops: u64) -> Self {
        self.usage = Some(IndexUsage { ops, since: None });
        self
    }

    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_INDEX_NAME
    }

    pub fn key_fields(&self) -> impl Iterator<Item = &str> {
        self.key_pattern.iter().map(|key| key.field.as_str())
    }

    pub fn leading_field(&self) -> Option<&str> {
        self.key_pattern.first().map(|key| key.field.as_str())
    }

    /// The key field set contains every one of `fields`.
    pub fn covers<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> bool {
        let keys: BTreeSet<&str> = self.key_fields().collect();
        fields.into_iter().all(|field| keys.contains(field))
    }
}

/// One observed query against a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySample {
    pub filter_fields: Vec<String>,
    pub filter_text: String,
    pub execution_millis: u64,
    /// Execution strategy, e.g. `COLLSCAN` or `IXSCAN { email: 1 }`.
    pub scan_type: String,
    pub timestamp: DateTime<Utc>,
}

impl QuerySample {
    /// Build a sample from a query filter, deriving its field list and text form.
    pub fn from_filter(
        filter: &DocumentValue,
        execution_millis: u64,
        scan_type: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            filter_fields: filter_fields(filter),
            filter_text: serde_json::to_string(filter).unwrap_or_default(),
            execution_millis,
            scan_type: scan_type.into(),
            timestamp,
        }
    }
}

/// Field names referenced by a query filter, in first-seen order.
///
/// Logical operators (`$and`, `$or`, `$nor`) are flattened; other `$`-prefixed keys are
/// skipped.
pub fn filter_fields(filter: &DocumentValue) -> Vec<String> {
    fn collect(filter: &DocumentValue, out: &mut Vec<String>) {
        let Some(fields) = filter.as_object() else {
            return;
        };
        for (key, value) in fields {
            if matches!(key.as_str(), "$and" | "$or" | "$nor") {
                for clause in value.as_array().unwrap_or_default() {
                    collect(clause, out);
                }
            } else if !key.starts_with('$') && !out.contains(key) {
                out.push(key.clone());
            }
        }
    }

    let mut out = Vec::new();
    collect(filter, &mut out);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecommendationRationale {
    /// Backed by slow queries observed on the collection.
    Observed,
    /// Derived from field naming conventions only.
    Heuristic,
}

/// A suggested index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecommendation {
    pub fields: Vec<String>,
    pub rationale: RecommendationRationale,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_millis: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<usize>,
}

/// Uncovered slow queries sharing one filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPattern {
    pub filter_text: String,
    pub fields: Vec<String>,
    pub occurrences: usize,
    pub average_millis: f64,
    pub scan_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnusedReason {
    /// No usage statistics were reported for the index.
    NoUsageStats,
    ZeroOps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnusedIndex {
    pub name: String,
    pub fields: Vec<String>,
    pub reason: UnusedReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SchemaRiskKind {
    /// Example array longer than the configured threshold.
    LargeArray { length: usize },
    /// More than one non-null type observed.
    MixedTypes { types: BTreeSet<TypeTag> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRisk {
    pub path: String,
    #[serde(flatten)]
    pub kind: SchemaRiskKind,
}

/// Findings of one query-pattern analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub collection: String,
    pub sample_size: u64,
    pub index_count: usize,
    /// At least one index reported usage statistics.
    pub usage_stats_available: bool,
    pub observed_query_count: usize,
    pub unused_indexes: Vec<UnusedIndex>,
    pub query_patterns: Vec<QueryPattern>,
    pub recommendations: Vec<IndexRecommendation>,
    pub schema_risks: Vec<SchemaRisk>,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn unused_index_names(&self) -> impl Iterator<Item = &str> {
        self.unused_indexes.iter().map(|index| index.name.as_str())
    }
}
