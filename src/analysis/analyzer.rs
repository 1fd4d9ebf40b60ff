//! Index and schema findings from a snapshot, index metadata and query samples.

use chrono::Utc;

use crate::bson::{DocumentValue, leaf_name, strip_array_markers};
use crate::schema::{SchemaSnapshot, TypeTag};
use crate::settings::AnalysisSettings;

use super::types::{
    AnalysisReport, IndexDescriptor, IndexRecommendation, QueryPattern, QuerySample,
    RecommendationRationale, SchemaRisk, SchemaRiskKind, UnusedIndex, UnusedReason,
};

/// Leaf-name fragments that suggest a lookup key.
const KEY_LIKE_FRAGMENTS: &[&str] = &["id", "key", "date", "time"];
/// Leaf names commonly used in equality filters.
const KEY_LIKE_NAMES: &[&str] = &["email", "name", "status"];

/// Combine schema knowledge, index metadata and observed queries into findings.
///
/// Heuristic recommendations are only produced when `samples` is empty. Missing usage
/// statistics or samples reduce the findings but never fail the analysis.
pub fn analyze_query_patterns(
    snapshot: &SchemaSnapshot,
    indexes: &[IndexDescriptor],
    samples: &[QuerySample],
    settings: &AnalysisSettings,
) -> AnalysisReport {
    let (query_patterns, recommendations) = if samples.is_empty() {
        (Vec::new(), heuristic_recommendations(snapshot, indexes))
    } else {
        let patterns = slow_query_patterns(samples, indexes, settings);
        let recommendations = patterns.iter().map(observed_recommendation).collect();
        (patterns, recommendations)
    };

    AnalysisReport {
        collection: snapshot.qualified_name(),
        sample_size: snapshot.sample_size(),
        index_count: indexes.len(),
        usage_stats_available: indexes.iter().any(|index| index.usage.is_some()),
        observed_query_count: samples.len(),
        unused_indexes: unused_indexes(indexes),
        query_patterns,
        recommendations,
        schema_risks: schema_risks(snapshot, settings.large_array_threshold),
        generated_at: Utc::now(),
    }
}

/// Non-primary indexes with no recorded accesses.
pub fn unused_indexes(indexes: &[IndexDescriptor]) -> Vec<UnusedIndex> {
    indexes
        .iter()
        .filter(|index| !index.is_primary())
        .filter_map(|index| {
            let reason = match &index.usage {
                None => UnusedReason::NoUsageStats,
                Some(usage) if usage.ops == 0 => UnusedReason::ZeroOps,
                Some(_) => return None,
            };
            Some(UnusedIndex {
                name: index.name.clone(),
                fields: index.key_fields().map(str::to_string).collect(),
                reason,
            })
        })
        .collect()
}

/// Group slow samples no index covers by filter text, slowest average first.
pub fn slow_query_patterns(
    samples: &[QuerySample],
    indexes: &[IndexDescriptor],
    settings: &AnalysisSettings,
) -> Vec<QueryPattern> {
    struct PatternAccum<'a> {
        sample: &'a QuerySample,
        occurrences: usize,
        total_millis: u64,
        scan_types: Vec<String>,
    }

    let mut accums: Vec<PatternAccum<'_>> = Vec::new();
    for sample in samples {
        if sample.filter_fields.is_empty()
            || sample.execution_millis <= settings.slow_query_millis
        {
            continue;
        }
        let covered = indexes
            .iter()
            .any(|index| index.covers(sample.filter_fields.iter().map(String::as_str)));
        if covered {
            continue;
        }

        match accums.iter_mut().find(|a| a.sample.filter_text == sample.filter_text) {
            Some(accum) => {
                accum.occurrences += 1;
                accum.total_millis += sample.execution_millis;
                if !accum.scan_types.contains(&sample.scan_type) {
                    accum.scan_types.push(sample.scan_type.clone());
                }
            }
            None => accums.push(PatternAccum {
                sample,
                occurrences: 1,
                total_millis: sample.execution_millis,
                scan_types: vec![sample.scan_type.clone()],
            }),
        }
    }

    let mut patterns: Vec<QueryPattern> = accums
        .into_iter()
        .map(|accum| QueryPattern {
            filter_text: accum.sample.filter_text.clone(),
            fields: accum.sample.filter_fields.clone(),
            occurrences: accum.occurrences,
            average_millis: accum.total_millis as f64 / accum.occurrences as f64,
            scan_types: accum.scan_types,
        })
        .collect();

    patterns.sort_by(|a, b| b.average_millis.total_cmp(&a.average_millis));
    patterns.truncate(settings.top_pattern_limit);
    patterns
}

fn observed_recommendation(pattern: &QueryPattern) -> IndexRecommendation {
    IndexRecommendation {
        fields: pattern.fields.clone(),
        rationale: RecommendationRationale::Observed,
        source_filter: Some(pattern.filter_text.clone()),
        observed_millis: Some(pattern.average_millis),
        occurrences: Some(pattern.occurrences),
    }
}

/// Key-like fields that do not lead any existing index.
pub fn heuristic_recommendations(
    snapshot: &SchemaSnapshot,
    indexes: &[IndexDescriptor],
) -> Vec<IndexRecommendation> {
    let mut fields: Vec<String> = Vec::new();

    for field in snapshot.fields() {
        if field.path == "_id" || field.has_type(TypeTag::Object) {
            continue;
        }
        let leaf = leaf_name(&field.path).to_lowercase();
        let key_like = KEY_LIKE_FRAGMENTS.iter().any(|fragment| leaf.contains(fragment))
            || KEY_LIKE_NAMES.contains(&leaf.as_str());
        if !key_like {
            continue;
        }

        let index_field = strip_array_markers(&field.path);
        let indexed =
            indexes.iter().any(|index| index.leading_field() == Some(index_field.as_str()));
        if !indexed && !fields.contains(&index_field) {
            fields.push(index_field);
        }
    }

    fields
        .into_iter()
        .map(|field| IndexRecommendation {
            fields: vec![field],
            rationale: RecommendationRationale::Heuristic,
            source_filter: None,
            observed_millis: None,
            occurrences: None,
        })
        .collect()
}

/// Large example arrays and fields with mixed non-null types.
pub fn schema_risks(snapshot: &SchemaSnapshot, large_array_threshold: usize) -> Vec<SchemaRisk> {
    let mut risks = Vec::new();
    for field in snapshot.fields() {
        if field.has_type(TypeTag::Array)
            && let DocumentValue::Array(items) = &field.example_value
            && items.len() > large_array_threshold
        {
            risks.push(SchemaRisk {
                path: field.path.clone(),
                kind: SchemaRiskKind::LargeArray { length: items.len() },
            });
        }
        if field.is_polymorphic() {
            risks.push(SchemaRisk {
                path: field.path.clone(),
                kind: SchemaRiskKind::MixedTypes {
                    types: field
                        .observed_types
                        .iter()
                        .copied()
                        .filter(|t| *t != TypeTag::Null)
                        .collect(),
                },
            });
        }
    }
    risks
}
