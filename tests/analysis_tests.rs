//! Integration tests for query-pattern analysis over the in-memory store.

mod common;

use std::time::Duration;

use common::fixtures::{self, query};
use schemango::analysis::{
    AnalysisReport, IndexDescriptor, QuerySample, RecommendationRationale, SchemaRiskKind,
    UnusedReason,
};
use schemango::bson::DocumentValue;
use schemango::connection::Namespace;
use schemango::settings::EngineSettings;
use schemango::{DocumentStore, Error, MemoryStore, Result, SchemaEngine};
use serde_json::json;

fn orders_ns() -> Namespace {
    Namespace::new("shop", "orders")
}

fn analyze(
    store: MemoryStore,
    settings: EngineSettings,
    window: Option<Duration>,
) -> AnalysisReport {
    SchemaEngine::new(store, settings)
        .analyze_query_patterns(&orders_ns(), window)
        .expect("Failed to analyze")
}

fn slow_queries() -> Vec<QuerySample> {
    vec![
        query(json!({ "status": "A" }), 500, "IXSCAN { status: 1 }"),
        query(json!({ "customer.email": "a@example.com" }), 400, "COLLSCAN"),
        query(json!({ "customer.email": "a@example.com" }), 200, "COLLSCAN"),
        query(json!({ "total": { "$gt": 5 } }), 150, "COLLSCAN"),
        query(json!({ "orderId": "o-1" }), 50, "COLLSCAN"),
    ]
}

fn all_rationale(report: &AnalysisReport, rationale: RecommendationRationale) -> bool {
    report.recommendations.iter().all(|r| r.rationale == rationale)
}

/// Store whose query observation always fails.
struct NoProfilerStore(MemoryStore);

impl DocumentStore for NoProfilerStore {
    fn collection_exists(&self, namespace: &Namespace) -> Result<bool> {
        self.0.collection_exists(namespace)
    }

    fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.0.list_collections(database)
    }

    fn sample(&self, namespace: &Namespace, size: u64) -> Result<Vec<DocumentValue>> {
        self.0.sample(namespace, size)
    }

    fn list_indexes(&self, namespace: &Namespace) -> Result<Vec<IndexDescriptor>> {
        self.0.list_indexes(namespace)
    }

    fn observe_queries(
        &self,
        _namespace: &Namespace,
        _window: Duration,
    ) -> Result<Vec<QuerySample>> {
        Err(Error::Timeout("profiler unavailable".into()))
    }
}

// =============================================================================
// Unused Index Tests
// =============================================================================

/// Test that an index with zero ops is unused and the primary index is never reported.
#[test]
fn test_unused_indexes_exclude_primary() {
    let store = MemoryStore::new().with_collection(orders_ns(), fixtures::orders()).with_indexes(
        orders_ns(),
        vec![
            IndexDescriptor::new("_id_", ["_id"]).with_usage(0),
            IndexDescriptor::new("email_1", ["email"]).with_usage(0),
            IndexDescriptor::new("orderId_1", ["orderId"]).with_usage(12),
        ],
    );

    let report = analyze(store, EngineSettings::default(), None);
    assert_eq!(report.unused_index_names().collect::<Vec<_>>(), ["email_1"]);
    assert_eq!(report.unused_indexes[0].reason, UnusedReason::ZeroOps);
    assert!(report.usage_stats_available);
    assert_eq!(report.index_count, 3);
}

/// Test that indexes without usage statistics are reported with that reason.
#[test]
fn test_unused_indexes_without_usage_stats() {
    let store = MemoryStore::new().with_collection(orders_ns(), fixtures::orders()).with_indexes(
        orders_ns(),
        vec![IndexDescriptor::new("_id_", ["_id"]), IndexDescriptor::new("status_1", ["status"])],
    );

    let report = analyze(store, EngineSettings::default(), None);
    assert!(!report.usage_stats_available);
    assert_eq!(report.unused_index_names().collect::<Vec<_>>(), ["status_1"]);
    assert_eq!(report.unused_indexes[0].reason, UnusedReason::NoUsageStats);
}

// =============================================================================
// Recommendation Tests
// =============================================================================

/// Test that slow uncovered queries are grouped and ranked by average time.
#[test]
fn test_observed_recommendations() {
    let store = MemoryStore::new()
        .with_collection(orders_ns(), fixtures::orders())
        .with_indexes(orders_ns(), vec![IndexDescriptor::new("status_1", ["status"])])
        .with_queries(orders_ns(), slow_queries());

    let report = analyze(store, EngineSettings::default(), None);
    assert_eq!(report.observed_query_count, 5);
    assert_eq!(report.query_patterns.len(), 2);

    let slowest = &report.query_patterns[0];
    assert_eq!(slowest.fields, ["customer.email"]);
    assert_eq!(slowest.occurrences, 2);
    assert_eq!(slowest.average_millis, 300.0);
    assert_eq!(slowest.scan_types, ["COLLSCAN"]);

    let fields: Vec<&str> = report.recommendations.iter().map(|r| r.fields[0].as_str()).collect();
    assert_eq!(fields, ["customer.email", "total"]);
    assert!(all_rationale(&report, RecommendationRationale::Observed));
    assert_eq!(report.recommendations[1].observed_millis, Some(150.0));
}

/// Test that the number of recommended patterns is capped.
#[test]
fn test_observed_recommendations_limit() {
    let store = MemoryStore::new()
        .with_collection(orders_ns(), fixtures::orders())
        .with_queries(orders_ns(), slow_queries());
    let mut settings = EngineSettings::default();
    settings.analysis.top_pattern_limit = 1;

    let report = analyze(store, settings, None);
    assert_eq!(report.recommendations.len(), 1);
    assert_eq!(report.recommendations[0].fields, ["status"]);
}

/// Test naming heuristics when no queries were observed.
#[test]
fn test_heuristic_recommendations() {
    let store = MemoryStore::new().with_collection(orders_ns(), fixtures::orders()).with_indexes(
        orders_ns(),
        vec![IndexDescriptor::new("_id_", ["_id"]), IndexDescriptor::new("status_1", ["status"])],
    );

    let report = analyze(store, EngineSettings::default(), None);
    assert!(report.query_patterns.is_empty());
    let fields: Vec<&str> = report.recommendations.iter().map(|r| r.fields[0].as_str()).collect();
    assert_eq!(fields, ["orderId", "customer.email"]);
    assert!(report.recommendations.iter().all(|r| {
        r.rationale == RecommendationRationale::Heuristic && r.observed_millis.is_none()
    }));
}

/// Test that a zero observation window skips the recorded queries.
#[test]
fn test_zero_window_uses_heuristics() {
    let store = MemoryStore::new()
        .with_collection(orders_ns(), fixtures::orders())
        .with_queries(orders_ns(), slow_queries());

    let report = analyze(store, EngineSettings::default(), Some(Duration::ZERO));
    assert_eq!(report.observed_query_count, 0);
    assert!(all_rationale(&report, RecommendationRationale::Heuristic));
}

/// Test that failed observation degrades to heuristics instead of failing.
#[test]
fn test_observation_failure_degrades() {
    let store = NoProfilerStore(
        MemoryStore::new()
            .with_collection(orders_ns(), fixtures::orders())
            .with_queries(orders_ns(), slow_queries()),
    );
    let engine = SchemaEngine::new(store, EngineSettings::default());

    let report = engine.analyze_query_patterns(&orders_ns(), None).expect("Failed to analyze");
    assert_eq!(report.observed_query_count, 0);
    assert!(!report.recommendations.is_empty());
    assert!(all_rationale(&report, RecommendationRationale::Heuristic));
}

// =============================================================================
// Schema Risk Tests
// =============================================================================

/// Test that long example arrays are flagged.
#[test]
fn test_large_array_risk() {
    let store = MemoryStore::new().with_collection(orders_ns(), fixtures::orders());
    let report = analyze(store, EngineSettings::default(), None);

    let tags = report.schema_risks.iter().find(|r| r.path == "tags").expect("tags not flagged");
    assert_eq!(tags.kind, SchemaRiskKind::LargeArray { length: 120 });
    assert!(report.schema_risks.iter().all(|r| r.path != "items"));
}

/// Test that fields with several non-null types are flagged.
#[test]
fn test_mixed_type_risk() {
    let ns = Namespace::new("hr", "people");
    let engine = SchemaEngine::new(
        MemoryStore::new().with_collection(ns.clone(), fixtures::people()),
        EngineSettings::default(),
    );

    let report = engine.analyze_query_patterns(&ns, None).unwrap();
    assert_eq!(report.schema_risks.len(), 1);
    assert_eq!(report.schema_risks[0].path, "age");
    assert!(matches!(report.schema_risks[0].kind, SchemaRiskKind::MixedTypes { .. }));

    let json = serde_json::to_value(&report.schema_risks[0]).unwrap();
    assert_eq!(json, json!({ "path": "age", "kind": "mixedTypes", "types": ["number", "string"] }));
}

/// Test that analysis of a missing collection fails like inference.
#[test]
fn test_analyze_missing_collection() {
    let engine = SchemaEngine::new(MemoryStore::new(), EngineSettings::default());
    let result = engine.analyze_query_patterns(&orders_ns(), None);
    assert!(matches!(result, Err(Error::NotFound(_))));
}
