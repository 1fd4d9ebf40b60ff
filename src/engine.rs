//! Engine facade: sampling, caching and the pure schema/analysis functions behind one type.

use std::sync::Arc;
use std::time::Duration;

use crate::analysis::{self, AnalysisReport};
use crate::cache::SnapshotCache;
use crate::connection::Namespace;
use crate::error::{Error, Result};
use crate::schema::{
    FlattenOptions, SchemaDiff, SchemaSnapshot, ValidatorDocument, ValidatorStrictness,
    build_snapshot, diff_schemas, synthesize_validator,
};
use crate::settings::EngineSettings;
use crate::store::DocumentStore;

/// Schema inference, comparison, validator synthesis and query analysis over a store.
pub struct SchemaEngine<S: DocumentStore> {
    store: S,
    settings: EngineSettings,
    cache: Option<SnapshotCache>,
}

impl<S: DocumentStore> SchemaEngine<S> {
    pub fn new(store: S, settings: EngineSettings) -> Self {
        let cache = settings.cache.enabled.then(|| SnapshotCache::new(settings.cache.ttl()));
        Self { store, settings, cache }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn cache(&self) -> Option<&SnapshotCache> {
        self.cache.as_ref()
    }

    /// Sample the collection and infer its schema.
    ///
    /// `sample_size` defaults to the configured size. A cached snapshot for the same
    /// collection and size is returned while fresh.
    pub fn infer_schema(
        &self,
        namespace: &Namespace,
        sample_size: Option<u64>,
    ) -> Result<Arc<SchemaSnapshot>> {
        let sample_size = sample_size.unwrap_or(self.settings.sampling.sample_size).max(1);

        if let Some(cache) = &self.cache
            && let Some(snapshot) = cache.get(namespace, sample_size)
        {
            return Ok(snapshot);
        }

        if !self.store.collection_exists(namespace)? {
            return Err(Error::NotFound(namespace.to_string()));
        }

        let documents = self.store.sample(namespace, sample_size)?;
        if documents.is_empty() {
            return Err(Error::Empty(namespace.to_string()));
        }

        let options = FlattenOptions::from(&self.settings.sampling);
        let snapshot = Arc::new(build_snapshot(
            &namespace.database,
            &namespace.collection,
            &documents,
            &options,
        ));
        log::debug!(
            "Inferred {} fields for {namespace} from {} documents",
            snapshot.fields().len(),
            snapshot.sample_size()
        );

        if let Some(cache) = &self.cache {
            cache.insert(namespace, sample_size, snapshot.clone());
        }
        Ok(snapshot)
    }

    /// Infer both collections and diff `source` against `target`.
    pub fn compare_schemas(
        &self,
        source: &Namespace,
        target: &Namespace,
        sample_size: Option<u64>,
    ) -> Result<SchemaDiff> {
        let source = self.infer_schema(source, sample_size)?;
        let target = self.infer_schema(target, sample_size)?;
        Ok(diff_schemas(&source, &target))
    }

    /// Infer the collection and synthesize a validator. `strictness` defaults to the
    /// configured level.
    pub fn generate_validator(
        &self,
        namespace: &Namespace,
        strictness: Option<ValidatorStrictness>,
        sample_size: Option<u64>,
    ) -> Result<ValidatorDocument> {
        let snapshot = self.infer_schema(namespace, sample_size)?;
        let strictness = strictness.unwrap_or(self.settings.validator.strictness);
        Ok(synthesize_validator(&snapshot, strictness))
    }

    /// Analyze indexes and query traffic of the collection.
    ///
    /// Queries are observed for `window` (default from settings, clamped to the configured
    /// maximum). A zero window skips observation. Observation failures are logged and the
    /// analysis falls back to heuristics.
    pub fn analyze_query_patterns(
        &self,
        namespace: &Namespace,
        window: Option<Duration>,
    ) -> Result<AnalysisReport> {
        let snapshot = self.infer_schema(namespace, None)?;
        let indexes = self.store.list_indexes(namespace)?;

        let window = self.settings.observation.window(window);
        let samples = if window.is_zero() {
            Vec::new()
        } else {
            match self.store.observe_queries(namespace, window) {
                Ok(samples) => samples,
                Err(e) => {
                    log::warn!("Query observation on {namespace} failed, using heuristics: {e}");
                    Vec::new()
                }
            }
        };

        Ok(analysis::analyze_query_patterns(&snapshot, &indexes, &samples, &self.settings.analysis))
    }

    /// Forget cached snapshots of one collection, e.g. after writes, index changes,
    /// drops or renames.
    pub fn invalidate_collection(&self, namespace: &Namespace) {
        if let Some(cache) = &self.cache {
            cache.invalidate_collection(namespace);
        }
    }

    pub fn invalidate_database(&self, database: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate_database(database);
        }
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}
