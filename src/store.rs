//! Document store collaborators the engine samples from.
//!
//! [`DocumentStore`] is the seam between the pure schema/analysis code and a live
//! deployment. [`MongoStore`] talks to MongoDB through [`ConnectionManager`];
//! [`MemoryStore`] holds collections in memory for offline analysis and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mongodb::Client;
use parking_lot::RwLock;

use crate::analysis::{IndexDescriptor, QuerySample};
use crate::bson::DocumentValue;
use crate::connection::{ConnectionManager, Namespace};
use crate::error::{Error, Result};

/// Read-only access to collections, their indexes and their query traffic.
///
/// Every call names its collection explicitly. Implementations are shared behind
/// `Arc` and must be safe to call from several threads.
pub trait DocumentStore: Send + Sync {
    fn collection_exists(&self, namespace: &Namespace) -> Result<bool>;

    /// Collection names in `database`, sorted case-insensitively.
    fn list_collections(&self, database: &str) -> Result<Vec<String>>;

    /// Up to `size` documents, approximately random. Fewer when the collection is smaller.
    fn sample(&self, namespace: &Namespace, size: u64) -> Result<Vec<DocumentValue>>;

    /// Indexes with usage counters when the deployment reports them.
    fn list_indexes(&self, namespace: &Namespace) -> Result<Vec<IndexDescriptor>>;

    /// Queries against the collection seen during `window`.
    fn observe_queries(&self, namespace: &Namespace, window: Duration) -> Result<Vec<QuerySample>>;
}

/// MongoDB-backed store. Blocking calls run on the manager's runtime.
pub struct MongoStore {
    manager: Arc<ConnectionManager>,
    client: Client,
}

impl MongoStore {
    pub fn new(manager: Arc<ConnectionManager>, client: Client) -> Self {
        Self { manager, client }
    }

    /// Create a manager, connect and ping.
    pub fn connect(uri: &str, timeout: Duration) -> Result<Self> {
        let manager = Arc::new(ConnectionManager::new()?);
        let client = manager.connect(uri, timeout)?;
        Ok(Self::new(manager, client))
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl DocumentStore for MongoStore {
    fn collection_exists(&self, namespace: &Namespace) -> Result<bool> {
        self.manager.collection_exists(&self.client, namespace)
    }

    fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.manager.list_collections(&self.client, database)
    }

    fn sample(&self, namespace: &Namespace, size: u64) -> Result<Vec<DocumentValue>> {
        let docs = self.manager.sample_for_schema(&self.client, namespace, size)?;
        Ok(docs.into_iter().map(DocumentValue::from).collect())
    }

    fn list_indexes(&self, namespace: &Namespace) -> Result<Vec<IndexDescriptor>> {
        self.manager.list_index_descriptors(&self.client, namespace)
    }

    fn observe_queries(&self, namespace: &Namespace, window: Duration) -> Result<Vec<QuerySample>> {
        self.manager.observe_queries(&self.client, namespace, window)
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryCollection {
    documents: Vec<DocumentValue>,
    indexes: Vec<IndexDescriptor>,
    queries: Vec<QuerySample>,
}

/// In-memory store. Sampling is deterministic: the first `size` documents in
/// insertion order. Observation returns the recorded queries immediately.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Namespace, MemoryCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(self, namespace: Namespace, documents: Vec<DocumentValue>) -> Self {
        self.insert_documents(&namespace, documents);
        self
    }

    pub fn with_indexes(self, namespace: Namespace, indexes: Vec<IndexDescriptor>) -> Self {
        self.collections.write().entry(namespace).or_default().indexes = indexes;
        self
    }

    pub fn with_queries(self, namespace: Namespace, queries: Vec<QuerySample>) -> Self {
        self.collections.write().entry(namespace).or_default().queries = queries;
        self
    }

    /// Append documents, creating the collection if needed.
    pub fn insert_documents(&self, namespace: &Namespace, documents: Vec<DocumentValue>) {
        self.collections
            .write()
            .entry(namespace.clone())
            .or_default()
            .documents
            .extend(documents);
    }

    /// Returns `true` if the collection existed.
    pub fn drop_collection(&self, namespace: &Namespace) -> bool {
        self.collections.write().remove(namespace).is_some()
    }

    fn read<T>(
        &self,
        namespace: &Namespace,
        f: impl FnOnce(&MemoryCollection) -> T,
    ) -> Result<T> {
        self.collections
            .read()
            .get(namespace)
            .map(f)
            .ok_or_else(|| Error::NotFound(namespace.to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn collection_exists(&self, namespace: &Namespace) -> Result<bool> {
        Ok(self.collections.read().contains_key(namespace))
    }

    fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .keys()
            .filter(|ns| ns.database == database)
            .map(|ns| ns.collection.clone())
            .collect();
        names.sort_unstable_by_key(|name| name.to_lowercase());
        Ok(names)
    }

    fn sample(&self, namespace: &Namespace, size: u64) -> Result<Vec<DocumentValue>> {
        self.read(namespace, |coll| {
            coll.documents.iter().take(size as usize).cloned().collect()
        })
    }

    fn list_indexes(&self, namespace: &Namespace) -> Result<Vec<IndexDescriptor>> {
        self.read(namespace, |coll| coll.indexes.clone())
    }

    fn observe_queries(
        &self,
        namespace: &Namespace,
        _window: Duration,
    ) -> Result<Vec<QuerySample>> {
        self.read(namespace, |coll| coll.queries.clone())
    }
}
