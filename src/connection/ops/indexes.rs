//! Index metadata operations for MongoDB collections.

use std::collections::HashMap;

use chrono::DateTime;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::{Client, Collection, IndexModel};

use crate::analysis::{IndexDescriptor, IndexKey, IndexKind, IndexUsage};
use crate::bson::DocumentValue;
use crate::connection::{ConnectionManager, Namespace};
use crate::error::Result;

use super::bson_to_u64;

impl ConnectionManager {
    /// List indexes with `$indexStats` usage counters where available (runs in Tokio runtime).
    ///
    /// Deployments that reject `$indexStats` still return their indexes, without usage.
    pub fn list_index_descriptors(
        &self,
        client: &Client,
        namespace: &Namespace,
    ) -> Result<Vec<IndexDescriptor>> {
        let client = client.clone();
        let namespace = namespace.clone();

        self.runtime.block_on(async move {
            let coll =
                client.database(&namespace.database).collection::<Document>(&namespace.collection);
            let indexes: Vec<IndexModel> = coll.list_indexes().await?.try_collect().await?;

            let usage = match index_usage(&coll).await {
                Ok(usage) => usage,
                Err(e) => {
                    log::warn!("Index usage statistics unavailable for {namespace}: {e}");
                    HashMap::new()
                }
            };

            Ok(indexes
                .into_iter()
                .map(|model| {
                    let mut descriptor = descriptor_from_model(model);
                    descriptor.usage = usage.get(&descriptor.name).cloned();
                    descriptor
                })
                .collect())
        })
    }
}

async fn index_usage(coll: &Collection<Document>) -> Result<HashMap<String, IndexUsage>> {
    let stats: Vec<Document> =
        coll.aggregate(vec![doc! { "$indexStats": {} }]).await?.try_collect().await?;
    Ok(stats.iter().filter_map(usage_from_stats).collect())
}

fn usage_from_stats(stats: &Document) -> Option<(String, IndexUsage)> {
    let name = stats.get_str("name").ok()?.to_string();
    let accesses = stats.get_document("accesses").ok()?;
    let ops = accesses.get("ops").and_then(bson_to_u64).unwrap_or(0);
    let since = match accesses.get("since") {
        Some(Bson::DateTime(dt)) => DateTime::from_timestamp_millis(dt.timestamp_millis()),
        _ => None,
    };
    Some((name, IndexUsage { ops, since }))
}

fn descriptor_from_model(model: IndexModel) -> IndexDescriptor {
    let options = model.options.unwrap_or_default();
    let key_pattern = model
        .keys
        .iter()
        .map(|(field, value)| IndexKey {
            field: field.to_string(),
            kind: IndexKind::from_spec(&DocumentValue::from(value)),
        })
        .collect::<Vec<_>>();
    let name = options.name.unwrap_or_else(|| default_index_name(&key_pattern));

    IndexDescriptor {
        name,
        key_pattern,
        unique: options.unique.unwrap_or(false),
        sparse: options.sparse.unwrap_or(false),
        usage: None,
    }
}

/// Server-style generated name, e.g. `email_1_createdAt_-1`.
fn default_index_name(keys: &[IndexKey]) -> String {
    keys.iter()
        .map(|key| {
            let suffix = match &key.kind {
                IndexKind::Ascending => "1",
                IndexKind::Descending => "-1",
                IndexKind::Text => "text",
                IndexKind::Hashed => "hashed",
                IndexKind::Geo2d => "2d",
                IndexKind::Geo2dSphere => "2dsphere",
                IndexKind::Other(other) => other.as_str(),
            };
            format!("{}_{suffix}", key.field)
        })
        .collect::<Vec<_>>()
        .join("_")
}
