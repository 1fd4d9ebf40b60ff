//! Schema sampling operations.

use futures::TryStreamExt;
use mongodb::Client;
use mongodb::bson::{Document, doc};

use crate::connection::{ConnectionManager, Namespace};
use crate::error::Result;

impl ConnectionManager {
    /// Sample up to `sample_size` documents with server-side `$sample` (runs in Tokio runtime).
    pub fn sample_for_schema(
        &self,
        client: &Client,
        namespace: &Namespace,
        sample_size: u64,
    ) -> Result<Vec<Document>> {
        let client = client.clone();
        let namespace = namespace.clone();
        self.runtime.block_on(async move {
            let coll =
                client.database(&namespace.database).collection::<Document>(&namespace.collection);

            let pipeline = vec![doc! { "$sample": { "size": sample_size as i64 } }];
            let cursor = coll.aggregate(pipeline).await?;
            let docs: Vec<Document> = cursor.try_collect().await?;
            log::debug!("Sampled {} of {sample_size} documents from {namespace}", docs.len());
            Ok(docs)
        })
    }
}
