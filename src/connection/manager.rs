//! Core ConnectionManager struct and basic connection methods.

use std::time::Duration;

use mongodb::Client;
use mongodb::bson::doc;
use tokio::runtime::Runtime;

use crate::connection::Namespace;
use crate::error::{Error, Result};

/// Owns the Tokio runtime used to drive MongoDB calls from blocking code
pub struct ConnectionManager {
    /// Tokio runtime for MongoDB async operations
    pub(crate) runtime: Runtime,
}

impl ConnectionManager {
    /// Create a new connection manager
    pub fn new() -> Result<Self> {
        let runtime = Runtime::new()?;
        Ok(Self { runtime })
    }

    /// Get a handle to the Tokio runtime for spawning parallel tasks
    pub fn runtime_handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    /// Connect to MongoDB and verify the connection with a ping (runs in Tokio runtime)
    pub fn connect(&self, uri: &str, timeout: Duration) -> Result<Client> {
        let uri = uri.to_string();
        self.runtime.block_on(async {
            let fut = async {
                let client = Client::with_uri_str(&uri).await?;
                client.database("admin").run_command(doc! { "ping": 1 }).await?;
                Ok::<Client, mongodb::error::Error>(client)
            };

            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result.map_err(Error::from),
                Err(_) => Err(Error::Timeout("Connection timed out".to_string())),
            }
        })
    }

    /// Check whether a collection exists (runs in Tokio runtime)
    pub fn collection_exists(&self, client: &Client, namespace: &Namespace) -> Result<bool> {
        let client = client.clone();
        let namespace = namespace.clone();
        self.runtime.block_on(async {
            let db = client.database(&namespace.database);
            let names = db
                .list_collection_names()
                .filter(doc! { "name": namespace.collection.as_str() })
                .await?;
            Ok(!names.is_empty())
        })
    }

    /// List collection names in a database (runs in Tokio runtime)
    pub fn list_collections(&self, client: &Client, database: &str) -> Result<Vec<String>> {
        let client = client.clone();
        let database = database.to_string();
        self.runtime.block_on(async {
            let db = client.database(&database);
            let mut collections = db.list_collection_names().await?;
            collections.sort_unstable_by_key(|name| name.to_lowercase());
            Ok(collections)
        })
    }
}
