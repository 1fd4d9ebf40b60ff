//! Query observation through the database profiler.
//!
//! Raising the profiling level is server-wide state for the database. It is held by a
//! [`ProfilerGuard`] so the previous level is restored on every exit path.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::{Client, Database};

use crate::analysis::QuerySample;
use crate::bson::DocumentValue;
use crate::connection::{ConnectionManager, Namespace};
use crate::error::{Error, Result};

use super::bson_to_u64;

/// Profiling level that records every operation.
const PROFILE_ALL: i32 = 2;
/// Extra time allowed on top of the window for enabling, reading and restoring.
const OBSERVE_GRACE: Duration = Duration::from_secs(5);
const PROFILED_OPS: [&str; 3] = ["query", "update", "remove"];

/// Profiler state as reported by the `profile` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProfilerSettings {
    pub level: i32,
    pub slow_ms: i64,
}

impl ProfilerSettings {
    fn from_reply(reply: &Document) -> Self {
        Self {
            level: reply.get("was").and_then(bson_to_u64).map(|v| v as i32).unwrap_or(0),
            slow_ms: reply.get("slowms").and_then(bson_to_u64).map(|v| v as i64).unwrap_or(100),
        }
    }
}

/// Elevated profiling on one database. Restores the previous settings when released,
/// or from `Drop` on the current runtime if the holder is cancelled or fails first.
pub struct ProfilerGuard {
    database: Database,
    previous: ProfilerSettings,
    released: bool,
}

impl ProfilerGuard {
    /// Record every operation on `database` until released.
    pub async fn acquire(database: Database) -> Result<Self> {
        let reply = database.run_command(doc! { "profile": PROFILE_ALL }).await?;
        let previous = ProfilerSettings::from_reply(&reply);
        log::debug!(
            "Profiler on '{}' raised from level {} to {PROFILE_ALL}",
            database.name(),
            previous.level
        );
        Ok(Self { database, previous, released: false })
    }

    pub fn previous(&self) -> ProfilerSettings {
        self.previous
    }

    /// Restore the previous profiler settings.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        restore(&self.database, self.previous).await
    }
}

impl Drop for ProfilerGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let database = self.database.clone();
        let previous = self.previous;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = restore(&database, previous).await {
                        log::error!(
                            "Failed to restore profiler level {} on '{}': {e}",
                            previous.level,
                            database.name()
                        );
                    }
                });
            }
            Err(_) => log::error!(
                "Profiler on '{}' left at level {PROFILE_ALL}: no runtime to restore level {}",
                database.name(),
                previous.level
            ),
        }
    }
}

async fn restore(database: &Database, previous: ProfilerSettings) -> Result<()> {
    database.run_command(doc! { "profile": previous.level, "slowms": previous.slow_ms }).await?;
    log::debug!("Profiler on '{}' restored to level {}", database.name(), previous.level);
    Ok(())
}

impl ConnectionManager {
    /// Profile the database for `window` and return the queries seen on the collection
    /// (runs in Tokio runtime).
    ///
    /// The whole observation is bounded by `window` plus a short grace period; overrunning
    /// it yields `Error::Timeout` and the profiler is still restored.
    pub fn observe_queries(
        &self,
        client: &Client,
        namespace: &Namespace,
        window: Duration,
    ) -> Result<Vec<QuerySample>> {
        let database = client.database(&namespace.database);
        let namespace = namespace.clone();
        self.runtime.block_on(async move {
            let observation = observe(database, &namespace, window);
            match tokio::time::timeout(window + OBSERVE_GRACE, observation).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(format!("Query observation on {namespace} overran"))),
            }
        })
    }
}

async fn observe(
    database: Database,
    namespace: &Namespace,
    window: Duration,
) -> Result<Vec<QuerySample>> {
    let started = mongodb::bson::DateTime::now();
    let guard = ProfilerGuard::acquire(database.clone()).await?;

    tokio::time::sleep(window).await;

    let samples = read_profile(&database, namespace, started).await;
    let restored = guard.release().await;
    let samples = samples?;
    restored?;

    log::debug!("Observed {} queries on {namespace} over {window:?}", samples.len());
    Ok(samples)
}

async fn read_profile(
    database: &Database,
    namespace: &Namespace,
    since: mongodb::bson::DateTime,
) -> Result<Vec<QuerySample>> {
    let filter = doc! {
        "ns": namespace.to_string(),
        "op": { "$in": PROFILED_OPS.to_vec() },
        "ts": { "$gte": since },
    };
    let entries: Vec<Document> = database
        .collection::<Document>("system.profile")
        .find(filter)
        .sort(doc! { "ts": 1 })
        .await?
        .try_collect()
        .await?;
    Ok(entries.iter().filter_map(sample_from_profile_entry).collect())
}

/// Convert one `system.profile` entry. Entries without a filter are skipped.
fn sample_from_profile_entry(entry: &Document) -> Option<QuerySample> {
    let command = entry.get_document("command").ok()?;
    let filter = command.get_document("filter").or_else(|_| command.get_document("q")).ok()?;
    let millis = entry.get("millis").and_then(bson_to_u64).unwrap_or(0);
    let scan_type = entry.get_str("planSummary").unwrap_or("UNKNOWN");
    let timestamp = match entry.get("ts") {
        Some(Bson::DateTime(ts)) => DateTime::from_timestamp_millis(ts.timestamp_millis()),
        _ => None,
    }
    .unwrap_or_else(Utc::now);

    Some(QuerySample::from_filter(&DocumentValue::from(filter), millis, scan_type, timestamp))
}
