//! Common test utilities and fixtures for integration tests.
//!
//! MongoDB-backed tests share a single MongoDB 7.0 container per test binary (Rust
//! compiles each `tests/*.rs` file as a separate binary). Per-test isolation is achieved
//! by namespacing every database name with a short UUID suffix.
//!
//! The container runs on a dedicated background thread with its own tokio runtime. The
//! store under test owns another runtime and blocks on it, so these tests are plain
//! `#[test]` functions rather than `#[tokio::test]`.
//!
//! An `atexit` hook ensures the container is removed when the process exits.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::OnceLock;
use std::time::Duration;

use mongodb::bson::Document;
use mongodb::{Client, options::ClientOptions};
use schemango::MongoStore;
use schemango::connection::Namespace;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::mongo::Mongo;

/// Connection info for the shared container.
struct SharedContainer {
    connection_string: String,
}

static SHARED: OnceLock<SharedContainer> = OnceLock::new();

/// Docker container ID — stored globally so the `atexit` handler can remove it.
static CONTAINER_ID: OnceLock<String> = OnceLock::new();

unsafe extern "C" {
    fn atexit(f: extern "C" fn()) -> i32;
}

/// Called by the C runtime on process exit. Forcibly removes the shared container.
extern "C" fn remove_container() {
    if let Some(id) = CONTAINER_ID.get() {
        let _ = std::process::Command::new("docker")
            .args(["rm", "-f", id])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
    }
}

/// Initialize the shared container (called once per test binary).
fn get_or_init_shared() -> &'static SharedContainer {
    SHARED.get_or_init(|| {
        let (tx, rx) = std::sync::mpsc::sync_channel(1);

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create container runtime");

            rt.block_on(async {
                let container = Mongo::default()
                    .with_tag("7.0")
                    .start()
                    .await
                    .expect("Failed to start MongoDB container");

                // Store container ID for the atexit cleanup hook.
                let _ = CONTAINER_ID.set(container.id().to_string());
                unsafe {
                    atexit(remove_container);
                }

                let host = container.get_host().await.expect("Failed to get host");
                let port = container.get_host_port_ipv4(27017).await.expect("Failed to get port");
                let connection_string = format!("mongodb://{}:{}", host, port);

                // Readiness probe
                let opts = ClientOptions::parse(&connection_string).await.expect("Failed to parse");
                let probe = Client::with_options(opts).expect("Failed to create probe client");
                for _ in 0..30 {
                    if probe.list_database_names().await.is_ok() {
                        break;
                    }
                    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                }
                drop(probe);

                tx.send(connection_string).expect("Failed to send connection string");

                // Park forever — keeps the container alive until the process exits.
                std::future::pending::<()>().await;
            });
        });

        SharedContainer {
            connection_string: rx.recv().expect("Failed to receive connection string"),
        }
    })
}

/// A connected store on the shared MongoDB container with per-test isolation.
///
/// Each handle gets a unique `test_id` so that `namespace("foo", ..)` lives in a
/// database named `foo_{test_id}`, preventing cross-test interference.
pub struct MongoTestContainer {
    pub store: MongoStore,
    pub connection_string: String,
    test_id: String,
}

impl MongoTestContainer {
    /// Connect a fresh store to the shared container.
    pub fn start() -> Self {
        let shared = get_or_init_shared();
        let store = MongoStore::connect(&shared.connection_string, Duration::from_secs(30))
            .expect("Failed to connect store");

        // Use first 8 chars of UUID v4 as a short, unique namespace suffix.
        let test_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

        Self { store, connection_string: shared.connection_string.clone(), test_id }
    }

    /// Return the namespaced database name for this test.
    pub fn db_name(&self, name: &str) -> String {
        format!("{}_{}", name, self.test_id)
    }

    /// Collection identity inside this test's database.
    pub fn namespace(&self, db: &str, collection: &str) -> Namespace {
        Namespace::new(self.db_name(db), collection)
    }

    pub fn collection(&self, namespace: &Namespace) -> mongodb::Collection<Document> {
        self.store.client().database(&namespace.database).collection(&namespace.collection)
    }

    /// Run a future on the store's runtime.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.store.manager().runtime_handle().block_on(future)
    }

    /// Insert documents, creating the collection.
    pub fn seed(&self, namespace: &Namespace, docs: Vec<Document>) {
        let coll = self.collection(namespace);
        self.block_on(async move { coll.insert_many(docs).await }).expect("Failed to insert");
    }
}
