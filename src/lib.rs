//! Schema inference, schema diffing, validator synthesis and index analysis for MongoDB
//! collections.

pub mod analysis;
pub mod bson;
pub mod cache;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod schema;
pub mod settings;
pub mod store;

pub use engine::SchemaEngine;
pub use error::{Error, Result};
pub use store::{DocumentStore, MemoryStore, MongoStore};
