//! MongoDB connection management and operations.
//!
//! This module provides:
//! - `ConnectionManager`: runtime ownership, connecting and collection listing
//! - `ops`: schema sampling, index metadata and profiler-based query observation
//! - `types`: shared types for all operations

pub mod manager;
pub mod ops;
pub mod types;

// Re-export commonly used items at the crate level
pub use manager::ConnectionManager;
pub use ops::profiler::{ProfilerGuard, ProfilerSettings};
pub use types::Namespace;
