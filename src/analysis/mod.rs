//! Query-pattern analysis: unused indexes, index recommendations and schema risks.

mod analyzer;
mod types;

pub use analyzer::{
    analyze_query_patterns, heuristic_recommendations, schema_risks, slow_query_patterns,
    unused_indexes,
};
pub use types::*;
