//! Database operations split into focused modules.

pub mod indexes;
pub mod profiler;
pub mod schema;

use mongodb::bson::Bson;

/// Non-negative integer from any numeric BSON value.
pub(crate) fn bson_to_u64(value: &Bson) -> Option<u64> {
    match value {
        Bson::Int32(n) => u64::try_from(*n).ok(),
        Bson::Int64(n) => u64::try_from(*n).ok(),
        Bson::Double(n) if *n >= 0.0 => Some(*n as u64),
        _ => None,
    }
}
