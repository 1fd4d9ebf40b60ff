//! Type unification and snapshot assembly.

use std::collections::BTreeSet;

use crate::bson::{DocumentValue, resolve_path};

use super::{
    FieldPaths, FieldStatistic, FlattenOptions, SchemaSnapshot, TypeTag, collect_field_paths,
};

/// Per-path accumulator during unification.
#[derive(Default)]
struct FieldAccum {
    types: BTreeSet<TypeTag>,
    occurrences: u64,
    example: Option<DocumentValue>,
}

impl FieldAccum {
    fn observe(&mut self, value: &DocumentValue) {
        self.types.insert(TypeTag::of(value));
        self.occurrences += 1;
        if self.example.is_none() && !value.is_null() {
            self.example = Some(value.clone());
        }
    }
}

/// Infer a snapshot from a fully buffered sample.
///
/// The first pass discovers the union of field paths, the second resolves every path in
/// every document. Coverage is computed against `documents.len()`, the realized sample.
pub fn build_snapshot(
    database: &str,
    collection: &str,
    documents: &[DocumentValue],
    options: &FlattenOptions,
) -> SchemaSnapshot {
    let mut discovered = FieldPaths::default();
    for document in documents {
        collect_field_paths(document, options, &mut discovered);
    }

    let sample_size = documents.len() as u64;
    let fields = discovered
        .paths()
        .iter()
        .map(|path| {
            let mut accum = FieldAccum::default();
            for document in documents {
                if let Some(value) = resolve_path(document, path, options.array_element_samples) {
                    accum.observe(value);
                }
            }
            FieldStatistic::new(
                path.clone(),
                accum.types,
                accum.occurrences,
                sample_size,
                accum.example.unwrap_or(DocumentValue::Null),
            )
        })
        .collect();

    log::debug!(
        "Inferred {} fields from {} documents in {database}.{collection}",
        discovered.len(),
        sample_size
    );

    SchemaSnapshot::new(database, collection, sample_size, fields)
        .with_depth_limited(discovered.depth_limited())
}
