//! Field-path discovery over sampled documents.

use std::collections::HashSet;

use crate::bson::{DocumentValue, ObjectFields, array_element_path, join_path};
use crate::settings::SamplingSettings;

/// Walk limits for path discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Objects nested deeper than this are not walked.
    pub max_depth: usize,
    /// Leading object elements walked in an array of objects.
    pub array_element_samples: usize,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self::from(&SamplingSettings::default())
    }
}

impl From<&SamplingSettings> for FlattenOptions {
    fn from(settings: &SamplingSettings) -> Self {
        Self {
            max_depth: settings.max_depth,
            array_element_samples: settings.array_element_samples.max(1),
        }
    }
}

/// Union of discovered paths, in first-discovery order.
#[derive(Debug, Default, Clone)]
pub struct FieldPaths {
    paths: Vec<String>,
    seen: HashSet<String>,
    depth_limited: bool,
}

impl FieldPaths {
    fn insert(&mut self, path: String) {
        if self.seen.insert(path.clone()) {
            self.paths.push(path);
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// At least one document was cut off by the depth limit.
    pub fn depth_limited(&self) -> bool {
        self.depth_limited
    }
}

/// Add every field path of `document` to `out`.
///
/// Arrays are only descended into when their first element is an object, and then only
/// the leading `array_element_samples` object elements are walked under `key[]`. Scalar
/// and empty arrays are a single `array` path. Object references and timestamps are leaves.
pub fn collect_field_paths(
    document: &DocumentValue,
    options: &FlattenOptions,
    out: &mut FieldPaths,
) {
    if let DocumentValue::Object(fields) = document {
        walk(fields, "", 0, options, out);
    }
}

fn walk(
    fields: &ObjectFields,
    prefix: &str,
    depth: usize,
    options: &FlattenOptions,
    out: &mut FieldPaths,
) {
    for (key, value) in fields {
        let path = join_path(prefix, key);
        out.insert(path.clone());

        match value {
            DocumentValue::Object(nested) => descend(nested, &path, depth, options, out),
            DocumentValue::Array(items) => {
                if !matches!(items.first(), Some(DocumentValue::Object(_))) {
                    continue;
                }
                let element_path = array_element_path(&path);
                for element in items.iter().take(options.array_element_samples) {
                    let DocumentValue::Object(nested) = element else {
                        break;
                    };
                    descend(nested, &element_path, depth, options, out);
                }
            }
            DocumentValue::Null
            | DocumentValue::Undefined
            | DocumentValue::Bool(_)
            | DocumentValue::Number(_)
            | DocumentValue::String(_)
            | DocumentValue::ObjectReference(_)
            | DocumentValue::Timestamp(_) => {}
        }
    }
}

fn descend(
    nested: &ObjectFields,
    path: &str,
    depth: usize,
    options: &FlattenOptions,
    out: &mut FieldPaths,
) {
    if depth + 1 >= options.max_depth {
        if !nested.is_empty() && !out.depth_limited {
            log::debug!("Depth limit {} reached at '{path}'", options.max_depth);
        }
        out.depth_limited |= !nested.is_empty();
        return;
    }
    walk(nested, path, depth + 1, options, out);
}
