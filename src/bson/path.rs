//! Dotted field-path construction and resolution.

use super::DocumentValue;

/// Suffix marking a segment that steps into the object elements of an array.
pub const ARRAY_MARKER: &str = "[]";

/// A segment of a dotted field path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathSegment<'a> {
    pub key: &'a str,
    /// The segment carried the `[]` marker.
    pub into_array: bool,
}

/// Append `key` to `prefix`, producing `key` at top level.
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() { key.to_string() } else { format!("{prefix}.{key}") }
}

/// Path under which the object elements of the array at `path` are walked.
pub fn array_element_path(path: &str) -> String {
    format!("{path}{ARRAY_MARKER}")
}

/// Split a dotted path into segments.
pub fn split_path(path: &str) -> impl Iterator<Item = PathSegment<'_>> {
    path.split('.').map(|segment| match segment.strip_suffix(ARRAY_MARKER) {
        Some(key) => PathSegment { key, into_array: true },
        None => PathSegment { key: segment, into_array: false },
    })
}

/// A path with no `.` separator, ignoring any `[]` marker.
pub fn is_top_level(path: &str) -> bool {
    !path.contains('.')
}

/// The path with every `[]` marker removed, i.e. the dotted form MongoDB indexes use.
pub fn strip_array_markers(path: &str) -> String {
    path.replace(ARRAY_MARKER, "")
}

/// Last segment of a path without its marker.
pub fn leaf_name(path: &str) -> &str {
    let leaf = path.rsplit('.').next().unwrap_or(path);
    leaf.strip_suffix(ARRAY_MARKER).unwrap_or(leaf)
}

/// Number of `.` separators in the path.
pub fn path_depth(path: &str) -> usize {
    path.matches('.').count()
}

/// Resolve the value at a dotted path inside `document`.
///
/// Returns `None` when a segment is missing or an intermediate value is not an object.
/// A marked segment steps into the leading `element_samples` elements of an array and
/// yields the first one that resolves, mirroring how the flattener discovered the path.
pub fn resolve_path<'a>(
    document: &'a DocumentValue,
    path: &str,
    element_samples: usize,
) -> Option<&'a DocumentValue> {
    let segments: Vec<PathSegment<'_>> = split_path(path).collect();
    resolve_segments(document, &segments, element_samples)
}

fn resolve_segments<'a>(
    value: &'a DocumentValue,
    segments: &[PathSegment<'_>],
    element_samples: usize,
) -> Option<&'a DocumentValue> {
    let Some((segment, rest)) = segments.split_first() else {
        return Some(value);
    };
    let child = value.get(segment.key)?;

    if !segment.into_array {
        return resolve_segments(child, rest, element_samples);
    }

    child
        .as_array()?
        .iter()
        .take(element_samples.max(1))
        .take_while(|element| element.as_object().is_some())
        .find_map(|element| resolve_segments(element, rest, element_samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocumentValue {
        DocumentValue::from(serde_json::json!({
            "name": "A",
            "address": { "city": "Oslo", "geo": null },
            "items": [{ "sku": "x1" }, { "sku": "x2", "qty": 3 }],
            "tags": ["a", "b"],
        }))
    }

    #[test]
    fn resolves_nested_object_fields() {
        let doc = sample();
        assert_eq!(
            resolve_path(&doc, "address.city", 1),
            Some(&DocumentValue::String("Oslo".into()))
        );
        assert_eq!(resolve_path(&doc, "address.geo", 1), Some(&DocumentValue::Null));
        assert_eq!(resolve_path(&doc, "address.zip", 1), None);
        assert_eq!(resolve_path(&doc, "name.first", 1), None);
    }

    #[test]
    fn marked_segments_step_into_leading_elements() {
        let doc = sample();
        assert_eq!(resolve_path(&doc, "items[].sku", 1), Some(&DocumentValue::String("x1".into())));
        assert_eq!(resolve_path(&doc, "items[].qty", 1), None);
        assert_eq!(resolve_path(&doc, "items[].qty", 2), Some(&DocumentValue::Number(3.0)));
        assert_eq!(resolve_path(&doc, "tags[].x", 1), None);
    }

    #[test]
    fn path_helpers() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a", "b"), "a.b");
        assert_eq!(array_element_path("items"), "items[]");
        assert_eq!(strip_array_markers("items[].sku"), "items.sku");
        assert_eq!(leaf_name("items[].sku"), "sku");
        assert_eq!(leaf_name("items[]"), "items");
        assert!(is_top_level("email"));
        assert!(!is_top_level("items[].sku"));
        assert_eq!(path_depth("a.b[].c"), 2);
    }
}
