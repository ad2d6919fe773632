//! Structural patches between restricted manifest views.
//!
//! Patches are RFC 6902 documents. They are computed between the field subset
//! of a destination and the field subset of the source, so every operation's
//! pointer starts with the name of a synchronized field.

use std::path::Path;

use indexmap::IndexSet;
use json_patch::Patch;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Computes the operations turning `destination` into `source`.
///
/// An empty patch means the views are equal.
pub fn compute_patch(destination: &Value, source: &Value) -> Patch {
    json_patch::diff(destination, source)
}

#[inline]
pub fn is_empty(patch: &Patch) -> bool {
    patch.0.is_empty()
}

/// Applies `patch` to a copy of `fields` and returns the copy.
///
/// `fields` itself is never modified, even when the patch fails halfway.
pub fn apply_patch(
    path: &Path,
    fields: &Map<String, Value>,
    patch: &Patch,
) -> Result<Map<String, Value>> {
    let mut document = Value::Object(fields.clone());
    json_patch::patch(&mut document, &patch.0).map_err(|e| Error::Patch {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match document {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Patch {
            path: path.to_path_buf(),
            message: "patch replaced the manifest root".to_string(),
        }),
    }
}

/// Field names addressed by `patch`, in order of first appearance.
pub fn touched_fields(patch: &Patch) -> IndexSet<String> {
    patch
        .0
        .iter()
        .filter_map(|op| serde_json::to_value(op).ok())
        .filter_map(|op| {
            op.get("path")
                .and_then(Value::as_str)
                .and_then(first_segment)
        })
        .collect()
}

/// Renders one line per operation, e.g. `replace /license "MIT"`.
pub fn describe(patch: &Patch) -> Vec<String> {
    patch
        .0
        .iter()
        .filter_map(|op| serde_json::to_value(op).ok())
        .map(|op| {
            let kind = op.get("op").and_then(Value::as_str).unwrap_or("?");
            let path = op.get("path").and_then(Value::as_str).unwrap_or("");
            match op.get("value") {
                Some(value) => format!("{} {} {}", kind, path, value),
                None => format!("{} {}", kind, path),
            }
        })
        .collect()
}

fn first_segment(pointer: &str) -> Option<String> {
    let rest = pointer.strip_prefix('/')?;
    let segment = rest.split('/').next()?;
    Some(segment.replace("~1", "/").replace("~0", "~"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equal_views_produce_no_operations() {
        let view = json!({"license": "MIT", "keywords": ["a"]});
        assert!(is_empty(&compute_patch(&view, &view)));
    }

    #[test]
    fn describe_renders_one_line_per_operation() {
        let destination = json!({"license": "ISC", "author": "x"});
        let source = json!({"license": "MIT"});
        let lines = describe(&compute_patch(&destination, &source));
        assert_eq!(lines.len(), 2);
        assert!(lines.contains(&"remove /author".to_string()));
        assert!(lines.contains(&r#"replace /license "MIT""#.to_string()));
    }

    #[test]
    fn first_segment_unescapes() {
        assert_eq!(first_segment("/a~1b/0"), Some("a/b".to_string()));
        assert_eq!(first_segment("/x~0y"), Some("x~y".to_string()));
        assert_eq!(first_segment(""), None);
    }

    #[test]
    fn touched_fields_lists_each_field_once() {
        let destination = json!({"keywords": ["a", "b"], "license": "ISC"});
        let source = json!({"keywords": ["a", "c", "d"], "license": "MIT"});
        let patch = compute_patch(&destination, &source);
        let fields = touched_fields(&patch);
        assert_eq!(fields.len(), 2);
        assert!(fields.contains("keywords"));
        assert!(fields.contains("license"));
    }
}
