//! Flattening of literal shapes into dotted-path maps.

use crate::model::{ObjectValue, PathMap};

/// A rewrite applied to every node before it is branched on.
pub type Filter = fn(ObjectValue) -> ObjectValue;

/// `{type: X, ...}` becomes `X`, repeatedly.
pub fn unwrap_type(value: ObjectValue) -> ObjectValue {
    let mut current = value;
    while let Some(inner) = current.get("type") {
        current = inner.clone();
    }
    current
}

/// An empty list becomes the leaf `Mixed`.
pub fn empty_list_as_mixed(value: ObjectValue) -> ObjectValue {
    match value {
        ObjectValue::List(items) if items.is_empty() => ObjectValue::leaf("Mixed"),
        other => other,
    }
}

/// A leaf keeps only the text after its last `.` (`Schema.Types.ObjectId`
/// becomes `ObjectId`).
pub fn canonicalize(value: ObjectValue) -> ObjectValue {
    match value {
        ObjectValue::Leaf(text) => match text.rsplit_once('.') {
            Some((_, last)) if !last.is_empty() => ObjectValue::leaf(last),
            _ => ObjectValue::Leaf(text),
        },
        other => other,
    }
}

/// Flattens `value` into `path.join(".") -> leaf`.
///
/// Filters run in order on every node. Lists visit each element under the
/// same path; objects push each key. Undefined and empty values are
/// skipped, and a later write to a path replaces the earlier value in place.
pub fn expand(value: &ObjectValue, filters: &[Filter]) -> PathMap {
    let mut out = PathMap::new();
    let mut path = Vec::new();
    visit(value.clone(), filters, &mut path, &mut out);
    out
}

fn visit(value: ObjectValue, filters: &[Filter], path: &mut Vec<String>, out: &mut PathMap) {
    let value = filters.iter().fold(value, |v, filter| filter(v));
    match value {
        ObjectValue::Undefined => {}
        ObjectValue::Leaf(text) => {
            if !text.is_empty() {
                out.insert(path.join("."), text);
            }
        }
        ObjectValue::List(items) => {
            for item in items {
                visit(item, filters, path, out);
            }
        }
        ObjectValue::Object(entries) => {
            for (key, child) in entries {
                path.push(key);
                visit(child, filters, path, out);
                path.pop();
            }
        }
    }
}
