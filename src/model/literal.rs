//! Structural shapes of object and array literals, and the ordered
//! dotted-path map produced when flattening them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The statically known shape of an object or array literal.
///
/// Objects keep their keys in source order. Scalars are kept as text:
/// identifiers and member expressions as written, string literals
/// without their quotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum ObjectValue {
    /// A property with no static value (`undefined`, `null`, spreads).
    Undefined,
    Leaf(String),
    List(Vec<ObjectValue>),
    Object(Vec<(String, ObjectValue)>),
}

impl ObjectValue {
    pub fn leaf(text: impl Into<String>) -> Self {
        ObjectValue::Leaf(text.into())
    }

    /// Looks up a direct property of an object shape.
    pub fn get(&self, key: &str) -> Option<&ObjectValue> {
        match self {
            ObjectValue::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            ObjectValue::Leaf(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, ObjectValue::Object(_))
    }

    /// True for `undefined`, empty objects and empty lists.
    pub fn is_empty(&self) -> bool {
        match self {
            ObjectValue::Undefined => true,
            ObjectValue::Leaf(_) => false,
            ObjectValue::List(items) => items.is_empty(),
            ObjectValue::Object(entries) => entries.is_empty(),
        }
    }
}

impl TryFrom<Value> for ObjectValue {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Ok(match value {
            Value::Null => ObjectValue::Undefined,
            Value::Bool(b) => ObjectValue::Leaf(b.to_string()),
            Value::Number(n) => ObjectValue::Leaf(n.to_string()),
            Value::String(s) => ObjectValue::Leaf(s),
            Value::Array(items) => ObjectValue::List(
                items
                    .into_iter()
                    .map(ObjectValue::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => ObjectValue::Object(
                map.into_iter()
                    .map(|(k, v)| ObjectValue::try_from(v).map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

impl From<ObjectValue> for Value {
    fn from(value: ObjectValue) -> Self {
        match value {
            ObjectValue::Undefined => Value::Null,
            ObjectValue::Leaf(s) => Value::String(s),
            ObjectValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            ObjectValue::Object(entries) => {
                Value::Object(entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// An insertion-ordered map from dotted paths to type names.
///
/// Writing an existing path replaces the value in place, so the first
/// position of a path is the one that is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMap(serde_json::Map<String, Value>);

impl PathMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.0.insert(path.into(), Value::String(value.into()));
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).and_then(Value::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str().unwrap_or_default()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = PathMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl fmt::Display for PathMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_value_from_json_keeps_order() {
        let value: ObjectValue =
            serde_json::from_str(r#"{"zeta": "String", "alpha": {"type": "Number"}, "list": []}"#)
                .unwrap();
        match &value {
            ObjectValue::Object(entries) => {
                let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["zeta", "alpha", "list"]);
            }
            other => panic!("expected object, got {:?}", other),
        }
        assert_eq!(
            value.get("alpha").and_then(|v| v.get("type")).and_then(ObjectValue::as_leaf),
            Some("Number")
        );
        assert!(value.get("list").unwrap().is_empty());
    }

    #[test]
    fn test_path_map_replace_keeps_position() {
        let mut map = PathMap::new();
        map.insert("a", "String");
        map.insert("b", "Number");
        map.insert("a", "Date");

        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![("a", "Date"), ("b", "Number")]);
        assert_eq!(map.to_string(), r#"{"a":"Date","b":"Number"}"#);
    }
}
