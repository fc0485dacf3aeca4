//! Feature values, records and the provider registry.

pub mod providers;
pub mod registry;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::entity::EntityKey;
use crate::model::PathMap;
use crate::views::{ViewGroup, ViewKind};

pub use registry::{
    FeatureProvider, FnFeature, FnLabel, LabelProvider, ProviderInput, ProviderSettings,
    Registry, Target,
};

/// Value emitted for every name of a provider that does not apply.
pub const IRRELEVANT_VALUE: &str = "-1";

/// `!<category>!<variant>`, e.g. `!ApiLabel!Express`.
pub fn format_label(category: &str, variant: &str) -> String {
    format!("!{}!{}", category, variant)
}

pub fn is_label_name(name: &str) -> bool {
    name.starts_with('!')
}

/// A typed feature value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Number(i64),
    Text(String),
    List(Vec<String>),
    Map(PathMap),
}

impl FeatureValue {
    pub fn irrelevant() -> Self {
        FeatureValue::Text(IRRELEVANT_VALUE.to_string())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FeatureValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FeatureValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Bool(value)
    }
}

impl From<usize> for FeatureValue {
    fn from(value: usize) -> Self {
        FeatureValue::Number(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for FeatureValue {
    fn from(value: Vec<String>) -> Self {
        FeatureValue::List(value)
    }
}

impl From<PathMap> for FeatureValue {
    fn from(value: PathMap) -> Self {
        FeatureValue::Map(value)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Bool(b) => write!(f, "{}", b),
            FeatureValue::Number(n) => write!(f, "{}", n),
            FeatureValue::Text(s) => write!(f, "{:?}", s),
            FeatureValue::List(items) => write!(f, "[{}]", items.join(", ")),
            FeatureValue::Map(map) => write!(f, "{}", map),
        }
    }
}

/// Feature name to value, in dispatch order. Serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMap(Vec<(String, FeatureValue)>);

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces in place.
    pub fn insert(&mut self, name: impl Into<String>, value: FeatureValue) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    /// Label name to value, labels only.
    pub fn labels(&self) -> impl Iterator<Item = (&str, bool)> {
        self.iter()
            .filter(|(name, _)| is_label_name(name))
            .map(|(name, value)| (name, value.as_bool().unwrap_or(false)))
    }

    pub fn has_true_label(&self) -> bool {
        self.labels().any(|(_, value)| value)
    }
}

impl Serialize for FeatureMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FeatureMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FeatureMapVisitor;

        impl<'de> Visitor<'de> for FeatureMapVisitor {
            type Value = FeatureMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of feature names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = FeatureMap::new();
                while let Some((name, value)) = access.next_entry::<String, FeatureValue>()? {
                    map.insert(name, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(FeatureMapVisitor)
    }
}

/// One output record per (entity, accepted view).
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRecord {
    pub entity_key: EntityKey,
    pub group: ViewGroup,
    pub view: ViewKind,
    pub features: FeatureMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ProviderFailed,
    ValueCountMismatch,
    AmbiguousView,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::ProviderFailed => write!(f, "provider_failed"),
            DiagnosticKind::ValueCountMismatch => write!(f, "value_count_mismatch"),
            DiagnosticKind::AmbiguousView => write!(f, "ambiguous_view"),
        }
    }
}

/// A per-entity problem that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub entity_key: String,
    pub provider: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        key: &EntityKey,
        provider: impl Into<String>,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity_key: key.key_string(),
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_feature_map_keeps_order_and_replaces_in_place() {
        let mut map = FeatureMap::new();
        map.insert("b", FeatureValue::from(1usize));
        map.insert("a", FeatureValue::from("x"));
        map.insert("b", FeatureValue::from(true));
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(map.get("b"), Some(&FeatureValue::Bool(true)));
    }

    #[test]
    fn test_feature_map_json_shape() {
        let mut map = FeatureMap::new();
        map.insert(format_label("ApiLabel", "Express"), true.into());
        map.insert("CallExpressionNumArgs", 2usize.into());
        map.insert("CallExpressionArgsValues", vec!["/users".to_string()].into());
        map.insert("ClassPropertiesJson", PathMap::from_iter([("id", "number")]).into());
        map.insert("CallExpressionMethodOwnerText", FeatureValue::irrelevant());

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"!ApiLabel!Express":true,"CallExpressionNumArgs":2,"#,
                r#""CallExpressionArgsValues":["/users"],"ClassPropertiesJson":{"id":"number"},"#,
                r#""CallExpressionMethodOwnerText":"-1"}"#
            )
        );
        let back: FeatureMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_labels_view() {
        let mut map = FeatureMap::new();
        map.insert("!ApiLabel!Koa", false.into());
        map.insert("Path", "a.ts".into());
        assert!(!map.has_true_label());
        map.insert("!ApiLabel!Express", true.into());
        assert!(map.has_true_label());
        assert_eq!(map.labels().count(), 2);
    }
}
