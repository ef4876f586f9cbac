use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::ast::Value;

/// Bound literal values, keyed by placeholder name (sigil included) and kept
/// in the order they were registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: IndexMap<String, Value>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `name`, returning the value it replaced. A replaced entry keeps
    /// its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(name.into(), value)
    }

    /// Move every entry of `other` into this map.
    pub fn merge(&mut self, other: Parameters) {
        for (name, value) in other.entries {
            if self.entries.contains_key(&name) {
                warn!(name = %name, "parameter name collision");
            }
            self.entries.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<N: Into<String>> FromIterator<(N, Value)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (N, Value)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A compiled command: SQL text plus the values of every placeholder in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterizedSql {
    pub text: String,
    pub parameters: Parameters,
}

impl ParameterizedSql {
    pub fn new(text: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            text: text.into(),
            parameters,
        }
    }

    /// Command text without bound values.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self::new(text, Parameters::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_overwrites() {
        let mut params = Parameters::new();
        assert_eq!(params.insert("@p0", Value::from("a")), None);
        params.insert("@p1", Value::from(2));
        assert_eq!(params.insert("@p0", Value::from("b")), Some(Value::from("a")));
        assert_eq!(params.len(), 2);
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["@p0", "@p1"]);
        assert_eq!(params.get("@p0"), Some(&Value::from("b")));
    }

    #[test]
    fn test_merge_appends_other_entries() {
        let mut first: Parameters = [("@so0_p0", Value::from(1))].into_iter().collect();
        let second: Parameters = [("@so1_p0", Value::from(2))].into_iter().collect();
        first.merge(second);
        assert_eq!(first.names().collect::<Vec<_>>(), vec!["@so0_p0", "@so1_p0"]);
        assert_eq!(first.get("@so1_p0"), Some(&Value::from(2)));
    }

    #[test]
    fn test_iterates_in_registration_order() {
        let params: Parameters = (0..50)
            .rev()
            .map(|i| (format!("@p{}", i), Value::from(i)))
            .collect();
        let names: Vec<&String> = (&params).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names.first().map(|n| n.as_str()), Some("@p49"));
        assert_eq!(names.last().map(|n| n.as_str()), Some("@p0"));
        assert_eq!(params.get("@p17"), Some(&Value::Int(17)));
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let sql = ParameterizedSql::new(
            "SELECT 1",
            [("@p1", Value::from("x")), ("@p0", Value::Null)]
                .into_iter()
                .collect(),
        );
        let json = serde_json::to_string(&sql).unwrap();
        assert_eq!(json, r#"{"text":"SELECT 1","parameters":{"@p1":"x","@p0":null}}"#);
    }
}
