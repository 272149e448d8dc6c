//! Flat JSON-object variable map.
//!
//! `Vars` carries parameter maps across the crate: provided parameters,
//! descriptor read-back and the dispatch payload all share this shape.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Ordered string-keyed map of JSON values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vars {
    #[serde(flatten)]
    inner: Map<String, Value>,
}

#[allow(unused)]
impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, serializing it to JSON.
    pub fn set<T: Serialize>(
        &mut self,
        key: &str,
        value: T,
    ) {
        if let Ok(value) = serde_json::to_value(value) {
            self.inner.insert(key.to_string(), value);
        }
    }

    /// Get a value, deserializing it from JSON.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Option<T> {
        self.inner.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get a value rendered as a plain string.
    ///
    /// Strings come back verbatim; numbers and booleans use their display
    /// form. Nulls, arrays and objects yield `None`.
    pub fn get_str(
        &self,
        key: &str,
    ) -> Option<String> {
        match self.inner.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.inner.contains_key(key)
    }

    pub fn remove(
        &mut self,
        key: &str,
    ) -> Option<Value> {
        self.inner.remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }
}

impl From<Value> for Vars {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(inner) => Self {
                inner,
            },
            _ => Self::default(),
        }
    }
}

impl From<Vars> for Value {
    fn from(vars: Vars) -> Self {
        Value::Object(vars.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_roundtrip() {
        let mut vars = Vars::new();
        vars.set("name", "median_filter");
        vars.set("radius", 3);

        assert_eq!(vars.get::<String>("name").unwrap(), "median_filter");
        assert_eq!(vars.get::<i64>("radius").unwrap(), 3);
        assert!(vars.get::<String>("missing").is_none());
    }

    #[test]
    fn test_get_str_renders_scalars() {
        let mut vars = Vars::new();
        vars.set("threshold", 1.5);
        vars.set("force_update", true);
        vars.set("nested", json!({"a": 1}));

        assert_eq!(vars.get_str("threshold").unwrap(), "1.5");
        assert_eq!(vars.get_str("force_update").unwrap(), "true");
        assert!(vars.get_str("nested").is_none());
    }

    #[test]
    fn test_from_value() {
        let vars = Vars::from(json!({"action": "crop", "x": 10}));
        assert_eq!(vars.get_str("action").unwrap(), "crop");
        assert_eq!(vars.len(), 2);

        let not_object = Vars::from(json!([1, 2]));
        assert!(not_object.is_empty());
    }
}
