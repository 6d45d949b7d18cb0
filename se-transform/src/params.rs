//! Pipeline invocation parameters.

use crate::errors::SdkError;
use anyhow::Context as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Named parameters a pipeline is invoked with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object such as `{"ds": "2025-10-01"}`.
    pub fn from_json(input: &str) -> Result<Self, SdkError> {
        if input.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(serde_json::from_str(input)?)
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts a parameter, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Returns the raw value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns a string parameter, failing when it is missing or not a string.
    pub fn get_str(&self, name: &str) -> anyhow::Result<&str> {
        self.0
            .get(name)
            .with_context(|| format!("missing parameter '{name}'"))?
            .as_str()
            .with_context(|| format!("parameter '{name}' is not a string"))
    }

    /// Deserializes a parameter into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .0
            .get(name)
            .with_context(|| format!("missing parameter '{name}'"))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("parameter '{name}' has an unexpected type"))
    }

    /// Returns true if the parameter is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the parameter names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Renders every parameter as a string, for key template substitution.
    ///
    /// Strings are used verbatim; other values use their JSON rendering.
    #[must_use]
    pub fn to_string_map(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .map(|(k, v)| {
                let rendered = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect()
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let params = Params::from_json(r#"{"ds": "2025-10-01", "limit": 10}"#).unwrap();

        assert_eq!(params.get_str("ds").unwrap(), "2025-10-01");
        assert_eq!(params.get_as::<u32>("limit").unwrap(), 10);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_from_json_empty_input() {
        assert!(Params::from_json("").unwrap().is_empty());
        assert!(Params::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_get_str_errors() {
        let params = Params::new().with("limit", 3);

        assert!(params.get_str("missing").unwrap_err().to_string().contains("missing parameter"));
        assert!(params.get_str("limit").unwrap_err().to_string().contains("not a string"));
    }

    #[test]
    fn test_to_string_map() {
        let params: Params = vec![("ds", Value::from("2025-10-01")), ("n", Value::from(4))]
            .into_iter()
            .collect();
        let map = params.to_string_map();

        assert_eq!(map["ds"], "2025-10-01");
        assert_eq!(map["n"], "4");
    }
}
