//! Filter options.
//!
//! Options are declared as a JSON object and deserialized by each filter into
//! its own configuration struct, so misspelled or mistyped options fail at
//! declaration.

use crate::filter::error::FilterOptionsError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterOptions(Map<String, Value>);

impl FilterOptions {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserialize into a filter's typed configuration.
    ///
    /// # Errors
    ///
    /// Unknown keys (with `deny_unknown_fields`) and wrongly typed values.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, FilterOptionsError> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }
}

impl From<Map<String, Value>> for FilterOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// `null` means no options; any other non-object is rejected.
impl TryFrom<Value> for FilterOptions {
    type Error = FilterOptionsError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(FilterOptionsError::new(format!(
                "filter options must be an object, got {}",
                other
            ))),
        }
    }
}
