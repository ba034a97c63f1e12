//! Request parameters echoed into envelope bodies.

use indexmap::IndexMap;
use portico_codec::RequestDataSource;
use serde_json::Value;

/// Snapshot of the request path and its parameters.
///
/// Path parameters come first, then query parameters. A query parameter
/// sent once appears as a string, one sent several times as an array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDescriber {
    path: String,
    parameters: IndexMap<String, Value>,
}

impl RequestDescriber {
    /// Describes the request behind `source`.
    pub fn from_source(source: &dyn RequestDataSource) -> Self {
        let mut parameters = IndexMap::new();
        for (name, value) in source.path_parameters().iter() {
            parameters.insert(name.to_string(), Value::String(value.to_string()));
        }
        for (name, values) in source.query() {
            let value = match values.as_slice() {
                [] => continue,
                [single] => Value::String(single.clone()),
                many => Value::Array(many.iter().cloned().map(Value::String).collect()),
            };
            parameters.entry(name.clone()).or_insert(value);
        }
        Self {
            path: source.path().to_string(),
            parameters,
        }
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the request parameters.
    #[must_use]
    pub fn parameters(&self) -> &IndexMap<String, Value> {
        &self.parameters
    }
}
