use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A remote event as a raw JSON object.
///
/// Every field the service returned is kept, including ones calsync knows
/// nothing about, so that writing the payload back does not clobber them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemotePayload(Map<String, Value>);

impl RemotePayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// The remote identifier, if the payload carries a non-empty one.
    pub fn id(&self) -> Option<&str> {
        self.0
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(Value::as_str)
    }

    /// Whether the service reports the event as deleted.
    pub fn is_cancelled(&self) -> bool {
        self.status() == Some("cancelled")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for RemotePayload {
    fn from(map: Map<String, Value>) -> Self {
        RemotePayload(map)
    }
}

impl TryFrom<Value> for RemotePayload {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(RemotePayload(map)),
            other => Err(format!("expected a JSON object, got {}", other)),
        }
    }
}
