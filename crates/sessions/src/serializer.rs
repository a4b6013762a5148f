use serde_json::{Map, Value};

use sk_domain::error::{Error, Result};

/// Session state: string keys to arbitrary JSON values.
pub type SessionData = Map<String, Value>;

/// Converts session state to and from the string a backend stores.
pub trait SessionSerializer: Send + Sync {
    fn serialize(&self, data: &SessionData) -> Result<String>;

    /// `None` (no stored record) yields an empty mapping.
    fn deserialize(&self, input: Option<&str>) -> Result<SessionData>;
}

/// Plain JSON object encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl SessionSerializer for JsonSerializer {
    fn serialize(&self, data: &SessionData) -> Result<String> {
        Ok(serde_json::to_string(data)?)
    }

    fn deserialize(&self, input: Option<&str>) -> Result<SessionData> {
        let Some(raw) = input else {
            return Ok(SessionData::new());
        };
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::CorruptSession(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn absent_record_is_empty() {
        assert!(JsonSerializer.deserialize(None).unwrap().is_empty());
    }

    #[test]
    fn nested_values_survive() {
        let Value::Object(data) = json!({
            "isConnected": true,
            "profile": { "name": "John", "tags": ["a", "b"], "age": 42 },
            "nothing": null
        }) else {
            unreachable!()
        };
        let raw = JsonSerializer.serialize(&data).unwrap();
        assert_eq!(JsonSerializer.deserialize(Some(&raw)).unwrap(), data);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let err = JsonSerializer.deserialize(Some("{not json")).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn non_object_payload_is_corrupt() {
        let err = JsonSerializer.deserialize(Some("[1,2]")).unwrap_err();
        assert!(matches!(err, Error::CorruptSession(_)));
    }
}
