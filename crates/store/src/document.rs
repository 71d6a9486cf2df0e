//! Documents: an opaque string ID plus a JSON object payload.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// A stored document. The payload never contains the ID; [`Document::merged`]
/// produces the `{id, ...data}` shape the wire format uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    /// The `{id, ...data}` JSON value.
    #[must_use]
    pub fn merged(&self) -> Value {
        let mut merged = self.data.clone();
        merged.insert("id".to_owned(), Value::String(self.id.clone()));
        Value::Object(merged)
    }

    /// Deserialize the merged document into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] when the payload does not match
    /// the target type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.merged())?)
    }

    /// A field of the payload, if present.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Serialize a payload into a document object, dropping any `id` key so the
/// ID lives only in the document address.
pub(crate) fn to_object<T: Serialize>(data: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(data)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        _ => Err(StoreError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pet {
        id: String,
        name: String,
    }

    #[test]
    fn test_merged_includes_id() {
        let doc = Document {
            id: "p1".into(),
            data: to_object(&json!({"name": "Rex"})).unwrap(),
        };
        assert_eq!(doc.merged(), json!({"id": "p1", "name": "Rex"}));
        assert_eq!(
            doc.deserialize::<Pet>().unwrap(),
            Pet { id: "p1".into(), name: "Rex".into() }
        );
    }

    #[test]
    fn test_payload_id_is_stripped() {
        let obj = to_object(&json!({"id": "spoofed", "name": "Rex"})).unwrap();
        assert!(!obj.contains_key("id"));
    }

    #[test]
    fn test_non_object_payload_rejected() {
        assert!(matches!(
            to_object(&json!([1, 2, 3])),
            Err(StoreError::NotAnObject)
        ));
    }
}
