//! Flat key/value metadata attached to a report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Maximum length of a metadata key, in characters.
pub const MAX_METADATA_KEY_LENGTH: usize = 100;

/// Maximum serialized length of a metadata value, in bytes.
pub const MAX_METADATA_VALUE_LENGTH: usize = 2000;

/// Metadata mapping (depth 1).
///
/// Deserializing a payload that omits metadata yields an empty mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    /// Builds validated metadata.
    ///
    /// # Errors
    ///
    /// - `InvalidMetadata` if a key is empty or too long, a value is too
    ///   long once serialized, or a value contains a nested object
    pub fn new(entries: BTreeMap<String, Value>) -> Result<Self, DomainError> {
        let metadata = Self(entries);
        metadata.validate()?;
        Ok(metadata)
    }

    /// Wraps stored metadata without validation.
    pub fn from_trusted(entries: BTreeMap<String, Value>) -> Self {
        Self(entries)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }

    fn validate(&self) -> Result<(), DomainError> {
        let mut error: Option<DomainError> = None;
        for (key, value) in &self.0 {
            let reason = if key.is_empty() {
                Some("key cannot be empty".to_string())
            } else if key.chars().count() > MAX_METADATA_KEY_LENGTH {
                Some(format!("key exceeds {} characters", MAX_METADATA_KEY_LENGTH))
            } else if contains_object(value) {
                Some("nested objects are not allowed".to_string())
            } else if value.to_string().len() > MAX_METADATA_VALUE_LENGTH {
                Some(format!("value exceeds {} bytes", MAX_METADATA_VALUE_LENGTH))
            } else {
                None
            };

            if let Some(reason) = reason {
                let err = error.take().unwrap_or_else(|| {
                    DomainError::new(ErrorCode::InvalidMetadata, "Metadata failed validation")
                });
                error = Some(err.with_field(format!("metadata.{}", key), reason));
            }
        }
        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn contains_object(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(contains_object),
        _ => false,
    }
}

impl TryFrom<BTreeMap<String, Value>> for Metadata {
    type Error = DomainError;

    fn try_from(entries: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn flat_metadata_is_accepted() {
        let metadata = Metadata::new(entries(&[
            ("owner", json!("finance")),
            ("priority", json!(3)),
            ("tags", json!(["a", "b"])),
        ]))
        .unwrap();
        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata.get("owner"), Some(&json!("finance")));
    }

    #[test]
    fn nested_object_is_rejected() {
        let err = Metadata::new(entries(&[("owner", json!({"team": "x"}))])).unwrap_err();
        assert!(err.has_code(ErrorCode::InvalidMetadata));
        assert!(err.fields.contains_key("metadata.owner"));
    }

    #[test]
    fn object_inside_array_is_rejected() {
        assert!(Metadata::new(entries(&[("rows", json!([1, {"x": 1}]))])).is_err());
    }

    #[test]
    fn long_key_is_rejected() {
        let key = "k".repeat(MAX_METADATA_KEY_LENGTH + 1);
        assert!(Metadata::new(entries(&[(key.as_str(), json!(1))])).is_err());
    }

    #[test]
    fn long_value_is_rejected() {
        let value = "v".repeat(MAX_METADATA_VALUE_LENGTH);
        let err = Metadata::new(entries(&[("note", json!(value))])).unwrap_err();
        assert_eq!(
            err.fields.get("metadata.note").map(String::as_str),
            Some("value exceeds 2000 bytes")
        );
    }

    #[test]
    fn every_offending_key_is_reported() {
        let err = Metadata::new(entries(&[
            ("", json!(1)),
            ("nested", json!({"a": 1})),
            ("ok", json!(true)),
        ]))
        .unwrap_err();
        assert_eq!(err.fields.len(), 2);
    }

    #[test]
    fn trusted_metadata_skips_validation() {
        let metadata = Metadata::from_trusted(entries(&[("legacy", json!({"a": 1}))]));
        assert_eq!(metadata.len(), 1);
    }
}
