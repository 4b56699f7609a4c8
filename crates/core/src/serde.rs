//! Serde helpers for query strings and partial updates.
//!
//! Query strings send empty values for cleared inputs (`?tenant_id=`), which
//! should read as absent. Partial updates need to tell a missing field apart
//! from an explicit `null`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Deserialize an optional string, treating empty strings as None.
pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.trim().is_empty()))
}

/// Deserialize an optional UUID, treating empty strings as None.
pub fn deserialize_optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    match deserialize_optional_string(deserializer)? {
        Some(s) => Uuid::parse_str(s.trim())
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// `Option<Option<T>>` field support: missing is `None`, `null` is `Some(None)`.
///
/// Use together with `#[serde(default)]`.
pub mod double_option {
    use super::*;

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Query {
        #[serde(default, deserialize_with = "deserialize_optional_string")]
        status: Option<String>,
        #[serde(default, deserialize_with = "deserialize_optional_uuid")]
        tenant_id: Option<Uuid>,
    }

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Patch {
        #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
        capacity: Option<Option<i64>>,
    }

    #[test]
    fn test_optional_string_empty_and_whitespace() {
        let q: Query = serde_json::from_str(r#"{"status": "  "}"#).unwrap();
        assert_eq!(q.status, None);
        let q: Query = serde_json::from_str(r#"{"status": "ACTIVE"}"#).unwrap();
        assert_eq!(q.status, Some("ACTIVE".to_string()));
    }

    #[test]
    fn test_optional_uuid() {
        let q: Query = serde_json::from_str(r#"{"tenant_id": ""}"#).unwrap();
        assert_eq!(q.tenant_id, None);

        let q: Query =
            serde_json::from_str(r#"{"tenant_id": "00000000-0000-0000-0000-000000000000"}"#)
                .unwrap();
        assert_eq!(q.tenant_id, Some(Uuid::nil()));

        let bad: Result<Query, _> = serde_json::from_str(r#"{"tenant_id": "nope"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_double_option_distinguishes_null_from_missing() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.capacity, None);

        let null: Patch = serde_json::from_str(r#"{"capacity": null}"#).unwrap();
        assert_eq!(null.capacity, Some(None));

        let value: Patch = serde_json::from_str(r#"{"capacity": 12}"#).unwrap();
        assert_eq!(value.capacity, Some(Some(12)));
    }

    #[test]
    fn test_double_option_serializes_null() {
        let json = serde_json::to_string(&Patch {
            capacity: Some(None),
        })
        .unwrap();
        assert_eq!(json, r#"{"capacity":null}"#);
    }
}
