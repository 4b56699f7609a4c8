use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::error::ValidationErrors;

/// Maximum length for display names across all entities.
pub const MAX_NAME_LEN: usize = 200;

/// Who created and last touched a record, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Audit {
    /// Audit fields for a record created now by `actor`.
    pub fn new(actor: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the record as modified by `actor` at `now`.
    pub fn touch(&mut self, actor: Option<Uuid>, now: DateTime<Utc>) {
        self.updated_by = actor;
        self.updated_at = now;
    }
}

/// Common view over versioned, soft-deletable entities.
pub trait Record {
    /// Entity name used in error messages and logs.
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;

    fn version(&self) -> i64;

    fn is_archived(&self) -> bool;

    /// Moves the record to its archived status as `actor` at `at` and bumps
    /// the version.
    fn mark_archived(&mut self, actor: Option<Uuid>, at: DateTime<Utc>);
}

/// Error for status strings read back from storage that no longer parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Returns an empty JSON object, the default metadata blob.
pub fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Applies a JSON merge patch (RFC 7386) to `target`.
///
/// Object members are merged recursively and `null` members remove the key.
/// A non-object patch replaces the target outright.
pub fn merge_patch(target: &mut serde_json::Value, patch: &serde_json::Value) {
    let serde_json::Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = empty_object();
    }
    if let serde_json::Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(
                    target_map
                        .entry(key.clone())
                        .or_insert(serde_json::Value::Null),
                    value,
                );
            }
        }
    }
}

/// Records an error when `blob` is anything other than a JSON object.
pub fn check_blob(errors: &mut ValidationErrors, field: &str, blob: &serde_json::Value) {
    errors.check(!blob.is_object(), field, "must be a JSON object");
}

/// Records errors for an empty or overly long display name.
pub fn check_name(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(field, "cannot be empty");
    } else if value.chars().count() > MAX_NAME_LEN {
        errors.push(field, format!("must be at most {MAX_NAME_LEN} characters"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_audit_touch_keeps_creation_fields() {
        let creator = Uuid::new_v4();
        let editor = Uuid::new_v4();
        let created = Utc::now();
        let mut audit = Audit::new(Some(creator), created);

        let later = created + chrono::Duration::minutes(5);
        audit.touch(Some(editor), later);

        assert_eq!(audit.created_by, Some(creator));
        assert_eq!(audit.created_at, created);
        assert_eq!(audit.updated_by, Some(editor));
        assert_eq!(audit.updated_at, later);
    }

    #[test]
    fn test_check_blob_rejects_non_objects() {
        for blob in [json!([1, 2]), json!("text"), json!(null), json!(3)] {
            let mut errors = ValidationErrors::new();
            check_blob(&mut errors, "metadata", &blob);
            assert!(errors.has_field("metadata"), "{blob} should be rejected");
        }

        let mut errors = ValidationErrors::new();
        check_blob(&mut errors, "metadata", &json!({"wing": "east"}));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_merge_patch_merges_and_removes() {
        let mut target = json!({"wing": "east", "hvac": {"zones": 3, "vendor": "acme"}});
        merge_patch(
            &mut target,
            &json!({"wing": null, "hvac": {"zones": 4}, "parking": true}),
        );
        assert_eq!(
            target,
            json!({"hvac": {"zones": 4, "vendor": "acme"}, "parking": true})
        );
    }

    #[test]
    fn test_merge_patch_non_object_replaces() {
        let mut target = json!({"wing": "east"});
        merge_patch(&mut target, &json!([1, 2]));
        assert_eq!(target, json!([1, 2]));
    }

    #[test]
    fn test_check_name_limits() {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, "name", "   ");
        check_name(&mut errors, "title", &"x".repeat(MAX_NAME_LEN + 1));
        check_name(&mut errors, "label", &"x".repeat(MAX_NAME_LEN));

        assert!(errors.has_field("name"));
        assert!(errors.has_field("title"));
        assert!(!errors.has_field("label"));
    }
}
