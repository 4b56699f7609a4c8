use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{check_blob, check_name, empty_object, merge_patch, Audit, Record, UnknownVariant};
use super::error::ValidationErrors;

const MAX_ADDRESS_LEN: usize = 500;

/// Lifecycle of a property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyStatus {
    #[default]
    Active,
    Inactive,
    Archived,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Active => "ACTIVE",
            PropertyStatus::Inactive => "INACTIVE",
            PropertyStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(PropertyStatus::Active),
            "INACTIVE" => Ok(PropertyStatus::Inactive),
            "ARCHIVED" => Ok(PropertyStatus::Archived),
            other => Err(UnknownVariant::new("property status", other)),
        }
    }
}

/// A managed building or site. Parent of floor plans, leases and occupancy data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub status: PropertyStatus,
    pub metadata: serde_json::Value,
    #[serde(flatten)]
    pub audit: Audit,
    pub version: i64,
}

impl Record for Property {
    const ENTITY: &'static str = "Property";

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn is_archived(&self) -> bool {
        self.status == PropertyStatus::Archived
    }

    fn mark_archived(&mut self, actor: Option<Uuid>, at: DateTime<Utc>) {
        self.status = PropertyStatus::Archived;
        self.audit.touch(actor, at);
        self.version += 1;
    }
}

/// Request payload for creating a property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePropertyRequest {
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl CreatePropertyRequest {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            metadata: None,
        }
    }

    /// Builds the record with a fresh id, default status and version 1.
    pub fn into_property(self, actor: Option<Uuid>, now: DateTime<Utc>) -> Property {
        Property {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            status: PropertyStatus::default(),
            metadata: self.metadata.unwrap_or_else(empty_object),
            audit: Audit::new(actor, now),
            version: 1,
        }
    }
}

/// Partial update for a property. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePropertyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PropertyStatus>,
    /// Merge patch applied to the stored metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Version the caller last read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl UpdatePropertyRequest {
    /// Applies the patch, then validates the status change.
    pub fn apply(&self, property: &mut Property) -> Result<(), ValidationErrors> {
        if let Some(status) = self.status {
            validate_property_transition(property.status, status)?;
            property.status = status;
        }
        if let Some(name) = &self.name {
            property.name = name.trim().to_string();
        }
        if let Some(address) = &self.address {
            property.address = address.trim().to_string();
        }
        if let Some(patch) = &self.metadata {
            merge_patch(&mut property.metadata, patch);
        }
        Ok(())
    }
}

/// Status changes allowed through an update. Archiving goes through delete.
pub fn validate_property_transition(
    from: PropertyStatus,
    to: PropertyStatus,
) -> Result<(), ValidationErrors> {
    use PropertyStatus::*;
    match (from, to) {
        (a, b) if a == b => Ok(()),
        (Active, Inactive) | (Inactive, Active) => Ok(()),
        (_, Archived) => Err(ValidationErrors::single(
            "status",
            "use delete to archive a property",
        )),
        (from, to) => Err(ValidationErrors::single(
            "status",
            format!("cannot change from {from} to {to}"),
        )),
    }
}

/// Validates every field of a property.
pub fn validate_property(property: &Property) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "name", &property.name);
    if property.address.trim().is_empty() {
        errors.push("address", "cannot be empty");
    } else if property.address.chars().count() > MAX_ADDRESS_LEN {
        errors.push(
            "address",
            format!("must be at most {MAX_ADDRESS_LEN} characters"),
        );
    }
    check_blob(&mut errors, "metadata", &property.metadata);
    errors.into_result()
}
