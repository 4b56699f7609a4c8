use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{check_blob, check_name, empty_object, merge_patch, Audit, Record, UnknownVariant};
use super::error::ValidationErrors;

/// Lowest floor accepted (deep basements).
pub const MIN_FLOOR: i32 = -10;
/// Highest floor accepted.
pub const MAX_FLOOR: i32 = 300;
/// Upper bound for width and length, in meters.
pub const MAX_DIMENSION_M: f64 = 10_000.0;

/// Publication state of a floor plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FloorPlanStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl FloorPlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FloorPlanStatus::Draft => "DRAFT",
            FloorPlanStatus::Published => "PUBLISHED",
            FloorPlanStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for FloorPlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FloorPlanStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(FloorPlanStatus::Draft),
            "PUBLISHED" => Ok(FloorPlanStatus::Published),
            "ARCHIVED" => Ok(FloorPlanStatus::Archived),
            other => Err(UnknownVariant::new("floor plan status", other)),
        }
    }
}

/// The layout of one floor of a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPlan {
    pub id: Uuid,
    pub property_id: Uuid,
    pub name: String,
    pub floor_number: i32,
    pub width_m: f64,
    pub length_m: f64,
    /// Derived from width and length; recomputed on every change.
    pub area_sqm: f64,
    pub capacity: Option<i64>,
    pub status: FloorPlanStatus,
    pub metadata: serde_json::Value,
    #[serde(flatten)]
    pub audit: Audit,
    pub version: i64,
}

impl FloorPlan {
    pub fn recompute_area(&mut self) {
        self.area_sqm = self.width_m * self.length_m;
    }
}

impl Record for FloorPlan {
    const ENTITY: &'static str = "FloorPlan";

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn is_archived(&self) -> bool {
        self.status == FloorPlanStatus::Archived
    }

    fn mark_archived(&mut self, actor: Option<Uuid>, at: DateTime<Utc>) {
        self.status = FloorPlanStatus::Archived;
        self.audit.touch(actor, at);
        self.version += 1;
    }
}

/// Request payload for creating a floor plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFloorPlanRequest {
    pub property_id: Uuid,
    pub name: String,
    pub floor_number: i32,
    pub width_m: f64,
    pub length_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl CreateFloorPlanRequest {
    pub fn new(
        property_id: Uuid,
        name: impl Into<String>,
        floor_number: i32,
        width_m: f64,
        length_m: f64,
    ) -> Self {
        Self {
            property_id,
            name: name.into(),
            floor_number,
            width_m,
            length_m,
            capacity: None,
            metadata: None,
        }
    }

    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Builds a draft floor plan at version 1.
    pub fn into_floor_plan(self, actor: Option<Uuid>, now: DateTime<Utc>) -> FloorPlan {
        let mut plan = FloorPlan {
            id: Uuid::new_v4(),
            property_id: self.property_id,
            name: self.name.trim().to_string(),
            floor_number: self.floor_number,
            width_m: self.width_m,
            length_m: self.length_m,
            area_sqm: 0.0,
            capacity: self.capacity,
            status: FloorPlanStatus::default(),
            metadata: self.metadata.unwrap_or_else(empty_object),
            audit: Audit::new(actor, now),
            version: 1,
        };
        plan.recompute_area();
        plan
    }
}

/// Request payload for creating several floor plans at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCreateFloorPlansRequest {
    pub items: Vec<CreateFloorPlanRequest>,
}

/// Partial update for a floor plan. The parent property cannot change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFloorPlanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_m: Option<f64>,
    /// `null` clears the capacity.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::serde::double_option"
    )]
    pub capacity: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FloorPlanStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl UpdateFloorPlanRequest {
    pub fn apply(&self, plan: &mut FloorPlan) -> Result<(), ValidationErrors> {
        if let Some(status) = self.status {
            validate_floor_plan_transition(plan.status, status)?;
            plan.status = status;
        }
        if let Some(name) = &self.name {
            plan.name = name.trim().to_string();
        }
        if let Some(floor_number) = self.floor_number {
            plan.floor_number = floor_number;
        }
        if let Some(width) = self.width_m {
            plan.width_m = width;
        }
        if let Some(length) = self.length_m {
            plan.length_m = length;
        }
        if let Some(capacity) = self.capacity {
            plan.capacity = capacity;
        }
        if let Some(patch) = &self.metadata {
            merge_patch(&mut plan.metadata, patch);
        }
        plan.recompute_area();
        Ok(())
    }
}

pub fn validate_floor_plan_transition(
    from: FloorPlanStatus,
    to: FloorPlanStatus,
) -> Result<(), ValidationErrors> {
    use FloorPlanStatus::*;
    match (from, to) {
        (a, b) if a == b => Ok(()),
        (Draft, Published) | (Published, Draft) => Ok(()),
        (_, Archived) => Err(ValidationErrors::single(
            "status",
            "use delete to archive a floor plan",
        )),
        (from, to) => Err(ValidationErrors::single(
            "status",
            format!("cannot change from {from} to {to}"),
        )),
    }
}

fn check_dimension(errors: &mut ValidationErrors, field: &str, value: f64) {
    if !value.is_finite() || value <= 0.0 {
        errors.push(field, "must be a positive number");
    } else if value > MAX_DIMENSION_M {
        errors.push(field, format!("must be at most {MAX_DIMENSION_M} meters"));
    }
}

/// Validates every field of a floor plan.
pub fn validate_floor_plan(plan: &FloorPlan) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "name", &plan.name);
    errors.check(
        !(MIN_FLOOR..=MAX_FLOOR).contains(&plan.floor_number),
        "floor_number",
        &format!("must be between {MIN_FLOOR} and {MAX_FLOOR}"),
    );
    check_dimension(&mut errors, "width_m", plan.width_m);
    check_dimension(&mut errors, "length_m", plan.length_m);
    if let Some(capacity) = plan.capacity {
        errors.check(capacity < 0, "capacity", "cannot be negative");
    }
    check_blob(&mut errors, "metadata", &plan.metadata);
    errors.into_result()
}
