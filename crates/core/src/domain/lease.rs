use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{check_blob, empty_object, merge_patch, Audit, Record, UnknownVariant};
use super::error::ValidationErrors;

const MAX_UNIT_LEN: usize = 50;

/// Lifecycle of a lease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaseStatus {
    #[default]
    Pending,
    Active,
    Terminated,
    Expired,
    Archived,
}

impl LeaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseStatus::Pending => "PENDING",
            LeaseStatus::Active => "ACTIVE",
            LeaseStatus::Terminated => "TERMINATED",
            LeaseStatus::Expired => "EXPIRED",
            LeaseStatus::Archived => "ARCHIVED",
        }
    }

    /// Statuses reachable from `self` through an update.
    pub fn next_states(&self) -> &'static [LeaseStatus] {
        match self {
            LeaseStatus::Pending => &[LeaseStatus::Active, LeaseStatus::Terminated],
            LeaseStatus::Active => &[LeaseStatus::Terminated, LeaseStatus::Expired],
            LeaseStatus::Terminated | LeaseStatus::Expired | LeaseStatus::Archived => &[],
        }
    }
}

impl fmt::Display for LeaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaseStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(LeaseStatus::Pending),
            "ACTIVE" => Ok(LeaseStatus::Active),
            "TERMINATED" => Ok(LeaseStatus::Terminated),
            "EXPIRED" => Ok(LeaseStatus::Expired),
            "ARCHIVED" => Ok(LeaseStatus::Archived),
            other => Err(UnknownVariant::new("lease status", other)),
        }
    }
}

/// A tenant's agreement to occupy a unit of a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    pub id: Uuid,
    pub property_id: Uuid,
    pub tenant_id: Uuid,
    pub unit: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent_cents: i64,
    pub deposit_cents: i64,
    /// ISO 4217 code, e.g. `USD`.
    pub currency: String,
    pub status: LeaseStatus,
    pub terms: serde_json::Value,
    #[serde(flatten)]
    pub audit: Audit,
    pub version: i64,
}

impl Lease {
    /// Number of days covered by the lease.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

impl Record for Lease {
    const ENTITY: &'static str = "Lease";

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn is_archived(&self) -> bool {
        self.status == LeaseStatus::Archived
    }

    fn mark_archived(&mut self, actor: Option<Uuid>, at: DateTime<Utc>) {
        self.status = LeaseStatus::Archived;
        self.audit.touch(actor, at);
        self.version += 1;
    }
}

/// Request payload for creating a lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeaseRequest {
    pub property_id: Uuid,
    pub tenant_id: Uuid,
    pub unit: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent_cents: i64,
    #[serde(default)]
    pub deposit_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<serde_json::Value>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl CreateLeaseRequest {
    pub fn into_lease(self, actor: Option<Uuid>, now: DateTime<Utc>) -> Lease {
        Lease {
            id: Uuid::new_v4(),
            property_id: self.property_id,
            tenant_id: self.tenant_id,
            unit: self.unit.trim().to_string(),
            start_date: self.start_date,
            end_date: self.end_date,
            monthly_rent_cents: self.monthly_rent_cents,
            deposit_cents: self.deposit_cents,
            currency: self.currency.trim().to_uppercase(),
            status: LeaseStatus::default(),
            terms: self.terms.unwrap_or_else(empty_object),
            audit: Audit::new(actor, now),
            version: 1,
        }
    }
}

/// Partial update for a lease. Property and tenant are fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLeaseRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_rent_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeaseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl UpdateLeaseRequest {
    pub fn apply(&self, lease: &mut Lease) -> Result<(), ValidationErrors> {
        if let Some(status) = self.status {
            validate_lease_transition(lease.status, status)?;
            lease.status = status;
        }
        if let Some(unit) = &self.unit {
            lease.unit = unit.trim().to_string();
        }
        if let Some(start) = self.start_date {
            lease.start_date = start;
        }
        if let Some(end) = self.end_date {
            lease.end_date = end;
        }
        if let Some(rent) = self.monthly_rent_cents {
            lease.monthly_rent_cents = rent;
        }
        if let Some(deposit) = self.deposit_cents {
            lease.deposit_cents = deposit;
        }
        if let Some(currency) = &self.currency {
            lease.currency = currency.trim().to_uppercase();
        }
        if let Some(patch) = &self.terms {
            merge_patch(&mut lease.terms, patch);
        }
        Ok(())
    }
}

/// Checks a status change requested through an update.
pub fn validate_lease_transition(from: LeaseStatus, to: LeaseStatus) -> Result<(), ValidationErrors> {
    if from == to || from.next_states().contains(&to) {
        return Ok(());
    }
    if to == LeaseStatus::Archived {
        return Err(ValidationErrors::single(
            "status",
            "use delete to archive a lease",
        ));
    }
    Err(ValidationErrors::single(
        "status",
        format!("cannot change from {from} to {to}"),
    ))
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

/// Validates every field of a lease.
pub fn validate_lease(lease: &Lease) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if lease.unit.trim().is_empty() {
        errors.push("unit", "cannot be empty");
    } else if lease.unit.chars().count() > MAX_UNIT_LEN {
        errors.push("unit", format!("must be at most {MAX_UNIT_LEN} characters"));
    }
    errors.check(
        lease.end_date <= lease.start_date,
        "end_date",
        "must be after start_date",
    );
    errors.check(
        lease.monthly_rent_cents < 0,
        "monthly_rent_cents",
        "cannot be negative",
    );
    errors.check(lease.deposit_cents < 0, "deposit_cents", "cannot be negative");
    errors.check(
        !is_currency_code(&lease.currency),
        "currency",
        "must be a three letter ISO 4217 code",
    );
    check_blob(&mut errors, "terms", &lease.terms);
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lease() -> Lease {
        CreateLeaseRequest {
            property_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            unit: "4B".to_string(),
            start_date: date(2025, 1, 1),
            end_date: date(2025, 12, 31),
            monthly_rent_cents: 180_000,
            deposit_cents: 360_000,
            currency: "usd".to_string(),
            terms: None,
        }
        .into_lease(None, Utc::now())
    }

    #[test]
    fn test_create_defaults() {
        let l = lease();
        assert_eq!(l.status, LeaseStatus::Pending);
        assert_eq!(l.currency, "USD");
        assert_eq!(l.version, 1);
        assert_eq!(l.duration_days(), 364);
        assert!(validate_lease(&l).is_ok());
    }

    #[test]
    fn test_end_date_must_follow_start() {
        let mut l = lease();
        l.end_date = l.start_date;
        assert!(validate_lease(&l).unwrap_err().has_field("end_date"));
    }

    #[test]
    fn test_rejects_negative_amounts() {
        let mut l = lease();
        l.monthly_rent_cents = -1;
        l.deposit_cents = -500;
        let errors = validate_lease(&l).unwrap_err();
        assert!(errors.has_field("monthly_rent_cents"));
        assert!(errors.has_field("deposit_cents"));
    }

    #[test]
    fn test_zero_rent_is_allowed() {
        let mut l = lease();
        l.monthly_rent_cents = 0;
        assert!(validate_lease(&l).is_ok());
    }

    #[test]
    fn test_rejects_bad_currency() {
        for code in ["US", "USDT", "U$D", ""] {
            let mut l = lease();
            l.currency = code.to_string();
            assert!(validate_lease(&l).unwrap_err().has_field("currency"));
        }
    }

    #[test]
    fn test_transitions() {
        use LeaseStatus::*;
        assert!(validate_lease_transition(Pending, Active).is_ok());
        assert!(validate_lease_transition(Active, Expired).is_ok());
        assert!(validate_lease_transition(Active, Active).is_ok());
        assert!(validate_lease_transition(Terminated, Active).is_err());
        assert!(validate_lease_transition(Pending, Expired).is_err());
        assert!(validate_lease_transition(Active, Archived).is_err());
    }

    #[test]
    fn test_update_moving_end_before_start_is_caught() {
        let mut l = lease();
        let req = UpdateLeaseRequest {
            end_date: Some(date(2024, 6, 1)),
            ..Default::default()
        };
        req.apply(&mut l).unwrap();
        assert!(validate_lease(&l).unwrap_err().has_field("end_date"));
    }
}
