use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    FloorPlan, FloorPlanStatus, Lease, LeaseStatus, Property, PropertyStatus, Record, User,
    UserRole, UserStatus,
};

use super::TimeRangeError;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 200;

/// A half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new range, validating that start < end.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeRangeError> {
        if start >= end {
            return Err(TimeRangeError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    /// The `hours` hours leading up to `now`, or `None` when the start
    /// would precede the earliest representable instant.
    pub fn last_hours(now: DateTime<Utc>, hours: i64) -> Option<Self> {
        let start = now.checked_sub_signed(chrono::Duration::try_hours(hours.max(1))?)?;
        Some(Self { start, end: now })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    /// Stable representation used inside cache keys, exact to the nanosecond.
    pub fn cache_fragment(&self) -> String {
        format!(
            "{}.{:09}:{}.{:09}",
            self.start.timestamp(),
            self.start.timestamp_subsec_nanos(),
            self.end.timestamp(),
            self.end.timestamp_subsec_nanos()
        )
    }
}

/// Offset pagination with a clamped limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    /// Builds a page, falling back to the default limit and clamping to the maximum.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        let limit = limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        Self {
            limit,
            offset: offset.unwrap_or(0),
        }
    }

    /// Slices an already filtered and ordered collection.
    pub fn apply<T>(&self, items: Vec<T>) -> Paginated<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect();
        Paginated {
            items,
            total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// One page of results plus the total matching count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> Paginated<T> {
    pub fn empty(page: Page) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// Shared status rule: an explicit status matches exactly, otherwise archived
/// records are hidden unless requested.
fn status_matches<S: PartialEq>(
    wanted: Option<S>,
    actual: S,
    archived: bool,
    include_archived: bool,
) -> bool {
    match wanted {
        Some(status) => status == actual,
        None => include_archived || !archived,
    }
}

fn fragment<S: Display>(status: Option<S>, include_archived: bool, page: Page) -> String {
    let status = status.map_or_else(|| "any".to_string(), |s| s.to_string());
    format!(
        "status={status}&archived={include_archived}&limit={}&offset={}",
        page.limit, page.offset
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyFilter {
    pub status: Option<PropertyStatus>,
    pub include_archived: bool,
    pub page: Page,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        status_matches(
            self.status,
            property.status,
            property.is_archived(),
            self.include_archived,
        )
    }

    pub fn cache_fragment(&self) -> String {
        fragment(self.status, self.include_archived, self.page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorPlanFilter {
    pub property_id: Uuid,
    pub status: Option<FloorPlanStatus>,
    pub include_archived: bool,
    pub page: Page,
}

impl FloorPlanFilter {
    pub fn new(property_id: Uuid) -> Self {
        Self {
            property_id,
            status: None,
            include_archived: false,
            page: Page::default(),
        }
    }

    pub fn matches(&self, plan: &FloorPlan) -> bool {
        plan.property_id == self.property_id
            && status_matches(
                self.status,
                plan.status,
                plan.is_archived(),
                self.include_archived,
            )
    }

    pub fn cache_fragment(&self) -> String {
        fragment(self.status, self.include_archived, self.page)
    }
}

/// The parent a lease listing is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseScope {
    Property(Uuid),
    Tenant(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseFilter {
    pub scope: LeaseScope,
    pub status: Option<LeaseStatus>,
    pub include_archived: bool,
    pub page: Page,
}

impl LeaseFilter {
    pub fn new(scope: LeaseScope) -> Self {
        Self {
            scope,
            status: None,
            include_archived: false,
            page: Page::default(),
        }
    }

    pub fn matches(&self, lease: &Lease) -> bool {
        let in_scope = match self.scope {
            LeaseScope::Property(id) => lease.property_id == id,
            LeaseScope::Tenant(id) => lease.tenant_id == id,
        };
        in_scope
            && status_matches(
                self.status,
                lease.status,
                lease.is_archived(),
                self.include_archived,
            )
    }

    pub fn cache_fragment(&self) -> String {
        fragment(self.status, self.include_archived, self.page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub include_archived: bool,
    pub page: Page,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.role.is_none_or(|role| user.role == role)
            && status_matches(
                self.status,
                user.status,
                user.is_archived(),
                self.include_archived,
            )
    }

    pub fn cache_fragment(&self) -> String {
        let role = self.role.map_or("any", |r| r.as_str());
        format!(
            "role={role}&{}",
            fragment(self.status, self.include_archived, self.page)
        )
    }
}
