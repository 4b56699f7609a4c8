use uuid::Uuid;

use crate::storage::{LeaseScope, TimeRange};

const TRACKING_SUFFIX: &str = "_keys";
const PROPERTIES: &str = "properties";
const USERS: &str = "users";

/// Returns the cache key for a single property.
pub fn property_key(property_id: Uuid) -> String {
    format!("property:{}", property_id)
}

/// Returns the cache key for a single floor plan.
pub fn floor_plan_key(floor_plan_id: Uuid) -> String {
    format!("floor_plan:{}", floor_plan_id)
}

/// Returns the cache key for a single lease.
pub fn lease_key(lease_id: Uuid) -> String {
    format!("lease:{}", lease_id)
}

/// Returns the cache key for a user.
pub fn user_key(user_id: Uuid) -> String {
    format!("user:{}", user_id)
}

/// Returns the cache key for one page of the property listing.
pub fn properties_list_key(query: &str) -> String {
    format!("{PROPERTIES}:{query}")
}

pub fn properties_list_pattern() -> String {
    format!("{PROPERTIES}:*")
}

/// Returns the cache key for one page of the user listing.
pub fn users_list_key(query: &str) -> String {
    format!("{USERS}:{query}")
}

pub fn users_list_pattern() -> String {
    format!("{USERS}:*")
}

/// Returns the cache key for one page of a property's floor plans.
pub fn property_floor_plans_key(property_id: Uuid, query: &str) -> String {
    format!("property:{}:floor_plans:{}", property_id, query)
}

/// Returns the pattern for matching every floor plan listing of a property.
pub fn property_floor_plans_pattern(property_id: Uuid) -> String {
    format!("property:{}:floor_plans:*", property_id)
}

pub fn property_leases_key(property_id: Uuid, query: &str) -> String {
    format!("property:{}:leases:{}", property_id, query)
}

pub fn property_leases_pattern(property_id: Uuid) -> String {
    format!("property:{}:leases:*", property_id)
}

pub fn tenant_leases_key(tenant_id: Uuid, query: &str) -> String {
    format!("tenant:{}:leases:{}", tenant_id, query)
}

pub fn tenant_leases_pattern(tenant_id: Uuid) -> String {
    format!("tenant:{}:leases:*", tenant_id)
}

/// Returns the listing key for a lease query in either scope.
pub fn lease_list_key(scope: LeaseScope, query: &str) -> String {
    match scope {
        LeaseScope::Property(id) => property_leases_key(id, query),
        LeaseScope::Tenant(id) => tenant_leases_key(id, query),
    }
}

/// Returns the cache key for the newest reading of a property.
pub fn occupancy_latest_key(property_id: Uuid) -> String {
    format!("property:{}:occupancy:latest", property_id)
}

/// Returns the cache key for an hourly rollup window.
pub fn occupancy_rollup_key(property_id: Uuid, range: &TimeRange) -> String {
    format!(
        "property:{}:occupancy:hourly:{}",
        property_id,
        range.cache_fragment()
    )
}

/// Returns the pattern matching every cached occupancy view of a property.
pub fn property_occupancy_pattern(property_id: Uuid) -> String {
    format!("property:{}:occupancy:*", property_id)
}

/// Returns the pattern matching every listing scoped to a property.
pub fn property_scope_pattern(property_id: Uuid) -> String {
    format!("property:{}:*", property_id)
}

/// Returns the pub/sub channel name for a property's live events.
pub fn property_channel(property_id: Uuid) -> String {
    format!("channel:property:{}", property_id)
}

/// The owner of a group of listing keys.
///
/// Listing keys are tracked in a set per scope so that pattern deletion can
/// find them without scanning the whole keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyScope {
    Property(Uuid),
    Tenant(Uuid),
    Properties,
    Users,
}

impl KeyScope {
    /// Returns the key of the set tracking this scope's listing keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use propdesk_core::cache::KeyScope;
    /// use uuid::Uuid;
    ///
    /// let scope = KeyScope::Property(Uuid::nil());
    /// assert_eq!(
    ///     scope.tracking_key(),
    ///     "property:00000000-0000-0000-0000-000000000000:_keys"
    /// );
    /// assert_eq!(KeyScope::Users.tracking_key(), "users:_keys");
    /// ```
    pub fn tracking_key(&self) -> String {
        match self {
            KeyScope::Property(id) => format!("property:{}:{TRACKING_SUFFIX}", id),
            KeyScope::Tenant(id) => format!("tenant:{}:{TRACKING_SUFFIX}", id),
            KeyScope::Properties => format!("{PROPERTIES}:{TRACKING_SUFFIX}"),
            KeyScope::Users => format!("{USERS}:{TRACKING_SUFFIX}"),
        }
    }
}

fn parse_scope(input: &str) -> Option<KeyScope> {
    let mut parts = input.split(':');
    let head = parts.next()?;
    match head {
        PROPERTIES | USERS => {
            let rest = parts.next()?;
            if rest == TRACKING_SUFFIX {
                return None;
            }
            Some(if head == PROPERTIES {
                KeyScope::Properties
            } else {
                KeyScope::Users
            })
        }
        "property" | "tenant" => {
            let id = Uuid::parse_str(parts.next()?).ok()?;
            // A listing key has at least one segment after the id that is not
            // the tracking suffix; `property:{id}` alone is a record key.
            let kind = parts.next()?;
            if kind == TRACKING_SUFFIX {
                return None;
            }
            Some(if head == "property" {
                KeyScope::Property(id)
            } else {
                KeyScope::Tenant(id)
            })
        }
        _ => None,
    }
}

/// Returns the scope of a listing key, or `None` for record and tracking keys.
///
/// # Examples
///
/// ```
/// use propdesk_core::cache::{scope_of_key, KeyScope};
/// use uuid::Uuid;
///
/// let id = Uuid::nil();
/// let key = format!("property:{}:floor_plans:status=any", id);
/// assert_eq!(scope_of_key(&key), Some(KeyScope::Property(id)));
///
/// assert_eq!(scope_of_key(&format!("property:{}", id)), None);
/// assert_eq!(scope_of_key("floor_plan:123"), None);
/// ```
pub fn scope_of_key(key: &str) -> Option<KeyScope> {
    parse_scope(key)
}

/// Returns the scope a pattern is confined to, if it names one.
///
/// Returns `None` for patterns that wildcard the scope id and must fall back
/// to a full scan.
///
/// # Examples
///
/// ```
/// use propdesk_core::cache::{scope_of_pattern, KeyScope};
/// use uuid::Uuid;
///
/// let id = Uuid::nil();
/// assert_eq!(
///     scope_of_pattern(&format!("tenant:{}:leases:*", id)),
///     Some(KeyScope::Tenant(id))
/// );
/// assert_eq!(scope_of_pattern("properties:*"), Some(KeyScope::Properties));
/// assert_eq!(scope_of_pattern("property:*:leases:*"), None);
/// ```
pub fn scope_of_pattern(pattern: &str) -> Option<KeyScope> {
    // A wildcarded id fails to parse as a UUID, which yields `None` here.
    parse_scope(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn test_uuid() -> Uuid {
        Uuid::nil()
    }

    #[test]
    fn test_record_keys() {
        let id = test_uuid();
        assert_eq!(
            property_key(id),
            "property:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            floor_plan_key(id),
            "floor_plan:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(lease_key(id), "lease:00000000-0000-0000-0000-000000000000");
        assert_eq!(user_key(id), "user:00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_floor_plan_list_key_matches_pattern() {
        let id = test_uuid();
        let key = property_floor_plans_key(id, "status=any&archived=false&limit=50&offset=0");
        assert!(crate::cache::pattern_matches(
            &property_floor_plans_pattern(id),
            &key
        ));
        assert!(!crate::cache::pattern_matches(
            &property_leases_pattern(id),
            &key
        ));
    }

    #[test]
    fn test_lease_list_key_by_scope() {
        let id = test_uuid();
        assert_eq!(
            lease_list_key(LeaseScope::Property(id), "q"),
            property_leases_key(id, "q")
        );
        assert_eq!(
            lease_list_key(LeaseScope::Tenant(id), "q"),
            tenant_leases_key(id, "q")
        );
    }

    #[test]
    fn test_occupancy_keys_share_pattern() {
        let id = test_uuid();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let range = TimeRange::new(start, start + chrono::Duration::hours(6)).unwrap();
        let pattern = property_occupancy_pattern(id);

        assert!(crate::cache::pattern_matches(
            &pattern,
            &occupancy_latest_key(id)
        ));
        assert!(crate::cache::pattern_matches(
            &pattern,
            &occupancy_rollup_key(id, &range)
        ));
    }

    #[test]
    fn test_property_channel() {
        assert_eq!(
            property_channel(test_uuid()),
            "channel:property:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_scope_of_listing_keys() {
        let id = Uuid::new_v4();
        assert_eq!(
            scope_of_key(&property_leases_key(id, "q")),
            Some(KeyScope::Property(id))
        );
        assert_eq!(
            scope_of_key(&tenant_leases_key(id, "q")),
            Some(KeyScope::Tenant(id))
        );
        assert_eq!(
            scope_of_key(&occupancy_latest_key(id)),
            Some(KeyScope::Property(id))
        );
        assert_eq!(
            scope_of_key(&properties_list_key("q")),
            Some(KeyScope::Properties)
        );
        assert_eq!(scope_of_key(&users_list_key("q")), Some(KeyScope::Users));
    }

    #[test]
    fn test_scope_of_non_listing_keys() {
        let id = Uuid::new_v4();
        assert_eq!(scope_of_key(&property_key(id)), None);
        assert_eq!(scope_of_key(&user_key(id)), None);
        assert_eq!(scope_of_key(&KeyScope::Property(id).tracking_key()), None);
        assert_eq!(scope_of_key(&KeyScope::Users.tracking_key()), None);
        assert_eq!(scope_of_key("property:not-a-uuid:leases:q"), None);
    }

    #[test]
    fn test_scope_of_patterns() {
        let id = Uuid::new_v4();
        assert_eq!(
            scope_of_pattern(&property_floor_plans_pattern(id)),
            Some(KeyScope::Property(id))
        );
        assert_eq!(
            scope_of_pattern(&property_scope_pattern(id)),
            Some(KeyScope::Property(id))
        );
        assert_eq!(scope_of_pattern(&users_list_pattern()), Some(KeyScope::Users));
        assert_eq!(scope_of_pattern("tenant:*:leases:*"), None);
        assert_eq!(scope_of_pattern("floor_plan:*"), None);
    }
}
