mod error;
mod keys;
mod patterns;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{
    floor_plan_key, lease_key, lease_list_key, occupancy_latest_key, occupancy_rollup_key,
    properties_list_key, properties_list_pattern, property_channel, property_floor_plans_key,
    property_floor_plans_pattern, property_key, property_leases_key, property_leases_pattern,
    property_occupancy_pattern, property_scope_pattern, scope_of_key, scope_of_pattern,
    tenant_leases_key, tenant_leases_pattern, user_key, users_list_key, users_list_pattern,
    KeyScope,
};
pub use patterns::pattern_matches;
pub use serialization::{deserialize, serialize, SerializationError};
pub use traits::{Cache, CachePubSub, FullCache};
