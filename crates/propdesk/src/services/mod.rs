//! Service layer between the HTTP handlers and the cached repositories.
//!
//! Services validate request payloads (collecting every field error), enrich
//! records with ids, default status, version and audit fields, check that
//! parent records exist, and then hand the record to the repository, which
//! owns the transaction and cache coherency.

mod floor_plans;
mod leases;
mod occupancy;
mod properties;
mod users;

use thiserror::Error;
use uuid::Uuid;

use propdesk_core::domain::{Property, Record, User, ValidationErrors};
use propdesk_core::storage::{PropertyRepository, RepositoryError, UserRepository};

pub use floor_plans::FloorPlanService;
pub use leases::LeaseService;
pub use occupancy::OccupancyService;
pub use properties::PropertyService;
pub use users::UserService;

/// The user a request acts on behalf of, taken from `x-user-id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Actor(Option<Uuid>);

impl Actor {
    pub fn new(user_id: Option<Uuid>) -> Self {
        Self(user_id)
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn id(&self) -> Option<Uuid> {
        self.0
    }
}

/// Errors returned by the services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// An update arrived without `If-Match` or a `version` field.
    #[error("Updating a {0} requires its current version (If-Match header or version field)")]
    PreconditionRequired(&'static str),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Turns a lookup miss into `NotFound`.
fn found<T: Record>(id: Uuid, record: Option<T>) -> Result<T> {
    record.ok_or_else(|| RepositoryError::not_found(T::ENTITY, id).into())
}

/// Resolves the version an update is conditional on.
///
/// The `If-Match` header wins over a `version` field in the body.
fn expected_version(entity: &'static str, if_match: Option<i64>, body: Option<i64>) -> Result<i64> {
    if_match
        .or(body)
        .ok_or(ServiceError::PreconditionRequired(entity))
}

/// Loads a record for an update and checks it can still change at `expected`.
fn writable<T: Record>(id: Uuid, record: Option<T>, expected: i64) -> Result<T> {
    let record = found(id, record)?;
    if record.is_archived() {
        return Err(RepositoryError::archived(T::ENTITY, id).into());
    }
    if record.version() != expected {
        return Err(
            RepositoryError::version_conflict(T::ENTITY, id, expected, record.version()).into(),
        );
    }
    Ok(record)
}

/// Checks that `property_id` names a live property, reporting on `field`.
async fn check_property(
    properties: &dyn PropertyRepository,
    errors: &mut ValidationErrors,
    field: &str,
    property_id: Uuid,
) -> Result<Option<Property>> {
    match properties.get_property(property_id).await? {
        None => {
            errors.push(field, "property does not exist");
            Ok(None)
        }
        Some(property) if property.is_archived() => {
            errors.push(field, "property is archived");
            Ok(None)
        }
        Some(property) => Ok(Some(property)),
    }
}

/// Checks that `user_id` names a live user, reporting on `field`.
async fn check_user(
    users: &dyn UserRepository,
    errors: &mut ValidationErrors,
    field: &str,
    user_id: Uuid,
) -> Result<Option<User>> {
    match users.get_user(user_id).await? {
        None => {
            errors.push(field, "user does not exist");
            Ok(None)
        }
        Some(user) if user.is_archived() => {
            errors.push(field, "user is archived");
            Ok(None)
        }
        Some(user) => Ok(Some(user)),
    }
}

/// Rejects empty batches and batches above `max`.
fn check_batch_size(field: &str, len: usize, max: usize) -> Result<()> {
    if len == 0 {
        return Err(ValidationErrors::single(field, "must contain at least one item").into());
    }
    if len > max {
        return Err(
            ValidationErrors::single(field, format!("must contain at most {max} items")).into(),
        );
    }
    Ok(())
}
