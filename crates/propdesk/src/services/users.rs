use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use propdesk_core::domain::{validate_user, CreateUserRequest, Record, UpdateUserRequest, User};
use propdesk_core::storage::{Paginated, UserFilter, UserRepository};

use super::{expected_version, found, writable, Actor, Result};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Creates a user. The normalized email must not belong to anyone else.
    pub async fn create(&self, request: CreateUserRequest, actor: Actor) -> Result<User> {
        let user = request.into_user(actor.id(), Utc::now());
        validate_user(&user)?;

        self.users.create_user(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "Created user");
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        found(id, self.users.get_user(id).await?)
    }

    pub async fn list(&self, filter: &UserFilter) -> Result<Paginated<User>> {
        Ok(self.users.list_users(filter).await?)
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateUserRequest,
        if_match: Option<i64>,
        actor: Actor,
    ) -> Result<User> {
        let expected = expected_version(User::ENTITY, if_match, request.version)?;
        let mut user = writable(id, self.users.load_user_for_update(id).await?, expected)?;

        request.apply(&mut user)?;
        validate_user(&user)?;
        user.audit.touch(actor.id(), Utc::now());
        user.version = expected + 1;

        self.users.update_user(&user, expected).await?;

        tracing::info!(user_id = %id, version = user.version, "Updated user");
        Ok(user)
    }

    pub async fn archive(&self, id: Uuid, if_match: Option<i64>, actor: Actor) -> Result<User> {
        let user = self
            .users
            .archive_user(id, actor.id(), Utc::now(), if_match)
            .await?;

        tracing::info!(user_id = %id, "Archived user");
        Ok(user)
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use propdesk_core::domain::{UserRole, UserStatus};
    use propdesk_core::storage::RepositoryError;

    use crate::services::ServiceError;
    use crate::storage::InMemoryRepository;

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_case_insensitively() {
        let service = service();
        service
            .create(CreateUserRequest::new("Ada", "ada@example.com"), Actor::anonymous())
            .await
            .unwrap();

        let clash = service
            .create(CreateUserRequest::new("Ada L", "ADA@example.com"), Actor::anonymous())
            .await;

        assert!(matches!(
            clash,
            Err(ServiceError::Repository(RepositoryError::AlreadyExists { .. }))
        ));
    }

    #[tokio::test]
    async fn test_invalid_email_is_a_field_error() {
        let Err(ServiceError::Validation(errors)) = service()
            .create(CreateUserRequest::new("Ada", "ada-at-example"), Actor::anonymous())
            .await
        else {
            panic!("expected validation errors");
        };
        assert!(errors.has_field("email"));
    }

    #[tokio::test]
    async fn test_suspend_and_promote() {
        let service = service();
        let user = service
            .create(
                CreateUserRequest::new("Grace", "grace@example.com").with_role(UserRole::Viewer),
                Actor::anonymous(),
            )
            .await
            .unwrap();

        let updated = service
            .update(
                user.id,
                UpdateUserRequest {
                    role: Some(UserRole::Manager),
                    status: Some(UserStatus::Suspended),
                    ..Default::default()
                },
                Some(1),
                Actor::anonymous(),
            )
            .await
            .unwrap();

        assert_eq!(updated.role, UserRole::Manager);
        assert_eq!(updated.status, UserStatus::Suspended);

        let listed = service
            .list(&UserFilter {
                role: Some(UserRole::Manager),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.total, 1);
    }
}
