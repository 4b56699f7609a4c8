//! Cached user repository decorator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use propdesk_core::cache::{user_key, users_list_key, users_list_pattern, Cache};
use propdesk_core::domain::User;
use propdesk_core::storage::{Paginated, Result, UserFilter, UserRepository};

use super::LookAside;

/// Cached user repository decorator.
pub struct CachedUserRepository<R, C>
where
    R: UserRepository,
    C: Cache,
{
    repository: Arc<R>,
    cache: LookAside<C>,
}

impl<R, C> CachedUserRepository<R, C>
where
    R: UserRepository,
    C: Cache,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            repository,
            cache: LookAside::new(cache, ttl),
        }
    }
}

#[async_trait]
impl<R, C> UserRepository for CachedUserRepository<R, C>
where
    R: UserRepository + 'static,
    C: Cache + 'static,
{
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.cache
            .record(user_key(id), || self.repository.get_user(id))
            .await
    }

    async fn load_user_for_update(&self, id: Uuid) -> Result<Option<User>> {
        self.repository.get_user(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.repository.get_user_by_email(email).await
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Paginated<User>> {
        self.cache
            .value(users_list_key(&filter.cache_fragment()), || {
                self.repository.list_users(filter)
            })
            .await
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        self.repository.create_user(user).await?;
        self.cache.invalidate_pattern(&users_list_pattern()).await;

        tracing::debug!(user_id = %user.id, "User created");
        Ok(())
    }

    async fn update_user(&self, user: &User, expected_version: i64) -> Result<()> {
        self.repository.update_user(user, expected_version).await?;
        self.cache.invalidate(&user_key(user.id)).await;
        self.cache.invalidate_pattern(&users_list_pattern()).await;

        tracing::debug!(user_id = %user.id, version = user.version, "User updated");
        Ok(())
    }

    async fn archive_user(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<User> {
        let user = self
            .repository
            .archive_user(id, actor, at, expected_version)
            .await?;
        self.cache.invalidate(&user_key(id)).await;
        self.cache.invalidate_pattern(&users_list_pattern()).await;

        tracing::debug!(user_id = %id, "User archived");
        Ok(user)
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use propdesk_core::domain::{CreateUserRequest, UserRole};

    use crate::storage::cached::test_support::MockCache;
    use crate::storage::inmemory::InMemoryRepository;

    #[tokio::test]
    async fn test_user_listing_invalidated_on_write() {
        let cache = Arc::new(MockCache::new());
        let cached = CachedUserRepository::new(
            Arc::new(InMemoryRepository::new()),
            cache.clone(),
            Duration::from_secs(300),
        );
        let filter = UserFilter::default();
        let key = users_list_key(&filter.cache_fragment());

        cached.list_users(&filter).await.unwrap();
        assert!(cache.contains(&key).await);

        let mut ada = CreateUserRequest::new("Ada", "ada@example.com").into_user(None, Utc::now());
        cached.create_user(&ada).await.unwrap();
        assert!(!cache.contains(&key).await);

        cached.get_user(ada.id).await.unwrap();
        ada.role = UserRole::Manager;
        ada.version = 2;
        cached.update_user(&ada, 1).await.unwrap();
        assert!(!cache.contains(&user_key(ada.id)).await);

        let listed = cached.list_users(&filter).await.unwrap();
        assert_eq!(listed.items[0].role, UserRole::Manager);
    }

    #[tokio::test]
    async fn test_duplicate_email_leaves_listing_cached() {
        let cache = Arc::new(MockCache::new());
        let cached = CachedUserRepository::new(
            Arc::new(InMemoryRepository::new()),
            cache.clone(),
            Duration::from_secs(300),
        );
        let ada = CreateUserRequest::new("Ada", "ada@example.com").into_user(None, Utc::now());
        cached.create_user(&ada).await.unwrap();

        let filter = UserFilter::default();
        cached.list_users(&filter).await.unwrap();

        let clash = CreateUserRequest::new("Ada Two", "ada@example.com").into_user(None, Utc::now());
        assert!(cached.create_user(&clash).await.is_err());
        assert!(cache.contains(&users_list_key(&filter.cache_fragment())).await);
    }
}
