//! Application state with repository-based storage.
//!
//! This module defines the shared application state that is passed to all
//! request handlers. Services sit on top of cached repository trait objects,
//! and the backend combination is chosen via feature flags.

use std::{
    collections::{HashSet, VecDeque},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};
use tokio::sync::broadcast;
use uuid::Uuid;

use propdesk_core::cache::{Cache, CachePubSub};
use propdesk_core::domain::OccupancyEvent;
use propdesk_core::storage::{
    FloorPlanRepository, HealthCheck, LeaseRepository, OccupancyRepository, PropertyRepository,
    UserRepository,
};

use crate::config::Config;
use crate::services::{
    FloorPlanService, LeaseService, OccupancyService, PropertyService, UserService,
};
use crate::storage::cached::{
    CachedFloorPlanRepository, CachedLeaseRepository, CachedOccupancyRepository,
    CachedPropertyRepository, CachedUserRepository,
};

/// A stored event with its ID for replay on reconnection.
#[derive(Clone, Debug)]
pub struct StoredEvent {
    pub id: u64,
    pub property_id: Uuid,
    pub event: OccupancyEvent,
}

/// Shared application state.
///
/// Cloned for each request handler.
#[derive(Clone)]
pub struct AppState {
    pub properties: PropertyService,
    pub floor_plans: FloorPlanService,
    pub leases: LeaseService,
    pub users: UserService,
    pub occupancy: OccupancyService,
    /// Storage probe for `/readyz`.
    pub health: Arc<dyn HealthCheck>,
    /// Cache pub/sub for cross-instance event propagation.
    pub cache_pubsub: Arc<dyn CachePubSub>,
    /// `max-age` advertised on cacheable GET responses.
    pub cache_ttl_secs: u64,

    /// Event counter for generating unique event IDs.
    pub event_counter: Arc<AtomicU64>,
    /// Event history for SSE reconnection catch-up.
    pub event_history: Arc<RwLock<VecDeque<StoredEvent>>>,
    /// Maximum events to keep in history.
    event_history_max_size: usize,
    /// Properties with active event listeners.
    active_listeners: Arc<RwLock<HashSet<Uuid>>>,
    /// Fan-out of freshly stored events to open SSE sessions.
    live_tx: broadcast::Sender<StoredEvent>,

    /// Shutdown signal sender for SSE connections.
    pub shutdown_tx: broadcast::Sender<()>,
}

/// Repository trait objects the services are built from.
struct Repositories {
    properties: Arc<dyn PropertyRepository>,
    floor_plans: Arc<dyn FloorPlanRepository>,
    leases: Arc<dyn LeaseRepository>,
    users: Arc<dyn UserRepository>,
    occupancy: Arc<dyn OccupancyRepository>,
    health: Arc<dyn HealthCheck>,
}

impl AppState {
    fn build(
        repositories: Repositories,
        cache_pubsub: Arc<dyn CachePubSub>,
        config: &Config,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (live_tx, _) = broadcast::channel(config.event_history_max_size.max(16));

        let Repositories {
            properties,
            floor_plans,
            leases,
            users,
            occupancy,
            health,
        } = repositories;

        Self {
            properties: PropertyService::new(properties.clone()),
            floor_plans: FloorPlanService::new(
                floor_plans.clone(),
                properties.clone(),
                config.max_batch_size,
            ),
            leases: LeaseService::new(leases, properties.clone(), users.clone()),
            users: UserService::new(users),
            occupancy: OccupancyService::new(
                occupancy,
                properties,
                floor_plans,
                config.max_batch_size,
                config.occupancy_retention_days,
            ),
            health,
            cache_pubsub,
            cache_ttl_secs: config.cache_ttl_seconds,
            event_counter: Arc::new(AtomicU64::new(1)),
            event_history: Arc::new(RwLock::new(VecDeque::new())),
            event_history_max_size: config.event_history_max_size,
            active_listeners: Arc::new(RwLock::new(HashSet::new())),
            live_tx,
            shutdown_tx,
        }
    }

    /// Wraps one storage backend in the cached decorators.
    fn from_backends<R, C, P>(storage: Arc<R>, cache: Arc<C>, pubsub: Arc<P>, config: &Config) -> Self
    where
        R: PropertyRepository
            + FloorPlanRepository
            + LeaseRepository
            + UserRepository
            + OccupancyRepository
            + HealthCheck
            + 'static,
        C: Cache + 'static,
        P: CachePubSub + 'static,
    {
        let ttl = config.cache_ttl();
        let repositories = Repositories {
            properties: Arc::new(CachedPropertyRepository::new(
                storage.clone(),
                cache.clone(),
                ttl,
            )),
            floor_plans: Arc::new(CachedFloorPlanRepository::new(
                storage.clone(),
                cache.clone(),
                ttl,
            )),
            leases: Arc::new(CachedLeaseRepository::new(
                storage.clone(),
                cache.clone(),
                ttl,
            )),
            users: Arc::new(CachedUserRepository::new(
                storage.clone(),
                cache.clone(),
                ttl,
            )),
            occupancy: Arc::new(CachedOccupancyRepository::new(
                storage.clone(),
                cache,
                pubsub.clone(),
                ttl,
            )),
            health: storage,
        };

        Self::build(repositories, pubsub, config)
    }

    /// Get the oldest event ID in the history.
    ///
    /// Returns 0 if history is empty.
    pub fn oldest_event_id(&self) -> u64 {
        self.event_history
            .read()
            .ok()
            .and_then(|h| h.front().map(|e| e.id))
            .unwrap_or(0)
    }

    /// Get events since a given event ID for a specific property.
    pub fn get_events_since(&self, property_id: Uuid, since_id: u64) -> Vec<StoredEvent> {
        self.event_history
            .read()
            .ok()
            .map(|history| {
                history
                    .iter()
                    .filter(|e| e.id > since_id && e.property_id == property_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Store an event in the local event history and hand it to open
    /// SSE sessions.
    ///
    /// Called by the listener task for each event received from
    /// CachePubSub.
    pub fn store_event(&self, property_id: Uuid, event: OccupancyEvent) -> u64 {
        let id = self.event_counter.fetch_add(1, Ordering::SeqCst);
        let stored = StoredEvent {
            id,
            property_id,
            event,
        };

        tracing::trace!(event_id = id, %property_id, "Storing event in history");

        if let Ok(mut history) = self.event_history.write() {
            history.push_back(stored.clone());

            while history.len() > self.event_history_max_size {
                history.pop_front();
            }
        }

        // No open sessions is not an error.
        let _ = self.live_tx.send(stored);
        id
    }

    /// Receiver of events stored after this call.
    pub fn subscribe_live(&self) -> broadcast::Receiver<StoredEvent> {
        self.live_tx.subscribe()
    }

    /// Ensures an event listener is running for the given property.
    ///
    /// If a listener is already running, this is a no-op. Otherwise spawns a
    /// background task that subscribes to CachePubSub and feeds the local
    /// event history.
    pub fn ensure_event_listener(&self, property_id: Uuid) {
        {
            let Ok(listeners) = self.active_listeners.read() else {
                return;
            };
            if listeners.contains(&property_id) {
                return;
            }
        }

        {
            let Ok(mut listeners) = self.active_listeners.write() else {
                return;
            };
            // Double-check after acquiring write lock
            if !listeners.insert(property_id) {
                return;
            }
        }

        let state = self.clone();
        let cache_pubsub = self.cache_pubsub.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut receiver = match cache_pubsub.subscribe(property_id).await {
                Ok(r) => r,
                Err(err) => {
                    tracing::error!(%property_id, error = %err, "Failed to subscribe to occupancy events");
                    state.remove_listener(property_id);
                    return;
                }
            };

            tracing::debug!(%property_id, "Event listener started");

            loop {
                tokio::select! {
                    result = receiver.recv() => {
                        match result {
                            Ok(event) => {
                                state.store_event(property_id, event);
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!(%property_id, lagged = n, "Event listener lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                tracing::info!(%property_id, "Event channel closed");
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!(%property_id, "Event listener shutting down");
                        break;
                    }
                }
            }

            state.remove_listener(property_id);
        });
    }

    fn remove_listener(&self, property_id: Uuid) {
        if let Ok(mut listeners) = self.active_listeners.write() {
            listeners.remove(&property_id);
        }
    }

    /// Subscribe to shutdown signal.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal all SSE connections to shut down.
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

// ============================================================================
// Factory functions for different backend combinations
// ============================================================================

#[cfg(all(feature = "sqlite", feature = "memory"))]
mod sqlite_memory {
    use super::*;
    use crate::cache::{MemoryCache, MemoryPubSub};
    use crate::storage::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage and in-memory cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let sqlite_repo = Arc::new(SqliteRepository::new(&config.sqlite_path).await?);
            let memory_cache = Arc::new(MemoryCache::new(config.cache_max_entries)?);
            let memory_pubsub = Arc::new(MemoryPubSub::new());

            Ok(Self::from_backends(
                sqlite_repo,
                memory_cache,
                memory_pubsub,
                config,
            ))
        }
    }
}

#[cfg(all(feature = "sqlite", feature = "redis"))]
mod sqlite_redis {
    use super::*;
    use crate::cache::{RedisCache, RedisPubSub};
    use crate::storage::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage and Redis cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let sqlite_repo = Arc::new(SqliteRepository::new(&config.sqlite_path).await?);
            let redis_cache = Arc::new(RedisCache::new(&config.redis_url).await?);
            let redis_pubsub = Arc::new(RedisPubSub::new(&config.redis_url).await?);

            Ok(Self::from_backends(
                sqlite_repo,
                redis_cache,
                redis_pubsub,
                config,
            ))
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "memory"))]
mod inmemory_memory {
    use super::*;
    use crate::cache::{MemoryCache, MemoryPubSub};
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-memory storage and cache.
        /// Useful for testing without any external dependencies.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let inmemory_repo = Arc::new(InMemoryRepository::new());
            let memory_cache = Arc::new(MemoryCache::new(config.cache_max_entries)?);
            let memory_pubsub = Arc::new(MemoryPubSub::new());

            Ok(Self::from_backends(
                inmemory_repo,
                memory_cache,
                memory_pubsub,
                config,
            ))
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "redis"))]
mod inmemory_redis {
    use super::*;
    use crate::cache::{RedisCache, RedisPubSub};
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-memory storage and Redis cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let inmemory_repo = Arc::new(InMemoryRepository::new());
            let redis_cache = Arc::new(RedisCache::new(&config.redis_url).await?);
            let redis_pubsub = Arc::new(RedisPubSub::new(&config.redis_url).await?);

            Ok(Self::from_backends(
                inmemory_repo,
                redis_cache,
                redis_pubsub,
                config,
            ))
        }
    }
}

// ============================================================================
// Test support - provides Default implementation for unit tests
// ============================================================================

#[cfg(all(test, feature = "inmemory", feature = "memory"))]
mod test_support {
    use super::*;
    use crate::cache::{MemoryCache, MemoryPubSub};
    use crate::storage::InMemoryRepository;

    impl Default for AppState {
        /// Creates an AppState with in-memory storage and cache for tests.
        fn default() -> Self {
            let config = Config::default();
            let cache = Arc::new(MemoryCache::new(config.cache_max_entries).unwrap());
            Self::from_backends(
                Arc::new(InMemoryRepository::new()),
                cache,
                Arc::new(MemoryPubSub::new()),
                &config,
            )
        }
    }
}
