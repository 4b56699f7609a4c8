//! Redis pub/sub implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use propdesk_core::cache::{property_channel, CacheError, CachePubSub, Result};
use propdesk_core::domain::OccupancyEvent;

use super::error::map_redis_error;

const CHANNEL_CAPACITY: usize = 100;

type Subscriptions = Arc<RwLock<HashMap<Uuid, broadcast::Sender<OccupancyEvent>>>>;

/// Redis pub/sub backend broadcasting occupancy events across instances.
pub struct RedisPubSub {
    client: redis::Client,
    subscriptions: Subscriptions,
}

impl RedisPubSub {
    /// Creates a new Redis pub/sub connection.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;

        let _ = client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;

        Ok(Self {
            client,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
        })
    }
}

#[async_trait]
impl CachePubSub for RedisPubSub {
    async fn publish(&self, property_id: Uuid, event: &OccupancyEvent) -> Result<()> {
        let channel = property_channel(property_id);

        let payload =
            serde_json::to_string(event).map_err(|e| CacheError::Serialization(e.to_string()))?;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;

        conn.publish::<_, _, ()>(&channel, &payload)
            .await
            .map_err(|e| CacheError::PublishFailed(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(&self, property_id: Uuid) -> Result<broadcast::Receiver<OccupancyEvent>> {
        {
            let subscriptions = self.subscriptions.read().await;
            if let Some(sender) = subscriptions.get(&property_id) {
                return Ok(sender.subscribe());
            }
        }

        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);

        {
            let mut subscriptions = self.subscriptions.write().await;
            if let Some(sender) = subscriptions.get(&property_id) {
                return Ok(sender.subscribe());
            }
            subscriptions.insert(property_id, tx.clone());
        }

        let channel = property_channel(property_id);
        let client = self.client.clone();
        let subscriptions = Arc::clone(&self.subscriptions);

        tokio::spawn(async move {
            if let Err(e) =
                run_subscription_loop(client, channel, property_id, tx, subscriptions).await
            {
                tracing::error!(%property_id, error = %e, "Redis subscription failed");
            }
        });

        Ok(rx)
    }
}

/// Forwards messages from the Redis channel into the broadcast channel.
async fn run_subscription_loop(
    client: redis::Client,
    channel: String,
    property_id: Uuid,
    tx: broadcast::Sender<OccupancyEvent>,
    subscriptions: Subscriptions,
) -> Result<()> {
    let result = forward_messages(&client, &channel, &tx).await;

    // Drop the entry so the next subscriber starts a fresh loop.
    subscriptions.write().await.remove(&property_id);

    result
}

async fn forward_messages(
    client: &redis::Client,
    channel: &str,
    tx: &broadcast::Sender<OccupancyEvent>,
) -> Result<()> {
    let mut pubsub = client.get_async_pubsub().await.map_err(map_redis_error)?;
    pubsub.subscribe(channel).await.map_err(map_redis_error)?;

    let mut stream = pubsub.on_message();

    while let Some(msg) = stream.next().await {
        let payload: String = msg.get_payload().map_err(map_redis_error)?;

        match serde_json::from_str::<OccupancyEvent>(&payload) {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => {
                tracing::warn!(%channel, error = %e, %payload, "Failed to deserialize occupancy event");
            }
        }
    }

    tracing::info!(%channel, "Redis subscription stream ended");
    Ok(())
}
