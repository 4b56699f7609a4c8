//! In-memory pub/sub over tokio broadcast channels, one per property.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use propdesk_core::cache::{CachePubSub, Result};
use propdesk_core::domain::OccupancyEvent;

/// Channel capacity for pub/sub messages.
const CHANNEL_CAPACITY: usize = 100;

/// In-memory pub/sub implementation.
///
/// Each property has its own channel for targeted event delivery.
#[derive(Debug, Clone)]
pub struct MemoryPubSub {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<OccupancyEvent>>>>,
}

impl MemoryPubSub {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn get_or_create_channel(&self, property_id: Uuid) -> broadcast::Sender<OccupancyEvent> {
        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(&property_id) {
                return sender.clone();
            }
        }

        let mut channels = self.channels.write().await;

        // Double-check after acquiring the write lock.
        if let Some(sender) = channels.get(&property_id) {
            return sender.clone();
        }

        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        channels.insert(property_id, sender.clone());
        sender
    }
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CachePubSub for MemoryPubSub {
    async fn publish(&self, property_id: Uuid, event: &OccupancyEvent) -> Result<()> {
        let sender = self.get_or_create_channel(property_id).await;

        // No receivers just means nobody is watching this property.
        let _ = sender.send(event.clone());

        Ok(())
    }

    async fn subscribe(&self, property_id: Uuid) -> Result<broadcast::Receiver<OccupancyEvent>> {
        let sender = self.get_or_create_channel(property_id).await;
        Ok(sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use propdesk_core::domain::RecordOccupancyRequest;

    fn recorded(property_id: Uuid, count: i64) -> OccupancyEvent {
        let reading = RecordOccupancyRequest::new(property_id, count).into_reading(None, Utc::now());
        OccupancyEvent::readings_recorded(property_id, vec![reading])
    }

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let pubsub = MemoryPubSub::new();
        let property_id = Uuid::new_v4();
        let event = recorded(property_id, 12);

        let mut receiver = pubsub.subscribe(property_id).await.unwrap();
        pubsub.publish(property_id, &event).await.unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let pubsub = MemoryPubSub::new();
        let property_id = Uuid::new_v4();
        let event = OccupancyEvent::reading_invalidated(property_id, Uuid::new_v4());

        let mut receiver1 = pubsub.subscribe(property_id).await.unwrap();
        let mut receiver2 = pubsub.subscribe(property_id).await.unwrap();

        pubsub.publish(property_id, &event).await.unwrap();

        assert!(matches!(
            receiver1.recv().await.unwrap(),
            OccupancyEvent::ReadingInvalidated { .. }
        ));
        assert!(matches!(
            receiver2.recv().await.unwrap(),
            OccupancyEvent::ReadingInvalidated { .. }
        ));
    }

    #[tokio::test]
    async fn test_channels_are_per_property() {
        let pubsub = MemoryPubSub::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let mut receiver1 = pubsub.subscribe(first).await.unwrap();
        let mut receiver2 = pubsub.subscribe(second).await.unwrap();

        pubsub.publish(second, &recorded(second, 3)).await.unwrap();
        pubsub.publish(first, &recorded(first, 7)).await.unwrap();

        assert_eq!(receiver1.recv().await.unwrap().property_id(), first);
        assert_eq!(receiver2.recv().await.unwrap().property_id(), second);
    }

    #[tokio::test]
    async fn test_publish_no_subscribers() {
        let pubsub = MemoryPubSub::new();
        let property_id = Uuid::new_v4();
        assert!(pubsub
            .publish(property_id, &recorded(property_id, 1))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_channel_reuse() {
        let pubsub = MemoryPubSub::new();
        let property_id = Uuid::new_v4();

        let _receiver1 = pubsub.subscribe(property_id).await.unwrap();
        let _receiver2 = pubsub.subscribe(property_id).await.unwrap();

        assert_eq!(pubsub.channels.read().await.len(), 1);
    }
}
