//! Event bus implementation
//!
//! This module provides the event bus abstraction the lifecycle posts
//! through, and an in-memory implementation.

use crate::config::EventBusConfig;
use crate::types::Event;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

/// Event bus error types.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// Failed to publish event
    #[error("Failed to publish event: {0}")]
    PublishError(String),

    /// Failed to subscribe
    #[error("Failed to subscribe: {0}")]
    SubscribeError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// No handler registered under this id
    #[error("Unknown handler: {0}")]
    UnknownHandler(String),

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Subscription handle for receiving events.
pub struct Subscription {
    /// Subscription ID
    pub id: String,
    /// Topic pattern
    pub topic: String,
    /// Event receiver
    pub receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receive the next event.
    pub async fn recv(&mut self) -> EventBusResult<Event> {
        self.receiver
            .recv()
            .await
            .map_err(|_| EventBusError::ChannelClosed)
    }

    /// Receive an already delivered event without waiting.
    ///
    /// Events dropped because this subscription fell behind the channel
    /// capacity are skipped; the oldest event still queued is returned.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(subscription_id = %self.id, topic = %self.topic, skipped, "Subscription lagged");
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain every event still queued for this subscription.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Event handler trait for processing events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: Event) -> EventBusResult<()>;

    /// Get the topics this handler is interested in.
    fn topics(&self) -> Vec<String>;
}

/// Event bus trait for publish/subscribe operations.
///
/// This is the event sink injected into the user lifecycle: the lifecycle
/// only ever calls [`EventBus::publish`]. Delivery guarantees are a property
/// of the implementation.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish (post) an event.
    async fn publish(&self, event: Event) -> EventBusResult<()>;

    /// Subscribe to a topic pattern.
    ///
    /// Topic patterns support wildcards:
    /// - `*` matches any single segment
    /// - `#` matches zero or more segments
    ///
    /// Examples:
    /// - `lifecycle.user.*` matches `lifecycle.user.banned`, `lifecycle.user.removed`
    /// - `#` matches every event
    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription>;

    /// Register an event handler. Returns the id to unregister it with.
    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<String>;

    /// Unregister a previously registered handler.
    async fn unregister_handler(&self, handler_id: &str) -> EventBusResult<()>;

    /// Unsubscribe from a topic.
    ///
    /// Stops counting the subscription. A [`Subscription`] the caller still
    /// holds keeps receiving until it is dropped.
    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()>;

    /// Get event bus stats.
    async fn stats(&self) -> EventBusStats;
}

/// Event bus statistics.
#[derive(Debug, Clone, Default)]
pub struct EventBusStats {
    /// Total events published
    pub events_published: u64,
    /// Total deliveries to subscribers and handlers
    pub events_delivered: u64,
    /// Events that matched no subscriber and no handler
    pub events_dead_lettered: u64,
    /// Active subscriptions
    pub active_subscriptions: usize,
    /// Registered handlers
    pub registered_handlers: usize,
}

/// In-memory event bus implementation.
///
/// This is suitable for single-process applications and testing.
pub struct MemoryEventBus {
    /// Topic subscribers
    subscribers: Arc<RwLock<HashMap<String, broadcast::Sender<Event>>>>,
    /// Subscription id to topic pattern
    subscriptions: Arc<RwLock<HashMap<String, String>>>,
    /// Registered handlers, in registration order
    handlers: Arc<RwLock<Vec<(String, Arc<dyn EventHandler>)>>>,
    /// Statistics
    stats: Arc<RwLock<EventBusStats>>,
    config: EventBusConfig,
}

impl std::fmt::Debug for MemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventBus")
            .field("config", &self.config)
            .finish()
    }
}

impl MemoryEventBus {
    /// Create a new in-memory event bus.
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create with custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(EventBusConfig {
            channel_capacity: capacity,
            ..EventBusConfig::default()
        })
    }

    /// Create from configuration. A zero capacity is raised to one.
    pub fn with_config(mut config: EventBusConfig) -> Self {
        config.channel_capacity = config.channel_capacity.max(1);
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            handlers: Arc::new(RwLock::new(Vec::new())),
            stats: Arc::new(RwLock::new(EventBusStats::default())),
            config,
        }
    }

    /// Check if a dotted topic matches a pattern.
    pub fn topic_matches(pattern: &str, topic: &str) -> bool {
        let pattern: Vec<&str> = pattern.split('.').collect();
        let topic: Vec<&str> = topic.split('.').collect();
        segments_match(&pattern, &topic)
    }
}

fn segments_match(pattern: &[&str], topic: &[&str]) -> bool {
    match (pattern.split_first(), topic.split_first()) {
        (None, None) => true,
        // `#` takes zero segments, or one segment and stays in place
        (Some((&"#", rest)), _) => {
            segments_match(rest, topic)
                || (!topic.is_empty() && segments_match(pattern, &topic[1..]))
        }
        (Some((&"*", rest)), Some((_, topic_rest))) => segments_match(rest, topic_rest),
        (Some((segment, rest)), Some((head, topic_rest))) => {
            segment == head && segments_match(rest, topic_rest)
        }
        _ => false,
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: Event) -> EventBusResult<()> {
        let topic = event.topic();
        let mut delivered: u64 = 0;

        {
            let subscribers = self.subscribers.read().await;
            for (pattern, sender) in subscribers.iter() {
                if Self::topic_matches(pattern, &topic) && sender.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }

        {
            let handlers = self.handlers.read().await;
            for (handler_id, handler) in handlers.iter() {
                if !handler
                    .topics()
                    .iter()
                    .any(|handler_topic| Self::topic_matches(handler_topic, &topic))
                {
                    continue;
                }
                let handler = handler.clone();
                let handler_id = handler_id.clone();
                let event = event.clone();
                tokio::task::spawn(async move {
                    if let Err(e) = handler.handle(event).await {
                        tracing::error!(handler_id = %handler_id, error = %e, "Handler error");
                    }
                });
                delivered += 1;
            }
        }

        {
            let mut stats = self.stats.write().await;
            stats.events_published += 1;
            stats.events_delivered += delivered;
            if delivered == 0 {
                stats.events_dead_lettered += 1;
            }
        }

        if delivered == 0 && self.config.log_dead_letters {
            tracing::warn!(topic = %topic, event_id = %event.id, "Dead event: no subscriber or handler");
        } else {
            tracing::debug!(topic = %topic, event_id = %event.id, delivered, "Event published");
        }

        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription> {
        if topic.is_empty() {
            return Err(EventBusError::SubscribeError(
                "topic pattern must not be empty".to_string(),
            ));
        }

        let id = uuid::Uuid::now_v7().to_string();

        let receiver = {
            let mut subscribers = self.subscribers.write().await;

            if let Some(sender) = subscribers.get(topic) {
                sender.subscribe()
            } else {
                let (sender, receiver) = broadcast::channel(self.config.channel_capacity);
                subscribers.insert(topic.to_string(), sender);
                receiver
            }
        };

        self.subscriptions
            .write()
            .await
            .insert(id.clone(), topic.to_string());

        {
            let mut stats = self.stats.write().await;
            stats.active_subscriptions += 1;
        }

        Ok(Subscription {
            id,
            topic: topic.to_string(),
            receiver,
        })
    }

    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<String> {
        let id = uuid::Uuid::now_v7().to_string();
        {
            let mut handlers = self.handlers.write().await;
            handlers.push((id.clone(), handler));
        }

        {
            let mut stats = self.stats.write().await;
            stats.registered_handlers += 1;
        }

        Ok(id)
    }

    async fn unregister_handler(&self, handler_id: &str) -> EventBusResult<()> {
        {
            let mut handlers = self.handlers.write().await;
            let before = handlers.len();
            handlers.retain(|(id, _)| id != handler_id);
            if handlers.len() == before {
                return Err(EventBusError::UnknownHandler(handler_id.to_string()));
            }
        }

        {
            let mut stats = self.stats.write().await;
            stats.registered_handlers = stats.registered_handlers.saturating_sub(1);
        }

        Ok(())
    }

    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()> {
        let Some(topic) = self.subscriptions.write().await.remove(subscription_id) else {
            return Ok(());
        };

        {
            // Drop the topic channel once its last receiver is gone
            let mut subscribers = self.subscribers.write().await;
            if subscribers
                .get(&topic)
                .map(|sender| sender.receiver_count() == 0)
                .unwrap_or(false)
            {
                subscribers.remove(&topic);
            }
        }

        {
            let mut stats = self.stats.write().await;
            stats.active_subscriptions = stats.active_subscriptions.saturating_sub(1);
        }

        Ok(())
    }

    async fn stats(&self) -> EventBusStats {
        self.stats.read().await.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
