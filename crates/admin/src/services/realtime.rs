//! Realtime relay for the admin dashboard.
//!
//! Domain events (`orders.created`, `catalog.product.updated`, ...) are
//! published as a JSON envelope `{"event": ..., "data": {...}}`.
//!
//! With Redis configured, every server instance publishes to the
//! `admin:events` channel and a background task relays the channel back into
//! a local [`broadcast`] channel, so dashboards connected to any instance see
//! every event. Without Redis the local channel is used directly.
//!
//! Publishing never fails a request. When Redis cannot be reached the event
//! is logged and delivered to this instance's dashboards only; the relay keeps
//! reconnecting with backoff.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Redis pub/sub channel carrying admin events.
pub const EVENTS_CHANNEL: &str = "admin:events";

const LOCAL_CAPACITY: usize = 256;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Event names emitted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    OrdersCreated,
    OrdersUpdated,
    CategoryCreated,
    CategoryUpdated,
    ProductCreated,
    ProductUpdated,
    SettingsUpdated,
}

impl EventName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrdersCreated => "orders.created",
            Self::OrdersUpdated => "orders.updated",
            Self::CategoryCreated => "catalog.category.created",
            Self::CategoryUpdated => "catalog.category.updated",
            Self::ProductCreated => "catalog.product.created",
            Self::ProductUpdated => "catalog.product.updated",
            Self::SettingsUpdated => "settings.updated",
        }
    }
}

/// A relayed event envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminEvent {
    pub event: String,
    pub data: serde_json::Value,
}

/// A pub/sub payload that is not a valid envelope.
#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event name must be a string")]
    EventName,

    #[error("event data must be an object")]
    Data,
}

impl AdminEvent {
    #[must_use]
    pub fn new(name: EventName, data: serde_json::Value) -> Self {
        Self {
            event: name.as_str().to_owned(),
            data,
        }
    }

    /// Parse a raw pub/sub payload.
    ///
    /// # Errors
    ///
    /// Returns an error unless the payload is a JSON object with a string
    /// `event` and an object `data`.
    pub fn from_payload(payload: &str) -> Result<Self, EventParseError> {
        let mut value: serde_json::Value = serde_json::from_str(payload)?;

        let event = match value.get("event") {
            Some(serde_json::Value::String(event)) => event.clone(),
            _ => return Err(EventParseError::EventName),
        };
        let data = match value.get_mut("data").map(serde_json::Value::take) {
            Some(data @ serde_json::Value::Object(_)) => data,
            _ => return Err(EventParseError::Data),
        };

        Ok(Self { event, data })
    }

    /// Serialize the envelope.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::json!({ "event": self.event, "data": self.data }).to_string()
    }
}

/// Fan-out bus for admin events. Clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

struct EventBusInner {
    local: broadcast::Sender<AdminEvent>,
    redis: Option<RedisLink>,
}

struct RedisLink {
    client: redis::Client,
    /// Established on first use when Redis was down at startup.
    publisher: RwLock<Option<ConnectionManager>>,
}

impl RedisLink {
    async fn publisher(&self) -> redis::RedisResult<ConnectionManager> {
        if let Some(conn) = self.publisher.read().await.as_ref() {
            return Ok(conn.clone());
        }
        let mut slot = self.publisher.write().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = open_publisher(&self.client).await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }
}

/// A publisher connection with a single retry and a short connect timeout.
async fn open_publisher(client: &redis::Client) -> redis::RedisResult<ConnectionManager> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(CONNECT_TIMEOUT)
        .set_response_timeout(CONNECT_TIMEOUT);
    client.get_connection_manager_with_config(config).await
}

impl EventBus {
    /// An in-process bus with no Redis.
    #[must_use]
    pub fn local() -> Self {
        let (local, _) = broadcast::channel(LOCAL_CAPACITY);
        Self {
            inner: Arc::new(EventBusInner { local, redis: None }),
        }
    }

    /// Connect to Redis when `redis_url` is set, otherwise stay in-process.
    ///
    /// An invalid URL falls back to the in-process bus. An unreachable server
    /// keeps the Redis link: publishing retries the connection and the relay
    /// resubscribes once Redis is back.
    pub async fn connect(redis_url: Option<&SecretString>) -> Self {
        let Some(url) = redis_url else {
            info!("REDIS_URL not set, admin events stay in-process");
            return Self::local();
        };

        let client = match redis::Client::open(url.expose_secret()) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Invalid REDIS_URL, admin events stay in-process");
                return Self::local();
            }
        };
        let publisher = match open_publisher(&client).await {
            Ok(conn) => {
                info!(channel = EVENTS_CHANNEL, "Connected admin event bus to Redis");
                Some(conn)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Redis unreachable, admin events stay local until it recovers"
                );
                None
            }
        };
        let (local, _) = broadcast::channel(LOCAL_CAPACITY);

        Self {
            inner: Arc::new(EventBusInner {
                local,
                redis: Some(RedisLink {
                    client,
                    publisher: RwLock::new(publisher),
                }),
            }),
        }
    }

    /// Whether events go through Redis.
    #[must_use]
    pub fn is_distributed(&self) -> bool {
        self.inner.redis.is_some()
    }

    /// Receive every event published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AdminEvent> {
        self.inner.local.subscribe()
    }

    /// Publish an event.
    pub async fn publish(&self, name: EventName, data: serde_json::Value) {
        let event = AdminEvent::new(name, data);

        let Some(redis) = &self.inner.redis else {
            self.send_local(event);
            return;
        };

        let result: redis::RedisResult<i64> = match redis.publisher().await {
            Ok(mut conn) => conn.publish(EVENTS_CHANNEL, event.to_json()).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(
                error = %e,
                event = %event.event,
                "Failed to publish admin event, delivering locally"
            );
            self.send_local(event);
        }
    }

    fn send_local(&self, event: AdminEvent) {
        // Err only means nobody is listening.
        if self.inner.local.send(event).is_err() {
            debug!("No live admin subscribers");
        }
    }

    /// Start relaying the Redis channel into the local bus. Returns `None`
    /// for an in-process bus.
    #[must_use]
    pub fn spawn_relay(&self) -> Option<JoinHandle<()>> {
        let redis = self.inner.redis.as_ref()?;
        let client = redis.client.clone();
        let bus = self.clone();
        Some(tokio::spawn(async move { bus.relay_loop(client).await }))
    }

    async fn relay_loop(self, client: redis::Client) {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match self.relay_once(&client, &mut backoff).await {
                Ok(()) => warn!("Admin event subscription closed, reconnecting"),
                Err(e) => warn!(
                    error = %e,
                    retry_in_ms = backoff.as_millis(),
                    "Admin event subscription failed"
                ),
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    async fn relay_once(
        &self,
        client: &redis::Client,
        backoff: &mut Duration,
    ) -> redis::RedisResult<()> {
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(EVENTS_CHANNEL).await?;
        info!(channel = EVENTS_CHANNEL, "Subscribed to admin events");
        *backoff = INITIAL_BACKOFF;

        let mut messages = pubsub.on_message();
        while let Some(msg) = messages.next().await {
            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "Dropping non-text admin event payload");
                    continue;
                }
            };
            match AdminEvent::from_payload(&payload) {
                Ok(event) => self.send_local(event),
                Err(e) => debug!(error = %e, "Dropping malformed admin event"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_payload_accepts_envelope() {
        let event = AdminEvent::from_payload(
            r#"{"event":"orders.created","data":{"orderNumber":"ZYT-20260301-0001"}}"#,
        )
        .unwrap();
        assert_eq!(event.event, "orders.created");
        assert_eq!(event.data["orderNumber"], "ZYT-20260301-0001");
    }

    #[test]
    fn test_from_payload_rejects_bad_envelopes() {
        assert!(matches!(
            AdminEvent::from_payload("not json"),
            Err(EventParseError::Json(_))
        ));
        assert!(matches!(
            AdminEvent::from_payload(r#"{"event":42,"data":{}}"#),
            Err(EventParseError::EventName)
        ));
        assert!(matches!(
            AdminEvent::from_payload(r#"{"event":"x","data":[1,2]}"#),
            Err(EventParseError::Data)
        ));
        assert!(matches!(
            AdminEvent::from_payload(r#"{"event":"x"}"#),
            Err(EventParseError::Data)
        ));
    }

    #[test]
    fn test_to_json_roundtrips_through_from_payload() {
        let event = AdminEvent::new(EventName::SettingsUpdated, json!({"settings": {}}));
        let parsed = AdminEvent::from_payload(&event.to_json()).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.event, "settings.updated");
    }

    #[tokio::test]
    async fn test_local_bus_delivers_to_subscribers() {
        let bus = EventBus::local();
        assert!(!bus.is_distributed());
        assert!(bus.spawn_relay().is_none());

        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        bus.publish(EventName::ProductUpdated, json!({"product": {"sku": "ERZ-1"}}))
            .await;

        let a = first.recv().await.unwrap();
        let b = second.recv().await.unwrap();
        assert_eq!(a.event, "catalog.product.updated");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::local();
        bus.publish(EventName::OrdersUpdated, json!({})).await;
    }

    #[tokio::test]
    async fn test_invalid_redis_url_falls_back_to_local_bus() {
        let url = SecretString::from("not a redis url");
        let bus = EventBus::connect(Some(&url)).await;
        assert!(!bus.is_distributed());
        assert!(bus.spawn_relay().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_redis_still_delivers_locally() {
        let url = SecretString::from("redis://127.0.0.1:1");
        let bus = EventBus::connect(Some(&url)).await;
        assert!(bus.is_distributed());

        let relay = bus.spawn_relay().unwrap();
        let mut rx = bus.subscribe();
        bus.publish(EventName::OrdersCreated, json!({"orderNumber": "ZYT-20260301-0001"}))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, "orders.created");
        assert_eq!(event.data["orderNumber"], "ZYT-20260301-0001");
        relay.abort();
    }
}
