//! Cache invalidation on publish.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use super::metrics::CACHE_INVALIDATION_FAILURES;
use crate::config::RedisConfig;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

#[async_trait]
pub trait CacheInvalidationNotifier: Send + Sync {
    /// Announce that a route became servable.
    async fn route_published(&self, route_id: Uuid) -> Result<(), anyhow::Error>;

    /// Channel label used in logs and metrics.
    fn channel(&self) -> &str;
}

/// Publish without letting a failure reach the caller.
pub async fn notify_route_published(notifier: &dyn CacheInvalidationNotifier, route_id: Uuid) {
    let outcome = tokio::time::timeout(PUBLISH_TIMEOUT, notifier.route_published(route_id)).await;

    let error = match outcome {
        Ok(Ok(())) => {
            tracing::debug!(%route_id, channel = notifier.channel(), "Cache invalidation published");
            return;
        }
        Ok(Err(e)) => e,
        Err(_) => anyhow::anyhow!("publish timed out after {:?}", PUBLISH_TIMEOUT),
    };

    CACHE_INVALIDATION_FAILURES
        .with_label_values(&[notifier.channel()])
        .inc();
    tracing::warn!(
        %route_id,
        channel = notifier.channel(),
        error = %error,
        "Failed to publish cache invalidation"
    );
}

/// `PUBLISH <channel> <route id>` over a reconnecting Redis connection.
#[derive(Clone)]
pub struct RedisNotifier {
    manager: ConnectionManager,
    channel: String,
}

impl RedisNotifier {
    pub async fn new(config: &RedisConfig) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %config.url, channel = %config.channel, "Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            manager,
            channel: config.channel.clone(),
        })
    }
}

#[async_trait]
impl CacheInvalidationNotifier for RedisNotifier {
    async fn route_published(&self, route_id: Uuid) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(route_id.to_string())
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to publish to {}: {}", self.channel, e))?;

        tracing::debug!(%route_id, receivers, "Route invalidation delivered");
        Ok(())
    }

    fn channel(&self) -> &str {
        &self.channel
    }
}

/// Deployments without a cache to invalidate.
pub struct NoopNotifier;

#[async_trait]
impl CacheInvalidationNotifier for NoopNotifier {
    async fn route_published(&self, _route_id: Uuid) -> Result<(), anyhow::Error> {
        Ok(())
    }

    fn channel(&self) -> &str {
        "noop"
    }
}

/// Keeps published ids in memory. Can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<Uuid>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn published(&self) -> Vec<Uuid> {
        self.published
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CacheInvalidationNotifier for RecordingNotifier {
    async fn route_published(&self, route_id: Uuid) -> Result<(), anyhow::Error> {
        if self.fail {
            return Err(anyhow::anyhow!("channel unavailable"));
        }
        self.published
            .lock()
            .map_err(|_| anyhow::anyhow!("recording notifier poisoned"))?
            .push(route_id);
        Ok(())
    }

    fn channel(&self) -> &str {
        "recording"
    }
}
