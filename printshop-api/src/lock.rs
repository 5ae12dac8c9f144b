use async_trait::async_trait;
use printshop_store::RedisClient;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Proof of holding an order's lock; hand it back to `release`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    pub order_id: i64,
    token: String,
}

/// Same-order mutual exclusion for reconcile and cancel
#[async_trait]
pub trait OrderLock: Send + Sync {
    /// `None` when someone else holds the lock
    async fn acquire(&self, order_id: i64) -> anyhow::Result<Option<LockToken>>;

    async fn release(&self, token: LockToken) -> anyhow::Result<()>;
}

pub struct RedisOrderLock {
    redis: Arc<RedisClient>,
    ttl_seconds: u64,
}

impl RedisOrderLock {
    pub fn new(redis: Arc<RedisClient>, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }
}

#[async_trait]
impl OrderLock for RedisOrderLock {
    async fn acquire(&self, order_id: i64) -> anyhow::Result<Option<LockToken>> {
        let token = uuid::Uuid::new_v4().to_string();
        let acquired = self
            .redis
            .acquire_order_lock(order_id, &token, self.ttl_seconds)
            .await?;
        Ok(acquired.then_some(LockToken { order_id, token }))
    }

    async fn release(&self, token: LockToken) -> anyhow::Result<()> {
        if !self.redis.release_order_lock(token.order_id, &token.token).await? {
            warn!(order_id = token.order_id, "Order lock expired before release");
        }
        Ok(())
    }
}

/// Process-local lock for single-instance runs and tests
#[derive(Default)]
pub struct LocalOrderLock {
    held: Mutex<HashMap<i64, String>>,
}

#[async_trait]
impl OrderLock for LocalOrderLock {
    async fn acquire(&self, order_id: i64) -> anyhow::Result<Option<LockToken>> {
        let mut held = self.held.lock().await;
        if held.contains_key(&order_id) {
            return Ok(None);
        }
        let token = uuid::Uuid::new_v4().to_string();
        held.insert(order_id, token.clone());
        Ok(Some(LockToken { order_id, token }))
    }

    async fn release(&self, token: LockToken) -> anyhow::Result<()> {
        let mut held = self.held.lock().await;
        if held.get(&token.order_id) == Some(&token.token) {
            held.remove(&token.order_id);
        }
        Ok(())
    }
}
