use crate::models::{Order, OrderStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Repository trait for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Order with its items and their designs loaded
    async fn get_order(&self, id: i64) -> Result<Option<Order>, StoreError>;

    /// Persist the order's mutable header fields in one write: status,
    /// payment/fulfillment references, notes, cancellation data, timestamps.
    async fn save_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Orders in any of `statuses`, oldest first
    async fn list_orders_by_status(&self, statuses: &[OrderStatus], limit: i64) -> Result<Vec<Order>, StoreError>;

    /// Paid or failed orders never dispatched and with fewer than
    /// `max_attempts` reconcile attempts, oldest first
    async fn list_retry_candidates(&self, max_attempts: i32, limit: i64) -> Result<Vec<Order>, StoreError>;
}

/// Statuses the retry worker may pick up
pub const RETRYABLE_STATUSES: [OrderStatus; 2] = [OrderStatus::Paid, OrderStatus::Error];

/// Map-backed repository for tests and local runs without Postgres
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<i64, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn get_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.id)
            .ok_or_else(|| format!("Order {} does not exist", order.id))?;
        // Items are written at checkout and never rewritten by reconciliation
        let items = std::mem::take(&mut stored.items);
        *stored = Order { items, ..order.clone() };
        Ok(())
    }

    async fn list_orders_by_status(&self, statuses: &[OrderStatus], limit: i64) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|order| statuses.contains(&order.status))
            .cloned()
            .collect();
        matching.sort_by_key(|order| (order.created_at, order.id));
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }

    async fn list_retry_candidates(&self, max_attempts: i32, limit: i64) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|order| RETRYABLE_STATUSES.contains(&order.status))
            .filter(|order| order.fulfillment_order_id.is_none() && order.reconcile_attempts < max_attempts)
            .cloned()
            .collect();
        matching.sort_by_key(|order| (order.created_at, order.id));
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }
}
