use crate::error::AppError;
use crate::lock::OrderLock;
use printshop_order::{FulfillmentGateway, OrderReconciler, OrderRepository, PaymentGateway};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

/// Which orders the retry worker picks up, and how often
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: i32,
    pub batch_size: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub reconciler: Arc<OrderReconciler>,
    pub fulfillment: Arc<FulfillmentGateway>,
    pub payments: Arc<PaymentGateway>,
    pub locks: Arc<dyn OrderLock>,
    pub checkout: CheckoutUrls,
    pub retry: RetryPolicy,
    /// Upper bound on work run under an order lock; below the lock TTL
    pub lock_deadline: Duration,
}

impl AppState {
    /// Run `work` while holding the order's lock; a held lock is a conflict.
    ///
    /// `work` is dropped at `lock_deadline` so the lock cannot lapse under it.
    pub async fn with_order_lock<T, F, Fut>(&self, order_id: i64, work: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let token = self
            .locks
            .acquire(order_id)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("Order {} is already being processed", order_id)))?;

        let result = match tokio::time::timeout(self.lock_deadline, work()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(order_id, deadline_ms = self.lock_deadline.as_millis() as u64, "Order work abandoned at lock deadline");
                Err(AppError::Upstream(format!(
                    "Order {} processing did not finish within {:?}",
                    order_id, self.lock_deadline
                )))
            }
        };

        if let Err(e) = self.locks.release(token).await {
            warn!(order_id, error = %e, "Failed to release order lock");
        }
        result
    }
}
