use crate::artifact::ArtifactRejection;
use crate::lifecycle::TransitionError;
use crate::models::OrderStatus;
use crate::repository::StoreError;
use printshop_core::{ProviderError, ProviderResult};
use std::future::Future;
use std::time::Duration;

/// Failure of a wrapped provider call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout { operation: &'static str, after: Duration },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Request rejected before dispatch: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// Whether a later retry of the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Timeout { .. } => true,
            GatewayError::Provider(e) => e.is_transient(),
            GatewayError::Malformed(_) | GatewayError::Rejected(_) => false,
        }
    }
}

/// Run a provider call under `after`, mapping an elapsed deadline to `Timeout`
pub(crate) async fn bounded<T>(
    after: Duration,
    operation: &'static str,
    call: impl Future<Output = ProviderResult<T>>,
) -> Result<T, GatewayError> {
    match tokio::time::timeout(after, call).await {
        Ok(result) => result.map_err(GatewayError::from),
        Err(_) => Err(GatewayError::Timeout { operation, after }),
    }
}

/// Why a single order item was left out of a fulfillment submission
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ItemRejection {
    #[error("missing variant id")]
    MissingVariant,

    #[error("variant {variant_id} invalid: {reason}")]
    VariantInvalid { variant_id: String, reason: String },

    #[error("artifact unusable: {0}")]
    Artifact(#[from] ArtifactRejection),

    #[error("missing size")]
    MissingSize,

    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i32),
}

/// An item excluded from the submission and why
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedItem {
    pub item_id: i64,
    pub rejection: ItemRejection,
}

/// A reconciliation attempt that parked the order in `error`
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileFailure {
    #[error("No item has a design with a front artifact")]
    NoArtifact,

    #[error("No valid items to submit for fulfillment")]
    NoValidItems,

    #[error("Fulfillment gateway error: {0}")]
    Gateway(GatewayError),
}

/// Errors surfaced to the caller of `reconcile` / `cancel_and_refund`.
///
/// Everything else is converted into order state and notes.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Order not found: {0}")]
    NotFound(i64),

    #[error("Order {order_id} is {status}; expected one of {expected}")]
    InvalidState { order_id: i64, status: OrderStatus, expected: &'static str },

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Order state error: {0}")]
    Transition(#[from] TransitionError),

    #[error("Persistence failed: {0}")]
    Storage(StoreError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentError {
    #[error("Order {order_number} has no payment session or payment intent to refund")]
    MissingPaymentReference { order_number: String },

    #[error("Checkout session {0} has no payment intent")]
    SessionWithoutIntent(String),

    #[error("Refund {refund_id} was not issued (status {status})")]
    RefundNotIssued { refund_id: String, status: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),
}
