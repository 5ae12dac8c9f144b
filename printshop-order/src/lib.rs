pub mod artifact;
pub mod cancellation;
pub mod error;
pub mod fulfillment;
pub mod lifecycle;
pub mod models;
pub mod payment;
pub mod reconciler;
pub mod repository;

pub use artifact::{ArtifactRejection, ArtifactResolver};
pub use cancellation::{CancellationOutcome, CANCELLATION_REASON};
pub use error::{GatewayError, ItemRejection, PaymentError, ReconcileError, ReconcileFailure, SkippedItem};
pub use fulfillment::FulfillmentGateway;
pub use models::{Design, DesignSnapshot, Order, OrderItem, OrderStatus};
pub use payment::{PaymentGateway, RefundResult};
pub use reconciler::{OrderReconciler, ReconcileOutcome};
pub use repository::{InMemoryOrderRepository, OrderRepository, StoreError, RETRYABLE_STATUSES};
