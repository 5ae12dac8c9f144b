use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use printshop_core::fulfillment::{ShippingLine, ShippingRate};
use printshop_core::ShippingAddress;
use printshop_order::{Order, OrderStatus, ReconcileError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Customer-facing order view; operator notes stay internal
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: i64,
    pub order_number: String,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub items: Vec<OrderItemView>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemView {
    pub id: i64,
    pub design_id: Option<i64>,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        OrderView {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            subtotal: order.subtotal,
            tax: order.tax,
            shipping: order.shipping,
            total: order.total,
            currency: order.currency,
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemView {
                    id: item.id,
                    design_id: item.design_id,
                    size: item.size,
                    color: item.color,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                })
                .collect(),
            paid_at: order.paid_at,
            shipped_at: order.shipped_at,
            cancelled_at: order.cancelled_at,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShippingRatesRequest {
    pub recipient: ShippingAddress,
    pub items: Vec<ShippingLine>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders/{id}", get(get_order))
        .route("/v1/orders/{id}/checkout", post(create_checkout))
        .route("/v1/shipping/rates", post(shipping_rates))
}

pub(crate) async fn load_order(state: &AppState, id: i64) -> Result<Order, AppError> {
    state
        .orders
        .get_order(id)
        .await
        .map_err(AppError::storage)?
        .ok_or_else(|| ReconcileError::NotFound(id).into())
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderView>, AppError> {
    let order = load_order(&state, id).await?;
    Ok(Json(order.into()))
}

/// Open a hosted checkout for a pending order and remember the session
pub async fn create_checkout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CheckoutResponse>, AppError> {
    state
        .with_order_lock(id, || async {
            let mut order = load_order(&state, id).await?;
            if order.status != OrderStatus::Pending {
                return Err(ReconcileError::InvalidState {
                    order_id: id,
                    status: order.status,
                    expected: "pending",
                }
                .into());
            }
            if order.items.is_empty() {
                return Err(AppError::BadRequest(format!("Order {} has no items", id)));
            }

            let session = state
                .payments
                .create_checkout_session(&order, &state.checkout.success_url, &state.checkout.cancel_url)
                .await?;

            order.payment_session_id = Some(session.id.clone());
            order.updated_at = Utc::now();
            state.orders.save_order(&order).await.map_err(AppError::storage)?;
            info!(order_id = id, payment_session_id = %session.id, "Checkout session stored");

            Ok::<_, AppError>(Json(CheckoutResponse { session_id: session.id, url: session.url }))
        })
        .await
}

pub async fn shipping_rates(
    State(state): State<AppState>,
    Json(request): Json<ShippingRatesRequest>,
) -> Result<Json<Vec<ShippingRate>>, AppError> {
    if request.items.is_empty() {
        return Err(AppError::BadRequest("At least one item is required".into()));
    }
    let rates = state
        .fulfillment
        .shipping_rates(&request.recipient, &request.items, &request.currency)
        .await?;
    Ok(Json(rates))
}
