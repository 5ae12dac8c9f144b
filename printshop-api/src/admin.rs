use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use printshop_catalog::VariantCheck;
use printshop_order::{CancellationOutcome, Order, OrderStatus, ReconcileError, ReconcileOutcome, SkippedItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AppError;
use crate::orders::load_order;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    /// Comma separated; defaults to `error`
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SkippedItemView {
    pub item_id: i64,
    pub reason: String,
}

impl From<&SkippedItem> for SkippedItemView {
    fn from(skipped: &SkippedItem) -> Self {
        SkippedItemView { item_id: skipped.item_id, reason: skipped.rejection.to_string() }
    }
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub result: &'static str,
    pub fulfillment_order_id: Option<String>,
    pub provider_status: Option<String>,
    pub failure: Option<String>,
    pub skipped: Vec<SkippedItemView>,
}

impl From<ReconcileOutcome> for ReconcileResponse {
    fn from(outcome: ReconcileOutcome) -> Self {
        let skipped = outcome.skipped().iter().map(SkippedItemView::from).collect();
        match outcome {
            ReconcileOutcome::Submitted { fulfillment_order_id, .. } => ReconcileResponse {
                result: "submitted",
                fulfillment_order_id: Some(fulfillment_order_id),
                provider_status: None,
                failure: None,
                skipped,
            },
            ReconcileOutcome::AlreadyReconciled { fulfillment_order_id, provider_status } => ReconcileResponse {
                result: "already_reconciled",
                fulfillment_order_id: Some(fulfillment_order_id),
                provider_status,
                failure: None,
                skipped,
            },
            ReconcileOutcome::Failed { failure, .. } => ReconcileResponse {
                result: "failed",
                fulfillment_order_id: None,
                provider_status: None,
                failure: Some(failure.to_string()),
                skipped,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FulfillmentStatusResponse {
    pub order_id: i64,
    pub fulfillment_order_id: String,
    pub provider_status: String,
    pub local_status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct ValidateVariantsRequest {
    pub variant_ids: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/orders", get(list_orders))
        .route("/v1/admin/orders/{id}", get(get_order))
        .route("/v1/admin/orders/{id}/reconcile", post(reconcile_order))
        .route("/v1/admin/orders/{id}/cancel-refund", post(cancel_and_refund))
        .route("/v1/admin/orders/{id}/fulfillment", get(fulfillment_status))
        .route("/v1/admin/variants/validate", post(validate_variants))
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<OrderStatus>, AppError> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(vec![OrderStatus::Error]);
    };
    raw.split(',')
        .map(|s| s.parse::<OrderStatus>().map_err(|e| AppError::BadRequest(e.to_string())))
        .collect()
}

/// Orders needing operator attention, notes included
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let statuses = parse_statuses(query.status.as_deref())?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let orders = state
        .orders
        .list_orders_by_status(&statuses, limit)
        .await
        .map_err(AppError::storage)?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(load_order(&state, id).await?))
}

pub async fn reconcile_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ReconcileResponse>, AppError> {
    state
        .with_order_lock(id, || async {
            let outcome = state.reconciler.reconcile(id).await?;
            Ok::<_, AppError>(Json(outcome.into()))
        })
        .await
}

pub async fn cancel_and_refund(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CancellationOutcome>, AppError> {
    state
        .with_order_lock(id, || async {
            let outcome = state.reconciler.cancel_and_refund(id).await?;
            Ok::<_, AppError>(Json(outcome))
        })
        .await
}

/// Live provider status for an order that was dispatched
pub async fn fulfillment_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FulfillmentStatusResponse>, AppError> {
    let order = load_order(&state, id).await?;
    let Some(fulfillment_order_id) = order.fulfillment_order_id else {
        return Err(ReconcileError::InvalidState {
            order_id: id,
            status: order.status,
            expected: "dispatched to fulfillment",
        }
        .into());
    };

    let remote = state.fulfillment.order_status(&fulfillment_order_id).await?;
    Ok(Json(FulfillmentStatusResponse {
        order_id: id,
        fulfillment_order_id,
        provider_status: remote.status,
        local_status: order.status,
    }))
}

pub async fn validate_variants(
    State(state): State<AppState>,
    Json(request): Json<ValidateVariantsRequest>,
) -> Result<Json<HashMap<String, VariantCheck>>, AppError> {
    if request.variant_ids.is_empty() {
        return Err(AppError::BadRequest("variant_ids must not be empty".into()));
    }
    let checks = state.fulfillment.validator().validate_many(&request.variant_ids).await;
    Ok(Json(checks))
}
