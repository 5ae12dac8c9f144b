use crate::artifact::{classify_file_type, ArtifactResolver};
use crate::error::{ItemRejection, ReconcileError, ReconcileFailure, SkippedItem};
use crate::fulfillment::FulfillmentGateway;
use crate::models::{Order, OrderItem};
use crate::payment::PaymentGateway;
use crate::repository::OrderRepository;
use printshop_catalog::VariantCheck;
use printshop_core::fulfillment::{
    CostBreakdown, FulfillmentSubmission, ItemOptions, PrintFile, StitchColor, SubmissionItem,
};
use printshop_core::Notifier;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const DEFAULT_COLOR: &str = "Default";

/// Result of a reconciliation attempt that did not error out
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Submitted now; the order is `processing`
    Submitted {
        fulfillment_order_id: String,
        skipped: Vec<SkippedItem>,
    },
    /// Already held a fulfillment order; the provider was queried instead
    AlreadyReconciled {
        fulfillment_order_id: String,
        provider_status: Option<String>,
    },
    /// Parked in `error` with a note
    Failed {
        failure: ReconcileFailure,
        skipped: Vec<SkippedItem>,
    },
}

impl ReconcileOutcome {
    pub fn skipped(&self) -> &[SkippedItem] {
        match self {
            ReconcileOutcome::Submitted { skipped, .. } | ReconcileOutcome::Failed { skipped, .. } => skipped,
            ReconcileOutcome::AlreadyReconciled { .. } => &[],
        }
    }
}

/// Drives paid orders into fulfillment and compensates when that fails
pub struct OrderReconciler {
    pub(crate) orders: Arc<dyn OrderRepository>,
    pub(crate) fulfillment: Arc<FulfillmentGateway>,
    pub(crate) payments: Arc<PaymentGateway>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) artifacts: ArtifactResolver,
}

impl OrderReconciler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        fulfillment: Arc<FulfillmentGateway>,
        payments: Arc<PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        artifacts: ArtifactResolver,
    ) -> Self {
        Self { orders, fulfillment, payments, notifier, artifacts }
    }

    /// Bring a paid or failed order into fulfillment.
    ///
    /// Dispatch happens at most once per order: when a fulfillment order id
    /// is already recorded the provider is only queried.
    #[instrument(skip(self), fields(order_number = tracing::field::Empty))]
    pub async fn reconcile(&self, order_id: i64) -> Result<ReconcileOutcome, ReconcileError> {
        let mut order = self.load(order_id).await?;
        tracing::Span::current().record("order_number", order.order_number.as_str());

        if !order.status.is_reconcilable() {
            return Err(ReconcileError::InvalidState {
                order_id,
                status: order.status,
                expected: "paid, error",
            });
        }

        if let Some(fulfillment_order_id) = order.fulfillment_order_id.clone() {
            return self.refresh_dispatched(order, fulfillment_order_id).await;
        }

        order.reconcile_attempts += 1;

        if !order.items.iter().any(OrderItem::has_design_front_artifact) {
            return self.park(order, ReconcileFailure::NoArtifact, Vec::new()).await;
        }

        let (items, skipped) = self.submission_items(&order).await;
        if items.is_empty() {
            return self.park(order, ReconcileFailure::NoValidItems, skipped).await;
        }

        let submission = FulfillmentSubmission {
            external_id: order.order_number.clone(),
            recipient: order.shipping_address.clone(),
            items,
            retail_costs: CostBreakdown {
                subtotal: order.subtotal,
                shipping: order.shipping,
                tax: order.tax,
                total: order.total,
                currency: order.currency.clone(),
            },
        };

        match self.fulfillment.create_order(&submission).await {
            Ok(created) => {
                order.mark_processing(created.id.clone())?;
                if !skipped.is_empty() {
                    order.append_note(format!(
                        "Submitted to fulfillment as {} without {} item(s)",
                        created.id,
                        skipped.len()
                    ));
                    for skip in &skipped {
                        order.append_note(format!("Item {} skipped: {}", skip.item_id, skip.rejection));
                    }
                }
                self.save(&order).await?;
                info!(
                    order_id,
                    fulfillment_order_id = %created.id,
                    items = submission.items.len(),
                    skipped = skipped.len(),
                    "Order submitted for fulfillment"
                );
                Ok(ReconcileOutcome::Submitted {
                    fulfillment_order_id: created.id,
                    skipped,
                })
            }
            Err(e) => {
                error!(order_id, error = %e, transient = e.is_transient(), "Fulfillment submission failed");
                self.park(order, ReconcileFailure::Gateway(e), skipped).await
            }
        }
    }

    pub(crate) async fn load(&self, order_id: i64) -> Result<Order, ReconcileError> {
        self.orders
            .get_order(order_id)
            .await
            .map_err(ReconcileError::Storage)?
            .ok_or(ReconcileError::NotFound(order_id))
    }

    pub(crate) async fn save(&self, order: &Order) -> Result<(), ReconcileError> {
        self.orders.save_order(order).await.map_err(ReconcileError::Storage)
    }

    /// The order was dispatched but its status never caught up
    async fn refresh_dispatched(
        &self,
        mut order: Order,
        fulfillment_order_id: String,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let remote = match self.fulfillment.order_status(&fulfillment_order_id).await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(
                    order_id = order.id,
                    fulfillment_order_id = %fulfillment_order_id,
                    error = %e,
                    "Could not query existing fulfillment order"
                );
                return Ok(ReconcileOutcome::AlreadyReconciled {
                    fulfillment_order_id,
                    provider_status: None,
                });
            }
        };

        order.mark_processing(fulfillment_order_id.clone())?;
        if remote.is_shipped() {
            order.mark_shipped()?;
        }
        order.append_note(format!(
            "Status repaired from fulfillment order {} ({})",
            fulfillment_order_id, remote.status
        ));
        self.save(&order).await?;
        info!(
            order_id = order.id,
            fulfillment_order_id = %fulfillment_order_id,
            provider_status = %remote.status,
            "Order already dispatched; local status repaired"
        );

        Ok(ReconcileOutcome::AlreadyReconciled {
            fulfillment_order_id,
            provider_status: Some(remote.status),
        })
    }

    async fn park(
        &self,
        mut order: Order,
        failure: ReconcileFailure,
        skipped: Vec<SkippedItem>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        order.mark_failed(&failure.to_string())?;
        for skip in &skipped {
            order.append_note(format!("Item {} skipped: {}", skip.item_id, skip.rejection));
        }
        self.save(&order).await?;
        warn!(
            order_id = order.id,
            attempts = order.reconcile_attempts,
            skipped = skipped.len(),
            failure = %failure,
            "Order parked in error"
        );
        Ok(ReconcileOutcome::Failed { failure, skipped })
    }

    /// Build the submittable lines, collecting the reason for every skipped item
    async fn submission_items(&self, order: &Order) -> (Vec<SubmissionItem>, Vec<SkippedItem>) {
        let mut variant_ids: Vec<String> = order
            .items
            .iter()
            .map(|item| item.variant_id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        variant_ids.dedup();
        let checks = self.fulfillment.validator().validate_many(&variant_ids).await;

        let mut items = Vec::with_capacity(order.items.len());
        let mut skipped = Vec::new();
        for item in &order.items {
            match self.submission_item(item, &checks) {
                Ok(line) => items.push(line),
                Err(rejection) => {
                    warn!(
                        order_id = order.id,
                        item_id = item.id,
                        variant_id = %item.variant_id,
                        reason = %rejection,
                        "Skipping order item"
                    );
                    skipped.push(SkippedItem { item_id: item.id, rejection });
                }
            }
        }
        (items, skipped)
    }

    fn submission_item(
        &self,
        item: &OrderItem,
        checks: &HashMap<String, VariantCheck>,
    ) -> Result<SubmissionItem, ItemRejection> {
        let variant_id = item.variant_id.trim();
        if variant_id.is_empty() {
            return Err(ItemRejection::MissingVariant);
        }
        match checks.get(variant_id) {
            Some(check) if check.valid => {}
            other => {
                return Err(ItemRejection::VariantInvalid {
                    variant_id: variant_id.to_string(),
                    reason: other
                        .and_then(|check| check.reason.clone())
                        .unwrap_or_else(|| "not validated".to_string()),
                })
            }
        }

        let url = self.artifacts.inspect(item)?;

        let size = item.size.trim();
        if size.is_empty() {
            return Err(ItemRejection::MissingSize);
        }
        if item.quantity <= 0 {
            return Err(ItemRejection::InvalidQuantity(item.quantity));
        }

        let color = match item.color.trim() {
            "" => DEFAULT_COLOR,
            color => color,
        };

        Ok(SubmissionItem {
            variant_id: variant_id.to_string(),
            quantity: item.quantity,
            files: vec![PrintFile {
                file_type: classify_file_type(&url),
                url: url.to_string(),
            }],
            options: ItemOptions {
                size: size.to_string(),
                color: color.to_string(),
                stitch_color: StitchColor::for_color(color),
            },
        })
    }
}
