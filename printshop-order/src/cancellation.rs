use crate::error::ReconcileError;
use crate::models::{Order, OrderStatus};
use crate::reconciler::OrderReconciler;
use printshop_core::CancellationNotice;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

pub const CANCELLATION_REASON: &str = "fulfillment failed — refunded";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CancellationOutcome {
    /// Refund issued and the order cancelled
    Refunded { refund_id: Option<String>, notified: bool },
    /// Provider refused or could not be reached; the order is left in `error`
    RefundFailed { message: String },
}

impl OrderReconciler {
    /// Refund an order that cannot be fulfilled and cancel it.
    ///
    /// Only `paid` or `error` orders that never reached the fulfillment
    /// provider qualify. A cancelled order is therefore never refunded twice.
    #[instrument(skip(self), fields(order_number = tracing::field::Empty))]
    pub async fn cancel_and_refund(&self, order_id: i64) -> Result<CancellationOutcome, ReconcileError> {
        let mut order = self.load(order_id).await?;
        tracing::Span::current().record("order_number", order.order_number.as_str());

        if !matches!(order.status, OrderStatus::Paid | OrderStatus::Error) || order.fulfillment_order_id.is_some() {
            return Err(ReconcileError::InvalidState {
                order_id,
                status: order.status,
                expected: "paid or error without a fulfillment order",
            });
        }

        let refund = match self.payments.refund_order(&order).await {
            Ok(refund) => refund,
            Err(e) => {
                error!(order_id, error = %e, "Cannot refund order");
                return Err(e.into());
            }
        };

        if !refund.success {
            order.mark_failed(&format!("Compensating refund not issued: {}", refund.message))?;
            self.save(&order).await?;
            error!(order_id, message = %refund.message, "Compensating refund failed");
            return Ok(CancellationOutcome::RefundFailed { message: refund.message });
        }

        order.mark_cancelled(CANCELLATION_REASON)?;
        order.append_note(format!(
            "Refunded {} {} ({})",
            order.total.round_dp(2),
            order.currency,
            refund.refund_id.as_deref().unwrap_or("no refund id")
        ));
        if let Err(e) = self.save(&order).await {
            error!(order_id, refund_id = ?refund.refund_id, error = %e, "Refund issued but cancellation was not persisted");
            return Err(e);
        }
        info!(order_id, refund_id = ?refund.refund_id, "Order cancelled and refunded");

        let notified = self.notify_cancelled(&order).await;
        Ok(CancellationOutcome::Refunded { refund_id: refund.refund_id, notified })
    }

    async fn notify_cancelled(&self, order: &Order) -> bool {
        let Some(email) = order.customer_email() else {
            warn!(order_id = order.id, "No customer email on order; cancellation notice skipped");
            return false;
        };

        let notice = CancellationNotice {
            order_number: order.order_number.clone(),
            recipient_email: email.to_string(),
            recipient_name: order.shipping_address.name.clone(),
            reason: CANCELLATION_REASON.to_string(),
            refunded_amount: order.total,
            currency: order.currency.clone(),
        };
        match self.notifier.send_cancellation(&notice).await {
            Ok(()) => true,
            Err(e) => {
                warn!(order_id = order.id, error = %e, "Cancellation notice failed");
                false
            }
        }
    }
}
