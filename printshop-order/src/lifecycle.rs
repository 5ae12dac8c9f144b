use crate::models::{Order, OrderStatus};
use chrono::Utc;

/// Allowed edges of the order state machine.
///
/// `error → error` is allowed so a repeated failure can be recorded.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Paid)
            | (Paid, Processing)
            | (Error, Processing)
            | (Paid, Error)
            | (Error, Error)
            | (Paid, Cancelled)
            | (Error, Cancelled)
            | (Processing, Shipped)
            | (Shipped, Delivered)
    )
}

impl Order {
    fn transition(&mut self, to: OrderStatus) -> Result<(), TransitionError> {
        if !can_transition(self.status, to) {
            return Err(TransitionError::InvalidTransition { from: self.status, to });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition: Pending → Paid (payment confirmed)
    pub fn mark_paid(&mut self, payment_intent_id: Option<String>) -> Result<(), TransitionError> {
        self.transition(OrderStatus::Paid)?;
        if payment_intent_id.is_some() {
            self.payment_intent_id = payment_intent_id;
        }
        self.paid_at = Some(Utc::now());
        Ok(())
    }

    /// Transition: Paid|Error → Processing, recording the provider's order id
    pub fn mark_processing(&mut self, fulfillment_order_id: String) -> Result<(), TransitionError> {
        if fulfillment_order_id.trim().is_empty() {
            return Err(TransitionError::MissingFulfillmentId);
        }
        self.transition(OrderStatus::Processing)?;
        self.fulfillment_order_id = Some(fulfillment_order_id);
        Ok(())
    }

    /// Transition: Paid|Error → Error; the order is kept for a later retry
    pub fn mark_failed(&mut self, detail: &str) -> Result<(), TransitionError> {
        self.transition(OrderStatus::Error)?;
        self.append_note(detail);
        Ok(())
    }

    /// Transition: Paid|Error → Cancelled (after a compensating refund)
    pub fn mark_cancelled(&mut self, reason: &str) -> Result<(), TransitionError> {
        if reason.trim().is_empty() {
            return Err(TransitionError::MissingCancellationReason);
        }
        if self.fulfillment_order_id.is_some() {
            return Err(TransitionError::InvalidTransition { from: self.status, to: OrderStatus::Cancelled });
        }
        self.transition(OrderStatus::Cancelled)?;
        self.cancellation_reason = Some(reason.to_string());
        self.cancelled_at = Some(Utc::now());
        Ok(())
    }

    /// Transition: Processing → Shipped
    pub fn mark_shipped(&mut self) -> Result<(), TransitionError> {
        self.transition(OrderStatus::Shipped)?;
        self.shipped_at = Some(Utc::now());
        Ok(())
    }

    /// Transition: Shipped → Delivered
    pub fn mark_delivered(&mut self) -> Result<(), TransitionError> {
        self.transition(OrderStatus::Delivered)
    }

    /// Checks the data invariants that tie status to the other fields
    pub fn check_invariants(&self) -> Result<(), TransitionError> {
        if self.fulfillment_order_id.is_some()
            && !matches!(self.status, OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered)
        {
            return Err(TransitionError::DanglingFulfillmentId(self.status));
        }
        if self.status == OrderStatus::Cancelled && self.cancellation_reason.is_none() {
            return Err(TransitionError::MissingCancellationReason);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Fulfillment order id must not be empty")]
    MissingFulfillmentId,

    #[error("Cancelled orders require a cancellation reason")]
    MissingCancellationReason,

    #[error("Fulfillment id present while order is {0}")]
    DanglingFulfillmentId(OrderStatus),
}
