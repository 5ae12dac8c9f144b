use crate::error::{bounded, PaymentError};
use crate::models::Order;
use printshop_core::payment::{
    CheckoutLine, CheckoutSession, CheckoutSessionRequest, PaymentIntent, PaymentIntentRequest, Refund,
};
use printshop_core::PaymentProvider;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Currencies the payment provider expresses without a minor unit
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "pyg", "rwf", "vnd", "xaf", "xof"];

/// Structured refund answer for callers that branch instead of handling errors
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RefundResult {
    pub success: bool,
    pub refund_id: Option<String>,
    pub message: String,
}

impl RefundResult {
    fn issued(refund: &Refund) -> Self {
        Self {
            success: true,
            refund_id: Some(refund.id.clone()),
            message: format!("Refund {} issued", refund.id),
        }
    }

    fn failed(message: String) -> Self {
        Self { success: false, refund_id: None, message }
    }
}

/// Convert a decimal amount into the provider's integer minor unit
pub fn to_minor_units(amount: Decimal, currency: &str) -> Result<i64, PaymentError> {
    if amount.is_sign_negative() {
        return Err(PaymentError::InvalidAmount(format!("{} is negative", amount)));
    }
    let scale = if ZERO_DECIMAL_CURRENCIES.contains(&currency.to_ascii_lowercase().as_str()) {
        Decimal::ONE
    } else {
        Decimal::ONE_HUNDRED
    };
    (amount * scale)
        .round()
        .to_i64()
        .ok_or_else(|| PaymentError::InvalidAmount(format!("{} does not fit in minor units", amount)))
}

/// Wraps payment-intent, checkout and refund calls with bounded time
pub struct PaymentGateway {
    provider: Arc<dyn PaymentProvider>,
    timeout: Duration,
}

impl PaymentGateway {
    pub fn new(provider: Arc<dyn PaymentProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Initialize a payment intent for an order
    pub async fn create_payment_intent(&self, order: &Order) -> Result<PaymentIntent, PaymentError> {
        let request = PaymentIntentRequest {
            amount: to_minor_units(order.total, &order.currency)?,
            currency: order.currency.to_ascii_lowercase(),
            order_number: order.order_number.clone(),
            receipt_email: order.customer_email().map(String::from),
        };
        let intent = bounded(self.timeout, "create_payment_intent", self.provider.create_payment_intent(&request))
            .await?;
        info!(order_id = order.id, payment_intent_id = %intent.id, "Payment intent created");
        Ok(intent)
    }

    /// Hosted checkout for every line of the order plus shipping and tax
    pub async fn create_checkout_session(
        &self,
        order: &Order,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut lines = Vec::with_capacity(order.items.len() + 2);
        for item in &order.items {
            let product = item
                .design_data
                .product_name
                .clone()
                .unwrap_or_else(|| "Custom T-Shirt".to_string());
            lines.push(CheckoutLine {
                name: format!("{} ({} / {})", product, item.size, item.color),
                unit_amount: to_minor_units(item.unit_price, &order.currency)?,
                quantity: item.quantity,
            });
        }
        for (name, amount) in [("Shipping", order.shipping), ("Tax", order.tax)] {
            if amount > Decimal::ZERO {
                lines.push(CheckoutLine {
                    name: name.to_string(),
                    unit_amount: to_minor_units(amount, &order.currency)?,
                    quantity: 1,
                });
            }
        }

        let request = CheckoutSessionRequest {
            order_number: order.order_number.clone(),
            currency: order.currency.to_ascii_lowercase(),
            lines,
            customer_email: order.customer_email().map(String::from),
            success_url: success_url.to_string(),
            cancel_url: cancel_url.to_string(),
        };
        let session = bounded(self.timeout, "create_checkout_session", self.provider.create_checkout_session(&request))
            .await?;
        info!(order_id = order.id, payment_session_id = %session.id, "Checkout session created");
        Ok(session)
    }

    /// Refund against a payment intent; `None` refunds in full
    pub async fn refund_by_payment_intent(
        &self,
        intent_id: &str,
        amount: Option<Decimal>,
        currency: &str,
    ) -> Result<Refund, PaymentError> {
        let minor = amount.map(|a| to_minor_units(a, currency)).transpose()?;
        let refund = bounded(self.timeout, "create_refund", self.provider.create_refund(intent_id, minor))
            .await?;

        if !refund.is_issued() {
            return Err(PaymentError::RefundNotIssued {
                refund_id: refund.id,
                status: format!("{:?}", refund.status).to_lowercase(),
            });
        }
        info!(payment_intent_id = intent_id, refund_id = %refund.id, amount = refund.amount, "Refund issued");
        Ok(refund)
    }

    /// Resolve the session's intent, then refund it. Never returns an error.
    pub async fn refund_by_session(&self, session_id: &str, amount: Option<Decimal>, currency: &str) -> RefundResult {
        let lookup = self.provider.retrieve_checkout_session(session_id);
        let session = match bounded(self.timeout, "retrieve_checkout_session", lookup).await {
            Ok(session) => session,
            Err(e) => {
                error!(payment_session_id = session_id, error = %e, "Could not retrieve checkout session");
                return RefundResult::failed(format!("Could not retrieve session {}: {}", session_id, e));
            }
        };

        let Some(intent_id) = session.payment_intent.filter(|id| !id.is_empty()) else {
            let e = PaymentError::SessionWithoutIntent(session_id.to_string());
            error!(payment_session_id = session_id, "{}", e);
            return RefundResult::failed(e.to_string());
        };

        match self.refund_by_payment_intent(&intent_id, amount, currency).await {
            Ok(refund) => RefundResult::issued(&refund),
            Err(e) => {
                error!(payment_session_id = session_id, payment_intent_id = %intent_id, error = %e, "Refund failed");
                RefundResult::failed(format!("Refund failed: {}", e))
            }
        }
    }

    /// Refund an order's full total: session reference first, intent second.
    ///
    /// Fails fast with `MissingPaymentReference` when the order has neither.
    pub async fn refund_order(&self, order: &Order) -> Result<RefundResult, PaymentError> {
        let session_id = order.payment_session_id.as_deref().filter(|s| !s.trim().is_empty());
        let intent_id = order.payment_intent_id.as_deref().filter(|s| !s.trim().is_empty());

        match (session_id, intent_id) {
            (Some(session_id), _) => Ok(self
                .refund_by_session(session_id, Some(order.total), &order.currency)
                .await),
            (None, Some(intent_id)) => {
                match self
                    .refund_by_payment_intent(intent_id, Some(order.total), &order.currency)
                    .await
                {
                    Ok(refund) => Ok(RefundResult::issued(&refund)),
                    Err(e) => Ok(RefundResult::failed(format!("Refund failed: {}", e))),
                }
            }
            (None, None) => Err(PaymentError::MissingPaymentReference {
                order_number: order.order_number.clone(),
            }),
        }
    }
}
