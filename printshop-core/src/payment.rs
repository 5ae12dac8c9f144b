use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ProviderResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Succeeded,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String, // Provider's ID (e.g., pi_123)
    /// Amount in the currency's minor unit
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub amount: i64,
    pub currency: String,
    pub order_number: String,
    pub receipt_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub order_number: String,
    pub currency: String,
    pub lines: Vec<CheckoutLine>,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String, // cs_...
    pub url: Option<String>,
    /// Set once the customer has paid
    pub payment_intent: Option<String>,
    pub payment_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    RequiresAction,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String, // re_...
    pub payment_intent: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: RefundStatus,
}

impl Refund {
    /// A refund counts as issued unless the provider reports it failed or canceled.
    pub fn is_issued(&self) -> bool {
        !matches!(self.status, RefundStatus::Failed | RefundStatus::Canceled)
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment intent with the provider
    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> ProviderResult<PaymentIntent>;

    /// Retrieve intent status
    async fn retrieve_payment_intent(&self, intent_id: &str) -> ProviderResult<PaymentIntent>;

    /// Create a hosted checkout session
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> ProviderResult<CheckoutSession>;

    /// Retrieve a checkout session, used to find the intent behind it
    async fn retrieve_checkout_session(&self, session_id: &str) -> ProviderResult<CheckoutSession>;

    /// Refund a captured intent; `None` refunds the full amount
    async fn create_refund(&self, intent_id: &str, amount: Option<i64>) -> ProviderResult<Refund>;
}
