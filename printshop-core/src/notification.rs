use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::ProviderResult;

/// "Your order was cancelled and refunded" message contents
#[derive(Debug, Clone)]
pub struct CancellationNotice {
    pub order_number: String,
    pub recipient_email: String,
    pub recipient_name: String,
    pub reason: String,
    pub refunded_amount: Decimal,
    pub currency: String,
}

impl CancellationNotice {
    pub fn subject(&self) -> String {
        format!("Your order {} has been cancelled", self.order_number)
    }

    pub fn html_body(&self) -> String {
        format!(
            "<p>Hi {},</p>\
             <p>We were unable to complete order <strong>{}</strong> and it has been cancelled.</p>\
             <p>Reason: {}</p>\
             <p>A refund of {} {} has been issued to your original payment method.</p>",
            self.recipient_name,
            self.order_number,
            self.reason,
            self.refunded_amount.round_dp(2),
            self.currency.to_uppercase(),
        )
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_cancellation(&self, notice: &CancellationNotice) -> ProviderResult<()>;
}
