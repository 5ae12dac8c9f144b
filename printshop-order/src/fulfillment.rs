use crate::error::{bounded, GatewayError};
use printshop_catalog::VariantValidator;
use printshop_core::fulfillment::{
    FulfillmentOrder, FulfillmentSubmission, ShippingLine, ShippingRate, ShippingRateRequest,
};
use printshop_core::{FulfillmentProvider, ShippingAddress};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Bounded-time access to the fulfillment provider
pub struct FulfillmentGateway {
    provider: Arc<dyn FulfillmentProvider>,
    validator: VariantValidator,
    timeout: Duration,
}

impl FulfillmentGateway {
    pub fn new(provider: Arc<dyn FulfillmentProvider>, validator: VariantValidator, timeout: Duration) -> Self {
        Self { provider, validator, timeout }
    }

    pub fn validator(&self) -> &VariantValidator {
        &self.validator
    }

    /// Submit an order for manufacturing
    pub async fn create_order(&self, submission: &FulfillmentSubmission) -> Result<FulfillmentOrder, GatewayError> {
        let created = bounded(self.timeout, "create_order", self.provider.create_order(submission)).await?;

        if created.id.trim().is_empty() {
            return Err(GatewayError::Malformed("create_order response carried no order id".into()));
        }
        info!(
            external_id = %submission.external_id,
            fulfillment_order_id = %created.id,
            status = %created.status,
            "Fulfillment order created"
        );
        Ok(created)
    }

    pub async fn order_status(&self, fulfillment_order_id: &str) -> Result<FulfillmentOrder, GatewayError> {
        bounded(self.timeout, "get_order", self.provider.get_order(fulfillment_order_id))
            .await
    }

    /// Quote shipping for the lines whose variants are currently shippable
    pub async fn shipping_rates(
        &self,
        recipient: &ShippingAddress,
        lines: &[ShippingLine],
        currency: &str,
    ) -> Result<Vec<ShippingRate>, GatewayError> {
        let variant_ids: Vec<String> = lines.iter().map(|line| line.variant_id.clone()).collect();
        let shippable = self.validator.filter_valid(&variant_ids).await;

        let items: Vec<ShippingLine> = lines
            .iter()
            .filter(|line| line.quantity > 0 && shippable.contains(&line.variant_id))
            .cloned()
            .collect();
        if items.len() < lines.len() {
            warn!(
                requested = lines.len(),
                shippable = items.len(),
                "Dropped unshippable lines from shipping quote"
            );
        }
        if items.is_empty() {
            return Err(GatewayError::Rejected("no shippable items in request".into()));
        }

        let request = ShippingRateRequest {
            recipient: recipient.clone(),
            items,
            currency: currency.to_string(),
        };
        bounded(self.timeout, "shipping_rates", self.provider.shipping_rates(&request))
            .await
    }
}
