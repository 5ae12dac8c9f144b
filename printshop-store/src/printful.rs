use crate::rest::{http_client, join, RestError};
use async_trait::async_trait;
use printshop_core::fulfillment::{
    CatalogVariant, FulfillmentOrder, FulfillmentSubmission, ItemOptions, PrintFile, ShippingRate,
    ShippingRateRequest,
};
use printshop_core::{FulfillmentProvider, ProviderError, ProviderResult};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// REST client for the Printful API
#[derive(Clone)]
pub struct PrintfulClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PrintfulClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, RestError> {
        Ok(PrintfulClient {
            client: http_client(timeout)?,
            base_url,
            api_key,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RestError> {
        let resp = self
            .client
            .get(join(&self.base_url, path))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, RestError> {
        let resp = self
            .client
            .post(join(&self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    /// Unwraps the `{code, result, error}` envelope every endpoint answers with
    async fn handle_response<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, RestError> {
        let status = resp.status();
        let text = resp.text().await?;
        parse_envelope(status.as_u16(), &text)
    }
}

fn parse_envelope<T: DeserializeOwned>(status: u16, text: &str) -> Result<T, RestError> {
    if !(200..300).contains(&status) {
        if let Ok(err) = serde_json::from_str::<ErrorEnvelope>(text) {
            let message = err
                .error
                .map(|e| e.message)
                .or_else(|| err.result.as_str().map(String::from))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(RestError::Api { status, message });
        }
        return Err(RestError::Api { status, message: format!("HTTP {}: {}", status, text) });
    }

    let envelope: Envelope<T> = serde_json::from_str(text).map_err(|e| RestError::Parse(e.to_string()))?;
    Ok(envelope.result)
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    result: serde_json::Value,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct VariantResult {
    variant: VariantBody,
    product: ProductBody,
}

#[derive(Deserialize)]
struct VariantBody {
    id: i64,
    name: String,
    #[serde(default = "default_true")]
    in_stock: bool,
}

#[derive(Deserialize)]
struct ProductBody {
    #[serde(default)]
    is_discontinued: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct OrderBody {
    id: i64,
    status: String,
}

impl From<OrderBody> for FulfillmentOrder {
    fn from(body: OrderBody) -> Self {
        FulfillmentOrder { id: body.id.to_string(), status: body.status }
    }
}

#[derive(Deserialize)]
struct RateBody {
    id: String,
    name: String,
    rate: Decimal,
    currency: String,
    #[serde(rename = "minDeliveryDays")]
    min_delivery_days: Option<u32>,
    #[serde(rename = "maxDeliveryDays")]
    max_delivery_days: Option<u32>,
}

/// Catalog ids go out as numbers, anything else as an external variant id
#[derive(Serialize)]
struct OrderItemBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    variant_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_variant_id: Option<&'a str>,
    quantity: i32,
    files: &'a [PrintFile],
    options: &'a ItemOptions,
}

#[derive(Serialize)]
struct OrderRequestBody<'a> {
    external_id: &'a str,
    recipient: &'a printshop_core::ShippingAddress,
    items: Vec<OrderItemBody<'a>>,
    retail_costs: &'a printshop_core::fulfillment::CostBreakdown,
}

impl<'a> From<&'a FulfillmentSubmission> for OrderRequestBody<'a> {
    fn from(submission: &'a FulfillmentSubmission) -> Self {
        let items = submission
            .items
            .iter()
            .map(|item| {
                let numeric = item.variant_id.parse::<i64>().ok();
                OrderItemBody {
                    variant_id: numeric,
                    external_variant_id: numeric.is_none().then_some(item.variant_id.as_str()),
                    quantity: item.quantity,
                    files: &item.files,
                    options: &item.options,
                }
            })
            .collect();
        OrderRequestBody {
            external_id: &submission.external_id,
            recipient: &submission.recipient,
            items,
            retail_costs: &submission.retail_costs,
        }
    }
}

#[derive(Serialize)]
struct RatesRecipient<'a> {
    address1: &'a str,
    city: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_code: Option<&'a str>,
    country_code: &'a str,
    zip: &'a str,
}

#[derive(Serialize)]
struct RatesItem<'a> {
    variant_id: &'a str,
    quantity: i32,
}

#[derive(Serialize)]
struct RatesRequestBody<'a> {
    recipient: RatesRecipient<'a>,
    items: Vec<RatesItem<'a>>,
    currency: &'a str,
}

#[async_trait]
impl FulfillmentProvider for PrintfulClient {
    async fn get_variant(&self, variant_id: &str) -> ProviderResult<Option<CatalogVariant>> {
        let path = format!("/products/variant/{}", variant_id);
        match self.get::<VariantResult>(&path).await {
            Ok(found) => Ok(Some(CatalogVariant {
                id: found.variant.id.to_string(),
                name: found.variant.name,
                discontinued: found.product.is_discontinued,
                enabled: found.variant.in_stock,
            })),
            Err(RestError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_order(&self, submission: &FulfillmentSubmission) -> ProviderResult<FulfillmentOrder> {
        debug!(external_id = %submission.external_id, items = submission.items.len(), "POST /orders");
        let body = OrderRequestBody::from(submission);
        let created: OrderBody = self.post("/orders", &body).await?;
        Ok(created.into())
    }

    async fn get_order(&self, fulfillment_order_id: &str) -> ProviderResult<FulfillmentOrder> {
        let order: OrderBody = self.get(&format!("/orders/{}", fulfillment_order_id)).await?;
        Ok(order.into())
    }

    async fn shipping_rates(&self, request: &ShippingRateRequest) -> ProviderResult<Vec<ShippingRate>> {
        let recipient = &request.recipient;
        if recipient.country_code.trim().is_empty() {
            return Err(ProviderError::Api { status: 400, message: "recipient country is required".into() });
        }
        let body = RatesRequestBody {
            recipient: RatesRecipient {
                address1: &recipient.address1,
                city: &recipient.city,
                state_code: recipient.state_code.as_deref(),
                country_code: &recipient.country_code,
                zip: &recipient.zip,
            },
            items: request
                .items
                .iter()
                .map(|line| RatesItem { variant_id: &line.variant_id, quantity: line.quantity })
                .collect(),
            currency: &request.currency,
        };

        let rates: Vec<RateBody> = self.post("/shipping/rates", &body).await?;
        Ok(rates
            .into_iter()
            .map(|rate| ShippingRate {
                id: rate.id,
                name: rate.name,
                rate: rate.rate,
                currency: rate.currency,
                min_delivery_days: rate.min_delivery_days,
                max_delivery_days: rate.max_delivery_days,
            })
            .collect())
    }
}
