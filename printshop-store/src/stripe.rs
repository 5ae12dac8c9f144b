use crate::rest::{http_client, join, RestError};
use async_trait::async_trait;
use printshop_core::payment::{
    CheckoutSession, CheckoutSessionRequest, PaymentIntent, PaymentIntentRequest, Refund,
};
use printshop_core::{PaymentProvider, ProviderResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

type Form = Vec<(String, String)>;

/// REST client for the Stripe API; request bodies are form-encoded
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(base_url: String, secret_key: String, timeout: Duration) -> Result<Self, RestError> {
        Ok(StripeClient {
            client: http_client(timeout)?,
            base_url,
            secret_key,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RestError> {
        let resp = self
            .client
            .get(join(&self.base_url, path))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, form: &Form) -> Result<T, RestError> {
        let resp = self
            .client
            .post(join(&self.base_url, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, RestError> {
        let status = resp.status();
        let text = resp.text().await?;
        parse_response(status.as_u16(), &text)
    }
}

fn parse_response<T: DeserializeOwned>(status: u16, text: &str) -> Result<T, RestError> {
    if !(200..300).contains(&status) {
        if let Ok(err) = serde_json::from_str::<ApiError>(text) {
            return Err(RestError::Api { status, message: err.error.message });
        }
        return Err(RestError::Api { status, message: format!("HTTP {}: {}", status, text) });
    }

    serde_json::from_str(text).map_err(|e| RestError::Parse(e.to_string()))
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn push(form: &mut Form, key: impl Into<String>, value: impl ToString) {
    form.push((key.into(), value.to_string()));
}

fn payment_intent_form(request: &PaymentIntentRequest) -> Form {
    let mut form = Form::new();
    push(&mut form, "amount", request.amount);
    push(&mut form, "currency", &request.currency);
    push(&mut form, "automatic_payment_methods[enabled]", true);
    push(&mut form, "metadata[order_number]", &request.order_number);
    if let Some(email) = &request.receipt_email {
        push(&mut form, "receipt_email", email);
    }
    form
}

fn checkout_session_form(request: &CheckoutSessionRequest) -> Form {
    let mut form = Form::new();
    push(&mut form, "mode", "payment");
    push(&mut form, "success_url", &request.success_url);
    push(&mut form, "cancel_url", &request.cancel_url);
    push(&mut form, "client_reference_id", &request.order_number);
    push(&mut form, "metadata[order_number]", &request.order_number);
    if let Some(email) = &request.customer_email {
        push(&mut form, "customer_email", email);
    }
    for (i, line) in request.lines.iter().enumerate() {
        let prefix = format!("line_items[{}]", i);
        push(&mut form, format!("{}[price_data][currency]", prefix), &request.currency);
        push(&mut form, format!("{}[price_data][product_data][name]", prefix), &line.name);
        push(&mut form, format!("{}[price_data][unit_amount]", prefix), line.unit_amount);
        push(&mut form, format!("{}[quantity]", prefix), line.quantity);
    }
    form
}

fn refund_form(intent_id: &str, amount: Option<i64>) -> Form {
    let mut form = Form::new();
    push(&mut form, "payment_intent", intent_id);
    if let Some(amount) = amount {
        push(&mut form, "amount", amount);
    }
    form
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> ProviderResult<PaymentIntent> {
        Ok(self.post("/v1/payment_intents", &payment_intent_form(request)).await?)
    }

    async fn retrieve_payment_intent(&self, intent_id: &str) -> ProviderResult<PaymentIntent> {
        Ok(self.get(&format!("/v1/payment_intents/{}", intent_id)).await?)
    }

    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> ProviderResult<CheckoutSession> {
        Ok(self.post("/v1/checkout/sessions", &checkout_session_form(request)).await?)
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> ProviderResult<CheckoutSession> {
        Ok(self.get(&format!("/v1/checkout/sessions/{}", session_id)).await?)
    }

    async fn create_refund(&self, intent_id: &str, amount: Option<i64>) -> ProviderResult<Refund> {
        Ok(self.post("/v1/refunds", &refund_form(intent_id, amount)).await?)
    }
}
