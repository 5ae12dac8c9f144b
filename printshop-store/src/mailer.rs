use crate::rest::{http_client, join, RestError};
use async_trait::async_trait;
use printshop_core::{CancellationNotice, Notifier, ProviderResult};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

#[derive(Serialize)]
struct Contact<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailBody<'a> {
    sender: Contact<'a>,
    to: [Contact<'a>; 1],
    subject: String,
    html_content: String,
}

/// Transactional email over the Brevo HTTP API
#[derive(Clone)]
pub struct BrevoMailer {
    client: Client,
    api_url: String,
    api_key: String,
    sender_email: String,
    sender_name: String,
}

impl BrevoMailer {
    pub fn new(
        api_url: String,
        api_key: String,
        sender_email: String,
        sender_name: String,
        timeout: Duration,
    ) -> Result<Self, RestError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_url,
            api_key,
            sender_email,
            sender_name,
        })
    }

    fn body<'a>(&'a self, notice: &'a CancellationNotice) -> EmailBody<'a> {
        EmailBody {
            sender: Contact { email: &self.sender_email, name: &self.sender_name },
            to: [Contact { email: &notice.recipient_email, name: &notice.recipient_name }],
            subject: notice.subject(),
            html_content: notice.html_body(),
        }
    }

    async fn send(&self, body: &EmailBody<'_>) -> Result<(), RestError> {
        let resp = self
            .client
            .post(join(&self.api_url, "/smtp/email"))
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(RestError::Api { status: status.as_u16(), message: text });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for BrevoMailer {
    async fn send_cancellation(&self, notice: &CancellationNotice) -> ProviderResult<()> {
        self.send(&self.body(notice)).await?;
        info!(order_number = %notice.order_number, "Cancellation email sent");
        Ok(())
    }
}
