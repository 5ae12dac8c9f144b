use printshop_core::ProviderError;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convert infrastructure RestError to the provider-facing error
impl From<RestError> for ProviderError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Http(e) => ProviderError::Transport(e.to_string()),
            RestError::Api { status, message } if status == StatusCode::NOT_FOUND.as_u16() => {
                ProviderError::NotFound(message)
            }
            RestError::Api { status, message } => ProviderError::Api { status, message },
            RestError::Parse(msg) => ProviderError::Malformed(msg),
        }
    }
}

/// HTTP client with a whole-request timeout
pub fn http_client(timeout: Duration) -> Result<Client, RestError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub(crate) fn join(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
