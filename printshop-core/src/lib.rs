pub mod fulfillment;
pub mod notification;
pub mod payment;
pub mod storage;

pub use fulfillment::{FulfillmentProvider, ShippingAddress};
pub use notification::{CancellationNotice, Notifier};
pub use payment::PaymentProvider;
pub use storage::ObjectStorage;

/// Failure reported by an external provider adapter (HTTP client, mailer).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Provider rejected request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Malformed provider response: {0}")]
    Malformed(String),
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl ProviderError {
    /// Transport and 5xx failures are worth retrying; 4xx rejections are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Api { status, .. } => *status >= 500 || *status == 429,
            ProviderError::Malformed(_) | ProviderError::NotFound(_) => false,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
