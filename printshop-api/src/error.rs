use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use printshop_order::{GatewayError, PaymentError, ReconcileError, StoreError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Upstream(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn storage(err: StoreError) -> Self {
        AppError::Anyhow(anyhow::anyhow!(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Upstream(msg) => {
                tracing::warn!("Upstream provider error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::NotFound(_) => AppError::NotFound(err.to_string()),
            ReconcileError::InvalidState { .. } | ReconcileError::Transition(_) => AppError::Conflict(err.to_string()),
            ReconcileError::Payment(e) => e.into(),
            ReconcileError::Storage(e) => AppError::storage(e),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::MissingPaymentReference { .. } | PaymentError::InvalidAmount(_) => {
                AppError::Unprocessable(err.to_string())
            }
            PaymentError::Gateway(e) => e.into(),
            PaymentError::SessionWithoutIntent(_) | PaymentError::RefundNotIssued { .. } => {
                AppError::Upstream(err.to_string())
            }
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected(_) => AppError::Unprocessable(err.to_string()),
            GatewayError::Timeout { .. } | GatewayError::Provider(_) | GatewayError::Malformed(_) => {
                AppError::Upstream(err.to_string())
            }
        }
    }
}
