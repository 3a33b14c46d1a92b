use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::AppError;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors surfaced by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    /// The request could not be bound: bad JSON, missing field, bad query
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::App(err) => match err {
                AppError::SenderNotFound(_)
                | AppError::RecipientNotFound(_)
                | AppError::WalletNotFound(_) => StatusCode::NOT_FOUND,
                AppError::InvalidAmount(_) | AppError::SelfTransfer | AppError::InvalidLimit(_) => {
                    StatusCode::BAD_REQUEST
                }
                AppError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
                AppError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            // Storage details stay in the logs.
            ApiError::App(AppError::StorageFailure(cause)) => {
                tracing::error!(error = %format!("{:#}", cause), "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}
