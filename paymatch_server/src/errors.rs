use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use log::error;
use paymatch_engine::{ApiKeyError, OrderFlowError};
use serde_json::Value;
use thiserror::Error;

use crate::data_objects::{ApiResponse, ResponseCode};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("params format error")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("api key not found")]
    ApiKeyNotFound,
    #[error("sign error")]
    SignatureInvalid,
    #[error("order not found")]
    OrderNotFound,
    #[error("{0}")]
    InvalidPrice(String),
    #[error("{0}")]
    OrderRejected(String),
}

impl ServerError {
    fn response_code(&self) -> ResponseCode {
        match self {
            Self::InvalidRequestBody(_) | Self::InvalidPrice(_) => ResponseCode::ParamsError,
            Self::ApiKeyNotFound | Self::SignatureInvalid | Self::OrderNotFound | Self::OrderRejected(_) => {
                ResponseCode::Error
            },
            Self::InitializeError(_) |
            Self::BackendError(_) |
            Self::IOError(_) |
            Self::ConfigurationError(_) |
            Self::Unspecified(_) => ResponseCode::ServiceError,
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self.response_code() {
            ResponseCode::ParamsError => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::OK,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::InvalidRequestBody(detail) | Self::InvalidPrice(detail) => ApiResponse::failure(
                self.response_code(),
                "params format error",
                Some(Value::String(detail.clone())),
            ),
            Self::InitializeError(_) |
            Self::BackendError(_) |
            Self::IOError(_) |
            Self::ConfigurationError(_) |
            Self::Unspecified(_) => {
                // Internal details stay in the logs
                error!("💻️ Request failed. {self}");
                ApiResponse::failure(self.response_code(), "service error", None)
            },
            _ => ApiResponse::failure(self.response_code(), self.to_string(), None),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<ApiKeyError> for ServerError {
    fn from(e: ApiKeyError) -> Self {
        match e {
            ApiKeyError::ApiKeyNotFound => Self::ApiKeyNotFound,
            ApiKeyError::SignatureInvalid => Self::SignatureInvalid,
            ApiKeyError::ApiKeyNameExists(_) => Self::OrderRejected(e.to_string()),
            ApiKeyError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::OrderNotFound(_) => Self::OrderNotFound,
            OrderFlowError::InvalidPrice(s) => Self::InvalidPrice(s),
            OrderFlowError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            OrderFlowError::InsertConflict(_) | OrderFlowError::OrderOwnerNotFound(_) => {
                Self::BackendError(e.to_string())
            },
            OrderFlowError::NoMatch |
            OrderFlowError::AmountUnparseable(_) |
            OrderFlowError::NoMatchingOrder(_) |
            OrderFlowError::AlreadyPaid(_) => Self::OrderRejected(e.to_string()),
        }
    }
}
