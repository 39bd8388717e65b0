use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use boba_order_engine::traits::{LoyaltyApiError, OrderFlowError, PaymentProviderError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("The data was not found. {0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Too many orders from this address. {0}")]
    RateLimited(String),
    #[error("{0}")]
    Conflict(String),
    #[error("The payment provider could not be reached. {0}")]
    PaymentProviderUnavailable(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ServerError {
    /// The machine-readable error kind carried in every error response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) | Self::InvalidRequestBody(_) => "bad_request",
            Self::RateLimited(_) => "rate_limited",
            Self::Conflict(_) => "conflict",
            Self::PaymentProviderUnavailable(_) => "provider_unavailable",
            Self::InsufficientPermissions(_) => "forbidden",
            Self::InitializeError(_) | Self::BackendError(_) | Self::IOError(_) | Self::Unspecified(_) => "internal",
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "kind": self.kind(), "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        use OrderFlowError::*;
        match e {
            DatabaseError(_) => Self::BackendError(e.to_string()),
            OrderNotFound(_) | PaymentRefNotFound(_) | ProductNotFound(_) | PromoCodeNotFound(_) => {
                Self::NotFound(e.to_string())
            },
            EmptyOrder |
            InvalidQuantity(_) |
            ProductUnavailable(_) |
            InvalidOption { .. } |
            ToppingUnavailable(_) |
            PromoRejected(_) |
            PickupRejected(_) |
            SlotDisabled { .. } |
            GuestRedemption |
            FulfilmentAdvanceForbidden(_) => Self::BadRequest(e.to_string()),
            SlotFull { .. } => Self::Conflict(e.to_string()),
            LoyaltyError(e) => e.into(),
            ProviderError(e) => e.into(),
        }
    }
}

impl From<LoyaltyApiError> for ServerError {
    fn from(e: LoyaltyApiError) -> Self {
        match e {
            LoyaltyApiError::DatabaseError(_) => Self::BackendError(e.to_string()),
            LoyaltyApiError::AccountNotFound(_) => Self::NotFound(e.to_string()),
            LoyaltyApiError::InsufficientPoints { .. } | LoyaltyApiError::ZeroAdjustment => {
                Self::BadRequest(e.to_string())
            },
        }
    }
}

impl From<PaymentProviderError> for ServerError {
    fn from(e: PaymentProviderError) -> Self {
        match e {
            PaymentProviderError::PaymentNotFound(_) => Self::NotFound(e.to_string()),
            _ => Self::PaymentProviderUnavailable(e.to_string()),
        }
    }
}
