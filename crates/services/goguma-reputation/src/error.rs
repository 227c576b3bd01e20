use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use goguma_types::ListingId;
use serde_json::json;
use thiserror::Error;

/// Failure of a request to the hosted marketplace backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected backend payload: {0}")]
    Decode(String),

    #[error("capability unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Transport(_) => "transport",
            BackendError::Status { .. } => "status",
            BackendError::Decode(_) => "decode",
            BackendError::Unavailable(_) => "unavailable",
        }
    }
}

/// Failure of a marketplace view or favorite update.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("listing {0} not found")]
    ListingNotFound(ListingId),

    #[error("user id must not be empty")]
    BlankUser,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors surfaced by the HTTP API as JSON `{"error": ...}` bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("upstream backend failed: {0}")]
    BadGateway(#[from] BackendError),
}

impl From<MarketplaceError> for ApiError {
    fn from(err: MarketplaceError) -> Self {
        match err {
            MarketplaceError::ListingNotFound(_) => ApiError::NotFound(err.to_string()),
            MarketplaceError::BlankUser => ApiError::BadRequest(err.to_string()),
            MarketplaceError::Backend(e) => ApiError::BadGateway(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        };

        if status.is_server_error() {
            tracing::error!("API error: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
