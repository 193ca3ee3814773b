//! Error types for webhook ingress

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bridge_sdk::ServiceError;
use thiserror::Error;

use crate::lifecycle::MapperError;
use crate::normalizer::NormalizeError;
use crate::signature::SignatureError;

/// Reasons a webhook delivery is rejected
///
/// The response body is the error's display text, so the sender's delivery
/// log shows what went wrong.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Status page failed its health check
    #[error("status page unavailable: {0}")]
    StatusPageUnavailable(#[source] ServiceError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// Body is not a JSON event envelope
    #[error("error decoding json: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    /// Envelope is fine but the typed payload is not
    #[error("error decoding json: {0}")]
    MalformedEvent(#[source] serde_json::Error),

    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    #[error(transparent)]
    Mapping(#[from] MapperError),
}

impl WebhookError {
    /// - Signature missing or malformed, body unreadable: 400
    /// - No matching signature: 401
    /// - Undecodable or unknown event: 400
    /// - Status page unavailable or rejecting the mutation: 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Signature(SignatureError::NoValidSignatures) => StatusCode::UNAUTHORIZED,
            Self::Signature(SignatureError::MalformedHeader(_) | SignatureError::MalformedBody(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Signature(SignatureError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MalformedEnvelope(_) | Self::MalformedEvent(_) | Self::UnknownEventType(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::StatusPageUnavailable(_) | Self::Mapping(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Failures while wiring the service at boot
#[derive(Debug, Error)]
pub enum BootError {
    #[error("failed to build {service} client: {source}")]
    Client {
        service: &'static str,
        #[source]
        source: ServiceError,
    },

    #[error(transparent)]
    Timezone(#[from] NormalizeError),
}
