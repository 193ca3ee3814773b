//! Error handling for the bridge SDK
//!
//! This module provides the error system shared by both remote clients:
//! - Categorizes errors by type (network, auth, rate limit, etc.)
//! - Keeps the remote response body around so callers can log it
//! - Maps HTTP error responses to normalized variants
//! - Provides a convenient Result type alias

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub mod mapping;

/// Result type for bridge SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the bridge SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Network or connection errors
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authorization errors (permission issues)
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Remote service rejected or failed the request
    #[error("Service error: {0}")]
    Service(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Errors with additional context
    #[error("{inner}")]
    WithContext {
        inner: Box<ServiceError>,
        context: ErrorContext,
    },
}

impl ServiceError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        ServiceError::Authentication(message.into())
    }

    /// Create an authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        ServiceError::Authorization(message.into())
    }

    /// Create a rate limit error
    pub fn rate_limit(message: impl Into<String>) -> Self {
        ServiceError::RateLimit(message.into())
    }

    /// Create a service-specific error
    pub fn service(message: impl Into<String>) -> Self {
        ServiceError::Service(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Create a parsing error
    pub fn parsing(message: impl Into<String>) -> Self {
        ServiceError::Parsing(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        ServiceError::Timeout(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    /// Add context to an existing error
    pub fn with_context(self, context: ErrorContext) -> Self {
        ServiceError::WithContext {
            inner: Box::new(self),
            context,
        }
    }

    /// The innermost error, with any context wrappers removed
    pub fn kind(&self) -> &ServiceError {
        match self {
            ServiceError::WithContext { inner, .. } => inner.kind(),
            other => other,
        }
    }

    /// Get the service name if available
    pub fn service_name(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { context, .. } => Some(&context.service),
            _ => None,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::WithContext { context, inner } => {
                context.status_code.or_else(|| inner.status_code())
            }
            _ => None,
        }
    }

    /// Raw body of the remote response that produced this error, if any
    pub fn response_body(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { context, inner } => context
                .response_body
                .as_deref()
                .or_else(|| inner.response_body()),
            _ => None,
        }
    }
}

/// Error context information
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Service that generated the error
    pub service: String,

    /// Time the error was observed
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// HTTP status code if applicable
    pub status_code: Option<u16>,

    /// Service-specific error code
    pub error_code: Option<String>,

    /// Endpoint that was called
    pub endpoint: Option<String>,

    /// Body of the failed response
    pub response_body: Option<String>,

    /// Additional context data
    pub data: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            service: "unknown".to_string(),
            timestamp: Some(chrono::Utc::now()),
            status_code: None,
            error_code: None,
            endpoint: None,
            response_body: None,
            data: HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new error context for a specific service
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// Add an HTTP status code
    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Add an error code
    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Add an endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Attach the raw response body
    pub fn response_body(mut self, body: impl Into<String>) -> Self {
        self.response_body = Some(body.into());
        self
    }

    /// Add a context value
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.data.insert(key.into(), value.to_string());
    }
}

/// Convert reqwest errors to ServiceError
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        let context = ErrorContext::for_service("http_client");

        let service_error = if err.is_timeout() {
            ServiceError::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ServiceError::network(format!("Connection error: {}", err))
        } else if err.is_request() {
            ServiceError::validation(format!("Invalid request: {}", err))
        } else if err.is_redirect() {
            ServiceError::network(format!("Too many redirects: {}", err))
        } else if err.is_decode() {
            ServiceError::parsing(format!("Response decode error: {}", err))
        } else {
            ServiceError::internal(format!("HTTP client error: {}", err))
        };

        if let Some(status) = err.status() {
            service_error.with_context(context.status_code(status.as_u16()))
        } else {
            service_error.with_context(context)
        }
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::parsing(format!("JSON error: {}", err))
            .with_context(ErrorContext::for_service("json"))
    }
}
