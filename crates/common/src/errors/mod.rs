//! Error types for Agora services
//!
//! Keeps three families apart:
//! - authorization denials (expected outcomes, 403/404/409/410)
//! - data-access failures (retryable, 5xx, never folded into a denial)
//! - malformed input (400)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::{Capability, LinkDenial, PaperStatus, ReviewDenial, TransitionDenial};

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,
    InvalidEmailDomain,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidToken,
    ExpiredToken,

    // Authorization errors (3xxx)
    Forbidden,
    InvalidTransition,
    ReviewNotAllowed,
    CapabilityDenied,

    // Resource errors (4xxx)
    NotFound,
    PaperNotFound,
    AssignmentNotFound,
    SharedLinkNotFound,
    SharedLinkInactive,
    SharedLinkExpired,

    // Conflict errors (5xxx)
    Conflict,
    StaleStatus,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,
    MalformedRecord,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    // Service unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::InvalidEmailDomain => 1004,

            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidToken => 2002,
            ErrorCode::ExpiredToken => 2003,

            ErrorCode::Forbidden => 3001,
            ErrorCode::InvalidTransition => 3002,
            ErrorCode::ReviewNotAllowed => 3003,
            ErrorCode::CapabilityDenied => 3004,

            ErrorCode::NotFound => 4001,
            ErrorCode::PaperNotFound => 4002,
            ErrorCode::AssignmentNotFound => 4003,
            ErrorCode::SharedLinkNotFound => 4004,
            ErrorCode::SharedLinkInactive => 4005,
            ErrorCode::SharedLinkExpired => 4006,

            ErrorCode::Conflict => 5001,
            ErrorCode::StaleStatus => 5002,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,
            ErrorCode::MalformedRecord => 7003,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Email address {email} is not from an accepted domain")]
    InvalidEmailDomain { email: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Transition refused: {0}")]
    InvalidTransition(TransitionDenial),

    #[error("Review action refused: {0}")]
    ReviewNotAllowed(ReviewDenial),

    #[error("Shared link does not allow {0}")]
    CapabilityDenied(Capability),

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Paper not found: {id}")]
    PaperNotFound { id: String },

    #[error("Review assignment not found: {id}")]
    AssignmentNotFound { id: String },

    #[error("Shared link not found")]
    SharedLinkNotFound,

    #[error("{0}")]
    SharedLinkDenied(LinkDenial),

    // Conflict errors
    #[error("Duplicate resource: {message}")]
    Duplicate { message: String },

    #[error("Paper {id} is no longer {expected}")]
    StaleStatus { id: String, expected: PaperStatus },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Malformed {table} record {id}: {message}")]
    MalformedRecord {
        table: &'static str,
        id: String,
        message: String,
    },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::InvalidEmailDomain { .. } => ErrorCode::InvalidEmailDomain,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            AppError::ReviewNotAllowed(_) => ErrorCode::ReviewNotAllowed,
            AppError::CapabilityDenied(_) => ErrorCode::CapabilityDenied,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::AssignmentNotFound { .. } => ErrorCode::AssignmentNotFound,
            AppError::SharedLinkNotFound => ErrorCode::SharedLinkNotFound,
            AppError::SharedLinkDenied(LinkDenial::Inactive) => ErrorCode::SharedLinkInactive,
            AppError::SharedLinkDenied(LinkDenial::Expired) => ErrorCode::SharedLinkExpired,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::StaleStatus { .. } => ErrorCode::StaleStatus,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::MalformedRecord { .. } => ErrorCode::MalformedRecord,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidFormat { .. }
            | AppError::InvalidEmailDomain { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } | AppError::InvalidToken | AppError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            AppError::Forbidden { .. }
            | AppError::ReviewNotAllowed(_)
            | AppError::CapabilityDenied(_) => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::PaperNotFound { .. }
            | AppError::AssignmentNotFound { .. }
            | AppError::SharedLinkNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::InvalidTransition(TransitionDenial::NotInTable { .. })
            | AppError::Duplicate { .. }
            | AppError::StaleStatus { .. } => StatusCode::CONFLICT,

            // Right state, wrong principal
            AppError::InvalidTransition(_) => StatusCode::FORBIDDEN,

            // 410 Gone
            AppError::SharedLinkDenied(_) => StatusCode::GONE,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::MalformedRecord { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 503 Service Unavailable
            AppError::DatabaseConnection { .. } | AppError::ServiceUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    /// Data-access failures the caller should retry with backoff.
    ///
    /// A retryable error is never an authorization outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::DatabaseConnection { .. } | AppError::ServiceUnavailable { .. }
        )
    }

    /// True for policy refusals (as opposed to failures)
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            AppError::Forbidden { .. }
                | AppError::InvalidTransition(_)
                | AppError::ReviewNotAllowed(_)
                | AppError::CapabilityDenied(_)
                | AppError::SharedLinkDenied(_)
        )
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl From<TransitionDenial> for AppError {
    fn from(denial: TransitionDenial) -> Self {
        AppError::InvalidTransition(denial)
    }
}

impl From<ReviewDenial> for AppError {
    fn from(denial: ReviewDenial) -> Self {
        AppError::ReviewNotAllowed(denial)
    }
}

impl From<LinkDenial> for AppError {
    fn from(denial: LinkDenial) -> Self {
        AppError::SharedLinkDenied(denial)
    }
}

impl From<Capability> for AppError {
    fn from(capability: Capability) -> Self {
        AppError::CapabilityDenied(capability)
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                retryable = self.is_retryable(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let details = match &self {
            AppError::Validation { field: Some(field), .. } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                retryable: self.is_retryable(),
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|k| k.to_string());
        AppError::Validation {
            message: err.to_string(),
            field,
        }
    }
}
