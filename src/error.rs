//! # Error Handling
//!
//! This module defines custom error types and how they're converted to HTTP responses.
//! This is a great example of Rust's powerful error handling system.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Result<T, E> Type
//! - **Purpose**: Forces you to handle both success and failure cases
//! - **T**: The success type (what you get when everything works)
//! - **E**: The error type (what you get when something goes wrong)
//! - **No exceptions**: Rust doesn't have try/catch, it uses Result instead
//!
//! ### Enums for Error Types
//! - **Variants**: Each enum variant represents a different kind of error
//! - **Data**: Each variant can hold additional information (String, numbers, etc.)
//! - **Pattern matching**: Use `match` to handle different error types
//!
//! ### Traits for Error Conversion
//! - **From trait**: Automatically converts between error types
//! - **ResponseError trait**: Converts errors to HTTP responses
//! - **Display trait**: Defines how errors are formatted as strings
//!
//! ## Status mapping used throughout the API:
//! - Missing or malformed request input → 400
//! - Missing provider credential → 500 (the server is misconfigured, the client
//!   did nothing wrong and is told so before any provider is contacted)
//! - Provider returned an error or was unreachable → 502, with the provider's
//!   own status and response body relayed in the error detail
//! - Everything else → 500

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Custom error types for the application.
///
/// ## Error Categories:
/// - **Internal**: Server-side problems (filesystem failures, logic errors)
/// - **BadRequest**: Client sent invalid or missing JSON data
/// - **ValidationError**: An upload or form submission failed validation
/// - **ConfigError**: A provider credential or other configuration is missing
/// - **Upstream**: A provider (OpenAI, ElevenLabs) request failed; carries the
///   provider name, the HTTP status it answered with (if it answered at all)
///   and its response body for the client to inspect
///
/// ## Usage Example:
/// ```rust
/// return Err(AppError::BadRequest("Missing message field".to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    /// Internal server errors (filesystem failures, unexpected states)
    Internal(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// An upload or multipart submission failed validation rules
    ValidationError(String),

    /// Configuration or credential problems discovered while handling a request
    ConfigError(String),

    /// An outbound provider call failed
    Upstream {
        /// Which provider failed ("openai" or "elevenlabs")
        provider: &'static str,
        /// The provider's HTTP status, when a response was received
        status: Option<u16>,
        /// The provider's response body (parsed JSON when possible)
        detail: Option<serde_json::Value>,
    },
}

/// Implementation of the Display trait for AppError.
///
/// This trait defines how errors are formatted as human-readable strings.
/// It's used when you print an error or convert it to a string.
impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Upstream {
                provider,
                status: Some(code),
                ..
            } => write!(f, "Upstream error: {} returned status {}", provider, code),
            AppError::Upstream {
                provider,
                status: None,
                ..
            } => write!(f, "Upstream error: {} request failed", provider),
        }
    }
}

impl AppError {
    /// Map each error variant to its HTTP status code, machine-readable type
    /// and client-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,  // 500
                "internal_error",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,  // 400
                "bad_request",
                msg.clone(),
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,  // 400
                "validation_error",
                msg.clone(),
            ),
            AppError::ConfigError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,  // 500
                "config_error",
                msg.clone(),
            ),
            AppError::Upstream {
                provider, status, ..
            } => (
                StatusCode::BAD_GATEWAY,  // 502
                "upstream_error",
                match status {
                    Some(code) => format!("{} returned status {}", provider, code),
                    None => format!("{} request failed", provider),
                },
            ),
        }
    }

    /// The HTTP status this error is answered with.
    pub fn http_status(&self) -> StatusCode {
        self.parts().0
    }

    /// The JSON object placed under the `"error"` key of the response body.
    ///
    /// All errors share the same base shape:
    /// ```json
    /// {
    ///   "type": "bad_request",
    ///   "message": "Missing message field",
    ///   "timestamp": "2025-01-01T12:00:00Z"
    /// }
    /// ```
    /// Upstream errors additionally carry `provider`, `provider_status` and
    /// `detail` (the provider's own response body), so clients see exactly
    /// what the provider said without this server editorialising.
    ///
    /// This is public because the voice endpoint merges the envelope with the
    /// partial pipeline progress (transcript, reply) it wants to return
    /// alongside the error.
    pub fn envelope(&self) -> serde_json::Value {
        let (_, error_type, message) = self.parts();

        let mut body = json!({
            "type": error_type,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let AppError::Upstream {
            provider,
            status,
            detail,
        } = self
        {
            body["provider"] = json!(provider);
            if let Some(code) = status {
                body["provider_status"] = json!(code);
            }
            if let Some(detail) = detail {
                body["detail"] = detail.clone();
            }
        }

        body
    }
}

/// Implementation of the ResponseError trait for AppError.
///
/// This trait converts our custom errors into HTTP responses that clients can
/// understand. It automatically handles the conversion when an error is
/// returned from a handler with `?`.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.http_status()).json(json!({ "error": self.envelope() }))
    }
}

/// Automatic conversion from anyhow::Error to AppError.
///
/// The anyhow crate provides general-purpose error handling. This conversion
/// allows us to use anyhow errors throughout the codebase and automatically
/// convert them to our custom error type when needed.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Automatic conversion from JSON parsing errors to AppError.
///
/// JSON parsing errors are almost always due to the client sending malformed
/// data, so they should result in a 400 (Bad Request) response, not a 500.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

/// Type alias for Results that use our custom error type.
///
/// This creates a shorthand for `Result<T, AppError>` so handlers can write
/// `AppResult<HttpResponse>` instead of `Result<HttpResponse, AppError>`.
pub type AppResult<T> = Result<T, AppError>;
