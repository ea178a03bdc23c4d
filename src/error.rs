//! Error types for Library Guide
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are categorized by where they come from (backend API, relationship
//! rules, validation, configuration) so the guide screens can decide how to
//! degrade.
//!
//! ## How screens treat each category
//!
//! - `Forbidden` (HTTP 403) → "nothing visible": empty list, no banner
//! - every other request failure → empty list plus an inline banner built
//!   from `user_message()`
//! - `Validation` → the edit form stays open with the messages attached

use thiserror::Error;

/// Result type alias using our LibraryError type
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Main error type for Library Guide
#[derive(Error, Debug)]
pub enum LibraryError {
    // ===== API Errors =====

    /// Backend refused access (HTTP 403)
    #[error("Access forbidden: {endpoint}")]
    Forbidden {
        endpoint: String,
    },

    /// Generic API request failure
    #[error("API request failed: {message}")]
    ApiRequestFailed {
        message: String,
        /// HTTP status code if available
        status_code: Option<u16>,
        /// API endpoint that failed
        endpoint: Option<String>,
    },

    /// API returned invalid or unexpected response format
    #[error("Invalid API response: {message}")]
    InvalidApiResponse {
        message: String,
        /// Response body snippet for debugging
        response_body: Option<String>,
    },

    /// Transport level failure (connection refused, DNS, timeout)
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Record not found on the backend (HTTP 404)
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    // ===== Relationship Errors =====

    /// Two entity kinds that have no join table between them
    #[error("No relationship between {parent} and {child}")]
    InvalidRelationship {
        parent: String,
        child: String,
    },

    // ===== Validation Errors =====

    /// Entity attributes failed validation before being sent
    #[error("Validation failed with {} errors", errors.len())]
    Validation {
        errors: Vec<String>,
    },

    /// Generic input validation error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Application state is invalid for the requested operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // ===== Configuration Errors =====

    /// Configuration file error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ===== External Library Errors =====

    /// HTTP client error from reqwest
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<std::num::ParseIntError> for LibraryError {
    fn from(err: std::num::ParseIntError) -> Self {
        LibraryError::InvalidInput(format!("Failed to parse integer: {}", err))
    }
}

impl From<url::ParseError> for LibraryError {
    fn from(err: url::ParseError) -> Self {
        LibraryError::ConfigurationError(format!("Invalid base URL: {}", err))
    }
}

// Helper methods for creating common errors
impl LibraryError {
    /// Create a RecordNotFound error with a resource name
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        LibraryError::RecordNotFound(resource.into())
    }

    /// Create an InvalidInput error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        LibraryError::InvalidInput(message.into())
    }

    /// Create an ApiRequestFailed error
    pub fn api_failed<S: Into<String>>(
        message: S,
        status_code: Option<u16>,
        endpoint: Option<String>,
    ) -> Self {
        LibraryError::ApiRequestFailed {
            message: message.into(),
            status_code,
            endpoint,
        }
    }

    /// Create a NetworkError
    pub fn network_error<S: Into<String>>(message: S) -> Self {
        LibraryError::NetworkError {
            message: message.into(),
        }
    }

    /// Check if the backend hid the data from this user (HTTP 403)
    pub fn is_forbidden(&self) -> bool {
        match self {
            LibraryError::Forbidden { .. } => true,
            LibraryError::ApiRequestFailed { status_code: Some(403), .. } => true,
            LibraryError::ReqwestError(e) => e.status().map(|s| s.as_u16()) == Some(403),
            _ => false,
        }
    }

    /// Check if error is the backend reporting a missing record
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LibraryError::RecordNotFound(_)
                | LibraryError::ApiRequestFailed { status_code: Some(404), .. }
        )
    }

    /// Inline banner text shown in list tables
    ///
    /// `Forbidden` never reaches a banner; screens filter it out first.
    pub fn user_message(&self) -> String {
        match self {
            LibraryError::Validation { errors } => errors.join("; "),
            LibraryError::ApiRequestFailed { message, .. } => {
                format!("Database Access Error: {}", message)
            }
            LibraryError::NetworkError { message } => {
                format!("Database Access Error: {}", message)
            }
            _ => format!("Database Access Error: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_detection() {
        let err = LibraryError::Forbidden { endpoint: "/authors/1".to_string() };
        assert!(err.is_forbidden());

        let err = LibraryError::api_failed("nope", Some(403), None);
        assert!(err.is_forbidden());

        let err = LibraryError::api_failed("boom", Some(500), None);
        assert!(!err.is_forbidden());
    }

    #[test]
    fn test_user_message_includes_underlying_text() {
        let err = LibraryError::api_failed("connection reset", Some(500), Some("/series/1".to_string()));
        assert_eq!(err.user_message(), "Database Access Error: connection reset");

        let err = LibraryError::Validation {
            errors: vec!["Name is required".to_string(), "Ordinal must be positive".to_string()],
        };
        assert_eq!(err.user_message(), "Name is required; Ordinal must be positive");
        assert_eq!(err.to_string(), "Validation failed with 2 errors");
    }

    #[test]
    fn test_not_found_detection() {
        assert!(LibraryError::not_found("author 7").is_not_found());
        assert!(LibraryError::api_failed("gone", Some(404), None).is_not_found());
        assert!(!LibraryError::invalid_input("x").is_not_found());
    }
}
