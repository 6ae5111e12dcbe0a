//! Error types for the m3ter provider.

use thiserror::Error;

/// Errors that can occur while reconciling m3ter entities.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A resource or data source configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested resource type is not registered.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The requested data source type is not registered.
    #[error("Unknown data source type: {0}")]
    UnknownDataSource(String),

    /// The remote entity does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The entity already exists or conflicts with the remote state (HTTP 409).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Authentication failed (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The credentials lack access to the entity (HTTP 403).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The API rate limit was exceeded (HTTP 429).
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The m3ter API is temporarily unavailable (HTTP 5xx).
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Any other non-2xx API response.
    #[error("unexpected status code {status}: {body}")]
    Api {
        /// The HTTP status code returned by the API.
        status: u16,
        /// The raw response body, if any.
        body: String,
    },

    /// A transport-level HTTP error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Classify a non-2xx API response into an error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::Unauthorized(body),
            403 => Self::PermissionDenied(body),
            404 => Self::NotFound(body),
            409 => Self::Conflict(body),
            429 => Self::RateLimited(body),
            500..=599 => Self::Unavailable(body),
            _ => Self::Api { status, body },
        }
    }

    /// Whether this error represents a missing remote entity.
    ///
    /// Used by import flows to fall back to a lookup by code.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
