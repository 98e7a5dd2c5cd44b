//! Error types for the Wykop API client.

use thiserror::Error;

/// Errors that can occur when talking to the Wykop API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// No token is available for an authenticated route
    #[error("Client is not authenticated")]
    NotAuthenticated,

    /// Other error
    #[error("{0}")]
    Other(String),
}
