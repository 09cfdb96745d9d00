//! Inventory Errors
//!
//! Error taxonomy for credential loading, Keystone authentication and the
//! compute/network list calls. The correlator itself never fails.

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Errors that can occur while loading credentials or querying the cloud
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Credentials or filter settings are missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Keystone rejected the credentials or returned an unusable token
    #[error("Authentication failed ({status}): {body}")]
    Authentication { status: u16, body: String },

    /// The service catalog has no endpoint for the requested service
    #[error(
        "No {interface} endpoint for service '{service_type}' in region {}",
        .region.as_deref().unwrap_or("<any>")
    )]
    EndpointNotFound {
        service_type: String,
        region: Option<String>,
        interface: String,
    },

    /// A list call returned a non-success status
    #[error("GET {url} returned {status}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected resource shape
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reading a local file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InventoryError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        InventoryError::Config(msg.into())
    }
}
