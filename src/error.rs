use thiserror::Error;
pub use url::ParseError as UrlParseError;

use crate::inventory::InventoryError;

/// Error types for the DNA Center inventory synchronisation.
#[derive(Error, Debug)]
pub enum DnacError {
    /// Session establishment with DNA Center failed.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// A remote query (count, page, site or topology) failed.
    #[error("{operation} failed: {message}")]
    FetchError {
        /// The query that failed, e.g. "device count".
        operation: String,
        message: String,
    },

    /// The API answered with an error status or an unusable body.
    #[error("API error: {0}")]
    ApiError(String),

    /// The site tree could not be registered.
    #[error("Building site hierarchy failed: {0}")]
    HierarchyError(String),

    /// A host could not be placed into the inventory.
    #[error("Binding host {host_id} failed: {message}")]
    BindError { host_id: String, message: String },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error parsing URL.
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] UrlParseError),

    /// The API endpoint/path string is invalid.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Error serializing or deserializing JSON.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The target inventory rejected an operation.
    #[error("Inventory error: {0}")]
    InventoryError(#[from] InventoryError),

    /// Invalid client or inventory configuration.
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),
}

impl DnacError {
    /// Wraps any error raised while running a remote query into a
    /// [`DnacError::FetchError`] naming that query.
    pub(crate) fn fetch(operation: &str, err: impl std::fmt::Display) -> Self {
        DnacError::FetchError {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for DNA Center inventory operations.
pub type DnacResult<T> = Result<T, DnacError>;
