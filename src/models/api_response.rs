use serde::Deserialize;

/// Standard API response envelope from DNA Center intent endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    /// The actual data returned.
    pub response: T,

    /// API version reported by the controller, if any.
    #[serde(default)]
    pub version: Option<String>,
}
