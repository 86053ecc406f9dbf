use serde::Deserialize;

/// Response of the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// The session token to send as `X-Auth-Token`.
    #[serde(rename = "Token")]
    pub token: String,
}
