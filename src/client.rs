use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::device::DeviceApi;
use crate::api::topology::TopologyApi;
use crate::models::auth::TokenResponse;
use crate::models::ApiResponse;
use crate::{DnacError, DnacResult};

pub(crate) const AUTH_TOKEN_ENDPOINT: &str = "/dna/system/api/v1/auth/token";
const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Builder for DNA Center client.
///
/// This builder provides a fluent API for creating DNA Center sessions
/// with validation at build time. [`DnacClientBuilder::build`] performs the
/// login, so a built client always carries a session token.
pub struct DnacClientBuilder {
    host: Option<String>,
    username: Option<String>,
    password: Option<SecretString>,
    api_version: Option<String>,
    validate_certs: bool,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    http_client: Option<ReqwestClient>,
}

impl Default for DnacClientBuilder {
    fn default() -> Self {
        Self {
            host: None,
            username: None,
            password: None,
            api_version: None,
            validate_certs: true,
            timeout: None,
            user_agent: None,
            http_client: None,
        }
    }
}

impl DnacClientBuilder {
    /// Sets the controller host. A bare FQDN is reached over `https://`; a
    /// value that already carries a scheme is used as given.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password for authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Sets the password from an already protected secret.
    pub fn password_secret(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }

    /// Sets the DNA Center API version the session targets (e.g. "2.3.5.3").
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Sets whether to validate TLS certificates.
    pub fn validate_certs(mut self, validate: bool) -> Self {
        self.validate_certs = validate;
        self
    }

    /// Sets the HTTP request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a custom user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets a custom reqwest client (e.g., for testing or custom middleware).
    pub fn http_client(mut self, http_client: ReqwestClient) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Validates the configuration and opens an authenticated session.
    ///
    /// # Errors
    ///
    /// Returns `DnacError::ConfigurationError` for missing or malformed
    /// settings and `DnacError::AuthenticationError` if the login fails for
    /// any reason, including transport errors. Logins are never retried.
    pub async fn build(self) -> DnacResult<DnacClient> {
        let username = self
            .username
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| DnacError::ConfigurationError("Username is required".into()))?;

        let password = self
            .password
            .filter(|p| !p.expose_secret().trim().is_empty())
            .ok_or_else(|| DnacError::ConfigurationError("Password is required".into()))?;

        let api_version = self
            .api_version
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| DnacError::ConfigurationError("API version is required".into()))?;

        let base_url = parse_host(self.host.as_deref())?;
        let timeout = self.timeout.unwrap_or(Duration::from_secs(30));

        if !self.validate_certs {
            warn!("TLS certificate validation is disabled for {base_url}");
        }

        let user_agent = self
            .user_agent
            .as_deref()
            .unwrap_or(concat!("dnac-inventory/", env!("CARGO_PKG_VERSION")));

        let http_client = if let Some(custom_client) = self.http_client {
            custom_client
        } else {
            ReqwestClient::builder()
                .timeout(timeout)
                .danger_accept_invalid_certs(!self.validate_certs)
                .user_agent(user_agent)
                .build()
                .map_err(|e| {
                    DnacError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
                })?
        };

        let token = login(&http_client, &base_url, &username, &password).await?;
        debug!("Logged in to {base_url} as {username}");

        Ok(DnacClient {
            base_url,
            api_version,
            http_client,
            token: Arc::new(token),
        })
    }
}

fn parse_host(host: Option<&str>) -> DnacResult<Url> {
    let host = host
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| DnacError::ConfigurationError("Host is required".into()))?;

    let url = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };

    Url::parse(&url)
        .map_err(|e| DnacError::ConfigurationError(format!("Invalid controller host: {e}")))
}

async fn login(
    http_client: &ReqwestClient,
    base_url: &Url,
    username: &str,
    password: &SecretString,
) -> DnacResult<SecretString> {
    let login_url = base_url
        .join(AUTH_TOKEN_ENDPOINT)
        .map_err(|e| DnacError::AuthenticationError(e.to_string()))?;

    let response = http_client
        .post(login_url)
        .basic_auth(username, Some(password.expose_secret()))
        .send()
        .await
        .map_err(|e| DnacError::AuthenticationError(e.to_string()))?;

    if !response.status().is_success() {
        return Err(DnacError::AuthenticationError(format!(
            "Authentication failed with status code: {}",
            response.status()
        )));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| DnacError::AuthenticationError(format!("Invalid token response: {e}")))?;

    if body.token.is_empty() {
        return Err(DnacError::AuthenticationError("No token received from server".into()));
    }

    Ok(SecretString::from(body.token))
}

/// An authenticated session against the DNA Center API.
///
/// Cloning is cheap; clones share the HTTP connection pool and the token.
#[derive(Clone)]
pub struct DnacClient {
    base_url: Url,
    api_version: String,
    http_client: ReqwestClient,
    token: Arc<SecretString>,
}

impl fmt::Debug for DnacClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnacClient")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl DnacClient {
    pub fn builder() -> DnacClientBuilder {
        DnacClientBuilder::default()
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The API version this session was opened for.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Gets the network device API interface.
    pub fn devices(&self) -> DeviceApi<'_> {
        DeviceApi::new(self)
    }

    /// Gets the topology API interface.
    pub fn topology(&self) -> TopologyApi<'_> {
        TopologyApi::new(self)
    }

    fn auth_headers(&self) -> DnacResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(self.token.expose_secret())
            .map_err(|e| DnacError::ApiError(format!("Invalid session token: {e}")))?;
        token.set_sensitive(true);
        headers.insert(AUTH_TOKEN_HEADER, token);
        Ok(headers)
    }

    /// Issues an authenticated GET and unwraps the `response` envelope.
    ///
    /// `endpoint` must be a path only; query parameters go in `query`.
    pub(crate) async fn get<R>(&self, endpoint: &str, query: &[(&str, String)]) -> DnacResult<R>
    where
        R: DeserializeOwned,
    {
        if !endpoint.starts_with('/') || endpoint.contains(['?', '#']) {
            return Err(DnacError::InvalidEndpoint(format!(
                "endpoint must be an absolute path without query or fragment: {endpoint}"
            )));
        }

        let url = self.base_url.join(endpoint)?;

        let response = self
            .http_client
            .get(url)
            .headers(self.auth_headers()?)
            .query(query)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(DnacError::ApiError("Session token rejected (401 Unauthorized)".into()));
        }

        if !response.status().is_success() {
            return Err(DnacError::ApiError(format!(
                "API request failed with status code: {}",
                response.status()
            )));
        }

        let body = response.bytes().await?;
        let api_response: ApiResponse<R> = serde_json::from_slice(&body)?;

        Ok(api_response.response)
    }
}
