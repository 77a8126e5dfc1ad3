//! Dual-token authentication for the DSIS gateway.
//!
//! Every data call needs two tokens:
//!
//! 1. an Azure AD token (client credentials) that gets the request through
//!    the API gateway, and
//! 2. a DSIS token, obtained by presenting the Azure AD token to the dsauth
//!    endpoint with a service account, that the backend checks.
//!
//! [`TokenAuthority`] caches both and hands out the header set that carries
//! them. It never detects expiry on its own; callers invoke
//! [`TokenAuthority::refresh`] when a call comes back unauthorized.

use dsis_http::{DsisHttpClient, Response};
use serde::Deserialize;
use tracing::{debug, error, instrument};

use crate::confidential::ConfidentialClient;
use crate::config::DsisConfig;
use crate::error::{Error, ErrorKind, Result};

/// Fixed client identifier sent on the DSIS password grant.
pub const DSIS_CLIENT_ID: &str = "dsis-data";

/// Header carrying the APIM subscription key.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Header carrying the DSIS site tag.
pub const SITE_HEADER: &str = "dsis-site";

/// Header carrying the DSIS backend token.
pub const DSIS_TOKEN_HEADER: &str = "dsis-token";

/// Acquires, caches and refreshes the gateway and backend tokens.
pub struct TokenAuthority {
    config: DsisConfig,
    http: DsisHttpClient,
    confidential: Option<ConfidentialClient>,
    gateway_token: Option<String>,
    backend_token: Option<String>,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("config", &self.config)
            .field(
                "gateway_token",
                &self.gateway_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "backend_token",
                &self.backend_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// Create an authority with no cached tokens.
    pub fn new(config: DsisConfig, http: DsisHttpClient) -> Self {
        Self {
            config,
            http,
            confidential: None,
            gateway_token: None,
            backend_token: None,
        }
    }

    /// The configuration this authority authenticates with.
    pub fn config(&self) -> &DsisConfig {
        &self.config
    }

    /// Returns true if both tokens are cached.
    pub fn has_tokens(&self) -> bool {
        self.gateway_token.is_some() && self.backend_token.is_some()
    }

    /// Drop both tokens and the confidential client cache without re-acquiring.
    pub fn clear(&mut self) {
        self.gateway_token = None;
        self.backend_token = None;
        if let Some(confidential) = self.confidential.as_mut() {
            confidential.clear_cache();
        }
    }

    /// Acquire the Azure AD gateway token through the client-credentials flow.
    ///
    /// The confidential client is created once and reused so its own cache
    /// can answer repeat calls.
    #[instrument(skip(self))]
    pub async fn acquire_gateway_token(&mut self) -> Result<String> {
        debug!("Acquiring Azure AD token");

        let config = &self.config;
        let http = &self.http;
        let confidential = self.confidential.get_or_insert_with(|| {
            ConfidentialClient::new(
                config.client_id(),
                config.client_secret(),
                config.authority(),
                http.clone(),
            )
        });

        let token = confidential
            .acquire_token_for_client(&config.scope())
            .await?;

        self.gateway_token = Some(token.clone());
        Ok(token)
    }

    /// Exchange the gateway token for a DSIS backend token.
    ///
    /// Acquires a gateway token first when none is given.
    #[instrument(skip(self, gateway_token))]
    pub async fn acquire_backend_token(&mut self, gateway_token: Option<&str>) -> Result<String> {
        debug!("Acquiring DSIS token");

        let gateway_token = match gateway_token {
            Some(token) => token.to_string(),
            None => self.acquire_gateway_token().await?,
        };

        let params = [
            ("grant_type", "password"),
            ("client_id", DSIS_CLIENT_ID),
            ("username", self.config.dsis_username()),
            ("password", self.config.dsis_password()),
        ];

        let request = self
            .http
            .post(self.config.token_endpoint())
            .bearer_auth(&gateway_token)
            .header(SITE_HEADER, self.config.dsis_site())
            .header(SUBSCRIPTION_KEY_HEADER, self.config.subscription_key_dsauth())
            .form(&params)?;

        let response = self.http.execute(request).await?;
        let token = handle_dsis_token_response(response).await?;

        self.backend_token = Some(token.clone());
        Ok(token)
    }

    /// Header set for an authenticated data request.
    ///
    /// Missing tokens are acquired first; cached ones are reused.
    pub async fn get_auth_headers(&mut self) -> Result<AuthHeaders> {
        let gateway_token = match self.gateway_token.clone() {
            Some(token) => token,
            None => self.acquire_gateway_token().await?,
        };

        let backend_token = match self.backend_token.clone() {
            Some(token) => token,
            None => self.acquire_backend_token(Some(&gateway_token)).await?,
        };

        Ok(AuthHeaders {
            gateway_token,
            subscription_key: self.config.subscription_key_dsdata().to_string(),
            site: self.config.dsis_site().to_string(),
            backend_token,
        })
    }

    /// Clear both tokens and acquire fresh ones.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<()> {
        debug!("Refreshing authentication tokens");
        self.clear();
        let gateway_token = self.acquire_gateway_token().await?;
        self.acquire_backend_token(Some(&gateway_token)).await?;
        debug!("Authentication tokens refreshed");
        Ok(())
    }
}

#[derive(Deserialize)]
struct DsisTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

async fn handle_dsis_token_response(response: Response) -> Result<String> {
    let status = response.status();
    let reason = response.reason();

    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        let message = format!(
            "Failed to acquire DSIS token: {status} - {reason} - {}",
            dsis_http::sanitize_body(&body)
        );
        error!(status, "DSIS token exchange failed");
        return Err(Error::authentication(message));
    }

    let body = response.text().await?;
    let parsed: DsisTokenResponse = serde_json::from_str(&body).map_err(|e| {
        error!(status, "DSIS token response was not JSON");
        Error::with_source(
            ErrorKind::Authentication(format!(
                "Failed to acquire DSIS token: {status} - {reason} - {}",
                dsis_http::sanitize_body(&body)
            )),
            e,
        )
    })?;

    match parsed.access_token {
        Some(token) if !token.is_empty() => {
            debug!("DSIS token acquired");
            Ok(token)
        }
        _ => {
            error!("DSIS token not found in response");
            Err(Error::authentication("DSIS token not found in response"))
        }
    }
}

/// The four headers every DSIS data request carries.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    gateway_token: String,
    subscription_key: String,
    site: String,
    backend_token: String,
}

impl std::fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHeaders")
            .field("authorization", &"Bearer [REDACTED]")
            .field("subscription_key", &"[REDACTED]")
            .field("site", &self.site)
            .field("dsis_token", &"[REDACTED]")
            .finish()
    }
}

impl AuthHeaders {
    /// Gateway bearer token.
    pub fn gateway_token(&self) -> &str {
        &self.gateway_token
    }

    /// Backend DSIS token.
    pub fn backend_token(&self) -> &str {
        &self.backend_token
    }

    /// Value of the `dsis-site` header.
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Header name/value pairs in wire order:
    /// `Authorization`, `Ocp-Apim-Subscription-Key`, `dsis-site`, `dsis-token`.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.gateway_token),
            ),
            (
                SUBSCRIPTION_KEY_HEADER.to_string(),
                self.subscription_key.clone(),
            ),
            (SITE_HEADER.to_string(), self.site.clone()),
            (DSIS_TOKEN_HEADER.to_string(), self.backend_token.clone()),
        ]
    }

    /// Look up one header by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<String> {
        self.to_pairs()
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }
}

impl IntoIterator for AuthHeaders {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.to_pairs().into_iter()
    }
}
