//! Azure AD client-credentials flow with an in-memory token cache.

use std::time::{Duration, Instant};

use dsis_http::{DsisHttpClient, Response};
use serde::Deserialize;
use tracing::{debug, error, instrument};

use crate::error::{Error, Result};

/// Tokens are treated as expired this long before Azure AD says they are.
pub const EXPIRY_SKEW: Duration = Duration::from_secs(5 * 60);

/// Lifetime assumed when the token response carries no `expires_in`.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Confidential client application for the OAuth2 client-credentials grant.
///
/// Keeps the last token per scope set so repeated calls inside the token
/// lifetime do not hit the identity provider.
#[derive(Clone)]
pub struct ConfidentialClient {
    client_id: String,
    client_secret: String,
    authority: String,
    http: DsisHttpClient,
    cache: Option<CachedToken>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    scopes: Vec<String>,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid_for(&self, scopes: &[String]) -> bool {
        self.scopes == scopes && Instant::now() < self.expires_at
    }
}

impl std::fmt::Debug for ConfidentialClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfidentialClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("authority", &self.authority)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl ConfidentialClient {
    /// Create a client for `authority` (e.g. `https://login.microsoftonline.com/<tenant>`).
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authority: impl Into<String>,
        http: DsisHttpClient,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority: authority.into(),
            http,
            cache: None,
        }
    }

    /// Authority this client authenticates against.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// OAuth2 token endpoint derived from the authority.
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority.trim_end_matches('/'))
    }

    /// Returns true if a token is cached and not yet expired.
    pub fn has_cached_token(&self) -> bool {
        self.cache
            .as_ref()
            .is_some_and(|cached| Instant::now() < cached.expires_at)
    }

    /// Drop the cached token.
    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// Acquire an access token for `scopes`, reusing the cached one when valid.
    ///
    /// The client secret is never logged.
    #[instrument(skip(self), fields(authority = %self.authority))]
    pub async fn acquire_token_for_client(&mut self, scopes: &[String]) -> Result<String> {
        if let Some(cached) = self.cache.as_ref().filter(|c| c.is_valid_for(scopes)) {
            debug!("Using cached Azure AD token");
            return Ok(cached.access_token.clone());
        }

        let scope = scopes.join(" ");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        let request = self.http.post(self.token_url()).form(&params)?;
        let response = self.http.execute(request).await?;
        let token = handle_token_response(response).await?;

        let lifetime = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LIFETIME);
        let access_token = token.access_token;

        self.cache = Some(CachedToken {
            access_token: access_token.clone(),
            scopes: scopes.to_vec(),
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_SKEW),
        });

        Ok(access_token)
    }
}

/// Token endpoint reply. Azure AD answers errors with the same shape.
#[derive(Deserialize)]
struct ClientCredentialsResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error_description: Option<String>,
}

struct IssuedToken {
    access_token: String,
    expires_in: Option<u64>,
}

async fn handle_token_response(response: Response) -> Result<IssuedToken> {
    let status = response.status();
    let body = response.text().await?;

    let parsed: ClientCredentialsResponse = serde_json::from_str(&body).map_err(|e| {
        error!(status, "Azure AD token response was not JSON");
        Error::with_source(
            crate::error::ErrorKind::Authentication(format!(
                "Failed to acquire Azure AD token: {status} - {}",
                dsis_http::sanitize_body(&body)
            )),
            e,
        )
    })?;

    match parsed.access_token {
        Some(access_token) if !access_token.is_empty() => {
            debug!("Azure AD token acquired");
            Ok(IssuedToken {
                access_token,
                expires_in: parsed.expires_in,
            })
        }
        _ => {
            let description = parsed
                .error_description
                .unwrap_or_else(|| "Unknown error".to_string());
            error!(status, "Azure AD token acquisition failed");
            Err(Error::authentication(format!(
                "Failed to acquire Azure AD token: {description}"
            )))
        }
    }
}
