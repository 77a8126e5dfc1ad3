//! # dsis-auth
//!
//! Configuration and authentication for the DSIS API gateway.
//!
//! ## Security
//!
//! - Secrets (client secret, service password, subscription keys, tokens)
//!   are redacted in Debug output
//! - Tracing spans skip credential parameters
//! - Response bodies quoted in errors are sanitized and truncated
//!
//! ## Flow
//!
//! ```text
//!   ConfidentialClient ──client_credentials──▶ Azure AD   (gateway token)
//!          │
//!   TokenAuthority ──password grant + gateway token──▶ /dsauth/v1/token  (DSIS token)
//!          │
//!          ▼
//!   AuthHeaders { Authorization, Ocp-Apim-Subscription-Key, dsis-site, dsis-token }
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use dsis_auth::{DsisConfig, TokenAuthority};
//! use dsis_http::DsisHttpClient;
//!
//! let config = DsisConfig::from_env()?;
//! let mut authority = TokenAuthority::new(config, DsisHttpClient::default_client()?);
//! let headers = authority.get_auth_headers().await?;
//! ```

mod authority;
mod confidential;
mod config;
mod environment;
mod error;

pub use authority::{
    AuthHeaders, TokenAuthority, DSIS_CLIENT_ID, DSIS_TOKEN_HEADER, SITE_HEADER,
    SUBSCRIPTION_KEY_HEADER,
};
pub use confidential::{ConfidentialClient, EXPIRY_SKEW};
pub use config::{
    DsisConfig, DsisConfigBuilder, COMMON_MODEL, DEFAULT_AUTHORITY_HOST, DEFAULT_DSIS_SITE,
    DEFAULT_MODEL_VERSION, NATIVE_MODEL,
};
pub use environment::Environment;
pub use error::{Error, ErrorKind, Result};
