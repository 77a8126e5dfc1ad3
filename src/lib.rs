//! # dsis-client
//!
//! A Rust client for the DSIS OData API behind the Equinor API gateway.
//!
//! Every data request carries two tokens: an Azure AD token for the gateway
//! and a DSIS token for the backend. This library acquires both, caches
//! them, and attaches them together with the subscription key and site
//! headers.
//!
//! ## Security
//!
//! - Sensitive data (tokens, secrets, keys) are redacted in Debug output
//! - Tracing/logging skips credential parameters
//! - Error messages sanitize any credential data
//!
//! ## Crates
//!
//! - **dsis-http** - HTTP transport with compression, pooling and error mapping
//! - **dsis-auth** - Environment config, Azure AD client credentials, DSIS token exchange
//! - **dsis-odata** - Query building, pagination, typed results and bulk data
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dsis_client::{DsisClient, DsisConfig, PageBound, QueryBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Read DSIS_* variables
//!     let config = DsisConfig::from_env()?;
//!     let mut client = DsisClient::new(config)?;
//!
//!     if !client.test_connection().await {
//!         return Err("gateway unreachable".into());
//!     }
//!
//!     let query = QueryBuilder::new("123", "SNORRE").schema("Basin");
//!     let result = client.execute_query(&query, PageBound::Unbounded).await?;
//!     println!("{} basins", result.len());
//!
//!     Ok(())
//! }
//! ```

// Re-export all crates for convenient access
#[cfg(feature = "auth")]
pub use dsis_auth as auth;
#[cfg(feature = "http")]
pub use dsis_http as http;
#[cfg(feature = "odata")]
pub use dsis_odata as odata;

// Re-export commonly used types at the top level
#[cfg(feature = "auth")]
pub use dsis_auth::{DsisConfig, Environment};
#[cfg(feature = "http")]
pub use dsis_http::ClientConfig;
#[cfg(feature = "odata")]
pub use dsis_odata::{DsisClient, DsisModel, ODataRequest, PageBound, QueryBuilder};
