//! # dsis-http
//!
//! Core HTTP transport for the DSIS API gateway.
//!
//! This crate provides the foundational HTTP client with:
//! - Connection pooling (one `reqwest::Client` per `DsisHttpClient`)
//! - Compression support (gzip, deflate)
//! - Request/response tracing
//! - Error mapping with sanitized, truncated response bodies
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │  (dsis-auth token exchanges, dsis-odata gateway)            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DsisHttpClient                           │
//! │  - Raw HTTP with compression and pooling                    │
//! │  - Request building (headers, query, form bodies)           │
//! │  - Response handling                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use dsis_http::{ClientConfig, DsisHttpClient};
//!
//! let http = DsisHttpClient::new(ClientConfig::default())?;
//! let response = http
//!     .send(http.get("https://api-dev.gateway.equinor.com/dsdata/v1").bearer_auth(token))
//!     .await?;
//! ```

mod client;
mod config;
mod error;
mod request;
mod response;

pub use client::DsisHttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use request::{RequestBuilder, RequestMethod};
pub use response::{sanitize_body, Response, MAX_BODY_EXCERPT};

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("dsis-client-rs/", env!("CARGO_PKG_VERSION"));
