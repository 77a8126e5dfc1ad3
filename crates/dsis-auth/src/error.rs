//! Error types for dsis-auth.
//!
//! Error messages never include credential values.

/// Result type alias for dsis-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for dsis-auth operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration(message.into()))
    }

    /// Shorthand for an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication(message.into()))
    }

    /// Returns true if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Configuration(_) | ErrorKind::EnvVar(_)
        )
    }

    /// Returns true if a token exchange was rejected.
    pub fn is_authentication(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication(_))
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Invalid or missing configuration value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A token exchange failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Environment variable not set.
    #[error("Environment variable not set: {0}")]
    EnvVar(String),

    /// Transport failure during a token exchange.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<dsis_http::Error> for Error {
    fn from(err: dsis_http::Error) -> Self {
        let message = err.to_string();
        let sanitized = if message.contains("Bearer") || message.contains("access_token") {
            "Token request failed (details redacted)".to_string()
        } else {
            message
        };
        let kind = match &err.kind {
            dsis_http::ErrorKind::Json(_) => ErrorKind::Json(sanitized),
            dsis_http::ErrorKind::Serialization(_) => ErrorKind::Serialization(sanitized),
            dsis_http::ErrorKind::Config(_) => ErrorKind::Configuration(sanitized),
            _ => ErrorKind::Http(sanitized),
        };
        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Error::with_source(ErrorKind::Serialization(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::Configuration(err.to_string()), err)
    }
}
