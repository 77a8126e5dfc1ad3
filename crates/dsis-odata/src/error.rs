//! Error types for dsis-odata.

/// Result type alias for dsis-odata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for dsis-odata operations.
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

    /// Shorthand for a malformed-query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidQuery(message.into()))
    }

    /// HTTP status of a failed API call, if any.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the gateway answered 401, which usually means the
    /// cached tokens expired and a refresh is worth trying.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Returns true if this error came from caller input rather than the network.
    pub fn is_invalid_query(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidQuery(_) | ErrorKind::TypeMismatch { .. }
        )
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A token exchange failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The gateway answered with a non-success status.
    #[error("API request failed: {status} - {reason} - {body}")]
    Api {
        status: u16,
        reason: String,
        body: String,
    },

    /// The query is not in a state that allows the requested operation.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A typed operation was asked for a model the query does not carry.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// An item could not be converted into the requested model.
    #[error("Failed to cast item {index} to {model}: {message}")]
    Validation {
        model: String,
        index: usize,
        message: String,
    },

    /// Connection, timeout or decoding failure below the API layer.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<dsis_http::Error> for Error {
    fn from(err: dsis_http::Error) -> Self {
        let kind = match &err.kind {
            dsis_http::ErrorKind::Api {
                status,
                reason,
                body,
            } => ErrorKind::Api {
                status: *status,
                reason: reason.clone(),
                body: body.clone(),
            },
            dsis_http::ErrorKind::Config(message) => ErrorKind::Configuration(message.clone()),
            _ => ErrorKind::Transport(err.to_string()),
        };
        Error::with_source(kind, err)
    }
}

impl From<dsis_auth::Error> for Error {
    fn from(err: dsis_auth::Error) -> Self {
        let kind = match &err.kind {
            dsis_auth::ErrorKind::Configuration(message) => {
                ErrorKind::Configuration(message.clone())
            }
            dsis_auth::ErrorKind::EnvVar(name) => {
                ErrorKind::Configuration(format!("environment variable not set: {name}"))
            }
            dsis_auth::ErrorKind::Authentication(message) => {
                ErrorKind::Authentication(message.clone())
            }
            _ => ErrorKind::Transport(err.to_string()),
        };
        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Transport(err.to_string()), err)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Error::with_source(ErrorKind::InvalidQuery(err.to_string()), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_from_http() {
        let http_err = dsis_http::Error::new(dsis_http::ErrorKind::Api {
            status: 401,
            reason: "Unauthorized".into(),
            body: "token expired".into(),
        });
        let err: Error = http_err.into();

        assert!(err.is_unauthorized());
        assert_eq!(
            err.to_string(),
            "API request failed: 401 - Unauthorized - token expired"
        );
    }

    #[test]
    fn test_auth_categories_are_preserved() {
        let err: Error = dsis_auth::Error::authentication("nope").into();
        assert!(matches!(err.kind, ErrorKind::Authentication(_)));

        let err: Error = dsis_auth::Error::configuration("'tenant_id' must be set").into();
        assert!(matches!(err.kind, ErrorKind::Configuration(_)));
    }

    #[test]
    fn test_transport_errors() {
        let err: Error = dsis_http::Error::new(dsis_http::ErrorKind::Timeout).into();
        assert!(matches!(err.kind, ErrorKind::Transport(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_query_error_predicates() {
        assert!(Error::invalid_query("schema must be set").is_invalid_query());
        let err = Error::new(ErrorKind::TypeMismatch {
            expected: "Well".into(),
            actual: "Fault".into(),
        });
        assert!(err.is_invalid_query());
        assert_eq!(err.to_string(), "Type mismatch: expected Well, got Fault");

        let err = Error::new(ErrorKind::Validation {
            model: "Well".into(),
            index: 2,
            message: "missing field `well_name`".into(),
        });
        assert!(!err.is_invalid_query());
        assert!(err.to_string().contains("item 2"));
    }
}
