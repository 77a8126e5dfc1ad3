//! HTTP response handling for gateway calls.

use bytes::Bytes;

use crate::error::{Error, ErrorKind, Result};

/// Maximum number of characters of a response body carried in an error.
pub const MAX_BODY_EXCERPT: usize = 500;

/// Wrapper around an HTTP response.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Get the canonical reason phrase for the status code.
    pub fn reason(&self) -> &'static str {
        self.inner.status().canonical_reason().unwrap_or("Unknown")
    }

    /// Returns true if the status is exactly 200.
    pub fn is_ok(&self) -> bool {
        self.status() == 200
    }

    /// Returns true if this is a 404 Not Found response.
    pub fn is_not_found(&self) -> bool {
        self.status() == 404
    }

    /// Get the Content-Length reported by the server, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.inner.content_length()
    }

    /// Get the response body as text.
    pub async fn text(self) -> Result<String> {
        self.inner.text().await.map_err(Into::into)
    }

    /// Get the response body as bytes.
    pub async fn bytes(self) -> Result<Bytes> {
        self.inner.bytes().await.map_err(Into::into)
    }

    /// Pull the next chunk of the body off the connection.
    ///
    /// Returns `None` once the body is exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        self.inner.chunk().await.map_err(Into::into)
    }

    /// Consume the response into an [`ErrorKind::Api`] error carrying the
    /// status, reason and a sanitized body excerpt.
    pub async fn into_api_error(self) -> Error {
        let status = self.status();
        let reason = self.reason().to_string();
        let body = self.inner.text().await.unwrap_or_default();
        Error::new(ErrorKind::Api {
            status,
            reason,
            body: sanitize_body(&body),
        })
    }

    /// Return `self` when the status is 200, otherwise an API error.
    pub async fn error_unless_ok(self) -> Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(self.into_api_error().await)
        }
    }
}

/// Sanitize a response body before it is placed in an error or log line.
///
/// Bearer tokens and JWT-shaped strings are redacted and anything longer than
/// [`MAX_BODY_EXCERPT`] characters is truncated.
pub fn sanitize_body(body: &str) -> String {
    let mut sanitized = body.to_string();

    if let Ok(bearer) = regex_lite::Regex::new(r"(?i)bearer\s+[A-Za-z0-9\-_.~+/]+=*") {
        sanitized = bearer
            .replace_all(&sanitized, "Bearer [REDACTED]")
            .to_string();
    }

    if let Ok(jwt) = regex_lite::Regex::new(r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*") {
        sanitized = jwt.replace_all(&sanitized, "[REDACTED_TOKEN]").to_string();
    }

    if sanitized.chars().count() > MAX_BODY_EXCERPT {
        sanitized = sanitized.chars().take(MAX_BODY_EXCERPT).collect();
        sanitized.push_str("...[truncated]");
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_redacts_bearer_tokens() {
        let body = "upstream rejected Authorization: Bearer abc.def-ghi_123";
        let sanitized = sanitize_body(body);
        assert!(
            sanitized.contains("Bearer [REDACTED]"),
            "Should redact bearer: {sanitized}"
        );
        assert!(!sanitized.contains("abc.def-ghi_123"));
    }

    #[test]
    fn test_sanitize_redacts_jwts() {
        let body = r#"{"error":"invalid_token","token":"eyJhbGciOi.eyJzdWIiOiIx.c2lnbmF0dXJl"}"#;
        let sanitized = sanitize_body(body);
        assert!(sanitized.contains("[REDACTED_TOKEN]"), "{sanitized}");
        assert!(!sanitized.contains("eyJzdWIiOiIx"));
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let long_body = "x".repeat(600);
        let sanitized = sanitize_body(&long_body);
        assert_eq!(
            sanitized.len(),
            MAX_BODY_EXCERPT + "...[truncated]".len()
        );
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let long_body = "ø".repeat(700);
        let sanitized = sanitize_body(&long_body);
        assert_eq!(sanitized.chars().filter(|c| *c == 'ø').count(), MAX_BODY_EXCERPT);
    }

    #[test]
    fn test_sanitize_passes_through_clean_bodies() {
        let body = "Resource not found for the segment 'Wellbore'";
        assert_eq!(sanitize_body(body), body);
    }
}
