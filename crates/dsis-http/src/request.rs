//! HTTP request building with gateway-specific headers.

use serde::Serialize;

use crate::error::Result;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    /// Convert to reqwest::Method.
    pub fn to_reqwest(&self) -> reqwest::Method {
        match self {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
        }
    }
}

/// Builder for HTTP requests.
///
/// Headers keep insertion order; setting a header twice replaces the first
/// value in place.
#[derive(Debug)]
pub struct RequestBuilder {
    pub(crate) method: RequestMethod,
    pub(crate) url: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) query_params: Vec<(String, String)>,
    pub(crate) body: Option<RequestBody>,
    pub(crate) bearer_token: Option<String>,
    pub(crate) timeout: Option<std::time::Duration>,
}

/// Request body content.
#[derive(Debug)]
pub enum RequestBody {
    /// Pre-encoded `application/x-www-form-urlencoded` body.
    Form(String),
}

impl RequestBuilder {
    /// Create a new request builder.
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query_params: Vec::new(),
            body: None,
            bearer_token: None,
            timeout: None,
        }
    }

    /// Set the bearer token for authentication.
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Add every header from an iterator of name/value pairs.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    /// Set the Accept header.
    pub fn accept(self, content_type: impl Into<String>) -> Self {
        self.header("Accept", content_type)
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    /// Set a per-request timeout, overriding the client default.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a form body from any serializable sequence of pairs.
    pub fn form<T: Serialize + ?Sized>(mut self, data: &T) -> Result<Self> {
        let encoded = serde_urlencoded::to_string(data)?;
        self.body = Some(RequestBody::Form(encoded));
        Ok(self.header("Content-Type", "application/x-www-form-urlencoded"))
    }

    /// Get the URL including encoded query parameters.
    pub fn full_url(&self) -> Result<String> {
        if self.query_params.is_empty() {
            return Ok(self.url.clone());
        }
        let encoded = serde_urlencoded::to_string(&self.query_params)?;
        let separator = if self.url.contains('?') { '&' } else { '?' };
        Ok(format!("{}{}{}", self.url, separator, encoded))
    }

    /// Get the request method.
    pub fn method(&self) -> RequestMethod {
        self.method
    }

    /// Get the request URL without query parameters.
    pub fn url(&self) -> &str {
        &self.url
    }
}
