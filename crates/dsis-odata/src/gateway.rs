//! Authenticated GET requests against the DSIS data endpoint.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use dsis_auth::{DsisConfig, TokenAuthority};
use dsis_http::{DsisHttpClient, RequestBuilder, Response};
use futures::Stream;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};

/// Accept header for JSON responses and most bulk data endpoints.
pub const ACCEPT_JSON: &str = "application/json";

/// Accept header for endpoints that serve raw binary, e.g. `SurfaceGrid/$value`.
pub const ACCEPT_OCTET_STREAM: &str = "application/octet-stream";

/// Chunk size recommended by DSIS for bulk downloads.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Performs authenticated requests and normalizes their outcome.
///
/// Owns the connection pool and the token cache.
#[derive(Debug)]
pub struct RequestGateway {
    http: DsisHttpClient,
    authority: TokenAuthority,
    data_endpoint: String,
}

impl RequestGateway {
    /// Create a gateway for `config`, sharing `http` with the token exchanges.
    pub fn new(config: DsisConfig, http: DsisHttpClient) -> Self {
        let data_endpoint = config.data_endpoint();
        Self {
            authority: TokenAuthority::new(config, http.clone()),
            http,
            data_endpoint,
        }
    }

    /// Data endpoint root, e.g. `https://api.gateway.equinor.com/dsdata/v1`.
    pub fn data_endpoint(&self) -> &str {
        &self.data_endpoint
    }

    /// The token authority.
    pub fn authority(&self) -> &TokenAuthority {
        &self.authority
    }

    /// The token authority, for refreshes.
    pub fn authority_mut(&mut self) -> &mut TokenAuthority {
        &mut self.authority
    }

    /// Absolute URL for `endpoint`.
    ///
    /// Absolute `http(s)` endpoints are used as given; anything else is
    /// appended to the data endpoint.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!(
                "{}/{}",
                self.data_endpoint.trim_end_matches('/'),
                endpoint.trim_start_matches('/')
            )
        }
    }

    async fn authenticated_get(&mut self, url: String) -> Result<RequestBuilder> {
        let headers = self.authority.get_auth_headers().await?;
        Ok(self.http.get(url).headers(headers))
    }

    /// GET `endpoint` and parse the JSON body.
    ///
    /// A 200 whose body is not JSON comes back as `{"data": "<text>"}`.
    #[instrument(skip(self, params))]
    pub async fn request_json(
        &mut self,
        endpoint: &str,
        params: Option<&[(String, String)]>,
    ) -> Result<Value> {
        let url = self.url_for(endpoint);
        let mut request = self.authenticated_get(url).await?.accept(ACCEPT_JSON);
        for (name, value) in params.unwrap_or_default() {
            request = request.query(name.as_str(), value.as_str());
        }

        debug!(endpoint, "Making request");
        let response = self.http.send(request).await?;
        let text = response.text().await?;

        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON response");
                Ok(serde_json::json!({ "data": text }))
            }
        }
    }

    /// GET a bulk data endpoint and return the whole payload.
    ///
    /// `Ok(None)` means the entity has no bulk data (404).
    #[instrument(skip(self))]
    pub async fn request_binary(&mut self, endpoint: &str, accept: &str) -> Result<Option<Bytes>> {
        let response = self.binary_response(endpoint, accept).await?;
        match response {
            Some(response) => {
                let payload = response.bytes().await?;
                debug!(bytes = payload.len(), "Bulk data received");
                Ok(Some(payload))
            }
            None => Ok(None),
        }
    }

    /// GET a bulk data endpoint and read it incrementally.
    ///
    /// A 404 gives an empty stream.
    #[instrument(skip(self))]
    pub async fn request_binary_stream(
        &mut self,
        endpoint: &str,
        chunk_size: usize,
        accept: &str,
    ) -> Result<BulkDataStream> {
        if chunk_size == 0 {
            return Err(Error::invalid_query("chunk_size must be greater than zero"));
        }
        let response = self.binary_response(endpoint, accept).await?;
        Ok(match response {
            Some(response) => BulkDataStream::new(response, chunk_size),
            None => BulkDataStream::empty(chunk_size),
        })
    }

    async fn binary_response(&mut self, endpoint: &str, accept: &str) -> Result<Option<Response>> {
        let url = self.url_for(endpoint);
        let request = self.authenticated_get(url).await?.accept(accept);
        let response = self.http.execute(request).await?;

        if response.is_not_found() {
            debug!(endpoint, "No bulk data for entity");
            return Ok(None);
        }

        Ok(Some(response.error_unless_ok().await?))
    }

    /// GET the bare data endpoint with a short timeout and report the status.
    pub async fn probe(&mut self, timeout: Duration) -> Result<u16> {
        let url = self.data_endpoint.clone();
        let request = self.authenticated_get(url).await?.timeout(timeout);
        let response = self.http.execute(request).await?;
        Ok(response.status())
    }
}

/// Bulk data read from the socket in chunks of at most `chunk_size` bytes.
///
/// Dropping the stream or calling [`close`] releases the connection, so a
/// consumer can stop early without reading the rest of the payload.
///
/// [`close`]: BulkDataStream::close
#[derive(Debug)]
pub struct BulkDataStream {
    response: Option<Response>,
    buffer: BytesMut,
    chunk_size: usize,
    bytes_read: u64,
    content_length: Option<u64>,
}

impl BulkDataStream {
    fn new(response: Response, chunk_size: usize) -> Self {
        Self {
            content_length: response.content_length(),
            response: Some(response),
            buffer: BytesMut::new(),
            chunk_size,
            bytes_read: 0,
        }
    }

    fn empty(chunk_size: usize) -> Self {
        Self {
            response: None,
            buffer: BytesMut::new(),
            chunk_size,
            bytes_read: 0,
            content_length: Some(0),
        }
    }

    /// Maximum chunk length.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Bytes handed out so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Content-Length announced by the server, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Returns true once the body is exhausted or the stream was closed.
    pub fn is_finished(&self) -> bool {
        self.response.is_none() && self.buffer.is_empty()
    }

    /// Next chunk, or `None` at the end of the payload.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            if self.buffer.len() >= self.chunk_size {
                return Ok(Some(self.take(self.chunk_size)));
            }

            let Some(response) = self.response.as_mut() else {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let len = self.buffer.len();
                return Ok(Some(self.take(len)));
            };

            match response.chunk().await {
                Ok(Some(chunk)) => self.buffer.extend_from_slice(&chunk),
                Ok(None) => self.response = None,
                Err(e) => {
                    self.close();
                    return Err(e.into());
                }
            }
        }
    }

    fn take(&mut self, len: usize) -> Bytes {
        let chunk = self.buffer.split_to(len).freeze();
        self.bytes_read += chunk.len() as u64;
        chunk
    }

    /// Read every remaining chunk into one buffer.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        let mut payload = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await? {
            payload.extend_from_slice(&chunk);
        }
        Ok(payload.freeze())
    }

    /// Stop reading and release the connection.
    pub fn close(&mut self) {
        if self.response.take().is_some() {
            debug!(bytes_read = self.bytes_read, "Bulk data stream closed early");
        }
        self.buffer.clear();
    }

    /// Adapt into a [`Stream`] of chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes>> {
        futures::stream::try_unfold(self, |mut stream| async move {
            Ok(stream.next_chunk().await?.map(|chunk| (chunk, stream)))
        })
    }
}

impl Drop for BulkDataStream {
    fn drop(&mut self) {
        self.close();
    }
}
