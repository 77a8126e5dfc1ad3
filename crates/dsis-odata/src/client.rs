//! High-level DSIS client.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dsis_auth::DsisConfig;
use dsis_http::{ClientConfig, DsisHttpClient};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::gateway::{BulkDataStream, RequestGateway};
use crate::model::{cast_items, DsisModel, ModelRegistry};
use crate::pagination::{Item, Page, PageBound, PageStream, QueryResult};
use crate::query_builder::{QueryBuilder, DEFAULT_FORMAT};

/// Timeout applied by [`DsisClient::test_connection`].
pub const CONNECTION_TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the DSIS OData API.
///
/// Holds the connection pool and the token cache; all calls take `&mut self`.
pub struct DsisClient {
    config: DsisConfig,
    gateway: RequestGateway,
    registry: Option<Arc<dyn ModelRegistry>>,
}

impl std::fmt::Debug for DsisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DsisClient")
            .field("config", &self.config)
            .field("data_endpoint", &self.gateway.data_endpoint())
            .field("registry", &self.registry.is_some())
            .finish_non_exhaustive()
    }
}

impl DsisClient {
    /// Create a client with default HTTP settings.
    pub fn new(config: DsisConfig) -> Result<Self> {
        Self::with_http_config(config, ClientConfig::default())
    }

    /// Create a client with custom HTTP settings.
    pub fn with_http_config(config: DsisConfig, http_config: ClientConfig) -> Result<Self> {
        let http = DsisHttpClient::new(http_config)?;
        debug!(environment = %config.environment(), "DSIS client initialized");
        Ok(Self {
            gateway: RequestGateway::new(config.clone(), http),
            config,
            registry: None,
        })
    }

    /// Attach a model registry for table validation and field discovery.
    pub fn with_registry(mut self, registry: Arc<dyn ModelRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The client configuration.
    pub fn config(&self) -> &DsisConfig {
        &self.config
    }

    /// The attached model registry.
    pub fn registry(&self) -> Option<&Arc<dyn ModelRegistry>> {
        self.registry.as_ref()
    }

    /// The underlying request gateway.
    pub fn gateway_mut(&mut self) -> &mut RequestGateway {
        &mut self.gateway
    }

    /// Run a query and collect every permitted page.
    pub async fn execute_query(&mut self, query: &QueryBuilder, bound: PageBound) -> Result<QueryResult> {
        self.execute_query_stream(query, bound)
            .await?
            .collect_all()
            .await
    }

    /// Run a query and return a lazy item sequence.
    ///
    /// The first page is fetched here; later pages are fetched on demand.
    #[instrument(skip(self, query), fields(query = %query))]
    pub async fn execute_query_stream(
        &mut self,
        query: &QueryBuilder,
        bound: PageBound,
    ) -> Result<PageStream<'_>> {
        let endpoint =
            query.build_endpoint(self.config.model_name(), self.config.model_version())?;
        let params = query.build_query_params();

        debug!(endpoint = %endpoint, "Executing query");
        let body = self.gateway.request_json(&endpoint, Some(params.as_slice())).await?;
        let first = Page::from_json(body)?;

        Ok(PageStream::new(&mut self.gateway, endpoint, first, bound))
    }

    /// Run a query and cast every item to `T`.
    ///
    /// The query must have been built with [`QueryBuilder::schema_model`]
    /// for `T`. One bad item fails the whole call.
    pub async fn execute_query_cast<T: DsisModel>(
        &mut self,
        query: &QueryBuilder,
        bound: PageBound,
    ) -> Result<Vec<T>> {
        let model = query.model().ok_or_else(|| {
            Error::invalid_query(
                "Cannot cast results: query has no schema model. \
                 Use .schema_model::<T>() when building the query.",
            )
        })?;
        if !model.is::<T>() {
            return Err(Error::new(ErrorKind::TypeMismatch {
                expected: model.name().to_string(),
                actual: T::MODEL_NAME.to_string(),
            }));
        }

        let result = self.execute_query(query, bound).await?;
        Self::cast_results(&result.items)
    }

    /// Cast item mappings to `T`, in order, failing on the first bad item.
    pub fn cast_results<T: DsisModel>(items: &[Item]) -> Result<Vec<T>> {
        cast_items(items)
    }

    /// Fetch an entity's bulk data in one piece.
    ///
    /// `Ok(None)` means the entity has no bulk data.
    pub async fn get_bulk_data(&mut self, query: &QueryBuilder, accept: &str) -> Result<Option<Bytes>> {
        let endpoint = self.bulk_endpoint(query, "get_bulk_data")?;
        info!(endpoint = %endpoint, "Fetching bulk data");
        self.gateway.request_binary(&endpoint, accept).await
    }

    /// Stream an entity's bulk data in chunks of at most `chunk_size` bytes.
    pub async fn get_bulk_data_stream(
        &mut self,
        query: &QueryBuilder,
        chunk_size: usize,
        accept: &str,
    ) -> Result<BulkDataStream> {
        let endpoint = self.bulk_endpoint(query, "get_bulk_data_stream")?;
        info!(endpoint = %endpoint, chunk_size, "Streaming bulk data");
        self.gateway
            .request_binary_stream(&endpoint, chunk_size, accept)
            .await
    }

    fn bulk_endpoint(&self, query: &QueryBuilder, operation: &str) -> Result<String> {
        if !query.has_entity() {
            return Err(Error::invalid_query(format!(
                "Query must target an entity. Call query.entity(native_uid) before passing to {operation}()."
            )));
        }
        query.build_endpoint(self.config.model_name(), self.config.model_version())
    }

    /// Check that the gateway is reachable and the tokens are accepted.
    ///
    /// 200 and 404 both count as reachable. Never fails; problems are logged.
    pub async fn test_connection(&mut self) -> bool {
        debug!("Testing DSIS API connection");
        match self.gateway.probe(CONNECTION_TEST_TIMEOUT).await {
            Ok(200 | 404) => {
                debug!("Connection test successful");
                true
            }
            Ok(status) => {
                warn!(status, "Connection test failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Connection test failed");
                false
            }
        }
    }

    /// Drop the cached tokens and acquire new ones.
    pub async fn refresh_authentication(&mut self) -> Result<()> {
        debug!("Refreshing authentication");
        Ok(self.gateway.authority_mut().refresh().await?)
    }

    /// Issue a raw OData GET against the configured model.
    #[instrument(skip(self, request))]
    pub async fn get_odata(&mut self, request: &ODataRequest) -> Result<Value> {
        let table = match (&request.data_table, &request.district_id, &request.field) {
            (Some(table), _, _) => Some(table.clone()),
            (None, Some(_), _) | (None, _, Some(_)) => {
                debug!(model = self.config.model_name(), "Using configured model as data table");
                Some(self.config.model_name().to_string())
            }
            (None, None, None) => None,
        };

        if let (true, Some(table), Some(registry)) =
            (request.validate_model, table.as_deref(), self.registry.as_ref())
        {
            if !registry.contains(table) {
                return Err(Error::invalid_query(format!(
                    "Unknown model: '{table}'. Use model_names() to discover available models."
                )));
            }
        }

        let mut segments = vec![
            self.config.model_name().to_string(),
            self.config.model_version().to_string(),
        ];
        segments.extend(request.district_id.iter().cloned());
        segments.extend(request.field.iter().cloned());
        segments.extend(table);
        let endpoint = segments.join("/");

        let params = request.query_params();
        self.gateway.request_json(&endpoint, Some(params.as_slice())).await
    }

    /// Declared fields of a model known to the registry.
    pub fn model_fields(&self, name: &str) -> Option<Vec<String>> {
        self.registry.as_ref()?.field_names(name)
    }

    /// Names of every model known to the registry.
    pub fn model_names(&self) -> Vec<String> {
        self.registry
            .as_ref()
            .map(|registry| registry.model_names())
            .unwrap_or_default()
    }
}

/// A raw OData request for [`DsisClient::get_odata`].
///
/// Resolves to `<model>/<version>[/<district>][/<field>][/<data_table>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ODataRequest {
    district_id: Option<String>,
    field: Option<String>,
    data_table: Option<String>,
    format: String,
    select: Option<String>,
    expand: Option<String>,
    filter: Option<String>,
    validate_model: bool,
    extra: Vec<(String, String)>,
}

impl Default for ODataRequest {
    fn default() -> Self {
        Self {
            district_id: None,
            field: None,
            data_table: None,
            format: DEFAULT_FORMAT.to_string(),
            select: None,
            expand: None,
            filter: None,
            validate_model: true,
            extra: Vec::new(),
        }
    }
}

impl ODataRequest {
    /// Request for just `<model>/<version>`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn district_id(mut self, district_id: impl Into<String>) -> Self {
        self.district_id = Some(district_id.into());
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Data table, e.g. `"Basin"`. Defaults to the configured model name
    /// when a district or field is set.
    pub fn data_table(mut self, table: impl Into<String>) -> Self {
        self.data_table = Some(table.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Comma-separated `$select`, passed through verbatim.
    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    /// Comma-separated `$expand`, passed through verbatim.
    pub fn expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Check the data table against the client's registry (default: on).
    pub fn validate_model(mut self, validate: bool) -> Self {
        self.validate_model = validate;
        self
    }

    /// Add any other query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    /// Ordered query parameters.
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("$format".to_string(), self.format.clone())];
        let options = [
            ("$select", &self.select),
            ("$expand", &self.expand),
            ("$filter", &self.filter),
        ];
        for (name, value) in options {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((name.to_string(), value.to_string()));
            }
        }
        params.extend(self.extra.iter().cloned());
        params
    }
}
