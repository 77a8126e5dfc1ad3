//! DSIS client configuration.
//!
//! [`DsisConfig`] is immutable once built. Every required string is checked
//! at [`DsisConfigBuilder::build`], and the gateway URLs are derived from the
//! environment rather than stored.
//!
//! Secrets are redacted in Debug output.

use crate::environment::Environment;
use crate::error::{Error, ErrorKind, Result};

/// Default DSIS model version.
pub const DEFAULT_MODEL_VERSION: &str = "5000107";

/// Default value of the `dsis-site` header.
pub const DEFAULT_DSIS_SITE: &str = "qa";

/// Model name of the native OpenWorks model.
pub const NATIVE_MODEL: &str = "OW5000";

/// Model name of the OpenWorks common model.
pub const COMMON_MODEL: &str = "OpenWorksCommonModel";

/// Azure AD login host.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Configuration for the DSIS API client.
#[derive(Clone)]
pub struct DsisConfig {
    environment: Environment,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    access_app_id: String,
    dsis_username: String,
    dsis_password: String,
    subscription_key_dsauth: String,
    subscription_key_dsdata: String,
    model_name: String,
    model_version: String,
    dsis_site: String,
    base_url_override: Option<String>,
    authority_host_override: Option<String>,
}

impl std::fmt::Debug for DsisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DsisConfig")
            .field("environment", &self.environment)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("access_app_id", &self.access_app_id)
            .field("dsis_username", &self.dsis_username)
            .field("dsis_password", &"[REDACTED]")
            .field("subscription_key_dsauth", &"[REDACTED]")
            .field("subscription_key_dsdata", &"[REDACTED]")
            .field("model_name", &self.model_name)
            .field("model_version", &self.model_version)
            .field("dsis_site", &self.dsis_site)
            .field("base_url", &self.base_url())
            .finish()
    }
}

impl DsisConfig {
    /// Create a validated configuration with the default model version and site.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        environment: Environment,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        access_app_id: impl Into<String>,
        dsis_username: impl Into<String>,
        dsis_password: impl Into<String>,
        subscription_key_dsauth: impl Into<String>,
        subscription_key_dsdata: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Result<Self> {
        Self::builder()
            .environment(environment)
            .tenant_id(tenant_id)
            .client_id(client_id)
            .client_secret(client_secret)
            .access_app_id(access_app_id)
            .dsis_username(dsis_username)
            .dsis_password(dsis_password)
            .subscription_key_dsauth(subscription_key_dsauth)
            .subscription_key_dsdata(subscription_key_dsdata)
            .model_name(model_name)
            .build()
    }

    /// Start an empty builder.
    pub fn builder() -> DsisConfigBuilder {
        DsisConfigBuilder::default()
    }

    /// Builder preset for the native `OW5000` model.
    pub fn for_native_model() -> DsisConfigBuilder {
        Self::builder().model_name(NATIVE_MODEL)
    }

    /// Builder preset for the `OpenWorksCommonModel` model.
    pub fn for_common_model() -> DsisConfigBuilder {
        Self::builder().model_name(COMMON_MODEL)
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `DSIS_ENVIRONMENT` (`dev`, `qa` or `prod`)
    /// - `DSIS_TENANT_ID`, `DSIS_CLIENT_ID`, `DSIS_CLIENT_SECRET`, `DSIS_ACCESS_APP_ID`
    /// - `DSIS_USERNAME`, `DSIS_PASSWORD`
    /// - `DSIS_SUBSCRIPTION_KEY_DSAUTH`, `DSIS_SUBSCRIPTION_KEY_DSDATA`
    /// - `DSIS_MODEL_NAME`
    ///
    /// Optional:
    /// - `DSIS_MODEL_VERSION` (default: "5000107")
    /// - `DSIS_SITE` (default: "qa")
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// [`DsisConfig::from_env`] is this with `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| Error::new(ErrorKind::EnvVar(name.to_string())))
        };

        let environment: Environment = required("DSIS_ENVIRONMENT")?.parse()?;

        let mut builder = Self::builder()
            .environment(environment)
            .tenant_id(required("DSIS_TENANT_ID")?)
            .client_id(required("DSIS_CLIENT_ID")?)
            .client_secret(required("DSIS_CLIENT_SECRET")?)
            .access_app_id(required("DSIS_ACCESS_APP_ID")?)
            .dsis_username(required("DSIS_USERNAME")?)
            .dsis_password(required("DSIS_PASSWORD")?)
            .subscription_key_dsauth(required("DSIS_SUBSCRIPTION_KEY_DSAUTH")?)
            .subscription_key_dsdata(required("DSIS_SUBSCRIPTION_KEY_DSDATA")?)
            .model_name(required("DSIS_MODEL_NAME")?);

        if let Some(version) = lookup("DSIS_MODEL_VERSION") {
            builder = builder.model_version(version);
        }
        if let Some(site) = lookup("DSIS_SITE") {
            builder = builder.dsis_site(site);
        }

        builder.build()
    }

    /// Target environment.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Azure AD tenant ID.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Azure AD client/application ID.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Azure AD application ID the gateway token is requested for.
    pub fn access_app_id(&self) -> &str {
        &self.access_app_id
    }

    /// DSIS service account user name.
    pub fn dsis_username(&self) -> &str {
        &self.dsis_username
    }

    pub(crate) fn dsis_password(&self) -> &str {
        &self.dsis_password
    }

    pub(crate) fn subscription_key_dsauth(&self) -> &str {
        &self.subscription_key_dsauth
    }

    pub(crate) fn subscription_key_dsdata(&self) -> &str {
        &self.subscription_key_dsdata
    }

    /// DSIS model name, e.g. `OW5000`.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// DSIS model version.
    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// Value of the `dsis-site` header.
    pub fn dsis_site(&self) -> &str {
        &self.dsis_site
    }

    /// Gateway base URL for the environment, or the override when set.
    pub fn base_url(&self) -> &str {
        self.base_url_override
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
    }

    /// DSIS token endpoint.
    pub fn token_endpoint(&self) -> String {
        format!("{}/dsauth/v1/token", self.base_url())
    }

    /// DSIS data endpoint root.
    pub fn data_endpoint(&self) -> String {
        format!("{}/dsdata/v1", self.base_url())
    }

    /// Azure AD authority for the tenant.
    pub fn authority(&self) -> String {
        let host = self
            .authority_host_override
            .as_deref()
            .unwrap_or(DEFAULT_AUTHORITY_HOST);
        format!("{}/{}", host, self.tenant_id)
    }

    /// OAuth2 scopes requested for the gateway token.
    pub fn scope(&self) -> Vec<String> {
        vec![format!("{}/.default", self.access_app_id)]
    }
}

/// Builder for [`DsisConfig`].
#[derive(Default, Clone)]
pub struct DsisConfigBuilder {
    environment: Option<Environment>,
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    access_app_id: Option<String>,
    dsis_username: Option<String>,
    dsis_password: Option<String>,
    subscription_key_dsauth: Option<String>,
    subscription_key_dsdata: Option<String>,
    model_name: Option<String>,
    model_version: Option<String>,
    dsis_site: Option<String>,
    base_url: Option<String>,
    authority_host: Option<String>,
}

impl std::fmt::Debug for DsisConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DsisConfigBuilder")
            .field("environment", &self.environment)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("model_name", &self.model_name)
            .field("model_version", &self.model_version)
            .field("dsis_site", &self.dsis_site)
            .finish_non_exhaustive()
    }
}

impl DsisConfigBuilder {
    /// Set the target environment.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Set the Azure AD tenant ID.
    pub fn tenant_id(mut self, value: impl Into<String>) -> Self {
        self.tenant_id = Some(value.into());
        self
    }

    /// Set the Azure AD client ID.
    pub fn client_id(mut self, value: impl Into<String>) -> Self {
        self.client_id = Some(value.into());
        self
    }

    /// Set the Azure AD client secret.
    pub fn client_secret(mut self, value: impl Into<String>) -> Self {
        self.client_secret = Some(value.into());
        self
    }

    /// Set the access application ID used to build the scope.
    pub fn access_app_id(mut self, value: impl Into<String>) -> Self {
        self.access_app_id = Some(value.into());
        self
    }

    /// Set the DSIS service account user name.
    pub fn dsis_username(mut self, value: impl Into<String>) -> Self {
        self.dsis_username = Some(value.into());
        self
    }

    /// Set the DSIS service account password.
    pub fn dsis_password(mut self, value: impl Into<String>) -> Self {
        self.dsis_password = Some(value.into());
        self
    }

    /// Set the APIM subscription key for the dsauth product.
    pub fn subscription_key_dsauth(mut self, value: impl Into<String>) -> Self {
        self.subscription_key_dsauth = Some(value.into());
        self
    }

    /// Set the APIM subscription key for the dsdata product.
    pub fn subscription_key_dsdata(mut self, value: impl Into<String>) -> Self {
        self.subscription_key_dsdata = Some(value.into());
        self
    }

    /// Set the DSIS model name.
    pub fn model_name(mut self, value: impl Into<String>) -> Self {
        self.model_name = Some(value.into());
        self
    }

    /// Set the DSIS model version.
    pub fn model_version(mut self, value: impl Into<String>) -> Self {
        self.model_version = Some(value.into());
        self
    }

    /// Set the `dsis-site` header value.
    pub fn dsis_site(mut self, value: impl Into<String>) -> Self {
        self.dsis_site = Some(value.into());
        self
    }

    /// Replace the environment's gateway base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Replace the Azure AD login host.
    pub fn with_authority_host(mut self, url: impl Into<String>) -> Self {
        self.authority_host = Some(url.into());
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<DsisConfig> {
        let environment = self
            .environment
            .ok_or_else(|| Error::configuration("'environment' must be set"))?;

        Ok(DsisConfig {
            environment,
            tenant_id: required("tenant_id", self.tenant_id)?,
            client_id: required("client_id", self.client_id)?,
            client_secret: required("client_secret", self.client_secret)?,
            access_app_id: required("access_app_id", self.access_app_id)?,
            dsis_username: required("dsis_username", self.dsis_username)?,
            dsis_password: required("dsis_password", self.dsis_password)?,
            subscription_key_dsauth: required(
                "subscription_key_dsauth",
                self.subscription_key_dsauth,
            )?,
            subscription_key_dsdata: required(
                "subscription_key_dsdata",
                self.subscription_key_dsdata,
            )?,
            model_name: required("model_name", self.model_name)?,
            model_version: required(
                "model_version",
                Some(
                    self.model_version
                        .unwrap_or_else(|| DEFAULT_MODEL_VERSION.to_string()),
                ),
            )?,
            dsis_site: required(
                "dsis_site",
                Some(self.dsis_site.unwrap_or_else(|| DEFAULT_DSIS_SITE.to_string())),
            )?,
            base_url_override: self
                .base_url
                .map(|url| normalize_url("base_url", url))
                .transpose()?,
            authority_host_override: self
                .authority_host
                .map(|url| normalize_url("authority_host", url))
                .transpose()?,
        })
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::configuration(format!(
            "'{name}' must be a non-empty string"
        ))),
    }
}

fn normalize_url(name: &str, value: String) -> Result<String> {
    let parsed = url::Url::parse(&value).map_err(|e| {
        Error::with_source(
            ErrorKind::Configuration(format!("'{name}' is not a valid URL")),
            e,
        )
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::configuration(format!(
            "'{name}' must use http or https"
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}
