use dsis_client::auth::DsisConfigBuilder;
use dsis_client::{DsisClient, DsisConfig, Environment};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const TENANT: &str = "tenant-id";
pub const CLIENT_ID: &str = "client-id";
pub const ACCESS_APP: &str = "access-app";
pub const USERNAME: &str = "svc-user";
pub const AUTH_KEY: &str = "auth-subscription-key";
pub const DATA_KEY: &str = "data-subscription-key";
pub const GATEWAY_TOKEN: &str = "aad-access-token";
pub const BACKEND_TOKEN: &str = "dsis-backend-token";

pub const AAD_TOKEN_PATH: &str = "/tenant-id/oauth2/v2.0/token";
pub const DSIS_TOKEN_PATH: &str = "/dsauth/v1/token";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Mock DSIS gateway with both token endpoints.
pub struct Gateway {
    pub server: MockServer,
}

impl Gateway {
    /// Gateway whose token endpoints accept the test credentials.
    pub async fn start() -> Self {
        let gateway = Self::without_tokens().await;
        gateway.mount_aad_token().await;
        gateway.mount_dsis_token().await;
        gateway
    }

    /// Gateway with no token endpoints mounted.
    pub async fn without_tokens() -> Self {
        init_tracing();
        Self {
            server: MockServer::start().await,
        }
    }

    pub async fn mount_aad_token(&self) {
        Mock::given(method("POST"))
            .and(path(AAD_TOKEN_PATH))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client-id"))
            .and(body_string_contains("scope=access-app%2F.default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "access_token": GATEWAY_TOKEN
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_dsis_token(&self) {
        Mock::given(method("POST"))
            .and(path(DSIS_TOKEN_PATH))
            .and(header("Authorization", format!("Bearer {GATEWAY_TOKEN}").as_str()))
            .and(header("Ocp-Apim-Subscription-Key", AUTH_KEY))
            .and(header("dsis-site", "qa"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("client_id=dsis-data"))
            .and(body_string_contains("username=svc-user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": BACKEND_TOKEN
            })))
            .mount(&self.server)
            .await;
    }

    /// Point a config builder at this gateway and fill in the credentials.
    pub fn config(&self, builder: DsisConfigBuilder) -> DsisConfig {
        builder
            .environment(Environment::Dev)
            .tenant_id(TENANT)
            .client_id(CLIENT_ID)
            .client_secret("client-secret")
            .access_app_id(ACCESS_APP)
            .dsis_username(USERNAME)
            .dsis_password("svc-password")
            .subscription_key_dsauth(AUTH_KEY)
            .subscription_key_dsdata(DATA_KEY)
            .with_base_url(self.server.uri())
            .with_authority_host(self.server.uri())
            .build()
            .expect("test config should be valid")
    }

    /// Client for the native model.
    pub fn client(&self) -> DsisClient {
        DsisClient::new(self.config(DsisConfig::for_native_model()))
            .expect("client should build")
    }

    /// Number of requests received on `request_path`.
    pub async fn hits(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }
}

/// GET on `request_path` carrying the full DSIS header set.
pub fn authenticated_get(request_path: &str) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path(request_path))
        .and(header("Authorization", format!("Bearer {GATEWAY_TOKEN}").as_str()))
        .and(header("Ocp-Apim-Subscription-Key", DATA_KEY))
        .and(header("dsis-site", "qa"))
        .and(header("dsis-token", BACKEND_TOKEN))
}
