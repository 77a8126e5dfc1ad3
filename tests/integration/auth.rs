//! Token acquisition, caching and refresh against the mock gateway.

use super::common::{authenticated_get, Gateway, AAD_TOKEN_PATH, DSIS_TOKEN_PATH};
use dsis_client::odata::ErrorKind;
use dsis_client::ODataRequest;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

const BASIN_PATH: &str = "/dsdata/v1/OW5000/5000107/123/SNORRE/Basin";

fn basin_request() -> ODataRequest {
    ODataRequest::new()
        .district_id("123")
        .field("SNORRE")
        .data_table("Basin")
}

#[tokio::test]
async fn test_data_request_carries_both_tokens() {
    let gateway = Gateway::start().await;
    authenticated_get(BASIN_PATH)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"basin_name": "North Sea"}]
        })))
        .expect(1)
        .mount(&gateway.server)
        .await;

    let mut client = gateway.client();
    let body = client.get_odata(&basin_request()).await.unwrap();

    assert_eq!(body["value"][0]["basin_name"], "North Sea");
}

#[tokio::test]
async fn test_tokens_are_cached_between_requests() {
    let gateway = Gateway::start().await;
    authenticated_get(BASIN_PATH)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&gateway.server)
        .await;

    let mut client = gateway.client();
    for _ in 0..3 {
        client.get_odata(&basin_request()).await.unwrap();
    }

    assert_eq!(gateway.hits(BASIN_PATH).await, 3);
    assert_eq!(gateway.hits(AAD_TOKEN_PATH).await, 1);
    assert_eq!(gateway.hits(DSIS_TOKEN_PATH).await, 1);
}

#[tokio::test]
async fn test_refresh_after_unauthorized() {
    let gateway = Gateway::start().await;
    authenticated_get(BASIN_PATH)
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .up_to_n_times(1)
        .mount(&gateway.server)
        .await;
    authenticated_get(BASIN_PATH)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [1]})))
        .mount(&gateway.server)
        .await;

    let mut client = gateway.client();

    let err = client.get_odata(&basin_request()).await.unwrap_err();
    assert!(err.is_unauthorized());

    client.refresh_authentication().await.unwrap();
    let body = client.get_odata(&basin_request()).await.unwrap();
    assert_eq!(body["value"][0], 1);

    assert_eq!(gateway.hits(AAD_TOKEN_PATH).await, 2);
    assert_eq!(gateway.hits(DSIS_TOKEN_PATH).await, 2);
}

#[tokio::test]
async fn test_dsis_token_failure_is_sanitized() {
    let gateway = Gateway::without_tokens().await;
    gateway.mount_aad_token().await;
    Mock::given(method("POST"))
        .and(path(DSIS_TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string("access denied for Bearer leaked-token-value"),
        )
        .mount(&gateway.server)
        .await;

    let mut client = gateway.client();
    let err = client.get_odata(&basin_request()).await.unwrap_err();

    assert!(matches!(err.kind, ErrorKind::Authentication(_)));
    let message = err.to_string();
    assert!(message.contains("Failed to acquire DSIS token: 403 - Forbidden"));
    assert!(message.contains("Bearer [REDACTED]"));
    assert!(!message.contains("leaked-token-value"));
    assert_eq!(gateway.hits(BASIN_PATH).await, 0);
}

#[tokio::test]
async fn test_azure_ad_failure_reports_description() {
    let gateway = Gateway::without_tokens().await;
    Mock::given(method("POST"))
        .and(path(AAD_TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&gateway.server)
        .await;

    let mut client = gateway.client();
    let err = client.get_odata(&basin_request()).await.unwrap_err();

    assert!(matches!(err.kind, ErrorKind::Authentication(_)));
    assert!(err
        .to_string()
        .contains("Failed to acquire Azure AD token: AADSTS7000215"));
    assert_eq!(gateway.hits(DSIS_TOKEN_PATH).await, 0);
    assert!(!client.test_connection().await);
}

#[tokio::test]
async fn test_connection_accepts_not_found() {
    let gateway = Gateway::start().await;
    authenticated_get("/dsdata/v1")
        .respond_with(ResponseTemplate::new(404))
        .mount(&gateway.server)
        .await;

    let mut client = gateway.client();
    assert!(client.test_connection().await);
}
