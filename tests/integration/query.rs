//! Query execution, pagination and typed results.

use super::common::{authenticated_get, Gateway};
use dsis_client::odata::{ErrorKind, Item};
use dsis_client::{DsisConfig, DsisModel, PageBound, QueryBuilder};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{query_param, query_param_is_missing};
use wiremock::ResponseTemplate;

const WELL_PATH: &str = "/dsdata/v1/OW5000/5000107/123/SNORRE/Well";

#[derive(Debug, Deserialize, PartialEq)]
struct Well {
    well_name: String,
    #[serde(default)]
    well_uwi: Option<String>,
}

impl DsisModel for Well {
    const MODEL_NAME: &'static str = "Well";
    const FIELD_NAMES: &'static [&'static str] = &["well_name", "well_uwi"];
}

/// Serves three pages of wells, two per page.
async fn mount_well_pages(gateway: &Gateway) {
    authenticated_get(WELL_PATH)
        .and(query_param("$format", "json"))
        .and(query_param("$select", "well_name,well_uwi"))
        .and(query_param("$filter", "well_name ne 'X'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "odata.metadata": "https://gateway/$metadata#Well",
            "value": [
                {"well_name": "34/7-A-1", "well_uwi": "NO 34/7-A-1"},
                {"well_name": "34/7-A-2"}
            ],
            "odata.nextLink": "Well?$skiptoken=2"
        })))
        .mount(&gateway.server)
        .await;

    authenticated_get(WELL_PATH)
        .and(query_param("$skiptoken", "2"))
        .and(query_param_is_missing("$select"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"well_name": "34/7-A-3"}, {"well_name": "34/7-A-4"}],
            "odata.nextLink": "Well?$skiptoken=4"
        })))
        .mount(&gateway.server)
        .await;

    authenticated_get(WELL_PATH)
        .and(query_param("$skiptoken", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "odata.metadata": "last",
            "value": [{"well_name": "34/7-A-5"}]
        })))
        .mount(&gateway.server)
        .await;
}

fn well_query() -> QueryBuilder {
    QueryBuilder::new("123", "SNORRE")
        .schema_model::<Well>()
        .select("well_name, well_uwi")
        .filter("well_name ne 'X'")
}

#[tokio::test]
async fn test_query_follows_every_page() {
    let gateway = Gateway::start().await;
    mount_well_pages(&gateway).await;
    let mut client = gateway.client();

    let result = client
        .execute_query(&well_query(), PageBound::Unbounded)
        .await
        .unwrap();

    assert_eq!(result.len(), 5);
    assert_eq!(result.pages_fetched, 3);
    assert_eq!(result.items[4]["well_name"], "34/7-A-5");
    assert_eq!(result.metadata.get("odata.metadata"), Some(&json!("last")));
    assert_eq!(gateway.hits(WELL_PATH).await, 3);
}

#[tokio::test]
async fn test_first_page_only() {
    let gateway = Gateway::start().await;
    mount_well_pages(&gateway).await;
    let mut client = gateway.client();

    let result = client
        .execute_query(&well_query(), PageBound::first_page())
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(gateway.hits(WELL_PATH).await, 1);
}

#[tokio::test]
async fn test_typed_query() {
    let gateway = Gateway::start().await;
    mount_well_pages(&gateway).await;
    let mut client = gateway.client();

    let wells: Vec<Well> = client
        .execute_query_cast(&well_query(), PageBound::pages(2).unwrap())
        .await
        .unwrap();

    assert_eq!(wells.len(), 4);
    assert_eq!(
        wells[0],
        Well {
            well_name: "34/7-A-1".into(),
            well_uwi: Some("NO 34/7-A-1".into()),
        }
    );
    assert_eq!(wells[3].well_uwi, None);
}

#[tokio::test]
async fn test_stream_matches_eager_result() {
    let gateway = Gateway::start().await;
    mount_well_pages(&gateway).await;
    let mut client = gateway.client();

    let streamed: Vec<Item> = client
        .execute_query_stream(&well_query(), PageBound::Unbounded)
        .await
        .unwrap()
        .into_stream()
        .try_collect()
        .await
        .unwrap();
    let eager = client
        .execute_query(&well_query(), PageBound::Unbounded)
        .await
        .unwrap();

    assert_eq!(streamed, eager.items);
}

#[tokio::test]
async fn test_bad_item_fails_whole_cast() {
    let gateway = Gateway::start().await;
    authenticated_get(WELL_PATH)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"well_name": "ok"}, {"well_uwi": "missing name"}]
        })))
        .mount(&gateway.server)
        .await;
    let mut client = gateway.client();

    let query = QueryBuilder::new("123", "SNORRE").schema_model::<Well>();
    let err = client
        .execute_query_cast::<Well>(&query, PageBound::Unbounded)
        .await
        .unwrap_err();

    assert!(matches!(err.kind, ErrorKind::Validation { index: 1, .. }));
}

#[tokio::test]
async fn test_common_model_path() {
    let gateway = Gateway::start().await;
    authenticated_get("/dsdata/v1/OpenWorksCommonModel/5000107/123/SNORRE/Well")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"well_name": "common"}]
        })))
        .expect(1)
        .mount(&gateway.server)
        .await;

    let config = gateway.config(DsisConfig::for_common_model());
    let mut client = dsis_client::DsisClient::new(config).unwrap();

    let result = client
        .execute_query(
            &QueryBuilder::new("123", "SNORRE").schema("Well"),
            PageBound::Unbounded,
        )
        .await
        .unwrap();
    assert_eq!(result.items[0]["well_name"], "common");
}

#[tokio::test]
async fn test_api_error_surfaces_status() {
    let gateway = Gateway::start().await;
    authenticated_get(WELL_PATH)
        .respond_with(ResponseTemplate::new(500).set_body_string("backend unavailable"))
        .mount(&gateway.server)
        .await;
    let mut client = gateway.client();

    let err = client
        .execute_query(
            &QueryBuilder::new("123", "SNORRE").schema("Well"),
            PageBound::Unbounded,
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(
        err.to_string(),
        "API request failed: 500 - Internal Server Error - backend unavailable"
    );
}
