//! Bulk data retrieval.

use super::common::{authenticated_get, Gateway};
use dsis_client::odata::{ACCEPT_OCTET_STREAM, DEFAULT_CHUNK_SIZE};
use dsis_client::QueryBuilder;
use futures::TryStreamExt;
use wiremock::matchers::header;
use wiremock::ResponseTemplate;

const CURVE_PATH: &str = "/dsdata/v1/OW5000/5000107/123/SNORRE/LogCurve('46075')/data";

fn curve_query(uid: &str) -> QueryBuilder {
    QueryBuilder::new("123", "SNORRE")
        .schema("LogCurve")
        .entity_uid(uid)
        .unwrap()
}

fn payload() -> Vec<u8> {
    (0..=255u8).cycle().take(4096).collect()
}

#[tokio::test]
async fn test_bulk_data_whole() {
    let gateway = Gateway::start().await;
    authenticated_get(CURVE_PATH)
        .and(header("Accept", ACCEPT_OCTET_STREAM))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload()))
        .mount(&gateway.server)
        .await;
    let mut client = gateway.client();

    let data = client
        .get_bulk_data(&curve_query("46075"), ACCEPT_OCTET_STREAM)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(data.as_ref(), payload().as_slice());
}

#[tokio::test]
async fn test_bulk_data_streamed() {
    let gateway = Gateway::start().await;
    authenticated_get(CURVE_PATH)
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload()))
        .mount(&gateway.server)
        .await;
    let mut client = gateway.client();

    let stream = client
        .get_bulk_data_stream(&curve_query("46075"), 1000, ACCEPT_OCTET_STREAM)
        .await
        .unwrap();
    let chunks: Vec<_> = stream.into_stream().try_collect().await.unwrap();

    assert!(chunks.iter().all(|c| c.len() <= 1000));
    let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
    assert_eq!(joined, payload());
}

#[tokio::test]
async fn test_missing_bulk_data() {
    let gateway = Gateway::start().await;
    let mut client = gateway.client();

    let data = client
        .get_bulk_data(&curve_query("404"), ACCEPT_OCTET_STREAM)
        .await
        .unwrap();
    assert!(data.is_none());

    let mut stream = client
        .get_bulk_data_stream(&curve_query("404"), DEFAULT_CHUNK_SIZE, ACCEPT_OCTET_STREAM)
        .await
        .unwrap();
    assert!(stream.next_chunk().await.unwrap().is_none());
}

#[tokio::test]
async fn test_bulk_data_requires_entity() {
    let gateway = Gateway::start().await;
    let mut client = gateway.client();

    let err = client
        .get_bulk_data(
            &QueryBuilder::new("123", "SNORRE").schema("LogCurve"),
            ACCEPT_OCTET_STREAM,
        )
        .await
        .unwrap_err();

    assert!(err.is_invalid_query());
    assert!(err.to_string().contains("Query must target an entity"));
}
