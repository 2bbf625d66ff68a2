//! HTTP mapping tests for the REST provider.
//!
//! These run the real `RestSearchProvider` against a local mock server.

use serde_json::json;
use skillset_sync_repository::{RestSearchProvider, SearchServiceProvider, ServiceConfig, SyncError};
use skillset_sync_shared::{
    DataContainer, DataSourceConnection, DataSourceType, ExecutionStatus, FieldType, IndexSchema,
    ResourceDescriptor, ResourceKind, SearchField,
};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-admin-key";

fn provider(server: &MockServer) -> RestSearchProvider {
    let config = ServiceConfig::new(&server.uri(), KEY).unwrap();
    RestSearchProvider::new(config).unwrap()
}

fn index() -> IndexSchema {
    IndexSchema::new(
        "demoindex",
        vec![SearchField::key("id"), SearchField::searchable("content", FieldType::STRING)],
    )
}

fn service_error(code: &str, message: &str) -> serde_json::Value {
    json!({ "error": { "code": code, "message": message } })
}

#[tokio::test]
async fn test_get_sends_key_and_request_id() {
    let server = MockServer::start().await;
    let mut record = serde_json::to_value(index()).unwrap();
    record["@odata.etag"] = json!("\"0x8DC\"");
    record["scoringProfiles"] = json!([]);

    Mock::given(method("GET"))
        .and(path("/indexes/demoindex"))
        .and(query_param("api-version", "2024-07-01"))
        .and(header("api-key", KEY))
        .and(header_exists("client-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record))
        .expect(1)
        .mount(&server)
        .await;

    let live = provider(&server)
        .get(ResourceKind::IndexSchema, "demoindex")
        .await
        .unwrap();

    assert_eq!(live, Some(ResourceDescriptor::IndexSchema(index())));
}

#[tokio::test]
async fn test_get_missing_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/datasources/demodata"))
        .respond_with(ResponseTemplate::new(404).set_body_json(service_error(
            "ResourceNameNotFound",
            "No data source with the name 'demodata' was found",
        )))
        .mount(&server)
        .await;

    let live = provider(&server)
        .get(ResourceKind::DataSource, "demodata")
        .await
        .unwrap();
    assert!(live.is_none());
}

#[tokio::test]
async fn test_put_sends_whole_payload() {
    let server = MockServer::start().await;
    let descriptor: ResourceDescriptor = DataSourceConnection::new(
        "demodata",
        DataSourceType::AzureBlob,
        "AccountKey=secret",
        DataContainer::new("cog-search-demo"),
    )
    .into();

    let mut echoed = descriptor.to_json().unwrap();
    echoed["credentials"]["connectionString"] = json!(null);

    Mock::given(method("PUT"))
        .and(path("/datasources/demodata"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "name": "demodata",
            "type": "azureblob",
            "credentials": { "connectionString": "AccountKey=secret" },
            "container": { "name": "cog-search-demo" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(echoed))
        .expect(1)
        .mount(&server)
        .await;

    let stored = provider(&server).create_or_update(&descriptor).await.unwrap();
    assert!(descriptor.is_satisfied_by(&stored));
}

#[tokio::test]
async fn test_put_without_body_returns_descriptor() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/indexes/demoindex"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let descriptor: ResourceDescriptor = index().into();
    let stored = provider(&server).create_or_update(&descriptor).await.unwrap();
    assert_eq!(stored, descriptor);
}

#[tokio::test]
async fn test_bad_request_is_rejection_with_diagnostic() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/indexes/demoindex"))
        .respond_with(ResponseTemplate::new(400).set_body_json(service_error(
            "InvalidRequestParameter",
            "The field 'content' has an unknown analyzer 'xx.microsoft'",
        )))
        .mount(&server)
        .await;

    let err = provider(&server)
        .create_or_update(&index().into())
        .await
        .unwrap_err();

    match err {
        SyncError::ValidationRejected { resource, message } => {
            assert_eq!(resource, "index 'demoindex'");
            assert!(message.contains("unknown analyzer"));
            assert!(message.contains("InvalidRequestParameter"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_status_code_mapping() {
    let cases = [
        (401, "NotAuthorized"),
        (403, "NotAuthorized"),
        (408, "RemoteUnavailable"),
        (409, "RemoteUnavailable"),
        (429, "RemoteUnavailable"),
        (500, "RemoteUnavailable"),
        (503, "RemoteUnavailable"),
        (412, "ValidationRejected"),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/skillsets/demoskillset"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .get(ResourceKind::EnrichmentPipeline, "demoskillset")
            .await
            .unwrap_err();

        let actual = match err {
            SyncError::NotAuthorized { .. } => "NotAuthorized",
            SyncError::RemoteUnavailable { .. } => "RemoteUnavailable",
            SyncError::ValidationRejected { .. } => "ValidationRejected",
            _ => "other",
        };
        assert_eq!(actual, expected, "status={}", status);
    }
}

#[tokio::test]
async fn test_unreachable_service_is_unavailable() {
    // Nothing listens on port 1.
    let config = ServiceConfig::new("http://127.0.0.1:1", KEY).unwrap();
    let err = RestSearchProvider::new(config).unwrap().ping().await.unwrap_err();
    assert!(err.is_transient(), "err={:?}", err);
}

#[tokio::test]
async fn test_delete_tolerates_missing() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/indexers/demoindexer"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server)
        .delete(ResourceKind::Indexer, "demoindexer")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_status_document_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexers/demoindexer/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@odata.context": "https://demo.search.windows.net/$metadata#Microsoft.Azure.Search.V2019_05_06.IndexerExecutionInfo",
            "status": "running",
            "lastResult": {
                "status": "success",
                "errorMessage": null,
                "startTime": "2024-05-01T10:00:00Z",
                "endTime": "2024-05-01T10:01:00Z",
                "errors": [],
                "warnings": [],
                "itemsProcessed": 14,
                "itemsFailed": 0
            },
            "executionHistory": [],
            "limits": { "maxRunTime": "PT2H" }
        })))
        .mount(&server)
        .await;

    let report = provider(&server)
        .get_execution_report("demoindexer")
        .await
        .unwrap();
    assert_eq!(report.status, ExecutionStatus::Success);
    assert_eq!(report.last_result.map(|r| r.items_processed), Some(14));
}

#[tokio::test]
async fn test_unrecognized_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexers/demoindexer/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "hibernating" })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .get_execution_report("demoindexer")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::UnrecognizedStatus(_)));
}

#[tokio::test]
async fn test_run_and_reset_post() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexers/demoindexer/run"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexers/demoindexer/reset"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    provider.reset_indexer("demoindexer").await.unwrap();
    provider.run_indexer("demoindexer").await.unwrap();
}

#[tokio::test]
async fn test_ping_hits_service_statistics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/servicestats"))
        .and(header("api-key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "counters": {} })))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server).ping().await.unwrap();
}
