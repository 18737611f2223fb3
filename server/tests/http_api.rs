//! HTTP API tests driving the router in-process

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::path::Path;
use tower::ServiceExt;

use objectspace_core::core::{create_app_state, Config, ConfiguredAppState, StorageType};
use objectspace_server::api::create_router;

struct TestServer {
    router: Router,
    state: ConfiguredAppState,
    _dir: tempfile::TempDir,
}

fn config(dir: &Path, storage_type: StorageType) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = dir.join("object_db");
    config.storage.storage_type = storage_type;
    config
}

fn server_with(storage_type: StorageType, customize: impl FnOnce(&mut Config)) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), storage_type);
    customize(&mut config);

    let state = create_app_state(config).unwrap();
    TestServer {
        router: create_router(&state),
        state,
        _dir: dir,
    }
}

fn server(storage_type: StorageType) -> TestServer {
    server_with(storage_type, |_| {})
}

impl TestServer {
    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, body) = self.send(request).await;
        (status, body)
    }

    async fn get_json(&self, uri: &str) -> Value {
        let (status, _, body) = self.get(uri).await;
        assert_eq!(status, StatusCode::OK, "GET {} failed: {}", uri, String::from_utf8_lossy(&body));
        serde_json::from_slice(&body).unwrap()
    }

    /// Each NDJSON line parsed on its own
    async fn get_lines(&self, uri: &str) -> Vec<Value> {
        let (status, _, body) = self.get(uri).await;
        assert_eq!(status, StatusCode::OK);
        body.split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).unwrap())
            .collect()
    }
}

fn error_message(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    assert_eq!(value["success"], json!(false));
    value["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn counter_insert_round_trip() {
    let server = server(StorageType::Counter);

    let (status, body) = server.post("/api/docs", r#"{"x":1}"#).await;
    assert_eq!(status, StatusCode::OK);
    let inserted: Value = serde_json::from_slice(&body).unwrap();
    let id = inserted["_id"].as_u64().unwrap();

    let (status, headers, body) = server.get("/api/docs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], "must-revalidate");
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");

    let listing: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listing[id.to_string()], json!({"x": 1}));
    assert_eq!(server.get_json("/").await, json!({"doc_count": 1}));
}

#[tokio::test]
async fn counter_full_listing_is_repeatable() {
    let server = server(StorageType::Counter);
    for i in 0..12 {
        server.post("/api/docs", &format!(r#"{{"i":{}}}"#, i)).await;
    }

    let (_, _, first) = server.get("/api/docs").await;
    let (_, _, second) = server.get("/api/docs").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn counter_pages_cover_listing_exactly_once() {
    let server = server(StorageType::Counter);
    for i in 0..30 {
        server.post("/api/docs", &format!(r#"{{"i":{}}}"#, i)).await;
    }
    let everything = server.get_json("/api/docs").await;

    for total in [1, 3, 8] {
        let mut union = serde_json::Map::new();
        for page in 0..total {
            let listing = server.get_json(&format!("/api/docs?page={}&total={}", page, total)).await;
            for (id, doc) in listing.as_object().unwrap() {
                assert!(union.insert(id.clone(), doc.clone()).is_none(), "{} on two pages", id);
            }
        }
        assert_eq!(Value::Object(union), everything, "total={}", total);
    }
}

#[tokio::test]
async fn counter_pagination_rejects_bad_parameters() {
    let server = server(StorageType::Counter);

    let cases = [
        ("page=-1&total=5", "Invalid page number '-1'."),
        ("page=5&total=5", "Invalid page number '5'."),
        ("page=0&total=0", "Invalid total page number '0'."),
        ("page=0&total=abc", "Invalid total page number 'abc'."),
        ("total=5", "Please pass POST/PUT/GET parameter value of 'page'."),
        ("page=1", "Please pass POST/PUT/GET parameter value of 'total'."),
        ("page=&total=5", "Please pass POST/PUT/GET parameter value of 'page'."),
    ];

    for (query, expected) in cases {
        let (status, _, body) = server.get(&format!("/api/docs?{}", query)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "query {}", query);
        assert_eq!(error_message(&body), expected, "query {}", query);
    }
}

#[tokio::test]
async fn malformed_insert_is_rejected_and_not_persisted() {
    let server = server(StorageType::Counter);

    for body in ["{not json", "", "[1,2]", "\"text\""] {
        let (status, response) = server.post("/api/docs", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
        assert!(error_message(&response).starts_with("Malformed request body"));
    }

    assert_eq!(server.get_json("/api/docs").await, json!({}));
    assert_eq!(server.get_json("/").await, json!({"doc_count": 0}));
}

#[tokio::test]
async fn keyed_insert_upserts_and_filters_by_string() {
    let server = server(StorageType::Keyed);

    let (status, body) = server.post("/api/docs", r#"{"uuid":"a","x":"1"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    server.post("/api/docs", r#"{"uuid":"a","x":"2"}"#).await;

    assert_eq!(
        server.get_lines("/api/docs?x=2").await,
        vec![json!({"a": {"uuid": "a", "x": "2"}})]
    );
    assert!(server.get_lines("/api/docs?x=1").await.is_empty());
    assert_eq!(server.get_lines("/api/docs").await.len(), 1);
}

#[tokio::test]
async fn keyed_filter_is_type_sensitive() {
    let server = server(StorageType::Keyed);
    server.post("/api/docs", r#"{"uuid":"b","n":5}"#).await;
    server.post("/api/docs", r#"{"uuid":"c","n":"5"}"#).await;

    let matches = server.get_lines("/api/docs?n=5").await;
    assert_eq!(matches, vec![json!({"c": {"uuid": "c", "n": "5"}})]);
}

#[tokio::test]
async fn keyed_filter_requires_every_pair() {
    let server = server(StorageType::Keyed);
    server.post("/api/docs", r#"{"uuid":"a","color":"red","size":"s"}"#).await;
    server.post("/api/docs", r#"{"uuid":"b","color":"red","size":"l"}"#).await;

    let (_, headers, _) = server.get("/api/docs?color=red").await;
    assert_eq!(headers[header::CACHE_CONTROL], "must-revalidate");

    assert_eq!(server.get_lines("/api/docs?color=red").await.len(), 2);
    let both = server.get_lines("/api/docs?color=red&size=l").await;
    assert_eq!(both, vec![json!({"b": {"uuid": "b", "color": "red", "size": "l"}})]);
}

#[tokio::test]
async fn keyed_insert_without_uuid_is_bad_request() {
    let server = server(StorageType::Keyed);

    let (status, body) = server.post("/api/docs", r#"{"x":"1"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("uuid"));

    let (status, _) = server.post("/api/docs", r#"{"uuid":7}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(server.get_lines("/api/docs").await.is_empty());
}

#[tokio::test]
async fn keyed_root_reports_bucket_size() {
    let server = server(StorageType::Keyed);
    server.post("/api/docs", r#"{"uuid":"a"}"#).await;
    server.post("/api/docs", r#"{"uuid":"b"}"#).await;

    let root = server.get_json("/").await;
    assert_eq!(root["size"]["key_count"], json!(2));
    assert!(root["size"]["stored_bytes"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn system_routes() {
    let server = server(StorageType::Counter);

    let health = server.get_json("/health").await;
    assert_eq!(health["status"], json!("healthy"));
    assert_eq!(health["version"], json!(objectspace_core::VERSION));

    server.post("/api/docs", r#"{"x":1}"#).await;
    let (status, _, body) = server.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("objectspace_documents_inserted_total"));

    let quiet = server_with(StorageType::Counter, |config| {
        config.metrics.enable_prometheus = false;
    });
    let (status, _, _) = quiet.get("/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn document_route_is_configurable() {
    let server = server_with(StorageType::Counter, |config| {
        config.server.doc_route = "/objects".to_string();
    });

    let (status, _) = server.post("/objects", r#"{"x":1}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.get_json("/objects").await, json!({"1": {"x": 1}}));

    let (status, _, _) = server.get("/api/docs").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn counter_pagination_accepts_totals_beyond_32_bits() {
    let server = server(StorageType::Counter);
    server.post("/api/docs", r#"{"x":1}"#).await;

    let first = server.get_json("/api/docs?page=0&total=4294967296").await;
    let last = server.get_json("/api/docs?page=4294967295&total=4294967296").await;
    assert!(first.is_object());
    assert!(last.is_object());
}

#[tokio::test]
async fn keyed_listing_on_closed_store_is_server_error() {
    let server = server(StorageType::Keyed);
    server.post("/api/docs", r#"{"uuid":"a"}"#).await;
    server.state.close().unwrap();

    for uri in ["/api/docs", "/api/docs?uuid=a"] {
        let (status, _, body) = server.get(uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "GET {}", uri);
        assert_eq!(error_message(&body), "Store handle is closed");
    }
}

#[tokio::test]
async fn counter_listing_on_closed_store_is_server_error() {
    let server = server(StorageType::Counter);
    server.state.close().unwrap();

    let (status, _, body) = server.get("/api/docs").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(&body), "Store handle is closed");
}
