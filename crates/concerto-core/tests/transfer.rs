//! Integration tests for file downloads and streamed uploads.

use concerto_core::{AuthMode, Error, FileName, ServiceClient, SessionConfig};
use reqwest::StatusCode;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> ServiceClient {
    let config = SessionConfig::new(server.uri()).with_brownfield_token("bf-token");
    ServiceClient::new(&config, AuthMode::Brownfield).unwrap()
}

#[tokio::test]
async fn download_discovers_file_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audit/reports/r1/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-disposition", r#"attachment; filename="report.csv""#)
                .set_body_string("id,name\n1,web\n"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();

    let client = test_client(&server);
    let downloaded = client
        .get_file("/audit/reports/r1/download", &out, FileName::Discover)
        .await
        .unwrap();

    assert_eq!(downloaded.path, out.join("report.csv"));
    assert_eq!(downloaded.status, StatusCode::OK);
    assert_eq!(downloaded.bytes, 14);
    let contents = fs::read_to_string(&downloaded.path).unwrap();
    assert_eq!(contents, "id,name\n1,web\n");
}

#[tokio::test]
async fn download_verbatim_uses_destination_as_given() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blueprint/attachments/a1/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-disposition", r#"attachment; filename="ignored.bin""#)
                .set_body_bytes(b"\x00\x01\x02".to_vec()),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("payload.bin");

    let client = test_client(&server);
    let downloaded = client
        .get_file("/blueprint/attachments/a1/download", &target, FileName::Verbatim)
        .await
        .unwrap();

    assert_eq!(downloaded.path, target);
    assert_eq!(fs::read(&target).unwrap(), vec![0, 1, 2]);
    assert!(!dir.path().join("ignored.bin").exists());
}

#[tokio::test]
async fn download_failure_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Not found"})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("file.bin");

    let client = test_client(&server);
    let err = client
        .get_file("/blueprint/attachments/missing/download", &target, FileName::Verbatim)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(!target.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn download_without_disposition_cannot_discover() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("data"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server);
    let err = client
        .get_file("/files/f1", dir.path(), FileName::Discover)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)));
}

#[tokio::test]
async fn download_create_failure_reports_resolved_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-disposition", r#"attachment; filename="report.csv""#)
                .set_body_string("data"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let missing_dir = dir.path().join("does-not-exist");

    let client = test_client(&server);
    let err = client
        .get_file("/files/f1", &missing_dir, FileName::Discover)
        .await
        .unwrap_err();

    match err {
        Error::Io { path, .. } => assert_eq!(path, missing_dir.join("report.csv")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn download_accepts_absolute_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bucket/cookbook.tgz"))
        .respond_with(ResponseTemplate::new(200).set_body_string("tarball"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("cookbook.tgz");

    let client = test_client(&server);
    client
        .get_file(
            &format!("{}/bucket/cookbook.tgz", server.uri()),
            &target,
            FileName::Verbatim,
        )
        .await
        .unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "tarball");
}

#[tokio::test]
async fn upload_of_missing_file_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.tgz");

    let client = test_client(&server);
    let err = client
        .put_file(&missing, &format!("{}/upload/u1", server.uri()))
        .await
        .unwrap_err();

    match err {
        Error::Io { path, .. } => assert_eq!(path, missing),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn upload_streams_file_contents() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/upload/u1"))
        .and(header("content-length", "11"))
        .and(body_bytes(b"hello world".to_vec()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let source = dir.path().join("script.sh");
    fs::write(&source, "hello world").unwrap();

    let client = test_client(&server);
    let status = client
        .put_file(&source, &format!("{}/upload/u1", server.uri()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn upload_to_foreign_origin() {
    let api = MockServer::start().await;
    let storage = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/presigned/object"))
        .and(body_bytes(b"blob".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&storage)
        .await;

    let dir = TempDir::new().unwrap();
    let source = dir.path().join("blob.bin");
    fs::write(&source, "blob").unwrap();

    let client = test_client(&api);
    let status = client
        .put_file(&source, &format!("{}/presigned/object", storage.uri()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let requests = storage.received_requests().await.unwrap();
    assert!(requests[0]
        .headers
        .get("x-concerto-brownfield-token")
        .is_none());
}

#[tokio::test]
async fn upload_failure_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403).set_body_string("SignatureDoesNotMatch"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let source = dir.path().join("blob.bin");
    fs::write(&source, "blob").unwrap();

    let client = test_client(&server);
    let err = client
        .put_file(&source, &format!("{}/upload/u1", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::HttpFailure {
            status: 403,
            message: "SignatureDoesNotMatch".to_string()
        }
    );
}
