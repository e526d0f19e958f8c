//! Integration tests for download routing using wiremock
//!
//! One mock server stands in for both the metadata service and the
//! object-storage endpoint; the storage base URL is injected so storage
//! URL shapes resolve to the mock.

use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use instance_init::backoff::Backoff;
use instance_init::download;
use instance_init::metadata::MetadataClient;

const TOKEN_BODY: &str =
    r#"{"access_token":"test-token","expires_in":3599,"token_type":"Bearer"}"#;

fn fast_policy() -> Backoff {
    Backoff::new(2, Duration::from_millis(1), Duration::from_millis(2))
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/instance/service-accounts/default/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TOKEN_BODY))
        .mount(server)
        .await;
}

/// A gs:// URL is fetched with service account credentials
#[tokio::test]
async fn test_storage_url_authenticated_download() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path("/my-bucket/scripts/boot.sh"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#!/bin/sh\necho from-storage\n"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("boot.sh");
    let metadata = MetadataClient::with_base_url(&server.uri());

    let mechanism = download::fetch_to_file(
        "gs://my-bucket/scripts/boot.sh",
        &dest,
        &metadata,
        &server.uri(),
        &fast_policy(),
    )
    .await
    .unwrap();

    assert_eq!(mechanism, "authenticated storage download");
    let content = tokio::fs::read_to_string(&dest).await.unwrap();
    assert!(content.contains("from-storage"));
}

/// When no token is available the public URL is fetched without credentials
#[tokio::test]
async fn test_storage_url_falls_back_without_token() {
    let server = MockServer::start().await;

    // Token endpoint is broken (e.g. no service account on the instance)
    Mock::given(method("GET"))
        .and(path("/instance/service-accounts/default/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/my-bucket/boot.sh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("echo public\n"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("boot.sh");
    let metadata = MetadataClient::with_base_url(&server.uri());

    let mechanism = download::fetch_to_file(
        "gs://my-bucket/boot.sh",
        &dest,
        &metadata,
        &server.uri(),
        &fast_policy(),
    )
    .await
    .unwrap();

    assert_eq!(mechanism, "unauthenticated download");
    let content = tokio::fs::read_to_string(&dest).await.unwrap();
    assert_eq!(content, "echo public\n");
}

/// A 403 on the authenticated path still reaches a public object
#[tokio::test]
async fn test_storage_url_falls_back_on_forbidden() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    // Authenticated requests are rejected...
    Mock::given(method("GET"))
        .and(path("/my-bucket/boot.sh"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    // ...but the anonymous fetch of the same object succeeds
    Mock::given(method("GET"))
        .and(path("/my-bucket/boot.sh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("echo anonymous\n"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("boot.sh");
    let metadata = MetadataClient::with_base_url(&server.uri());

    let mechanism = download::fetch_to_file(
        "gs://my-bucket/boot.sh",
        &dest,
        &metadata,
        &server.uri(),
        &fast_policy(),
    )
    .await
    .unwrap();

    assert_eq!(mechanism, "unauthenticated download");
}

/// Non-storage URLs skip authentication entirely
#[tokio::test]
async fn test_plain_url_download() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scripts/setup.sh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("echo plain\n"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("setup.sh");
    let metadata = MetadataClient::with_base_url(&server.uri());

    let url = format!("{}/scripts/setup.sh", server.uri());
    let mechanism = download::fetch_to_file(
        &url,
        &dest,
        &metadata,
        &server.uri(),
        &fast_policy(),
    )
    .await
    .unwrap();

    assert_eq!(mechanism, "unauthenticated download");
}

/// Transient failures are retried before falling back
#[tokio::test]
async fn test_plain_url_retries_transient_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky.sh"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky.sh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("echo recovered\n"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("flaky.sh");
    let metadata = MetadataClient::with_base_url(&server.uri());

    let url = format!("{}/flaky.sh", server.uri());
    download::fetch_to_file(&url, &dest, &metadata, &server.uri(), &fast_policy())
        .await
        .unwrap();

    let content = tokio::fs::read_to_string(&dest).await.unwrap();
    assert_eq!(content, "echo recovered\n");
}

/// When every mechanism fails the last error is surfaced
#[tokio::test]
async fn test_download_exhaustion_is_an_error() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path("/my-bucket/missing.sh"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("missing.sh");
    let metadata = MetadataClient::with_base_url(&server.uri());

    let result = download::fetch_to_file(
        "gs://my-bucket/missing.sh",
        &dest,
        &metadata,
        &server.uri(),
        &fast_policy(),
    )
    .await;

    assert!(result.is_err());
}
