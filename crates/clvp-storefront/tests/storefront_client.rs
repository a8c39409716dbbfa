//! Integration tests for `StorefrontClient::fetch_page`.
//!
//! Each test stands up a local `wiremock` server so no real storefront is
//! contacted. Covers the happy path, every status mapping and the retry
//! policy for transient failures.

use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clvp_storefront::{StorefrontClient, StorefrontError};

/// Builds a `StorefrontClient` for tests: 5-second timeout, no retries.
fn test_client() -> StorefrontClient {
    StorefrontClient::new(5, "clvp-test/0.1", 0, 0).expect("failed to build test StorefrontClient")
}

/// Builds a `StorefrontClient` with retries and a 1ms backoff base.
fn test_client_with_retries(max_retries: u32) -> StorefrontClient {
    StorefrontClient::new(5, "clvp-test/0.1", max_retries, 1)
        .expect("failed to build test StorefrontClient")
}

fn page_url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{route}", server.uri())).expect("valid mock url")
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_page_returns_body_and_sends_browser_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/blue-s"))
        .and(query_param("variant", "102"))
        .and(header("user-agent", "clvp-test/0.1"))
        .and(header("referer", server.uri().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let body = test_client()
        .fetch_page(&page_url(&server, "/products/blue-s?variant=102"))
        .await
        .expect("fetch should succeed");

    assert!(body.contains("ok"), "unexpected body: {body}");
}

// ---------------------------------------------------------------------------
// Status mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_page_maps_404_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_client()
        .fetch_page(&page_url(&server, "/products/gone"))
        .await;

    match result {
        Err(StorefrontError::NotFound { url }) => assert!(url.ends_with("/products/gone")),
        other => panic!("expected NotFound, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_page_maps_418_to_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(418))
        .mount(&server)
        .await;

    let result = test_client()
        .fetch_page(&page_url(&server, "/products/teapot"))
        .await;

    assert!(
        matches!(result, Err(StorefrontError::UnexpectedStatus { status: 418, .. })),
        "expected UnexpectedStatus(418), got: {result:?}"
    );
}

#[tokio::test]
async fn fetch_page_maps_429_to_rate_limited_with_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let result = test_client()
        .fetch_page(&page_url(&server, "/products/red-s"))
        .await;

    match result {
        Err(StorefrontError::RateLimited {
            domain,
            retry_after_secs,
        }) => {
            assert_eq!(domain, "127.0.0.1");
            assert_eq!(retry_after_secs, 7);
        }
        other => panic!("expected RateLimited, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Retries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_page_retries_rate_limit_until_budget_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let result = test_client_with_retries(1)
        .fetch_page(&page_url(&server, "/products/red-s"))
        .await;

    assert!(
        matches!(result, Err(StorefrontError::RateLimited { .. })),
        "expected RateLimited after retries, got: {result:?}"
    );
}

#[tokio::test]
async fn fetch_page_recovers_from_transient_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/red-s"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/red-s"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>back</body></html>"))
        .mount(&server)
        .await;

    let body = test_client_with_retries(2)
        .fetch_page(&page_url(&server, "/products/red-s"))
        .await
        .expect("retry should recover");

    assert!(body.contains("back"));
}

#[tokio::test]
async fn fetch_page_does_not_retry_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_client_with_retries(3)
        .fetch_page(&page_url(&server, "/products/gone"))
        .await;

    assert!(matches!(result, Err(StorefrontError::NotFound { .. })));
}
