use crate::{millis, polite_fetcher, test_config, transport, IDENTITY};
use hearth_crawl::crawler::{FetchOptions, RateLimitedFetcher, TransportError};
use hearth_crawl::FetchError;
use std::time::Instant;
use wiremock::matchers::{header, headers, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_returns_page() {
    let mock_server = MockServer::start().await;
    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;

    Mock::given(method("GET"))
        .and(path("/homes/austin-tx/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>listings</body></html>", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config();
    let (fetcher, options) = polite_fetcher(&config);
    let url = format!("{}/homes/austin-tx/", mock_server.uri());

    let response = fetcher.fetch(&url, IDENTITY, &options).await.unwrap();
    assert_eq!(response.status, 200);
    assert!(response.text().contains("listings"));
    assert!(response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("text/html")));
}

#[tokio::test]
async fn test_requests_carry_identity_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .and(header("user-agent", IDENTITY))
        .and(headers("accept-language", vec!["en-US", "en;q=0.9"]))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow:"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", IDENTITY))
        .and(headers("accept-language", vec!["en-US", "en;q=0.9"]))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config();
    let (fetcher, options) = polite_fetcher(&config);
    let response = fetcher
        .fetch(&format!("{}/page", mock_server.uri()), IDENTITY, &options)
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_disallowed_page_is_never_requested() {
    let mock_server = MockServer::start().await;
    mount_robots(&mock_server, "User-agent: *\nDisallow: /private/\nAllow: /").await;

    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = test_config();
    let (fetcher, options) = polite_fetcher(&config);
    let url = format!("{}/private/secret", mock_server.uri());

    let err = fetcher.fetch(&url, IDENTITY, &options).await.unwrap_err();
    assert!(matches!(err, FetchError::Disallowed { .. }));
}

#[tokio::test]
async fn test_named_group_overrides_wildcard() {
    let mock_server = MockServer::start().await;
    mount_robots(
        &mock_server,
        "User-agent: *\nDisallow: /\n\nUser-agent: TestBot\nAllow: /listings/\nDisallow: /",
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/listings/123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config();
    let (fetcher, options) = polite_fetcher(&config);
    let base = mock_server.uri();

    assert!(fetcher
        .fetch(&format!("{}/listings/123", base), IDENTITY, &options)
        .await
        .is_ok());
    assert!(matches!(
        fetcher
            .fetch(&format!("{}/search", base), IDENTITY, &options)
            .await,
        Err(FetchError::Disallowed { .. })
    ));
}

#[tokio::test]
async fn test_ignore_robots_txt_fetches_disallowed_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config();
    let (fetcher, options) = polite_fetcher(&config);
    let options = options.ignoring_robots_txt(true);

    let response = fetcher
        .fetch(&format!("{}/private/", mock_server.uri()), IDENTITY, &options)
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_crawl_delay_spaces_requests() {
    let mock_server = MockServer::start().await;
    mount_robots(&mock_server, "User-agent: *\nCrawl-delay: 0.5").await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = test_config();
    let (fetcher, options) = polite_fetcher(&config);
    let base = mock_server.uri();

    fetcher
        .fetch(&format!("{}/a", base), IDENTITY, &options)
        .await
        .unwrap();
    let started = Instant::now();
    fetcher
        .fetch(&format!("{}/b", base), IDENTITY, &options)
        .await
        .unwrap();

    assert!(started.elapsed() >= millis(450));
}

#[tokio::test]
async fn test_non_success_status_is_returned_without_retry() {
    let mock_server = MockServer::start().await;
    mount_robots(&mock_server, "User-agent: *\nDisallow:").await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = test_config();
    config.robots.default_crawl_delay_secs = 0.0;
    let (fetcher, options) = polite_fetcher(&config);
    let base = mock_server.uri();

    let gone = fetcher
        .fetch(&format!("{}/gone", base), IDENTITY, &options)
        .await
        .unwrap();
    assert_eq!(gone.status, 404);

    let busy = fetcher
        .fetch(&format!("{}/busy", base), IDENTITY, &options)
        .await
        .unwrap();
    assert_eq!(busy.status, 503);
    assert!(!busy.is_success());
}

#[tokio::test]
async fn test_timeouts_are_retried_then_surfaced() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(millis(2_000)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = RateLimitedFetcher::new(transport());
    let options = FetchOptions {
        timeout: millis(200),
        max_retries: 3,
        backoff_base: millis(10),
        ..FetchOptions::default()
    };

    let err = fetcher
        .fetch(&format!("{}/slow", mock_server.uri()), IDENTITY, &options)
        .await
        .unwrap_err();

    match err {
        FetchError::Exhausted { attempts, source, .. } => {
            assert_eq!(attempts, 3);
            assert!(matches!(source, TransportError::Timeout(_)));
        }
        other => panic!("Expected exhausted retries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused_exhausts_retries() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let fetcher = RateLimitedFetcher::new(transport());
    let options = FetchOptions {
        backoff_base: millis(10),
        ..FetchOptions::default()
    };

    let err = fetcher
        .fetch(&format!("http://127.0.0.1:{}/", port), IDENTITY, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Exhausted { attempts: 3, .. }));
    assert!(err.transport_error().is_some());
}

#[tokio::test]
async fn test_malformed_url_fails_fast() {
    let fetcher = RateLimitedFetcher::new(transport());
    let err = fetcher
        .fetch("htp:/broken url", IDENTITY, &FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl { .. }));
}
