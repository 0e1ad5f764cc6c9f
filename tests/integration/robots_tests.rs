use crate::{test_config, transport, IDENTITY};
use hearth_crawl::robots::{RobotsPolicy, RobotsProvider};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider() -> RobotsProvider {
    RobotsProvider::from_config(transport(), &test_config())
}

fn url(base: &str, suffix: &str) -> Url {
    Url::parse(&format!("{}{}", base, suffix)).expect("Failed to parse URL")
}

#[tokio::test]
async fn test_robots_txt_rules_and_delay() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "# listing site\n\
             User-agent: *\n\
             Disallow: /private/\n\
             Allow: /path?param=*\n\
             Disallow: /path\n\
             Crawl-delay: 5\n\
             Sitemap: https://example.com/sitemap.xml\n",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = provider();
    let base = mock_server.uri();

    assert!(!provider.is_allowed(&url(&base, "/private/secret"), IDENTITY).await);
    assert!(provider.is_allowed(&url(&base, "/public"), IDENTITY).await);
    assert!(provider.is_allowed(&url(&base, "/path?param=value"), IDENTITY).await);
    assert!(!provider.is_allowed(&url(&base, "/path"), IDENTITY).await);
    assert_eq!(
        provider.crawl_delay_for(&url(&base, "/"), IDENTITY).await,
        Some(Duration::from_secs(5))
    );
    assert_eq!(
        provider.sitemaps_for(&url(&base, "/")).await,
        vec!["https://example.com/sitemap.xml".to_string()]
    );
}

#[tokio::test]
async fn test_missing_robots_txt_allows_all() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let provider = provider();
    let base = mock_server.uri();
    let policy = provider.policy_for(&url(&base, "/anything")).await;

    assert!(policy.is_available());
    assert!(policy.is_allowed(provider.evaluator(), IDENTITY, "/admin/"));
    assert_eq!(
        policy.crawl_delay(provider.evaluator(), IDENTITY),
        Some(Duration::from_secs(1))
    );
}

#[tokio::test]
async fn test_server_error_fails_open() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = provider();
    let target = url(&mock_server.uri(), "/private/secret");

    assert!(provider.is_allowed(&target, IDENTITY).await);
    assert_eq!(provider.crawl_delay_for(&target, IDENTITY).await, None);
}

#[tokio::test]
async fn test_unreachable_host_fails_open() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let provider = provider();
    let target = Url::parse(&format!("http://127.0.0.1:{}/private/", port)).unwrap();
    let policy = provider.policy_for(&target).await;

    assert!(matches!(policy, RobotsPolicy::Unavailable { .. }));
    assert!(policy.is_allowed(provider.evaluator(), IDENTITY, target.as_str()));
    assert_eq!(policy.crawl_delay(provider.evaluator(), IDENTITY), None);
}

#[tokio::test]
async fn test_concurrent_lookups_fetch_robots_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /private/")
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = Arc::new(provider());
    let base = mock_server.uri();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let provider = Arc::clone(&provider);
        let target = url(&base, &format!("/homes/{}", i));
        tasks.push(tokio::spawn(async move {
            provider.is_allowed(&target, IDENTITY).await
        }));
    }

    for task in tasks {
        assert!(task.await.unwrap());
    }
}

#[tokio::test]
async fn test_robots_statistics() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Sitemap: https://example.com/a.xml\n\
             User-agent: Googlebot\n\
             User-agent: Bingbot\n\
             Disallow: /search\n\
             Crawl-delay: 2\n\
             \n\
             User-agent: *\n\
             Disallow: /private/\n\
             Allow: /private/public\n\
             Sitemap: https://example.com/b.xml\n",
        ))
        .mount(&mock_server)
        .await;

    let provider = provider();
    let policy = provider.policy_for(&url(&mock_server.uri(), "/")).await;
    let stats = policy.document().expect("document should be fetched").stats();

    assert_eq!(stats.user_agents, 3);
    assert_eq!(stats.total_rules, 4);
    assert_eq!(stats.sitemaps, 2);
    assert_eq!(stats.user_agents_with_crawl_delay, 2);
    assert!(policy.is_allowed(provider.evaluator(), "Bingbot/2.0", "/private/x"));
    assert!(!policy.is_allowed(provider.evaluator(), "Bingbot/2.0", "/search"));
    assert!(!policy.is_allowed(provider.evaluator(), IDENTITY, "/private/x"));
}
