//! Integration tests for the search service
//!
//! These tests use wiremock to stand in for the crawled site and drive the
//! full cycle over HTTP: submit a search, poll it, check the final snapshot.

use serde_json::Value;
use sitegrep::config::{parse_config, validate, Config};
use sitegrep::{HttpFetcher, SearchService};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling `base_url`
fn create_test_config(base_url: &str, max_results: usize, max_retries: u32) -> Config {
    let toml = format!(
        r#"
        [crawler]
        base-url = "{}"
        max-results = {}
        max-retries = {}
        fetch-timeout-ms = 300

        [runner]
        shutdown-grace-secs = 1

        [server]
        listen-addr = "127.0.0.1:0"

        [user-agent]
        crawler-name = "TestBot"
        crawler-version = "1.0.0"
        contact-url = "https://example.com/contact"
        contact-email = "test@example.com"
        "#,
        base_url, max_results, max_retries
    );
    let config = parse_config(&toml).expect("Failed to parse test config");
    validate(&config).expect("Test config is invalid");
    config
}

/// A running API server backed by a real HTTP fetcher
struct TestApi {
    base: String,
    client: reqwest::Client,
    stop: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl TestApi {
    async fn start(config: &Config) -> Self {
        let fetcher = HttpFetcher::new(&config.user_agent).expect("Failed to build fetcher");
        let service = Arc::new(SearchService::from_config(config, fetcher));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");

        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(sitegrep::server::serve(listener, service, async move {
            let _ = stopped.await;
        }));

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            stop: Some(stop),
            handle,
        }
    }

    async fn post_crawl(&self, body: &str) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}/crawl", self.base))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("POST /crawl failed");
        let status = response.status().as_u16();
        let text = response.text().await.expect("No response body");
        (status, serde_json::from_str(&text).expect("Response is not JSON"))
    }

    async fn start_search(&self, keyword: &str) -> String {
        let (status, body) = self
            .post_crawl(&serde_json::json!({ "keyword": keyword }).to_string())
            .await;
        assert_eq!(status, 200, "unexpected response: {}", body);
        body["id"].as_str().expect("Missing id").to_string()
    }

    async fn get_crawl(&self, id: &str) -> (u16, Value) {
        let response = self
            .client
            .get(format!("{}/crawl/{}", self.base, id))
            .send()
            .await
            .expect("GET /crawl/:id failed");
        let status = response.status().as_u16();
        let text = response.text().await.expect("No response body");
        (status, serde_json::from_str(&text).expect("Response is not JSON"))
    }

    /// Polls until the search leaves the active state
    async fn wait_for_completion(&self, id: &str) -> Value {
        for _ in 0..300 {
            let (status, body) = self.get_crawl(id).await;
            assert_eq!(status, 200);
            if body["status"] != "active" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Search {} did not complete", id);
    }

    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.handle
            .await
            .expect("Server task panicked")
            .expect("Server returned an error");
    }
}

fn urls(body: &Value) -> Vec<String> {
    body["urls"]
        .as_array()
        .expect("urls is not an array")
        .iter()
        .map(|u| u.as_str().expect("url is not a string").to_string())
        .collect()
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn requests_for(requests: &[wiremock::Request], page: &str) -> usize {
    requests.iter().filter(|r| r.url.path() == page).count()
}

#[tokio::test]
async fn test_full_search_single_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        format!(
            r#"<html><body>Security home
            <a href="{}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="https://elsewhere.example/security">External</a>
            </body></html>"#,
            base_url
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/page1",
        "<html><body>All about SECURITY</body></html>".to_string(),
    )
    .await;
    mount_page(
        &mock_server,
        "/page2",
        "<html><body>Unrelated</body></html>".to_string(),
    )
    .await;

    let api = TestApi::start(&create_test_config(&format!("{}/", base_url), 100, 3)).await;
    let id = api.start_search("security").await;

    let body = api.wait_for_completion(&id).await;

    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["status"], "done");
    assert_eq!(
        urls(&body),
        vec![format!("{}/", base_url), format!("{}/page1", base_url)]
    );

    api.stop().await;
}

#[tokio::test]
async fn test_max_results_limits_search() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let mut home = String::from("<html><body>security");
    for i in 1..=10 {
        home.push_str(&format!(r#"<a href="/page{}.html">Link {}</a>"#, i, i));
    }
    home.push_str("</body></html>");
    mount_page(&mock_server, "/", home).await;
    for i in 1..=10 {
        mount_page(
            &mock_server,
            &format!("/page{}.html", i),
            "<p>security</p>".to_string(),
        )
        .await;
    }

    let api = TestApi::start(&create_test_config(&format!("{}/", base_url), 5, 3)).await;
    let id = api.start_search("security").await;

    let body = api.wait_for_completion(&id).await;

    assert_eq!(body["status"], "done");
    let found = urls(&body);
    assert_eq!(found.len(), 5);
    assert_eq!(found[0], format!("{}/", base_url));
    assert_eq!(found[4], format!("{}/page4.html", base_url));

    let requests = mock_server.received_requests().await.expect("Recording disabled");
    assert_eq!(requests_for(&requests, "/page5.html"), 0);

    api.stop().await;
}

#[tokio::test]
async fn test_failing_site_exhausts_retries() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let api = TestApi::start(&create_test_config(&format!("{}/", mock_server.uri()), 100, 3)).await;
    let id = api.start_search("security").await;

    let body = api.wait_for_completion(&id).await;

    // Fetch failures never fail the search
    assert_eq!(body["status"], "done");
    assert!(urls(&body).is_empty());

    let requests = mock_server.received_requests().await.expect("Recording disabled");
    assert_eq!(requests_for(&requests, "/"), 4);

    api.stop().await;
}

#[tokio::test]
async fn test_slow_page_counts_as_failure() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<a href="/slow">slow</a><a href="/fast">fast</a>"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("security")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/fast", "security".to_string()).await;

    let base_url = mock_server.uri();
    let api = TestApi::start(&create_test_config(&format!("{}/", base_url), 100, 1)).await;
    let id = api.start_search("security").await;

    let body = api.wait_for_completion(&id).await;

    assert_eq!(body["status"], "done");
    assert_eq!(urls(&body), vec![format!("{}/fast", base_url)]);

    api.stop().await;
}

#[tokio::test]
async fn test_query_variants_fetched_once() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"
        <a href="/doc?page=1">one</a>
        <a href="/doc?page=2">two</a>
        <a href="/doc#section">anchor</a>
        <a href="/?from=nav">home again</a>
        "#
        .to_string(),
    )
    .await;
    mount_page(&mock_server, "/doc", "security docs".to_string()).await;

    let base_url = mock_server.uri();
    let api = TestApi::start(&create_test_config(&format!("{}/", base_url), 100, 3)).await;
    let id = api.start_search("security").await;

    let body = api.wait_for_completion(&id).await;

    assert_eq!(urls(&body), vec![format!("{}/doc", base_url)]);
    let requests = mock_server.received_requests().await.expect("Recording disabled");
    assert_eq!(requests_for(&requests, "/doc"), 1);
    assert_eq!(requests_for(&requests, "/"), 1);

    api.stop().await;
}

#[tokio::test]
async fn test_unknown_search_not_found() {
    let api = TestApi::start(&create_test_config("http://127.0.0.1:9/", 100, 3)).await;

    let (status, body) = api.get_crawl("no-such-search").await;

    assert_eq!(status, 404);
    assert_eq!(body["error"], "Search not found");

    api.stop().await;
}

#[tokio::test]
async fn test_invalid_requests_rejected() {
    let api = TestApi::start(&create_test_config("http://127.0.0.1:9/", 100, 3)).await;

    let (status, body) = api.post_crawl(r#"{"keyword": "abc"}"#).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Keyword must be between 4 and 32 characters");

    let long = "a".repeat(33);
    let (status, _) = api
        .post_crawl(&serde_json::json!({ "keyword": long }).to_string())
        .await;
    assert_eq!(status, 400);

    let (status, body) = api.post_crawl("{}").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid JSON format or missing keyword");

    let (status, body) = api.post_crawl("not json").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid JSON format or missing keyword");

    api.stop().await;
}

#[tokio::test]
async fn test_unreachable_site_finishes_done() {
    // Nothing listens on the discard port, every fetch fails
    let api = TestApi::start(&create_test_config("http://127.0.0.1:9/", 100, 2)).await;
    let id = api.start_search("security").await;

    let body = api.wait_for_completion(&id).await;

    assert_eq!(body["status"], "done");
    assert!(urls(&body).is_empty());

    api.stop().await;
}

#[tokio::test]
async fn test_health() {
    let api = TestApi::start(&create_test_config("http://127.0.0.1:9/", 100, 3)).await;

    let response = api
        .client
        .get(format!("{}/health", api.base))
        .send()
        .await
        .expect("GET /health failed");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value =
        serde_json::from_str(&response.text().await.expect("No body")).expect("Not JSON");
    assert_eq!(body["status"], "healthy");

    api.stop().await;
}
