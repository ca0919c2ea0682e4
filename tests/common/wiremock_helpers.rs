use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves `html` at `url_path` on an existing mock server.
pub async fn mount_page(server: &MockServer, url_path: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html.to_string())
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Creates a mock HTTP server that serves HTML content at the specified path.
pub async fn mock_page_server(url_path: &str, html: &str) -> MockServer {
    let server = MockServer::start().await;
    mount_page(&server, url_path, html).await;
    server
}

/// Answers `url_path` with a bare status code.
pub async fn mount_status(server: &MockServer, url_path: &str, status_code: u16) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(status_code))
        .mount(server)
        .await;
}

/// Creates a mock HTTP server that answers every request with `status_code`.
pub async fn mock_error_server(status_code: u16) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status_code))
        .mount(&server)
        .await;

    server
}

/// Creates a mock HTTP server that delays responses to simulate network timeouts.
pub async fn mock_timeout_server(delay_ms: u64) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>late</body></html>")
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(&server)
        .await;

    server
}

/// Permanent redirect from `from` to `to` on the same server.
pub async fn mount_redirect(server: &MockServer, from: &str, to: &str) {
    Mock::given(method("GET"))
        .and(path(from))
        .respond_with(ResponseTemplate::new(301).insert_header("location", to))
        .mount(server)
        .await;
}
