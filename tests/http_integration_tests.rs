//! Evaluation against local mock servers over real HTTP.

mod common;

use common::fixtures::load_fixture;
use common::wiremock_helpers::{
    mock_error_server, mock_page_server, mock_timeout_server, mount_page, mount_redirect, mount_status,
};
use common::{empty_registry, http_analyzer, registry_with};
use cultural_url_analyzer::{CulturalContext, FetchStatus};
use wiremock::MockServer;

#[tokio::test]
async fn test_forbidden_page_has_empty_content_fields() {
    let server = mock_error_server(403).await;
    let analyzer = http_analyzer(empty_registry());
    let url = format!("{}/blocked", server.uri());

    let record = analyzer.analyze("filipino", &url).await.unwrap();

    assert_eq!(record.status.to_string(), "error_403");
    assert_eq!(record.status_code, Some(403));
    assert_eq!(record.country, "Unknown");
    assert_eq!(record.evidence, vec!["HTTP status code: 403"]);
    assert_eq!(record.cultural_context, CulturalContext::Unknown);
    assert!(record.matched_keywords.is_empty());
    assert!(record.matched_concepts.is_empty());
    assert_eq!(record.unique_concept_count(), 0);
    assert!(record.western_keywords.is_empty());
}

#[tokio::test]
async fn test_missing_page_evidence() {
    let server = MockServer::start().await;
    let analyzer = http_analyzer(empty_registry());

    let record = analyzer
        .analyze("filipino", &format!("{}/gone", server.uri()))
        .await
        .unwrap();

    assert_eq!(record.status, FetchStatus::HttpError(404));
    assert_eq!(record.evidence, vec!["Page not found (404)"]);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = mock_timeout_server(4_000).await;
    let analyzer = http_analyzer(empty_registry());

    let record = analyzer
        .analyze("filipino", &format!("{}/slow", server.uri()))
        .await
        .unwrap();

    assert_eq!(record.status, FetchStatus::ConnectionError);
    assert_eq!(record.status_code, None);
    assert_eq!(record.evidence, vec!["Request timed out after 2 seconds"]);
}

#[tokio::test]
async fn test_refused_connection() {
    // Port 1 has no listener on test machines.
    let analyzer = http_analyzer(empty_registry());
    let record = analyzer.analyze("filipino", "http://127.0.0.1:1/article").await.unwrap();

    assert_eq!(record.status, FetchStatus::ConnectionError);
    assert_eq!(record.evidence, vec!["Could not connect to URL"]);
}

#[tokio::test]
async fn test_registry_country_wins_over_footer_address() {
    let server = mock_page_server("/family/boundaries", &load_fixture("footer_makati.html")).await;
    let analyzer = http_analyzer(registry_with("Canada", "Canadian", &["127.0.0.1"], &[]));

    let record = analyzer
        .analyze("filipino", &format!("{}/family/boundaries", server.uri()))
        .await
        .unwrap();

    assert_eq!(record.status, FetchStatus::Working);
    assert_eq!(record.country, "Canada");
    assert_eq!(record.evidence[0], "Known Canadian organization: 127.0.0.1");
    assert!(record.evidence[1].starts_with("Physical address found: Unit 12, 1226 Makati"));
    assert_eq!(
        record.evidence.last().unwrap(),
        "Content analysis suggested: Philippines (but known organization is Canada)"
    );
    assert!(record.western_keywords.iter().any(|k| k == "set boundaries"));
    assert!(record.western_keywords.iter().any(|k| k == "personal space"));
}

#[tokio::test]
async fn test_footer_address_sets_country_without_registry() {
    let server = mock_page_server("/family/boundaries", &load_fixture("footer_makati.html")).await;
    let analyzer = http_analyzer(empty_registry());

    let record = analyzer
        .analyze("filipino", &format!("{}/family/boundaries", server.uri()))
        .await
        .unwrap();

    assert_eq!(record.country, "Philippines");
    assert!(!record.evidence.iter().any(|e| e.starts_with("Content analysis suggested")));
}

#[tokio::test]
async fn test_contact_link_is_followed() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &load_fixture("home_with_links.html")).await;
    mount_page(&server, "/contact-us", &load_fixture("contact_quezon_city.html")).await;
    let analyzer = http_analyzer(empty_registry());

    let record = analyzer.analyze("filipino", &format!("{}/", server.uri())).await.unwrap();

    assert_eq!(record.country, "Philippines");
    assert_eq!(record.evidence[0], "Checking /contact-us...");
    assert!(record.evidence[1].starts_with("about/contact page address: Unit 5, 1100 Quezon City"));
    assert_eq!(
        record.evidence.iter().filter(|e| e.starts_with("Checking")).count(),
        1,
        "duplicate or mailto links must not be fetched: {:?}",
        record.evidence
    );

    let contact_hits = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/contact-us")
        .count();
    assert_eq!(contact_hits, 1);
}

#[tokio::test]
async fn test_failed_subpage_is_recorded() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &load_fixture("home_with_links.html")).await;
    mount_status(&server, "/contact-us", 500).await;
    let analyzer = http_analyzer(empty_registry());

    let record = analyzer.analyze("filipino", &format!("{}/", server.uri())).await.unwrap();

    assert_eq!(record.status, FetchStatus::Working);
    assert_eq!(
        record.evidence[..2],
        ["Checking /contact-us...".to_string(), "about/contact page unavailable: error_500".to_string()]
    );
    assert_eq!(record.country, "Unknown");
}

#[tokio::test]
async fn test_fallback_path_used_when_page_has_no_links() {
    let server = MockServer::start().await;
    mount_page(&server, "/article", "<html><body><p>Nothing to see.</p></body></html>").await;
    mount_page(&server, "/contact", &load_fixture("contact_quezon_city.html")).await;
    let analyzer = http_analyzer(empty_registry());

    let record = analyzer
        .analyze("filipino", &format!("{}/article", server.uri()))
        .await
        .unwrap();

    assert_eq!(record.country, "Philippines");
    assert_eq!(record.evidence[0], "Checking fallback /contact...");
}

#[tokio::test]
async fn test_redirect_is_followed() {
    let server = MockServer::start().await;
    mount_redirect(&server, "/old", &format!("{}/new", server.uri())).await;
    mount_page(&server, "/new", "<html><body><p>kapwa</p></body></html>").await;
    let analyzer = http_analyzer(empty_registry());
    let url = format!("{}/old", server.uri());

    let record = analyzer.analyze("filipino", &url).await.unwrap();

    assert_eq!(record.url, url);
    assert_eq!(record.status_code, Some(200));
    assert_eq!(record.matched_keywords, vec!["kapwa"]);
}
