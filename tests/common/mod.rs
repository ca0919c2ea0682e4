#![allow(dead_code)]

pub mod fixtures;
pub mod wiremock_helpers;

use async_trait::async_trait;
use cultural_url_analyzer::analyzer::Analyzer;
use cultural_url_analyzer::batch::CancelSignal;
use cultural_url_analyzer::concepts::ConceptLibrary;
use cultural_url_analyzer::config::AppConfig;
use cultural_url_analyzer::fetcher::{FetchError, FetchedPage, HttpTransport, PageTransport};
use cultural_url_analyzer::known_orgs::{
    CountryEntry, KnownOrganizations, KnownOrganizationsDatabase, OrganizationKind,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Embedded defaults with rate limiting off and short timeouts.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::embedded_default().expect("embedded config parses");
    config.rate_limit.http_requests_per_second = 0;
    config.http.request_timeout_secs = 2;
    config.http.subpage_timeout_secs = 1;
    config
}

/// Registry with a single country entry plus an expired-domain list.
pub fn registry_with(country: &str, label: &str, domains: &[&str], expired: &[&str]) -> Arc<KnownOrganizations> {
    Arc::new(KnownOrganizations::from_database(KnownOrganizationsDatabase {
        version: "test".to_string(),
        updated: "2026-01-01".to_string(),
        description: String::new(),
        countries: vec![CountryEntry {
            country: country.to_string(),
            label: label.to_string(),
            kind: OrganizationKind::Organization,
            exact_only: false,
            domains: domains.iter().map(|d| d.to_string()).collect(),
        }],
        expired_domains: expired.iter().map(|d| d.to_string()).collect(),
    }))
}

pub fn empty_registry() -> Arc<KnownOrganizations> {
    registry_with("Nowhere", "Nowhere", &[], &[])
}

pub fn concepts() -> Arc<ConceptLibrary> {
    Arc::new(ConceptLibrary::embedded().expect("embedded concepts parse"))
}

/// Analyzer over real HTTP, for wiremock-backed tests.
pub fn http_analyzer(registry: Arc<KnownOrganizations>) -> Analyzer {
    let config = test_config();
    let transport = Arc::new(HttpTransport::new(&config.http).expect("client builds"));
    Analyzer::new(&config, transport, registry, concepts())
}

/// Analyzer over a [`StubTransport`].
pub fn stub_analyzer(transport: Arc<StubTransport>, registry: Arc<KnownOrganizations>) -> Analyzer {
    stub_analyzer_with_config(&test_config(), transport, registry)
}

pub fn stub_analyzer_with_config(
    config: &AppConfig,
    transport: Arc<StubTransport>,
    registry: Arc<KnownOrganizations>,
) -> Analyzer {
    Analyzer::new(config, transport, registry, concepts())
}

/// In-memory transport serving canned pages by exact URL; anything else gets
/// the default page, or a 404 when none is set.
#[derive(Default)]
pub struct StubTransport {
    pages: HashMap<String, (u16, String)>,
    default_page: Option<(u16, String)>,
    delay: Option<Duration>,
    cancel_on: Option<(String, CancelSignal)>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
        let key = Url::parse(url).expect("stub URL parses").to_string();
        self.pages.insert(key, (status, body.to_string()));
        self
    }

    pub fn with_default_page(mut self, status: u16, body: &str) -> Self {
        self.default_page = Some((status, body.to_string()));
        self
    }

    /// Every response is held back this long.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fire `cancel` as soon as `url` is requested.
    pub fn cancel_when_requested(mut self, url: &str, cancel: CancelSignal) -> Self {
        let key = Url::parse(url).expect("stub URL parses").to_string();
        self.cancel_on = Some((key, cancel));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most requests that were ever in flight at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageTransport for StubTransport {
    async fn get(&self, url: &Url, _timeout: Duration) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some((trigger, cancel)) = &self.cancel_on {
            if trigger == url.as_str() {
                cancel.cancel();
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let (status, body) = self
            .pages
            .get(url.as_str())
            .or(self.default_page.as_ref())
            .cloned()
            .unwrap_or_else(|| (404, String::new()));
        Ok(FetchedPage { final_url: url.to_string(), status, body })
    }

    fn name(&self) -> &str {
        "stub"
    }
}
