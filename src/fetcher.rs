//! Page retrieval.
//!
//! [`Fetcher`] is the only place the pipeline touches the network. It turns
//! every outcome into either a [`FetchedPage`] with a 2xx status or a
//! [`FetchError`] the analyzer records as a status and an evidence line;
//! nothing here aborts a run. Hosts on the expired-server deny list are
//! answered without calling the transport.

use crate::config::{AppConfig, HttpConfig};
use crate::domain_utils::host_of;
use crate::known_orgs::KnownOrganizations;
use crate::rate_limit::DomainRateLimiter;
use crate::record::FetchStatus;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

/// Response as received, before status classification.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Why no response (or no readable body) was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout(Duration),
    Connect(String),
    InvalidUrl(String),
    Body(String),
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::Timeout(after) => write!(f, "timed out after {}s", after.as_secs()),
            TransportFailure::Connect(detail) => write!(f, "connection failed: {}", detail),
            TransportFailure::InvalidUrl(detail) => write!(f, "invalid URL: {}", detail),
            TransportFailure::Body(detail) => write!(f, "unreadable body: {}", detail),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport failure: {failure}")]
    Transport {
        failure: TransportFailure,
        /// Set when headers arrived before the failure.
        status: Option<u16>,
    },

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("known expired server ({domain})")]
    KnownExpired { domain: String },
}

impl FetchError {
    fn transport(failure: TransportFailure) -> Self {
        FetchError::Transport { failure, status: None }
    }

    pub fn status(&self) -> FetchStatus {
        match self {
            FetchError::Transport { .. } => FetchStatus::ConnectionError,
            FetchError::Http { status } => FetchStatus::HttpError(*status),
            FetchError::KnownExpired { .. } => FetchStatus::ExpiredServer,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Transport { status, .. } => *status,
            FetchError::Http { status } => Some(*status),
            FetchError::KnownExpired { .. } => None,
        }
    }

    /// Evidence line recorded for a failed root fetch.
    pub fn evidence(&self) -> String {
        match self {
            FetchError::Transport { failure, .. } => match failure {
                TransportFailure::Timeout(after) => {
                    format!("Request timed out after {} seconds", after.as_secs())
                }
                TransportFailure::Connect(_) => "Could not connect to URL".to_string(),
                TransportFailure::InvalidUrl(reason) => format!("Invalid URL: {}", reason),
                TransportFailure::Body(_) => "Could not read response body".to_string(),
            },
            FetchError::Http { status: 404 } => "Page not found (404)".to_string(),
            FetchError::Http { status } => format!("HTTP status code: {}", status),
            FetchError::KnownExpired { domain } => format!("Known expired server ({})", domain),
        }
    }
}

#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Single GET following redirects. Any received status is `Ok`.
    async fn get(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError>;

    fn name(&self) -> &str;
}

/// reqwest-backed transport shared by every fetch in a run.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageTransport for HttpTransport {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::transport(classify_reqwest_error(&e, timeout)))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| FetchError::Transport {
            failure: if e.is_timeout() {
                TransportFailure::Timeout(timeout)
            } else {
                TransportFailure::Body(e.to_string())
            },
            status: Some(status),
        })?;

        Ok(FetchedPage { final_url, status, body })
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

fn classify_reqwest_error(e: &reqwest::Error, timeout: Duration) -> TransportFailure {
    if e.is_timeout() {
        TransportFailure::Timeout(timeout)
    } else if e.is_builder() {
        TransportFailure::InvalidUrl(e.to_string())
    } else {
        TransportFailure::Connect(e.to_string())
    }
}

/// Deny list, per-domain rate limit and global in-flight cap in front of a transport.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn PageTransport>,
    registry: Arc<KnownOrganizations>,
    limiter: DomainRateLimiter,
    permits: Arc<Semaphore>,
    page_timeout: Duration,
    subpage_timeout: Duration,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn PageTransport>,
        registry: Arc<KnownOrganizations>,
        config: &AppConfig,
    ) -> Self {
        debug!(
            "Fetcher using {} transport, {} concurrent fetches, {} req/s per domain",
            transport.name(),
            config.analysis.max_concurrent_fetches,
            config.rate_limit.http_requests_per_second
        );
        Self {
            transport,
            registry,
            limiter: DomainRateLimiter::new(config.rate_limit.http_requests_per_second),
            permits: Arc::new(Semaphore::new(config.analysis.max_concurrent_fetches)),
            page_timeout: config.http.request_timeout(),
            subpage_timeout: config.http.subpage_timeout(),
        }
    }

    /// Fetch the page under evaluation.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetch(url, self.page_timeout).await
    }

    /// Fetch a discovered contact/about/terms page.
    pub async fn fetch_subpage(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetch(url, self.subpage_timeout).await
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        if let Some(domain) = host_of(url).and_then(|host| self.registry.expired_domain(&host)) {
            debug!("Skipping {}: known expired server {}", url, domain);
            return Err(FetchError::KnownExpired { domain: domain.to_string() });
        }

        let parsed = parse_http_url(url)?;
        let host = parsed.host_str().unwrap_or_default().to_lowercase();

        self.limiter.acquire(&host).await;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::transport(TransportFailure::Connect(e.to_string())))?;

        debug!("GET {} (timeout {:?})", parsed, timeout);
        let page = self.transport.get(&parsed, timeout).await;
        match &page {
            Ok(page) => debug!("{} -> {}", url, page.status),
            Err(e) => debug!("{} -> {}", url, e),
        }

        let page = page?;
        if page.is_success() {
            Ok(page)
        } else {
            Err(FetchError::Http { status: page.status })
        }
    }
}

fn parse_http_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| FetchError::transport(TransportFailure::InvalidUrl(e.to_string())))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        "http" | "https" => Err(FetchError::transport(TransportFailure::InvalidUrl(
            "missing host".to_string(),
        ))),
        other => Err(FetchError::transport(TransportFailure::InvalidUrl(format!(
            "unsupported scheme '{}'",
            other
        )))),
    }
}
