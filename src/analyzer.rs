//! Per-URL evaluation.
//!
//! One [`Analyzer`] is built per run and shared by every task. All of its
//! state is read-only after construction; the only suspension points are
//! the fetches.

use crate::concepts::{ConceptDictionary, ConceptLibrary};
use crate::config::AppConfig;
use crate::context::ContextClassifier;
use crate::country::{self, ContentSignals, StaticChain};
use crate::domain_utils::host_of;
use crate::fetcher::{FetchError, Fetcher, PageTransport};
use crate::known_orgs::KnownOrganizations;
use crate::link_discovery::LinkDiscoverer;
use crate::page::PageContent;
use crate::record::{EvaluationRecord, FetchStatus, EXPIRED_COUNTRY, UNKNOWN_COUNTRY};
use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// URL path fragments marking a page whose whole text is worth scanning for addresses.
const INFO_PAGE_MARKERS: &[&str] = &["about", "contact", "terms", "privacy", "legal"];

pub struct Analyzer {
    fetcher: Fetcher,
    statics: StaticChain,
    discoverer: LinkDiscoverer,
    concepts: Arc<ConceptLibrary>,
    classifier: ContextClassifier,
    max_addresses_main: usize,
}

impl Analyzer {
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn PageTransport>,
        registry: Arc<KnownOrganizations>,
        concepts: Arc<ConceptLibrary>,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(transport, registry.clone(), config),
            statics: StaticChain::new(registry),
            discoverer: LinkDiscoverer::new(&config.crawl),
            concepts,
            classifier: ContextClassifier::default(),
            max_addresses_main: config.crawl.max_addresses_main,
        }
    }

    pub fn with_classifier(mut self, classifier: ContextClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn concepts(&self) -> &ConceptLibrary {
        &self.concepts
    }

    /// Evaluate `url` for `group`. Fails only when the group has no dictionary.
    pub async fn analyze(&self, group: &str, url: &str) -> Result<EvaluationRecord> {
        let dictionary = self
            .concepts
            .dictionary(group)
            .ok_or_else(|| anyhow!("No concept dictionary for group '{}'", group))?;
        Ok(self.analyze_with(dictionary, url).await)
    }

    pub async fn analyze_with(&self, dictionary: &ConceptDictionary, url: &str) -> EvaluationRecord {
        let fetched = self.fetcher.fetch_page(url).await;

        if let Err(e) = &fetched {
            if matches!(e, FetchError::KnownExpired { .. }) {
                return EvaluationRecord::unreachable(
                    url,
                    FetchStatus::ExpiredServer,
                    None,
                    EXPIRED_COUNTRY,
                    vec![e.evidence()],
                );
            }
        }

        let verdict = host_of(url).and_then(|host| self.statics.resolve(&host));
        let mut evidence: Vec<String> = verdict.iter().map(|v| v.evidence.clone()).collect();

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                debug!("{} unreachable: {}", url, e);
                evidence.push(e.evidence());
                let country = verdict.map_or_else(|| UNKNOWN_COUNTRY.to_string(), |v| v.country);
                return EvaluationRecord::unreachable(url, e.status(), e.status_code(), country, evidence);
            }
        };

        let content = PageContent::from_html(&page.body);
        let mut signals = ContentSignals::new();
        let region = if is_info_page(url) { &content.text } else { &content.footer_text };
        signals.observe_main_page(region, self.max_addresses_main);

        match Url::parse(&page.final_url) {
            Ok(base) => {
                let mut visited: HashSet<String> = [url.trim().to_string(), page.final_url.clone()]
                    .into_iter()
                    .collect();
                let subpages = self
                    .discoverer
                    .explore(&self.fetcher, &base, &content.links, &mut visited, &mut signals)
                    .await;
                debug!("{}: {} sub-pages fetched", url, subpages);
            }
            Err(e) => debug!("{}: final URL {:?} unparseable, skipping sub-pages: {}", url, page.final_url, e),
        }

        let (content_country, content_evidence) = signals.conclude();
        evidence.extend(content_evidence);
        let (country, conflict) = country::resolve(verdict.as_ref(), content_country);
        if let Some(conflict) = conflict {
            evidence.push(conflict.to_string());
        }

        let scan = self.concepts.scan(dictionary, &content.text);
        let context = self.classifier.classify(dictionary, &scan);
        info!(
            "{} [{}]: {} / {} ({} concepts)",
            url,
            dictionary.group,
            country,
            context,
            scan.concept_count()
        );

        EvaluationRecord::analyzed(url, page.status, country, evidence, scan, context)
    }
}

fn is_info_page(url: &str) -> bool {
    let path = Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());
    INFO_PAGE_MARKERS.iter().any(|m| path.contains(m))
}
