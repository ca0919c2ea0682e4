//! Contact/about/terms sub-page discovery.
//!
//! Candidates come from the page's anchors, ranked contact, about, then
//! terms/privacy/legal. They are fetched in waves sized to the remaining
//! sub-page budget and folded into the [`ContentSignals`] in candidate order,
//! so evidence does not depend on which response arrived first. When links
//! alone do not fill the budget, a few conventional paths are tried on the
//! page's origin.

use crate::config::CrawlConfig;
use crate::country::ContentSignals;
use crate::fetcher::Fetcher;
use crate::page::{PageContent, PageLink};
use futures::future::join_all;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

const TERMS_PAGE: &str = "terms";
const ABOUT_CONTACT_PAGE: &str = "about/contact";
const LOGGED_HREF_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    /// Absolute URL without fragment.
    pub url: String,
    /// The anchor's href as written.
    pub href: String,
    pub priority: u8,
    pub page_type: &'static str,
}

fn priority(key: &str) -> u8 {
    if key.contains("contact") {
        0
    } else if key.contains("about") {
        1
    } else {
        2
    }
}

fn page_type(href: &str) -> &'static str {
    if href.to_lowercase().contains("terms") {
        TERMS_PAGE
    } else {
        ABOUT_CONTACT_PAGE
    }
}

fn normalize(mut url: Url) -> String {
    url.set_fragment(None);
    url.to_string()
}

pub struct LinkDiscoverer {
    terms: Vec<String>,
    max_candidates: usize,
    max_subpages: usize,
    fallback_paths: Vec<String>,
    max_addresses: usize,
}

impl LinkDiscoverer {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            terms: config
                .link_terms
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            max_candidates: config.max_candidate_links,
            max_subpages: config.max_subpages,
            fallback_paths: config.fallback_paths.clone(),
            max_addresses: config.max_addresses_subpage,
        }
    }

    fn matching_key(&self, link: &PageLink) -> Option<String> {
        let href = link.href.to_lowercase();
        if self.terms.iter().any(|t| href.contains(t.as_str())) {
            return Some(href);
        }
        let text = link.text.to_lowercase();
        self.terms.iter().any(|t| text.contains(t.as_str())).then_some(text)
    }

    /// Ranked, resolved, deduplicated candidates not yet in `visited`.
    /// Accepted candidates are added to `visited`.
    pub fn candidates(
        &self,
        base: &Url,
        links: &[PageLink],
        visited: &mut HashSet<String>,
    ) -> Vec<LinkCandidate> {
        let mut ranked: Vec<(u8, &PageLink)> = links
            .iter()
            .filter_map(|link| self.matching_key(link).map(|key| (priority(&key), link)))
            .collect();
        ranked.sort_by_key(|(p, _)| *p);

        let mut out = Vec::new();
        for (priority, link) in ranked.into_iter().take(self.max_candidates) {
            let Ok(resolved) = base.join(link.href.trim()) else {
                debug!("Skipping unresolvable link {:?}", link.href);
                continue;
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }
            let url = normalize(resolved);
            if !visited.insert(url.clone()) {
                continue;
            }
            out.push(LinkCandidate {
                url,
                href: link.href.clone(),
                priority,
                page_type: page_type(&link.href),
            });
        }
        out
    }

    /// Fetch sub-pages of the page at `base` and fold them into `signals`.
    /// Returns how many sub-pages were fetched successfully.
    pub async fn explore(
        &self,
        fetcher: &Fetcher,
        base: &Url,
        links: &[PageLink],
        visited: &mut HashSet<String>,
        signals: &mut ContentSignals,
    ) -> usize {
        let candidates = self.candidates(base, links, visited);
        let mut fetched = 0;
        let mut queue = candidates.iter();

        while fetched < self.max_subpages {
            let wave: Vec<&LinkCandidate> = queue.by_ref().take(self.max_subpages - fetched).collect();
            if wave.is_empty() {
                break;
            }

            let results = join_all(wave.iter().map(|c| fetcher.fetch_subpage(&c.url))).await;
            for (candidate, result) in wave.into_iter().zip(results) {
                let shown: String = candidate.href.chars().take(LOGGED_HREF_CHARS).collect();
                signals.note(format!("Checking {}...", shown));
                match result {
                    Ok(page) => {
                        let content = PageContent::from_html(&page.body);
                        signals.observe_subpage(candidate.page_type, &content.text, self.max_addresses);
                        fetched += 1;
                    }
                    Err(e) => {
                        debug!("Sub-page {} failed: {}", candidate.url, e);
                        signals.note(format!("{} page unavailable: {}", candidate.page_type, e.status()));
                    }
                }
            }
        }

        if fetched < self.max_subpages {
            fetched += self.explore_fallbacks(fetcher, base, visited, signals, fetched).await;
        }
        fetched
    }

    async fn explore_fallbacks(
        &self,
        fetcher: &Fetcher,
        base: &Url,
        visited: &mut HashSet<String>,
        signals: &mut ContentSignals,
        already: usize,
    ) -> usize {
        let mut fetched = 0;
        for path in &self.fallback_paths {
            if already + fetched >= self.max_subpages {
                break;
            }
            let Ok(url) = base.join(path) else {
                continue;
            };
            let url = normalize(url);
            if !visited.insert(url.clone()) {
                continue;
            }

            match fetcher.fetch_subpage(&url).await {
                Ok(page) => {
                    signals.note(format!("Checking fallback {}...", path));
                    let content = PageContent::from_html(&page.body);
                    signals.observe_subpage(page_type(path), &content.text, self.max_addresses);
                    fetched += 1;
                }
                Err(e) => debug!("Fallback {} failed: {}", url, e),
            }
        }
        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn discoverer() -> LinkDiscoverer {
        LinkDiscoverer::new(&AppConfig::embedded_default().unwrap().crawl)
    }

    fn link(href: &str, text: &str) -> PageLink {
        PageLink { href: href.to_string(), text: text.to_string() }
    }

    fn base() -> Url {
        Url::parse("https://www.example.com/blog/post").unwrap()
    }

    #[test]
    fn test_ranking_contact_about_then_rest() {
        let links = vec![
            link("/privacy-policy", "Privacy"),
            link("/blog/other", "Read more"),
            link("/about-us", "About"),
            link("/terms", "Terms"),
            link("/contact", "Contact"),
        ];
        let mut visited = HashSet::new();
        let found = discoverer().candidates(&base(), &links, &mut visited);
        let urls: Vec<&str> = found.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.example.com/contact",
                "https://www.example.com/about-us",
                "https://www.example.com/privacy-policy",
                "https://www.example.com/terms",
            ]
        );
        assert_eq!(found[3].page_type, "terms");
        assert_eq!(found[0].page_type, "about/contact");
    }

    #[test]
    fn test_anchor_text_matches() {
        let links = vec![link("/page?id=7", "Contact Us")];
        let found = discoverer().candidates(&base(), &links, &mut HashSet::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].priority, 0);
    }

    #[test]
    fn test_dedup_fragments_and_visited() {
        let links = vec![
            link("/contact#form", "Contact"),
            link("/contact", "Contact"),
            link("https://www.example.com/blog/post", "About this post"),
            link("mailto:contact@example.com", "Contact"),
        ];
        let mut visited = HashSet::new();
        visited.insert("https://www.example.com/blog/post".to_string());
        let found = discoverer().candidates(&base(), &links, &mut visited);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://www.example.com/contact");
    }

    #[test]
    fn test_only_first_six_ranked_considered() {
        let links: Vec<PageLink> = (0..10).map(|i| link(&format!("/about/{}", i), "")).collect();
        let found = discoverer().candidates(&base(), &links, &mut HashSet::new());
        assert_eq!(found.len(), 6);
    }
}
