//! Publisher-country resolution.
//!
//! Static resolvers look only at the host and run in precedence order:
//! the known-organization registry, then domain-name heuristics. Page
//! content is scored separately by [`ContentSignals`] (addresses, phone
//! numbering plans and, as a last resort, country-name mentions). The final
//! country is decided by [`resolve`]: a static verdict always wins, and a
//! disagreeing content country is kept as a [`CountryConflict`] line.

use crate::address::{extract_addresses, truncate_chars};
use crate::domain_utils::has_bank_label;
use crate::known_orgs::KnownOrganizations;
use crate::phone::{detect_numbering_plans, NORTH_AMERICA};
use crate::record::UNKNOWN_COUNTRY;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

const ADDRESS_WEIGHT: u32 = 25;
const PHONE_WEIGHT: u32 = 2;
const MIN_MENTIONS: usize = 2;

/// Compact state names as they appear in hosts once `-` and `.` are removed.
const US_STATES: &[&str] = &[
    "alabama", "alaska", "arizona", "arkansas", "california", "colorado", "connecticut",
    "delaware", "florida", "georgia", "hawaii", "idaho", "illinois", "indiana", "iowa",
    "kansas", "kentucky", "louisiana", "maine", "maryland", "massachusetts", "michigan",
    "minnesota", "mississippi", "missouri", "montana", "nebraska", "nevada", "newhampshire",
    "newjersey", "newmexico", "newyork", "northcarolina", "northdakota", "ohio", "oklahoma",
    "oregon", "pennsylvania", "rhodeisland", "southcarolina", "southdakota", "tennessee",
    "texas", "utah", "vermont", "virginia", "washington", "westvirginia", "wisconsin",
    "wyoming",
];

/// First suffix match wins, so order matters (`.ph` before `.com.ph`).
const COUNTRY_TLDS: &[(&str, &str)] = &[
    (".ph", "Philippines"),
    (".com.ph", "Philippines"),
    (".gov.ph", "Philippines"),
    (".edu.ph", "Philippines"),
    (".org.ph", "Philippines"),
    (".in", "India"),
    (".co.in", "India"),
    (".pk", "Pakistan"),
    (".com.pk", "Pakistan"),
    (".bd", "Bangladesh"),
    (".com.bd", "Bangladesh"),
    (".lk", "Sri Lanka"),
    (".com.lk", "Sri Lanka"),
    (".th", "Thailand"),
    (".co.th", "Thailand"),
    (".vn", "Vietnam"),
    (".com.vn", "Vietnam"),
    (".sg", "Singapore"),
    (".com.sg", "Singapore"),
    (".my", "Malaysia"),
    (".com.my", "Malaysia"),
    (".id", "Indonesia"),
    (".co.id", "Indonesia"),
    (".uk", "UK"),
    (".co.uk", "UK"),
    (".gov.uk", "UK"),
    (".ac.uk", "UK"),
    (".us", "US"),
    (".gov", "US"),
    (".mil", "US"),
    (".ca", "Canada"),
    (".au", "Australia"),
    (".nz", "New Zealand"),
    (".co.nz", "New Zealand"),
    (".nl", "Netherlands"),
    (".de", "Germany"),
    (".fr", "France"),
    (".ng", "Nigeria"),
    (".ch", "Switzerland"),
];

const MENTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("US", &["United States", "USA", "U.S.A", "U.S.", "America"]),
    ("UK", &["United Kingdom", "UK", "U.K.", "Britain", "England", "Scotland", "Wales"]),
    ("India", &["India", "Indian"]),
    ("Canada", &["Canada", "Canadian"]),
    ("Australia", &["Australia", "Australian"]),
    ("Switzerland", &["Switzerland", "Swiss", "Basel", "Zurich", "Geneva"]),
    ("Indonesia", &["Indonesia", "Indonesian", "Jakarta"]),
    ("Pakistan", &["Pakistan", "Pakistani", "Karachi", "Lahore"]),
    ("Netherlands", &["Netherlands", "Dutch", "Amsterdam"]),
    ("Germany", &["Germany", "German", "Berlin"]),
    ("France", &["France", "French", "Paris"]),
];

/// One word-bounded, case-insensitive matcher per country.
static MENTION_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    MENTION_KEYWORDS
        .iter()
        .map(|(country, keywords)| {
            let alternatives: Vec<String> = keywords
                .iter()
                .map(|kw| {
                    let tail = if kw.ends_with(|c: char| c.is_alphanumeric()) { r"\b" } else { "" };
                    format!(r"\b{}{}", regex::escape(kw), tail)
                })
                .collect();
            let pattern = format!("(?i)(?:{})", alternatives.join("|"));
            (*country, Regex::new(&pattern).expect("mention pattern compiles"))
        })
        .collect()
});

/// Which static resolver produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticTier {
    KnownOrganization,
    Domain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryVerdict {
    pub country: String,
    pub evidence: String,
    pub tier: StaticTier,
}

/// Host-only country signal.
pub trait StaticResolver: Send + Sync {
    fn name(&self) -> &'static str;

    /// `host` is lowercase and may start with `www.`.
    fn resolve(&self, host: &str) -> Option<CountryVerdict>;
}

pub struct RegistryResolver {
    registry: Arc<KnownOrganizations>,
}

impl RegistryResolver {
    pub fn new(registry: Arc<KnownOrganizations>) -> Self {
        Self { registry }
    }
}

impl StaticResolver for RegistryResolver {
    fn name(&self) -> &'static str {
        "known_organizations"
    }

    fn resolve(&self, host: &str) -> Option<CountryVerdict> {
        self.registry.lookup(host).map(|hit| CountryVerdict {
            country: hit.country,
            evidence: hit.evidence,
            tier: StaticTier::KnownOrganization,
        })
    }
}

pub struct DomainHeuristics;

impl DomainHeuristics {
    fn verdict(country: &str, evidence: String) -> Option<CountryVerdict> {
        Some(CountryVerdict {
            country: country.to_string(),
            evidence,
            tier: StaticTier::Domain,
        })
    }
}

impl StaticResolver for DomainHeuristics {
    fn name(&self) -> &'static str {
        "domain_heuristics"
    }

    fn resolve(&self, host: &str) -> Option<CountryVerdict> {
        if host.contains("america") {
            return Self::verdict("US", format!("Domain contains \"american/america\": {}", host));
        }

        let compact: String = host.chars().filter(|c| *c != '-' && *c != '.').collect();
        if let Some(state) = US_STATES.iter().find(|state| compact.contains(*state)) {
            return Self::verdict(
                "US",
                format!("Domain contains US state name \"{}\": {}", state, host),
            );
        }

        if host.ends_with(".edu") {
            return Self::verdict("US", format!("Domain ends with .edu: {}", host));
        }

        if has_bank_label(host) {
            return Self::verdict("US", "Domain is .bank TLD (US-based)".to_string());
        }

        COUNTRY_TLDS
            .iter()
            .find(|(tld, _)| host.ends_with(tld))
            .and_then(|(tld, country)| Self::verdict(country, format!("Domain TLD: {}", tld)))
    }
}

/// Static resolvers in precedence order.
pub struct StaticChain {
    resolvers: Vec<Box<dyn StaticResolver>>,
}

impl StaticChain {
    pub fn new(registry: Arc<KnownOrganizations>) -> Self {
        Self::with_resolvers(vec![
            Box::new(RegistryResolver::new(registry)),
            Box::new(DomainHeuristics),
        ])
    }

    pub fn with_resolvers(resolvers: Vec<Box<dyn StaticResolver>>) -> Self {
        Self { resolvers }
    }

    pub fn resolver_names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    pub fn resolve(&self, host: &str) -> Option<CountryVerdict> {
        self.resolvers.iter().find_map(|r| r.resolve(host))
    }
}

/// Content country overruled by a static verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryConflict {
    pub content_country: String,
    pub static_country: String,
    pub tier: StaticTier,
}

impl fmt::Display for CountryConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.tier {
            StaticTier::KnownOrganization => "known organization is",
            StaticTier::Domain => "domain says",
        };
        write!(
            f,
            "Content analysis suggested: {} (but {} {})",
            self.content_country, source, self.static_country
        )
    }
}

/// Country evidence gathered from the page and its sub-pages.
#[derive(Debug, Default)]
pub struct ContentSignals {
    evidence: Vec<String>,
    /// Scored countries in the order they were first scored.
    scores: Vec<(String, u32)>,
    texts: Vec<String>,
}

impl ContentSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, line: impl Into<String>) {
        self.evidence.push(line.into());
    }

    pub fn evidence(&self) -> &[String] {
        &self.evidence
    }

    fn score(&mut self, country: &str, points: u32) {
        match self.scores.iter_mut().find(|(c, _)| c == country) {
            Some((_, total)) => *total += points,
            None => self.scores.push((country.to_string(), points)),
        }
    }

    fn score_phone(&mut self, plan: &str) {
        if plan == NORTH_AMERICA {
            self.score("US", PHONE_WEIGHT / 2);
            self.score("Canada", PHONE_WEIGHT / 2);
        } else {
            self.score(plan, PHONE_WEIGHT);
        }
    }

    /// Score the analysed region of the page under evaluation.
    pub fn observe_main_page(&mut self, region: &str, max_addresses: usize) {
        for address in extract_addresses(region).into_iter().take(max_addresses) {
            self.note(format!("Physical address found: {}...", truncate_chars(&address.text, 50)));
            self.score(address.country, ADDRESS_WEIGHT);
        }
        for plan in detect_numbering_plans(region) {
            self.note(format!("Phone number found: {}", plan));
            self.score_phone(plan);
        }
        self.texts.push(region.to_string());
    }

    /// Score a fetched contact/about/terms page.
    pub fn observe_subpage(&mut self, page_type: &str, text: &str, max_addresses: usize) {
        for address in extract_addresses(text).into_iter().take(max_addresses) {
            self.note(format!(
                "{} page address: {}...",
                page_type,
                truncate_chars(&address.text, 40)
            ));
            self.score(address.country, ADDRESS_WEIGHT);
        }
        for plan in detect_numbering_plans(text) {
            self.note(format!("{} page phone: {}", page_type, plan));
            self.score_phone(plan);
        }
        self.texts.push(text.to_string());
    }

    /// Highest-scoring country, ties going to the first scored. Falls back to
    /// country-name mentions when no address or phone was seen.
    pub fn conclude(mut self) -> (Option<String>, Vec<String>) {
        let mut best: Option<&(String, u32)> = None;
        for entry in &self.scores {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        if let Some((country, _)) = best {
            let country = country.clone();
            return (Some(country), self.evidence);
        }

        let country = most_mentioned(&self.texts).map(|(country, mentions)| {
            self.evidence.push(format!(
                "Location mentions suggest: {} ({} mentions)",
                country, mentions
            ));
            country.to_string()
        });
        (country, self.evidence)
    }
}

fn most_mentioned(texts: &[String]) -> Option<(&'static str, usize)> {
    let mut best: Option<(&'static str, usize)> = None;
    for (country, pattern) in MENTION_PATTERNS.iter() {
        let mentions: usize = texts.iter().map(|t| pattern.find_iter(t).count()).sum();
        if mentions >= MIN_MENTIONS && best.map_or(true, |(_, n)| mentions > n) {
            best = Some((country, mentions));
        }
    }
    best
}

/// Final country plus the conflict line when content disagreed with a static verdict.
pub fn resolve(
    static_verdict: Option<&CountryVerdict>,
    content_country: Option<String>,
) -> (String, Option<CountryConflict>) {
    match (static_verdict, content_country) {
        (Some(verdict), Some(content)) if content != verdict.country => (
            verdict.country.clone(),
            Some(CountryConflict {
                content_country: content,
                static_country: verdict.country.clone(),
                tier: verdict.tier,
            }),
        ),
        (Some(verdict), _) => (verdict.country.clone(), None),
        (None, Some(content)) => (content, None),
        (None, None) => (UNKNOWN_COUNTRY.to_string(), None),
    }
}
