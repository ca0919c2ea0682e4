//! Known-organization registry and expired-server deny list.
//!
//! The registry maps publisher domains to the country they operate from. It is
//! the highest-precedence country signal: a registry hit is kept even when the
//! page content points somewhere else.
//!
//! Countries are tested in file order, and a domain matches either exactly or
//! as a subdomain (`news.example.com` matches `example.com`) unless the entry
//! is marked `exact_only`. Both the raw host and the host without `www.` are
//! tried.

use crate::domain_utils::{matches_domain, strip_www};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Registry shipped with the binary.
pub const DEFAULT_KNOWN_ORGANIZATIONS: &str = include_str!("../config/known_organizations.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownOrganizationsDatabase {
    pub version: String,
    pub updated: String,
    #[serde(default)]
    pub description: String,
    pub countries: Vec<CountryEntry>,
    #[serde(default)]
    pub expired_domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryEntry {
    pub country: String,
    /// Adjective used in evidence lines, e.g. "Canadian".
    pub label: String,
    #[serde(default)]
    pub kind: OrganizationKind,
    #[serde(default)]
    pub exact_only: bool,
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationKind {
    #[default]
    Organization,
    Publisher,
}

impl fmt::Display for OrganizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizationKind::Organization => write!(f, "organization"),
            OrganizationKind::Publisher => write!(f, "publisher"),
        }
    }
}

/// Where the registry was loaded from
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrySource {
    Embedded,
    File(PathBuf),
}

impl fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrySource::Embedded => write!(f, "embedded"),
            RegistrySource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnownOrganizationMatch {
    pub country: String,
    pub evidence: String,
}

pub struct KnownOrganizations {
    database: KnownOrganizationsDatabase,
    source: RegistrySource,
}

impl KnownOrganizations {
    /// Load from `path` when given, otherwise use the embedded registry.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let registry = match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read known organizations from {:?}", path))?;
                let database = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse known organizations from {:?}", path))?;
                Self { database, source: RegistrySource::File(path.to_path_buf()) }
            }
            None => Self::embedded()?,
        };

        info!(
            "Loaded known organizations ({}): {} domains across {} countries, {} expired (version {}, updated {})",
            registry.source,
            registry.domain_count(),
            registry.database.countries.len(),
            registry.database.expired_domains.len(),
            registry.database.version,
            registry.database.updated
        );
        Ok(registry)
    }

    pub fn embedded() -> Result<Self> {
        let database = serde_json::from_str(DEFAULT_KNOWN_ORGANIZATIONS)
            .context("Failed to parse embedded known organizations")?;
        Ok(Self { database, source: RegistrySource::Embedded })
    }

    pub fn from_database(database: KnownOrganizationsDatabase) -> Self {
        Self { database, source: RegistrySource::Embedded }
    }

    /// Country for a host, with the evidence line to log.
    pub fn lookup(&self, host: &str) -> Option<KnownOrganizationMatch> {
        let host = host.to_lowercase();
        let bare = strip_www(&host);

        for entry in &self.database.countries {
            let hit = entry.domains.iter().any(|known| {
                if entry.exact_only {
                    host == known.as_str() || bare == known.as_str()
                } else {
                    matches_domain(&host, known) || matches_domain(bare, known)
                }
            });
            if hit {
                debug!("Registry hit for {}: {}", host, entry.country);
                return Some(KnownOrganizationMatch {
                    country: entry.country.clone(),
                    evidence: format!("Known {} {}: {}", entry.label, entry.kind, host),
                });
            }
        }
        None
    }

    /// The deny-list entry covering `host`, if the server is known to be gone.
    pub fn expired_domain(&self, host: &str) -> Option<&str> {
        let host = host.to_lowercase();
        self.database
            .expired_domains
            .iter()
            .find(|d| matches_domain(&host, d))
            .map(|d| d.as_str())
    }

    pub fn domain_count(&self) -> usize {
        self.database.countries.iter().map(|c| c.domains.len()).sum()
    }

    pub fn source(&self) -> &RegistrySource {
        &self.source
    }
}
