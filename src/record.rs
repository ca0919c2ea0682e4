//! Per-URL evaluation record and the JSON contract consumers rely on.
//!
//! Field names, status strings and context strings are fixed; everything that
//! writes or reads result files goes through these types.

use crate::concepts::ConceptScan;
use crate::ordered::OrderedMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Sentinel country for records whose publisher could not be inferred.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Sentinel country for URLs on the expired-server deny list.
pub const EXPIRED_COUNTRY: &str = "Expired";

/// Concept id -> phrases (dictionary casing) that triggered it, in dictionary order.
pub type ConceptMatches = OrderedMap<Vec<String>>;

/// Cultural group -> records in seed order.
pub type GroupedResults = OrderedMap<Vec<EvaluationRecord>>;

/// Terminal classification of the root fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    Working,
    HttpError(u16),
    ConnectionError,
    ExpiredServer,
}

impl FetchStatus {
    pub fn is_working(&self) -> bool {
        matches!(self, FetchStatus::Working)
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::Working => write!(f, "working"),
            FetchStatus::HttpError(code) => write!(f, "error_{}", code),
            FetchStatus::ConnectionError => write!(f, "connection_error"),
            FetchStatus::ExpiredServer => write!(f, "expired_server"),
        }
    }
}

impl FromStr for FetchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "working" => Ok(FetchStatus::Working),
            "connection_error" => Ok(FetchStatus::ConnectionError),
            "expired_server" => Ok(FetchStatus::ExpiredServer),
            other => other
                .strip_prefix("error_")
                .and_then(|code| code.parse::<u16>().ok())
                .map(FetchStatus::HttpError)
                .ok_or_else(|| format!("unrecognized status '{}'", other)),
        }
    }
}

impl Serialize for FetchStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FetchStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// How a page relates to the cultural group it was collected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CulturalContext {
    Unknown,
    NotRelated,
    GenericAdvice,
    DefinesPractice,
    AddressesUserDilemma,
}

impl CulturalContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            CulturalContext::Unknown => "unknown",
            CulturalContext::NotRelated => "not_related",
            CulturalContext::GenericAdvice => "generic_advice",
            CulturalContext::DefinesPractice => "defines_practice",
            CulturalContext::AddressesUserDilemma => "addresses_user_dilemma",
        }
    }
}

impl fmt::Display for CulturalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finalized URL evaluation.
///
/// Records are built through [`EvaluationRecord::unreachable`] or
/// [`EvaluationRecord::analyzed`], so content fields are only ever populated
/// for working fetches and `unique_concept_count` always equals the number of
/// concept buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RecordDocument")]
pub struct EvaluationRecord {
    pub url: String,
    pub status: FetchStatus,
    pub status_code: Option<u16>,
    pub country: String,
    pub evidence: Vec<String>,
    pub cultural_context: CulturalContext,
    pub matched_keywords: Vec<String>,
    pub matched_concepts: ConceptMatches,
    unique_concept_count: usize,
    pub western_keywords: Vec<String>,
}

impl EvaluationRecord {
    /// Record for a URL whose root fetch did not produce a working page.
    pub fn unreachable(
        url: impl Into<String>,
        status: FetchStatus,
        status_code: Option<u16>,
        country: impl Into<String>,
        evidence: Vec<String>,
    ) -> Self {
        Self {
            url: url.into(),
            status,
            status_code,
            country: country.into(),
            evidence,
            cultural_context: CulturalContext::Unknown,
            matched_keywords: Vec::new(),
            matched_concepts: ConceptMatches::new(),
            unique_concept_count: 0,
            western_keywords: Vec::new(),
        }
    }

    /// Record for a working page with its concept scan and classification.
    pub fn analyzed(
        url: impl Into<String>,
        status_code: u16,
        country: impl Into<String>,
        evidence: Vec<String>,
        scan: ConceptScan,
        cultural_context: CulturalContext,
    ) -> Self {
        let unique_concept_count = scan.matched_concepts.len();
        Self {
            url: url.into(),
            status: FetchStatus::Working,
            status_code: Some(status_code),
            country: country.into(),
            evidence,
            cultural_context,
            matched_keywords: scan.matched_keywords,
            matched_concepts: scan.matched_concepts,
            unique_concept_count,
            western_keywords: scan.western_keywords,
        }
    }

    pub fn unique_concept_count(&self) -> usize {
        self.unique_concept_count
    }
}

/// On-disk shape. The stored concept count is ignored and recomputed.
#[derive(Deserialize)]
struct RecordDocument {
    url: String,
    status: FetchStatus,
    #[serde(default)]
    status_code: Option<u16>,
    country: String,
    #[serde(default)]
    evidence: Vec<String>,
    cultural_context: CulturalContext,
    #[serde(default)]
    matched_keywords: Vec<String>,
    #[serde(default)]
    matched_concepts: ConceptMatches,
    #[serde(default)]
    #[allow(dead_code)]
    unique_concept_count: usize,
    #[serde(default)]
    western_keywords: Vec<String>,
}

impl From<RecordDocument> for EvaluationRecord {
    fn from(doc: RecordDocument) -> Self {
        let unique_concept_count = doc.matched_concepts.len();
        Self {
            url: doc.url,
            status: doc.status,
            status_code: doc.status_code,
            country: doc.country,
            evidence: doc.evidence,
            cultural_context: doc.cultural_context,
            matched_keywords: doc.matched_keywords,
            matched_concepts: doc.matched_concepts,
            unique_concept_count,
            western_keywords: doc.western_keywords,
        }
    }
}
