//! Cultural concept dictionaries and the concept matcher.
//!
//! Each cultural group has an ordered list of concepts, each concept an
//! ordered list of trigger phrases. A phrase may carry spelling variations;
//! a hit on any variation is reported as the phrase itself, in dictionary
//! casing. A single Western self-help vocabulary is shared by all groups and
//! is tracked separately from the concepts.
//!
//! Matching is case-insensitive substring search. Needles are lowercased once
//! at load time and the page text once per scan.

use crate::ordered::OrderedMap;
use crate::record::ConceptMatches;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Dictionaries shipped with the binary.
pub const DEFAULT_CONCEPTS: &str = include_str!("../config/concepts.json");

const DEFAULT_DILEMMA_MIN_CONCEPTS: usize = 3;

#[derive(Debug, Deserialize)]
struct ConceptsFile {
    version: String,
    western_keywords: Vec<String>,
    groups: OrderedMap<GroupFile>,
}

#[derive(Debug, Deserialize)]
struct GroupFile {
    label: String,
    #[serde(default = "default_dilemma_min_concepts")]
    dilemma_min_concepts: usize,
    #[serde(default)]
    specific_concepts: Vec<String>,
    concepts: Vec<ConceptFile>,
}

fn default_dilemma_min_concepts() -> usize {
    DEFAULT_DILEMMA_MIN_CONCEPTS
}

#[derive(Debug, Deserialize)]
struct ConceptFile {
    id: String,
    phrases: Vec<PhraseFile>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PhraseFile {
    Plain(String),
    Varied {
        phrase: String,
        #[serde(default)]
        variations: Vec<String>,
    },
}

/// A trigger phrase and the lowercased needles that count as a hit.
#[derive(Debug, Clone)]
pub struct Phrase {
    pub text: String,
    needles: Vec<String>,
}

impl Phrase {
    fn new(text: String, variations: Vec<String>) -> Result<Self> {
        let mut needles = vec![text.to_lowercase()];
        for variation in variations {
            let needle = variation.to_lowercase();
            if !needles.contains(&needle) {
                needles.push(needle);
            }
        }
        if needles.iter().any(|n| n.trim().is_empty()) {
            bail!("empty trigger phrase or variation for '{}'", text);
        }
        Ok(Self { text, needles })
    }

    /// `lowered` must already be lowercase.
    fn is_in(&self, lowered: &str) -> bool {
        self.needles.iter().any(|needle| lowered.contains(needle.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct Concept {
    pub id: String,
    pub phrases: Vec<Phrase>,
}

/// Concepts for one cultural group.
#[derive(Debug, Clone)]
pub struct ConceptDictionary {
    pub group: String,
    pub label: String,
    pub concepts: Vec<Concept>,
    /// Concepts that only make sense for this group, e.g. `pamanhikan`.
    pub specific_concepts: HashSet<String>,
    /// Distinct concepts at which a page is taken to address the user's dilemma.
    pub dilemma_min_concepts: usize,
}

/// Result of scanning one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConceptScan {
    /// Every concept phrase hit, first-seen order, deduplicated.
    pub matched_keywords: Vec<String>,
    pub matched_concepts: ConceptMatches,
    pub western_keywords: Vec<String>,
}

impl ConceptScan {
    pub fn concept_count(&self) -> usize {
        self.matched_concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matched_concepts.is_empty() && self.western_keywords.is_empty()
    }
}

impl ConceptDictionary {
    /// Concept buckets for already-lowercased text, in dictionary order.
    fn match_lowered(&self, lowered: &str) -> ConceptMatches {
        let mut matches = ConceptMatches::new();
        for concept in &self.concepts {
            let hits: Vec<String> = concept
                .phrases
                .iter()
                .filter(|phrase| phrase.is_in(lowered))
                .map(|phrase| phrase.text.clone())
                .collect();
            if !hits.is_empty() {
                matches.insert(concept.id.clone(), hits);
            }
        }
        matches
    }
}

/// All group dictionaries plus the shared Western vocabulary, loaded once per run.
#[derive(Debug, Clone)]
pub struct ConceptLibrary {
    version: String,
    groups: OrderedMap<ConceptDictionary>,
    western: Vec<Phrase>,
}

impl ConceptLibrary {
    /// Load from `path` when given, otherwise use the embedded dictionaries.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let library = match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read concept dictionaries from {:?}", path))?;
                Self::from_json(&content)
                    .with_context(|| format!("Failed to load concept dictionaries from {:?}", path))?
            }
            None => Self::embedded()?,
        };

        info!(
            "Loaded concept dictionaries v{}: groups [{}], {} western keywords",
            library.version,
            library.groups().collect::<Vec<_>>().join(", "),
            library.western.len()
        );
        Ok(library)
    }

    pub fn embedded() -> Result<Self> {
        Self::from_json(DEFAULT_CONCEPTS).context("Failed to load embedded concept dictionaries")
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: ConceptsFile = serde_json::from_str(content)?;

        let mut groups = OrderedMap::new();
        for (group, group_file) in file.groups {
            let mut concepts = Vec::with_capacity(group_file.concepts.len());
            let mut seen = HashSet::new();
            for concept in group_file.concepts {
                if !seen.insert(concept.id.clone()) {
                    bail!("duplicate concept '{}' in group '{}'", concept.id, group);
                }
                let phrases = concept
                    .phrases
                    .into_iter()
                    .map(|p| match p {
                        PhraseFile::Plain(text) => Phrase::new(text, Vec::new()),
                        PhraseFile::Varied { phrase, variations } => Phrase::new(phrase, variations),
                    })
                    .collect::<Result<Vec<_>>>()?;
                concepts.push(Concept { id: concept.id, phrases });
            }

            for specific in &group_file.specific_concepts {
                if !seen.contains(specific) {
                    bail!("specific concept '{}' is not defined in group '{}'", specific, group);
                }
            }
            if group_file.dilemma_min_concepts == 0 {
                bail!("dilemma_min_concepts for group '{}' must be at least 1", group);
            }

            groups.insert(
                group.clone(),
                ConceptDictionary {
                    group,
                    label: group_file.label,
                    concepts,
                    specific_concepts: group_file.specific_concepts.into_iter().collect(),
                    dilemma_min_concepts: group_file.dilemma_min_concepts,
                },
            );
        }

        let western = file
            .western_keywords
            .into_iter()
            .map(|k| Phrase::new(k, Vec::new()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { version: file.version, groups, western })
    }

    pub fn dictionary(&self, group: &str) -> Option<&ConceptDictionary> {
        self.groups.get(group)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys()
    }

    /// Scan page text against one group's concepts and the Western vocabulary.
    pub fn scan(&self, dictionary: &ConceptDictionary, text: &str) -> ConceptScan {
        let lowered = text.to_lowercase();
        let matched_concepts = dictionary.match_lowered(&lowered);

        let mut matched_keywords: Vec<String> = Vec::new();
        for hit in matched_concepts.values().flatten() {
            if !matched_keywords.contains(hit) {
                matched_keywords.push(hit.clone());
            }
        }

        let western_keywords = self
            .western
            .iter()
            .filter(|k| k.is_in(&lowered))
            .map(|k| k.text.clone())
            .collect();

        ConceptScan { matched_keywords, matched_concepts, western_keywords }
    }
}
