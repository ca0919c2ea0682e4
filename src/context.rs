//! Cultural-context classification.
//!
//! Two outcomes are fixed: a page that was not fetched is `unknown`, and a
//! page with no concept and no Western hit is `not_related`. Everything else
//! goes through an ordered chain of [`ContextRule`]s; the first rule with an
//! opinion decides, and `generic_advice` is the answer when none has one.
//!
//! Default chain:
//! 1. [`DilemmaThreshold`]: at least `dilemma_min_concepts` distinct concepts
//!    (3 for the shipped groups) means the page engages with the situation
//!    as a whole -> `addresses_user_dilemma`.
//! 2. [`CulturalSpecificity`]: fewer concepts, but at least one that only
//!    exists in this culture (e.g. `pamanhikan`, `joint_family`, `aso_ebi`)
//!    -> `defines_practice`.
//!
//! Pages left over matched only generic family/finance concepts or only
//! Western vocabulary, and are `generic_advice`.

use crate::concepts::{ConceptDictionary, ConceptScan};
use crate::record::CulturalContext;

/// What a rule gets to look at.
pub struct ContextInput<'a> {
    pub dictionary: &'a ConceptDictionary,
    pub scan: &'a ConceptScan,
}

impl ContextInput<'_> {
    pub fn has_specific_concept(&self) -> bool {
        self.scan
            .matched_concepts
            .keys()
            .any(|id| self.dictionary.specific_concepts.contains(id))
    }
}

pub trait ContextRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` when the rule has no opinion.
    fn classify(&self, input: &ContextInput<'_>) -> Option<CulturalContext>;
}

pub struct DilemmaThreshold;

impl ContextRule for DilemmaThreshold {
    fn name(&self) -> &'static str {
        "dilemma_threshold"
    }

    fn classify(&self, input: &ContextInput<'_>) -> Option<CulturalContext> {
        (input.scan.concept_count() >= input.dictionary.dilemma_min_concepts)
            .then_some(CulturalContext::AddressesUserDilemma)
    }
}

pub struct CulturalSpecificity;

impl ContextRule for CulturalSpecificity {
    fn name(&self) -> &'static str {
        "cultural_specificity"
    }

    fn classify(&self, input: &ContextInput<'_>) -> Option<CulturalContext> {
        input
            .has_specific_concept()
            .then_some(CulturalContext::DefinesPractice)
    }
}

pub struct ContextClassifier {
    rules: Vec<Box<dyn ContextRule>>,
}

impl Default for ContextClassifier {
    fn default() -> Self {
        Self::with_rules(vec![Box::new(DilemmaThreshold), Box::new(CulturalSpecificity)])
    }
}

impl ContextClassifier {
    pub fn with_rules(rules: Vec<Box<dyn ContextRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Context for a working page.
    pub fn classify(&self, dictionary: &ConceptDictionary, scan: &ConceptScan) -> CulturalContext {
        if scan.is_empty() {
            return CulturalContext::NotRelated;
        }

        let input = ContextInput { dictionary, scan };
        self.rules
            .iter()
            .find_map(|rule| rule.classify(&input))
            .unwrap_or(CulturalContext::GenericAdvice)
    }
}
