//! Card field extraction from recognized text
//!
//! Each field is found independently: locate a fragment containing the
//! field's keyword (case-insensitive), then validate the value with a fixed
//! pattern inside that same fragment. Neighbouring fragments are never
//! searched, so a keyword without a well-formed value leaves the field empty.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::TextFragment;

/// DD/MM/YYYY
static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{2}/\d{2}/\d{4}\b").expect("date pattern is valid"));

/// NNN-NNNN-NNNNNNN-N
static ID_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}-\d{4}-\d{7}-\d\b").expect("id number pattern is valid"));

/// Field printed on the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    IssuingDate,
    ExpiryDate,
    IdNumber,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [FieldKind::IssuingDate, FieldKind::ExpiryDate, FieldKind::IdNumber];

    /// Lowercase label anchoring the field
    pub fn keyword(&self) -> &'static str {
        match self {
            FieldKind::IssuingDate => "issuing date",
            FieldKind::ExpiryDate => "expiry date",
            FieldKind::IdNumber => "id number",
        }
    }

    /// Format the value must match
    pub fn pattern(&self) -> &'static Regex {
        match self {
            FieldKind::IssuingDate | FieldKind::ExpiryDate => Lazy::force(&DATE_PATTERN),
            FieldKind::IdNumber => Lazy::force(&ID_NUMBER_PATTERN),
        }
    }
}

/// Chooses which fragment anchors a keyword
pub trait MatchStrategy: Send + Sync {
    fn locate<'a>(&self, fragments: &'a [TextFragment], keyword: &str) -> Option<&'a TextFragment>;
}

/// First fragment, in recognizer order, whose lowercased text contains the keyword
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatch;

impl MatchStrategy for FirstMatch {
    fn locate<'a>(&self, fragments: &'a [TextFragment], keyword: &str) -> Option<&'a TextFragment> {
        fragments
            .iter()
            .find(|fragment| fragment.text.to_lowercase().contains(keyword))
    }
}

/// Structured fields read from the card; each one independently optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuing_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
}

impl ExtractedFields {
    /// Value of one field
    pub fn get(&self, kind: FieldKind) -> Option<&str> {
        match kind {
            FieldKind::IssuingDate => self.issuing_date.as_deref(),
            FieldKind::ExpiryDate => self.expiry_date.as_deref(),
            FieldKind::IdNumber => self.id_number.as_deref(),
        }
    }

    fn set(&mut self, kind: FieldKind, value: String) {
        match kind {
            FieldKind::IssuingDate => self.issuing_date = Some(value),
            FieldKind::ExpiryDate => self.expiry_date = Some(value),
            FieldKind::IdNumber => self.id_number = Some(value),
        }
    }

    /// Number of fields present
    pub fn found_count(&self) -> usize {
        FieldKind::ALL.iter().filter(|k| self.get(**k).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.found_count() == 0
    }
}

/// Keyword-anchored extractor with a pluggable matching strategy
pub struct FieldExtractor {
    strategy: Box<dyn MatchStrategy>,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    /// Extractor using first-match anchoring
    pub fn new() -> Self {
        Self::with_strategy(FirstMatch)
    }

    pub fn with_strategy(strategy: impl MatchStrategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    /// Extract all fields; never fails
    pub fn extract(&self, fragments: &[TextFragment]) -> ExtractedFields {
        let mut fields = ExtractedFields::default();

        for kind in FieldKind::ALL {
            let Some(anchor) = self.strategy.locate(fragments, kind.keyword()) else {
                debug!("No fragment mentions '{}'", kind.keyword());
                continue;
            };

            match kind.pattern().find(&anchor.text) {
                Some(m) => fields.set(kind, m.as_str().to_string()),
                None => debug!("'{}' found but value is malformed: {:?}", kind.keyword(), anchor.text),
            }
        }

        fields
    }
}
