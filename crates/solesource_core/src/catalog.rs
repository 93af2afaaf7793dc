//! Option catalogs.
//!
//! Every selectable key maps to a display label and, for justifications and
//! alternative-research reasons, a category tag. The engine classifies
//! answers by tag only, so a catalog can be swapped without touching the
//! scoring rules.

use crate::record::{AlternativesResearched, AmountTier, Field, SingleSource, PRICE_NONE_KEY};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// How a justification bears on sole-source eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JustificationCategory {
    Valid,
    Invalid,
    Unsure,
}

impl JustificationCategory {
    pub const ALL: [JustificationCategory; 3] = [
        JustificationCategory::Valid,
        JustificationCategory::Invalid,
        JustificationCategory::Unsure,
    ];

    pub fn heading(&self) -> &'static str {
        match self {
            JustificationCategory::Valid => "Acceptable justifications",
            JustificationCategory::Invalid => "Justifications that do not support a sole source",
            JustificationCategory::Unsure => "Uncertain justifications",
        }
    }
}

impl fmt::Display for JustificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JustificationCategory::Valid => "valid",
            JustificationCategory::Invalid => "invalid",
            JustificationCategory::Unsure => "unsure",
        };
        write!(f, "{}", s)
    }
}

/// Persuasive weight of a reason for not researching alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonWeight {
    Strong,
    Neutral,
    Weak,
}

impl ReasonWeight {
    pub const ALL: [ReasonWeight; 3] = [ReasonWeight::Strong, ReasonWeight::Neutral, ReasonWeight::Weak];

    pub fn heading(&self) -> &'static str {
        match self {
            ReasonWeight::Strong => "Strong reasons",
            ReasonWeight::Neutral => "Supporting reasons",
            ReasonWeight::Weak => "Weak reasons",
        }
    }
}

impl fmt::Display for ReasonWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasonWeight::Strong => "strong",
            ReasonWeight::Neutral => "neutral",
            ReasonWeight::Weak => "weak",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JustificationEntry {
    pub key: String,
    pub label: String,
    pub category: JustificationCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonEntry {
    pub key: String,
    pub label: String,
    pub weight: ReasonWeight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceMethodEntry {
    pub key: String,
    pub label: String,
}

/// A selectable option as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDescriptor {
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl OptionDescriptor {
    fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Errors found when validating a catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog for {0} is empty")]
    Empty(Field),

    #[error("duplicate key '{key}' in {field} catalog")]
    DuplicateKey { field: Field, key: String },

    #[error("key '{0}' is reserved for the price reasonableness 'none' option")]
    ReservedKey(String),
}

/// Label of the price reasonableness sentinel option.
pub const PRICE_NONE_LABEL: &str = "None of the above / price has not been evaluated";

/// The full option catalog for the questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub justifications: Vec<JustificationEntry>,
    pub alternative_reasons: Vec<ReasonEntry>,
    pub price_methods: Vec<PriceMethodEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            justifications: default_justifications(),
            alternative_reasons: default_alternative_reasons(),
            price_methods: default_price_methods(),
        }
    }
}

impl Catalog {
    /// Check that keys are unique per field and lists are non-empty.
    pub fn validate(&self) -> Result<(), CatalogError> {
        check_keys(
            Field::Justification,
            self.justifications.iter().map(|e| e.key.as_str()),
        )?;
        check_keys(
            Field::AlternativeReasons,
            self.alternative_reasons.iter().map(|e| e.key.as_str()),
        )?;
        check_keys(
            Field::PriceReasonable,
            self.price_methods.iter().map(|e| e.key.as_str()),
        )?;
        if let Some(entry) = self.price_methods.iter().find(|e| e.key == PRICE_NONE_KEY) {
            return Err(CatalogError::ReservedKey(entry.key.clone()));
        }
        Ok(())
    }

    pub fn justification_category(&self, key: &str) -> Option<JustificationCategory> {
        self.justifications
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.category)
    }

    pub fn reason_weight(&self, key: &str) -> Option<ReasonWeight> {
        self.alternative_reasons
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.weight)
    }

    /// The options offered for `field`, in display order.
    pub fn options(&self, field: Field) -> Vec<OptionDescriptor> {
        match field {
            Field::Amount => AmountTier::ALL
                .iter()
                .map(|a| OptionDescriptor::new(a.as_str(), a.label()).with_hint(a.hint()))
                .collect(),
            Field::SingleSource => SingleSource::ALL
                .iter()
                .map(|s| OptionDescriptor::new(s.as_str(), s.label()))
                .collect(),
            Field::AlternativesResearched => AlternativesResearched::ALL
                .iter()
                .map(|a| OptionDescriptor::new(a.as_str(), a.label()))
                .collect(),
            Field::Justification => self
                .justifications
                .iter()
                .map(|e| OptionDescriptor::new(&e.key, &e.label))
                .collect(),
            Field::AlternativeReasons => self
                .alternative_reasons
                .iter()
                .map(|e| OptionDescriptor::new(&e.key, &e.label))
                .collect(),
            Field::PriceReasonable => self
                .price_methods
                .iter()
                .map(|e| OptionDescriptor::new(&e.key, &e.label))
                .chain(std::iter::once(OptionDescriptor::new(
                    PRICE_NONE_KEY,
                    PRICE_NONE_LABEL,
                )))
                .collect(),
        }
    }

    /// Whether `key` is a legal selection for `field`.
    pub fn contains(&self, field: Field, key: &str) -> bool {
        self.label(field, key).is_some()
    }

    /// Display label for a selection key.
    pub fn label(&self, field: Field, key: &str) -> Option<&str> {
        match field {
            Field::Amount => key.parse::<AmountTier>().ok().map(|a| a.label()),
            Field::SingleSource => key.parse::<SingleSource>().ok().map(|s| s.label()),
            Field::AlternativesResearched => {
                key.parse::<AlternativesResearched>().ok().map(|a| a.label())
            }
            Field::Justification => self
                .justifications
                .iter()
                .find(|e| e.key == key)
                .map(|e| e.label.as_str()),
            Field::AlternativeReasons => self
                .alternative_reasons
                .iter()
                .find(|e| e.key == key)
                .map(|e| e.label.as_str()),
            Field::PriceReasonable if key == PRICE_NONE_KEY => Some(PRICE_NONE_LABEL),
            Field::PriceReasonable => self
                .price_methods
                .iter()
                .find(|e| e.key == key)
                .map(|e| e.label.as_str()),
        }
    }
}

fn check_keys<'a>(field: Field, keys: impl Iterator<Item = &'a str>) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(CatalogError::DuplicateKey {
                field,
                key: key.to_string(),
            });
        }
    }
    if seen.is_empty() {
        return Err(CatalogError::Empty(field));
    }
    Ok(())
}

fn justification(key: &str, label: &str, category: JustificationCategory) -> JustificationEntry {
    JustificationEntry {
        key: key.to_string(),
        label: label.to_string(),
        category,
    }
}

fn reason(key: &str, label: &str, weight: ReasonWeight) -> ReasonEntry {
    ReasonEntry {
        key: key.to_string(),
        label: label.to_string(),
        weight,
    }
}

fn price_method(key: &str, label: &str) -> PriceMethodEntry {
    PriceMethodEntry {
        key: key.to_string(),
        label: label.to_string(),
    }
}

pub fn default_justifications() -> Vec<JustificationEntry> {
    use JustificationCategory::*;
    vec![
        justification(
            "proprietary_technology",
            "Proprietary or patented product available from only one source",
            Valid,
        ),
        justification(
            "compatibility",
            "Must be compatible with existing equipment, software, or systems",
            Valid,
        ),
        justification(
            "unique_capability",
            "Unique features or performance required by the project",
            Valid,
        ),
        justification(
            "sponsor_requirement",
            "Sponsor or grant agreement names the vendor",
            Valid,
        ),
        justification(
            "exclusive_distributor",
            "Manufacturer sells only through one exclusive distributor",
            Valid,
        ),
        justification(
            "emergency",
            "Emergency that does not permit the delay of competition",
            Valid,
        ),
        justification(
            "vendor_preference",
            "Preference for a particular vendor or brand",
            Invalid,
        ),
        justification(
            "prior_relationship",
            "Existing or previous relationship with the vendor",
            Invalid,
        ),
        justification("lowest_price", "The vendor offered the lowest price", Invalid),
        justification(
            "avoid_competition",
            "Avoiding the time needed to compete the purchase",
            Invalid,
        ),
        justification(
            "fiscal_year_end",
            "Funds must be spent before the end of the fiscal year",
            Invalid,
        ),
        justification("not_sure", "Not sure which justification applies", Unsure),
    ]
}

pub fn default_alternative_reasons() -> Vec<ReasonEntry> {
    use ReasonWeight::*;
    vec![
        reason(
            "no_comparable_products",
            "No comparable product or service exists on the market",
            Strong,
        ),
        reason(
            "specialized_requirements",
            "Specialized requirements rule out other options",
            Strong,
        ),
        reason(
            "continuation_of_work",
            "Continuation of work already performed by the vendor",
            Neutral,
        ),
        reason(
            "colleague_recommendation",
            "Vendor was recommended by a colleague",
            Neutral,
        ),
        reason(
            "time_constraints",
            "Not enough time to research alternatives",
            Weak,
        ),
        reason(
            "unaware_of_requirement",
            "Did not know research was required",
            Weak,
        ),
    ]
}

pub fn default_price_methods() -> Vec<PriceMethodEntry> {
    vec![
        price_method(
            "quote_comparison",
            "Compared with quotes or prior purchases of similar items",
        ),
        price_method("catalog_pricing", "Published catalog or list pricing"),
        price_method(
            "market_research",
            "Market research on prices of comparable products",
        ),
        price_method("cost_analysis", "Independent cost estimate or cost analysis"),
        price_method(
            "discount_verified",
            "Educational, government, or volume discount verified",
        ),
    ]
}
