//! Answer record and the typed values it holds.
//!
//! The record is the single piece of mutable session data. It is created
//! empty, mutated only through [`crate::Wizard::select`], and replaced
//! wholesale on reset.

use crate::steps::Step;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Key of the exclusive "no evidence" option for price reasonableness.
pub const PRICE_NONE_KEY: &str = "none";

/// Error when a selection key is not part of a field's domain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {field} value: {value}")]
pub struct KeyParseError {
    pub field: &'static str,
    pub value: String,
}

impl KeyParseError {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// Enum-valued answers
// ============================================================================

/// Estimated dollar amount of the procurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmountTier {
    #[serde(rename = "under_10k", alias = "less_than_10k")]
    Under10k,
    #[serde(rename = "10k_to_200k")]
    From10kTo200k,
    #[serde(rename = "above_200k")]
    Above200k,
}

impl AmountTier {
    pub const ALL: [AmountTier; 3] = [
        AmountTier::Under10k,
        AmountTier::From10kTo200k,
        AmountTier::Above200k,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AmountTier::Under10k => "under_10k",
            AmountTier::From10kTo200k => "10k_to_200k",
            AmountTier::Above200k => "above_200k",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AmountTier::Under10k => "Less than $10,000",
            AmountTier::From10kTo200k => "$10,000 to $200,000",
            AmountTier::Above200k => "$200,000 and above",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            AmountTier::Under10k => "Delegated authority threshold",
            AmountTier::From10kTo200k => "Standard sole source documentation required",
            AmountTier::Above200k => "Additional approval required",
        }
    }
}

impl fmt::Display for AmountTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AmountTier {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "under_10k" | "less_than_10k" => Ok(AmountTier::Under10k),
            "10k_to_200k" => Ok(AmountTier::From10kTo200k),
            "above_200k" => Ok(AmountTier::Above200k),
            _ => Err(KeyParseError::new("amount", s)),
        }
    }
}

/// Whether the good or service is available from a single vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleSource {
    Yes,
    No,
    Unsure,
}

impl SingleSource {
    pub const ALL: [SingleSource; 3] = [SingleSource::Yes, SingleSource::No, SingleSource::Unsure];

    pub fn as_str(&self) -> &'static str {
        match self {
            SingleSource::Yes => "yes",
            SingleSource::No => "no",
            SingleSource::Unsure => "unsure",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SingleSource::Yes => "Yes, only one vendor can provide it",
            SingleSource::No => "No, multiple vendors can provide it",
            SingleSource::Unsure => "Not sure",
        }
    }
}

impl fmt::Display for SingleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SingleSource {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(SingleSource::Yes),
            "no" => Ok(SingleSource::No),
            "unsure" => Ok(SingleSource::Unsure),
            _ => Err(KeyParseError::new("single_source", s)),
        }
    }
}

/// Whether alternative vendors or products were researched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternativesResearched {
    Yes,
    No,
}

impl AlternativesResearched {
    pub const ALL: [AlternativesResearched; 2] =
        [AlternativesResearched::Yes, AlternativesResearched::No];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlternativesResearched::Yes => "yes",
            AlternativesResearched::No => "no",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlternativesResearched::Yes => "Yes, alternatives were researched",
            AlternativesResearched::No => "No, alternatives were not researched",
        }
    }
}

impl fmt::Display for AlternativesResearched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AlternativesResearched {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(AlternativesResearched::Yes),
            "no" => Ok(AlternativesResearched::No),
            _ => Err(KeyParseError::new("alternatives_researched", s)),
        }
    }
}

// ============================================================================
// Field - addressable answer slots
// ============================================================================

/// A field of the answer record, addressable by `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Amount,
    SingleSource,
    Justification,
    AlternativesResearched,
    #[serde(rename = "alternatives_reason_options")]
    AlternativeReasons,
    PriceReasonable,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Amount,
        Field::SingleSource,
        Field::Justification,
        Field::AlternativesResearched,
        Field::AlternativeReasons,
        Field::PriceReasonable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Amount => "amount",
            Field::SingleSource => "single_source",
            Field::Justification => "justification",
            Field::AlternativesResearched => "alternatives_researched",
            Field::AlternativeReasons => "alternatives_reason_options",
            Field::PriceReasonable => "price_reasonable",
        }
    }

    /// The step on which this field is asked.
    pub fn step(&self) -> Step {
        match self {
            Field::Amount => Step::Amount,
            Field::SingleSource => Step::SingleSource,
            Field::Justification => Step::Justification,
            Field::AlternativesResearched | Field::AlternativeReasons => Step::Alternatives,
            Field::PriceReasonable => Step::PriceReasonableness,
        }
    }

    /// Set-valued fields toggle membership; the rest overwrite.
    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            Field::Justification | Field::AlternativeReasons | Field::PriceReasonable
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Field {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| KeyParseError::new("field", s))
    }
}

// ============================================================================
// Answer Record
// ============================================================================

/// Answers accumulated over the five steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<AmountTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_source: Option<SingleSource>,
    #[serde(default)]
    pub justification: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives_researched: Option<AlternativesResearched>,
    #[serde(default)]
    pub alternatives_reason_options: BTreeSet<String>,
    #[serde(default)]
    pub price_reasonable: BTreeSet<String>,
}

impl AnswerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completeness predicate gating `advance()` from `step`.
    pub fn is_step_complete(&self, step: Step) -> bool {
        match step {
            Step::Amount => self.amount.is_some(),
            Step::SingleSource => self.single_source.is_some(),
            Step::Justification => !self.justification.is_empty(),
            // The reason sub-question never blocks.
            Step::Alternatives => self.alternatives_researched.is_some(),
            Step::PriceReasonableness => !self.price_reasonable.is_empty(),
        }
    }

    /// Whether the reason sub-question of step 4 is visible.
    pub fn reasons_visible(&self) -> bool {
        self.alternatives_researched == Some(AlternativesResearched::No)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether `key` is currently selected for `field`.
    pub fn is_selected(&self, field: Field, key: &str) -> bool {
        match field {
            Field::Amount => self.amount.map(|a| a.as_str() == key).unwrap_or(false),
            Field::SingleSource => self.single_source.map(|s| s.as_str() == key).unwrap_or(false),
            Field::AlternativesResearched => self
                .alternatives_researched
                .map(|a| a.as_str() == key)
                .unwrap_or(false),
            Field::Justification | Field::AlternativeReasons | Field::PriceReasonable => {
                self.set(field).map(|s| s.contains(key)).unwrap_or(false)
            }
        }
    }

    pub(crate) fn set(&self, field: Field) -> Option<&BTreeSet<String>> {
        match field {
            Field::Justification => Some(&self.justification),
            Field::AlternativeReasons => Some(&self.alternatives_reason_options),
            Field::PriceReasonable => Some(&self.price_reasonable),
            _ => None,
        }
    }

    /// Apply a value that has already been validated against the field's
    /// domain.
    pub(crate) fn apply(&mut self, field: Field, value: &str) -> Result<(), KeyParseError> {
        match field {
            Field::Amount => self.amount = Some(value.parse()?),
            Field::SingleSource => self.single_source = Some(value.parse()?),
            Field::AlternativesResearched => {
                let answer: AlternativesResearched = value.parse()?;
                if answer == AlternativesResearched::Yes {
                    self.alternatives_reason_options.clear();
                }
                self.alternatives_researched = Some(answer);
            }
            Field::Justification => toggle(&mut self.justification, value),
            Field::AlternativeReasons => toggle(&mut self.alternatives_reason_options, value),
            Field::PriceReasonable => {
                if value == PRICE_NONE_KEY {
                    let had_none = self.price_reasonable.contains(PRICE_NONE_KEY);
                    self.price_reasonable.clear();
                    if !had_none {
                        self.price_reasonable.insert(PRICE_NONE_KEY.to_string());
                    }
                } else {
                    self.price_reasonable.remove(PRICE_NONE_KEY);
                    toggle(&mut self.price_reasonable, value);
                }
            }
        }
        Ok(())
    }
}

fn toggle(set: &mut BTreeSet<String>, value: &str) {
    if !set.remove(value) {
        set.insert(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_accepts_legacy_key() {
        assert_eq!("less_than_10k".parse::<AmountTier>().unwrap(), AmountTier::Under10k);
        let decoded: AmountTier = serde_json::from_str("\"less_than_10k\"").unwrap();
        assert_eq!(decoded, AmountTier::Under10k);
        assert_eq!(serde_json::to_string(&decoded).unwrap(), "\"under_10k\"");
    }

    #[test]
    fn test_field_parse() {
        assert_eq!(
            "alternatives_reason_options".parse::<Field>().unwrap(),
            Field::AlternativeReasons
        );
        assert!("budget".parse::<Field>().is_err());
    }

    #[test]
    fn test_completeness_predicates() {
        let mut record = AnswerRecord::new();
        for step in Step::ALL {
            assert!(!record.is_step_complete(step));
        }

        record.apply(Field::Amount, "above_200k").unwrap();
        record.apply(Field::SingleSource, "unsure").unwrap();
        record.apply(Field::Justification, "proprietary_technology").unwrap();
        record.apply(Field::AlternativesResearched, "no").unwrap();
        record.apply(Field::PriceReasonable, "quote_comparison").unwrap();

        for step in Step::ALL {
            assert!(record.is_step_complete(step), "{} incomplete", step);
        }
    }

    #[test]
    fn test_set_fields_toggle() {
        let mut record = AnswerRecord::new();
        record.apply(Field::Justification, "a").unwrap();
        record.apply(Field::Justification, "b").unwrap();
        record.apply(Field::Justification, "a").unwrap();
        assert_eq!(record.justification.len(), 1);
        assert!(record.is_selected(Field::Justification, "b"));
    }

    #[test]
    fn test_researched_yes_clears_reasons() {
        let mut record = AnswerRecord::new();
        record.apply(Field::AlternativesResearched, "no").unwrap();
        record.apply(Field::AlternativeReasons, "time_constraints").unwrap();
        assert!(record.reasons_visible());

        record.apply(Field::AlternativesResearched, "yes").unwrap();
        assert!(record.alternatives_reason_options.is_empty());
        assert!(!record.reasons_visible());
    }

    #[test]
    fn test_price_none_is_exclusive() {
        let mut record = AnswerRecord::new();
        record.apply(Field::PriceReasonable, "quote_comparison").unwrap();
        record.apply(Field::PriceReasonable, "catalog_pricing").unwrap();
        record.apply(Field::PriceReasonable, PRICE_NONE_KEY).unwrap();
        assert_eq!(record.price_reasonable.len(), 1);
        assert!(record.is_selected(Field::PriceReasonable, PRICE_NONE_KEY));

        record.apply(Field::PriceReasonable, "catalog_pricing").unwrap();
        assert!(!record.is_selected(Field::PriceReasonable, PRICE_NONE_KEY));
        assert_eq!(record.price_reasonable.len(), 1);
    }

    #[test]
    fn test_rejected_value_leaves_record_untouched() {
        let mut record = AnswerRecord::new();
        assert!(record.apply(Field::SingleSource, "maybe").is_err());
        assert!(record.is_empty());
    }
}
