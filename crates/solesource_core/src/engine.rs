//! Determination engine.
//!
//! Weighted scoring over the answer record. The exemption tier short-circuits
//! before any scoring; every other record accumulates points per rule and is
//! mapped onto a tier, highest first.

use crate::catalog::{Catalog, JustificationCategory};
use crate::record::{AlternativesResearched, AmountTier, AnswerRecord, SingleSource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum score per tier, checked in order.
const LIKELY_SOLE_SOURCE_MIN: i32 = 7;
const NEEDS_REVIEW_MIN: i32 = 4;
const INCONCLUSIVE_MIN: i32 = 1;

/// Classified outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeterminationCode {
    DelegatedAuthority,
    LikelySoleSource,
    NeedsFurtherReview,
    Inconclusive,
    NotLikelySoleSource,
}

impl DeterminationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeterminationCode::DelegatedAuthority => "delegated_authority",
            DeterminationCode::LikelySoleSource => "likely_sole_source",
            DeterminationCode::NeedsFurtherReview => "needs_further_review",
            DeterminationCode::Inconclusive => "inconclusive",
            DeterminationCode::NotLikelySoleSource => "not_likely_sole_source",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DeterminationCode::DelegatedAuthority => "Delegated Authority",
            DeterminationCode::LikelySoleSource => "Likely Sole Source",
            DeterminationCode::NeedsFurtherReview => "Needs Further Review",
            DeterminationCode::Inconclusive => "Inconclusive",
            DeterminationCode::NotLikelySoleSource => "Not Likely Sole Source",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DeterminationCode::DelegatedAuthority => {
                "Procurements under $10,000 fall within your department's delegated purchasing \
                 authority. No sole source justification is needed; follow your department's \
                 standard purchasing procedures."
            }
            DeterminationCode::LikelySoleSource => {
                "Based on your responses, your procurement may qualify as a sole source. Please \
                 complete the documentation form and consult Procurement Services as needed."
            }
            DeterminationCode::NeedsFurtherReview => {
                "Your responses partly support a sole source, but some answers weaken the \
                 justification. Strengthen your documentation and consult Procurement Services \
                 before proceeding."
            }
            DeterminationCode::Inconclusive => {
                "Your responses neither clearly support nor rule out a sole source. Gather more \
                 information about alternatives and pricing, then consult Procurement Services."
            }
            DeterminationCode::NotLikelySoleSource => {
                "Based on your responses, this procurement does not appear to qualify as a sole \
                 source. A competitive process is likely required; contact Procurement Services \
                 for guidance."
            }
        }
    }

    /// Tier for a final score.
    pub fn for_score(score: i32) -> Self {
        if score >= LIKELY_SOLE_SOURCE_MIN {
            DeterminationCode::LikelySoleSource
        } else if score >= NEEDS_REVIEW_MIN {
            DeterminationCode::NeedsFurtherReview
        } else if score >= INCONCLUSIVE_MIN {
            DeterminationCode::Inconclusive
        } else {
            DeterminationCode::NotLikelySoleSource
        }
    }
}

impl fmt::Display for DeterminationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scoring rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRule {
    Amount,
    SingleSource,
    Justification,
    UnsureJustification,
    Alternatives,
    PriceReasonableness,
}

impl ScoreRule {
    pub fn description(&self) -> &'static str {
        match self {
            ScoreRule::Amount => "Procurement amount",
            ScoreRule::SingleSource => "Single source status",
            ScoreRule::Justification => "Justification strength",
            ScoreRule::UnsureJustification => "Uncertain justification",
            ScoreRule::Alternatives => "Alternatives research",
            ScoreRule::PriceReasonableness => "Price reasonableness evidence",
        }
    }
}

/// Points contributed by one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub rule: ScoreRule,
    pub points: i32,
}

/// Result of evaluating a record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Determination {
    pub code: DeterminationCode,
    pub title: String,
    pub message: String,
    /// `None` for the exemption, which is not scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<ScoreComponent>,
}

impl Determination {
    fn new(code: DeterminationCode) -> Self {
        Self {
            code,
            title: code.title().to_string(),
            message: code.message().to_string(),
            score: None,
            breakdown: Vec::new(),
        }
    }

    fn scored(breakdown: Vec<ScoreComponent>) -> Self {
        let score = breakdown.iter().map(|c| c.points).sum();
        Self {
            score: Some(score),
            breakdown,
            ..Self::new(DeterminationCode::for_score(score))
        }
    }

    /// The delegated-authority result for the low amount tier.
    pub fn delegated_authority() -> Self {
        Self::new(DeterminationCode::DelegatedAuthority)
    }
}

/// Which justification categories appear in a selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JustificationProfile {
    pub has_valid: bool,
    pub has_invalid: bool,
    pub has_unsure: bool,
}

/// Classify selected justifications by catalog tag. Keys the catalog does
/// not know are neither valid nor unsure, so they count as invalid.
pub fn classify_justifications(record: &AnswerRecord, catalog: &Catalog) -> JustificationProfile {
    let mut profile = JustificationProfile::default();
    for key in &record.justification {
        match catalog.justification_category(key) {
            Some(JustificationCategory::Valid) => profile.has_valid = true,
            Some(JustificationCategory::Unsure) => profile.has_unsure = true,
            Some(JustificationCategory::Invalid) | None => profile.has_invalid = true,
        }
    }
    profile
}

/// Evaluate a record. Total over every record, including empty ones.
pub fn evaluate(record: &AnswerRecord, catalog: &Catalog) -> Determination {
    if record.amount == Some(AmountTier::Under10k) {
        return Determination::delegated_authority();
    }

    let mut breakdown = Vec::with_capacity(6);

    let amount = match record.amount {
        Some(AmountTier::Above200k) => -1,
        _ => 0,
    };
    breakdown.push(ScoreComponent {
        rule: ScoreRule::Amount,
        points: amount,
    });

    let single_source = match record.single_source {
        Some(SingleSource::Yes) => 3,
        Some(SingleSource::No) => -3,
        Some(SingleSource::Unsure) => -1,
        None => 0,
    };
    breakdown.push(ScoreComponent {
        rule: ScoreRule::SingleSource,
        points: single_source,
    });

    let profile = classify_justifications(record, catalog);
    let justification = match (profile.has_valid, profile.has_invalid, profile.has_unsure) {
        (true, false, false) => 2,
        (true, true, _) => 1,
        (false, true, _) => -2,
        _ => 0,
    };
    breakdown.push(ScoreComponent {
        rule: ScoreRule::Justification,
        points: justification,
    });
    if profile.has_unsure {
        breakdown.push(ScoreComponent {
            rule: ScoreRule::UnsureJustification,
            points: -1,
        });
    }

    let alternatives = match record.alternatives_researched {
        Some(AlternativesResearched::Yes) => 2,
        Some(AlternativesResearched::No) if !record.alternatives_reason_options.is_empty() => 1,
        _ => 0,
    };
    breakdown.push(ScoreComponent {
        rule: ScoreRule::Alternatives,
        points: alternatives,
    });

    let price = if record.price_reasonable.len() >= 2 { 2 } else { 0 };
    breakdown.push(ScoreComponent {
        rule: ScoreRule::PriceReasonableness,
        points: price,
    });

    Determination::scored(breakdown)
}
