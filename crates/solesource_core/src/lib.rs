//! Sole source eligibility questionnaire.
//!
//! A five-step [`Wizard`] collects an [`AnswerRecord`], the engine turns the
//! finished record into a [`Determination`], and the report and export
//! modules format the outcome for the user.

pub mod catalog;
pub mod engine;
pub mod export;
pub mod record;
pub mod report;
pub mod steps;
pub mod wizard;

pub use catalog::{
    Catalog, CatalogError, JustificationCategory, JustificationEntry, OptionDescriptor,
    PriceMethodEntry, ReasonEntry, ReasonWeight,
};
pub use engine::{evaluate, Determination, DeterminationCode, ScoreComponent, ScoreRule};
pub use export::{
    render_document, render_text, Artifact, DocumentLayout, Downloader, ExportError, FsDownloader,
};
pub use record::{
    AlternativesResearched, AmountTier, AnswerRecord, Field, KeyParseError, SingleSource,
    PRICE_NONE_KEY,
};
pub use report::{format_report, format_report_now, ReportProfile};
pub use steps::{ChoiceKind, Step, StepDescriptor, StepView, STEPS, TOTAL_STEPS};
pub use wizard::{StateTransition, Wizard, WizardError, WizardOptions, WizardState};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one questionnaire session in logs and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First eight hex digits, for filenames.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}
