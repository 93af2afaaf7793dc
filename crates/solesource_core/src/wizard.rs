//! Wizard state machine.
//!
//! Owns the current step, the answer record and the determination. All
//! mutation goes through [`Wizard::select`]; navigation is gated by the
//! per-step completeness predicates on [`AnswerRecord`].

use crate::catalog::Catalog;
use crate::engine::{self, Determination};
use crate::record::{AmountTier, AnswerRecord, Field};
use crate::steps::{Step, StepView};
use crate::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

// ============================================================================
// Wizard State
// ============================================================================

/// Position of the wizard: one of the five steps, or submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardState {
    Step(Step),
    Submitted,
}

impl WizardState {
    pub const INITIAL: WizardState = WizardState::Step(Step::Amount);

    pub fn step(&self) -> Option<Step> {
        match self {
            WizardState::Step(step) => Some(*step),
            WizardState::Submitted => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WizardState::Submitted)
    }
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardState::Step(step) => write!(f, "{}", step),
            WizardState::Submitted => write!(f, "submitted"),
        }
    }
}

// ============================================================================
// State Transition
// ============================================================================

/// A navigation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: WizardState,
    pub to: WizardState,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StateTransition {
    pub fn new(from: WizardState, to: WizardState) -> Self {
        Self {
            from,
            to,
            timestamp: Utc::now(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Contract violations. A rejected call leaves the wizard untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("{0} is incomplete")]
    StepIncomplete(Step),

    #[error("already at the first step")]
    AtFirstStep,

    #[error("questionnaire already submitted; reset to start over")]
    AlreadySubmitted,

    #[error("{requested} is not the current step ({current})")]
    NotCurrentStep { requested: Step, current: Step },

    #[error("field {field} does not belong to {step}")]
    FieldNotOnStep { field: Field, step: Step },

    #[error("'{value}' is not an option for {field}")]
    UnknownOption { field: Field, value: String },

    #[error("{0} is hidden by the current answers")]
    HiddenQuestion(Field),
}

// ============================================================================
// Wizard
// ============================================================================

/// Behaviour switches for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardOptions {
    /// Jump straight to the delegated-authority result when step 1 is
    /// answered with the lowest amount tier.
    pub exemption_short_circuit: bool,
}

impl Default for WizardOptions {
    fn default() -> Self {
        Self {
            exemption_short_circuit: true,
        }
    }
}

/// One questionnaire session.
#[derive(Debug, Clone)]
pub struct Wizard {
    session_id: SessionId,
    catalog: Arc<Catalog>,
    options: WizardOptions,
    state: WizardState,
    record: AnswerRecord,
    result: Option<Determination>,
    history: Vec<StateTransition>,
}

impl Wizard {
    /// Start a session at step 1 with an empty record.
    pub fn new(catalog: Arc<Catalog>, options: WizardOptions) -> Self {
        Self {
            session_id: SessionId::new(),
            catalog,
            options,
            state: WizardState::INITIAL,
            record: AnswerRecord::new(),
            result: None,
            history: Vec::new(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> WizardOptions {
        self.options
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn record(&self) -> &AnswerRecord {
        &self.record
    }

    /// The determination, once submitted.
    pub fn result(&self) -> Option<&Determination> {
        self.result.as_ref()
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Whether `advance()` is currently legal.
    pub fn can_advance(&self) -> bool {
        self.state
            .step()
            .map(|step| self.record.is_step_complete(step))
            .unwrap_or(false)
    }

    /// Whether `retreat()` is currently legal.
    pub fn can_retreat(&self) -> bool {
        self.state.step().map(|step| !step.is_first()).unwrap_or(false)
    }

    /// Render data for the current step, or `None` once submitted.
    pub fn view(&self) -> Option<StepView> {
        self.state
            .step()
            .map(|step| StepView::build(step, &self.catalog, &self.record))
    }

    /// Record an answer for `field` on `step` and report whether the current
    /// step is complete afterwards.
    ///
    /// Enum fields overwrite; set fields toggle membership.
    pub fn select(&mut self, step: Step, field: Field, value: &str) -> Result<bool, WizardError> {
        let current = self.current_step()?;
        if step != current {
            return Err(WizardError::NotCurrentStep {
                requested: step,
                current,
            });
        }
        if field.step() != step {
            return Err(WizardError::FieldNotOnStep { field, step });
        }
        if field == Field::AlternativeReasons && !self.record.reasons_visible() {
            return Err(WizardError::HiddenQuestion(field));
        }
        if !self.catalog.contains(field, value) {
            return Err(WizardError::UnknownOption {
                field,
                value: value.to_string(),
            });
        }

        self.record
            .apply(field, value)
            .map_err(|_| WizardError::UnknownOption {
                field,
                value: value.to_string(),
            })?;

        let complete = self.record.is_step_complete(step);
        debug!(
            session = %self.session_id,
            %step,
            %field,
            value,
            complete,
            "selection recorded"
        );
        Ok(complete)
    }

    /// Move forward one step, or evaluate and submit from the last step.
    pub fn advance(&mut self) -> Result<WizardState, WizardError> {
        let current = self.current_step()?;
        if !self.record.is_step_complete(current) {
            return Err(WizardError::StepIncomplete(current));
        }

        let exempt = current.is_first()
            && self.options.exemption_short_circuit
            && self.record.amount == Some(AmountTier::Under10k);

        let transition = match current.next() {
            _ if exempt => {
                self.submit(Determination::delegated_authority());
                StateTransition::new(WizardState::Step(current), WizardState::Submitted)
                    .with_reason("delegated authority exemption")
            }
            Some(next) => {
                self.state = WizardState::Step(next);
                StateTransition::new(WizardState::Step(current), self.state)
            }
            None => {
                let result = engine::evaluate(&self.record, &self.catalog);
                self.submit(result);
                StateTransition::new(WizardState::Step(current), WizardState::Submitted)
            }
        };

        debug!(session = %self.session_id, from = %transition.from, to = %transition.to, "advance");
        self.history.push(transition);
        Ok(self.state)
    }

    /// Move back one step. Answers are kept.
    pub fn retreat(&mut self) -> Result<WizardState, WizardError> {
        let current = self.current_step()?;
        let previous = current.previous().ok_or(WizardError::AtFirstStep)?;
        self.state = WizardState::Step(previous);

        let transition = StateTransition::new(WizardState::Step(current), self.state);
        debug!(session = %self.session_id, from = %transition.from, to = %transition.to, "retreat");
        self.history.push(transition);
        Ok(self.state)
    }

    /// Discard all answers and the result, and return to step 1. Legal from
    /// any state.
    ///
    /// The restarted questionnaire is a new session: it gets a fresh id and
    /// its history begins with the reset itself.
    pub fn reset(&mut self) -> WizardState {
        let transition = StateTransition::new(self.state, WizardState::INITIAL).with_reason("reset");
        let previous = std::mem::replace(&mut self.session_id, SessionId::new());
        self.state = WizardState::INITIAL;
        self.record = AnswerRecord::new();
        self.result = None;
        self.history = vec![transition];
        info!(session = %self.session_id, previous = %previous, "questionnaire reset");
        self.state
    }

    fn current_step(&self) -> Result<Step, WizardError> {
        self.state.step().ok_or(WizardError::AlreadySubmitted)
    }

    fn submit(&mut self, result: Determination) {
        info!(
            session = %self.session_id,
            code = %result.code,
            score = ?result.score,
            "questionnaire submitted"
        );
        self.result = Some(result);
        self.state = WizardState::Submitted;
    }
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new(Arc::new(Catalog::default()), WizardOptions::default())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DeterminationCode;

    fn answer(wizard: &mut Wizard, field: Field, value: &str) -> bool {
        wizard.select(field.step(), field, value).unwrap()
    }

    fn walk_to(wizard: &mut Wizard, target: Step) {
        let answers = [
            (Field::Amount, "10k_to_200k"),
            (Field::SingleSource, "yes"),
            (Field::Justification, "compatibility"),
            (Field::AlternativesResearched, "yes"),
        ];
        for (field, value) in answers {
            if field.step() == target {
                return;
            }
            answer(wizard, field, value);
            wizard.advance().unwrap();
        }
    }

    #[test]
    fn test_starts_at_step_one() {
        let wizard = Wizard::default();
        assert_eq!(wizard.state(), WizardState::Step(Step::Amount));
        assert!(wizard.record().is_empty());
        assert!(!wizard.can_advance());
        assert!(!wizard.can_retreat());
        assert!(wizard.result().is_none());
    }

    #[test]
    fn test_select_reports_completeness() {
        let mut wizard = Wizard::default();
        assert!(answer(&mut wizard, Field::Amount, "above_200k"));
        assert!(wizard.can_advance());
    }

    #[test]
    fn test_advance_rejected_when_incomplete() {
        let mut wizard = Wizard::default();
        let before = wizard.record().clone();
        assert_eq!(
            wizard.advance(),
            Err(WizardError::StepIncomplete(Step::Amount))
        );
        assert_eq!(wizard.state(), WizardState::Step(Step::Amount));
        assert_eq!(wizard.record(), &before);
        assert!(wizard.history().is_empty());
    }

    #[test]
    fn test_retreat_rejected_at_first_step() {
        let mut wizard = Wizard::default();
        assert_eq!(wizard.retreat(), Err(WizardError::AtFirstStep));
        assert_eq!(wizard.state(), WizardState::INITIAL);
    }

    #[test]
    fn test_select_rejects_other_step() {
        let mut wizard = Wizard::default();
        let result = wizard.select(Step::SingleSource, Field::SingleSource, "yes");
        assert_eq!(
            result,
            Err(WizardError::NotCurrentStep {
                requested: Step::SingleSource,
                current: Step::Amount
            })
        );
        assert!(wizard.record().is_empty());
    }

    #[test]
    fn test_select_rejects_field_from_other_step() {
        let mut wizard = Wizard::default();
        let result = wizard.select(Step::Amount, Field::SingleSource, "yes");
        assert_eq!(
            result,
            Err(WizardError::FieldNotOnStep {
                field: Field::SingleSource,
                step: Step::Amount
            })
        );
    }

    #[test]
    fn test_select_rejects_unknown_option() {
        let mut wizard = Wizard::default();
        let result = wizard.select(Step::Amount, Field::Amount, "a_lot");
        assert!(matches!(result, Err(WizardError::UnknownOption { .. })));
        assert!(wizard.record().is_empty());
    }

    #[test]
    fn test_hidden_reasons_rejected() {
        let mut wizard = Wizard::default();
        walk_to(&mut wizard, Step::Alternatives);

        let result = wizard.select(Step::Alternatives, Field::AlternativeReasons, "time_constraints");
        assert_eq!(result, Err(WizardError::HiddenQuestion(Field::AlternativeReasons)));

        answer(&mut wizard, Field::AlternativesResearched, "no");
        assert!(answer(&mut wizard, Field::AlternativeReasons, "time_constraints"));
    }

    #[test]
    fn test_researched_yes_clears_reasons_but_stays_complete() {
        let mut wizard = Wizard::default();
        walk_to(&mut wizard, Step::Alternatives);
        answer(&mut wizard, Field::AlternativesResearched, "no");
        answer(&mut wizard, Field::AlternativeReasons, "no_comparable_products");

        assert!(answer(&mut wizard, Field::AlternativesResearched, "yes"));
        assert!(wizard.record().alternatives_reason_options.is_empty());
    }

    #[test]
    fn test_retreat_keeps_answers() {
        let mut wizard = Wizard::default();
        walk_to(&mut wizard, Step::Justification);
        let before = wizard.record().clone();

        assert_eq!(wizard.retreat().unwrap(), WizardState::Step(Step::SingleSource));
        assert_eq!(wizard.record(), &before);
        assert!(wizard.can_advance());

        assert_eq!(wizard.advance().unwrap(), WizardState::Step(Step::Justification));
        assert_eq!(wizard.record(), &before);
    }

    #[test]
    fn test_full_walk_submits() {
        let mut wizard = Wizard::default();
        walk_to(&mut wizard, Step::PriceReasonableness);
        answer(&mut wizard, Field::PriceReasonable, "quote_comparison");
        answer(&mut wizard, Field::PriceReasonable, "catalog_pricing");

        assert_eq!(wizard.advance().unwrap(), WizardState::Submitted);
        let result = wizard.result().unwrap();
        assert_eq!(result.code, DeterminationCode::LikelySoleSource);
        assert_eq!(result.score, Some(9));
        assert_eq!(wizard.history().len(), 5);
        assert!(wizard.view().is_none());
    }

    #[test]
    fn test_exemption_short_circuit() {
        let mut wizard = Wizard::default();
        answer(&mut wizard, Field::Amount, "under_10k");

        assert_eq!(wizard.advance().unwrap(), WizardState::Submitted);
        assert_eq!(
            wizard.result().map(|r| r.code),
            Some(DeterminationCode::DelegatedAuthority)
        );
        assert_eq!(wizard.history()[0].reason.as_deref(), Some("delegated authority exemption"));
    }

    #[test]
    fn test_exemption_without_short_circuit_walks_all_steps() {
        let mut wizard = Wizard::new(
            Arc::new(Catalog::default()),
            WizardOptions {
                exemption_short_circuit: false,
            },
        );
        answer(&mut wizard, Field::Amount, "under_10k");
        assert_eq!(wizard.advance().unwrap(), WizardState::Step(Step::SingleSource));
    }

    #[test]
    fn test_submitted_record_is_frozen() {
        let mut wizard = Wizard::default();
        answer(&mut wizard, Field::Amount, "under_10k");
        wizard.advance().unwrap();
        let frozen = wizard.record().clone();

        assert_eq!(
            wizard.select(Step::Amount, Field::Amount, "above_200k"),
            Err(WizardError::AlreadySubmitted)
        );
        assert_eq!(wizard.advance(), Err(WizardError::AlreadySubmitted));
        assert_eq!(wizard.retreat(), Err(WizardError::AlreadySubmitted));
        assert_eq!(wizard.record(), &frozen);
    }

    #[test]
    fn test_reset_from_submitted() {
        let mut wizard = Wizard::default();
        answer(&mut wizard, Field::Amount, "under_10k");
        wizard.advance().unwrap();

        assert_eq!(wizard.reset(), WizardState::INITIAL);
        assert!(wizard.record().is_empty());
        assert!(wizard.result().is_none());
        assert_eq!(wizard.history().last().map(|t| t.from), Some(WizardState::Submitted));
    }

    #[test]
    fn test_reset_starts_new_session() {
        let mut wizard = Wizard::default();
        let first = wizard.session_id();
        answer(&mut wizard, Field::Amount, "under_10k");
        wizard.advance().unwrap();

        wizard.reset();
        let second = wizard.session_id();
        assert_ne!(first, second);
        assert_ne!(first.short(), second.short());

        answer(&mut wizard, Field::Amount, "under_10k");
        wizard.advance().unwrap();
        wizard.reset();
        assert_ne!(wizard.session_id(), second);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut wizard = Wizard::default();
        for _ in 0..3 {
            walk_to(&mut wizard, Step::PriceReasonableness);
            wizard.reset();
        }
        assert_eq!(wizard.history().len(), 1);
        assert_eq!(wizard.history()[0].reason.as_deref(), Some("reset"));
        assert_eq!(
            wizard.history()[0].from,
            WizardState::Step(Step::PriceReasonableness)
        );
    }

    #[test]
    fn test_reset_mid_session() {
        let mut wizard = Wizard::default();
        walk_to(&mut wizard, Step::Alternatives);
        wizard.reset();
        assert_eq!(wizard.state(), WizardState::INITIAL);
        assert_eq!(wizard.record(), &AnswerRecord::default());
    }

    #[test]
    fn test_state_serde_roundtrip() {
        let state = WizardState::Step(Step::Justification);
        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: WizardState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(state, decoded);
    }
}
