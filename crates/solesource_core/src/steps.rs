//! Static step descriptors.
//!
//! The five steps are declared once as data: title, prompt and the field
//! each one binds. A renderer combines a descriptor with the catalog and
//! the current record into a [`QuestionView`]; nothing here builds markup.

use crate::catalog::{Catalog, OptionDescriptor};
use crate::record::{AnswerRecord, Field};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of steps in the questionnaire.
pub const TOTAL_STEPS: u8 = 5;

/// One screen of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Amount,
    SingleSource,
    Justification,
    Alternatives,
    PriceReasonableness,
}

/// Error for a step number outside 1..=5.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("step {0} is out of range (1..=5)")]
pub struct StepOutOfRange(pub u8);

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Amount,
        Step::SingleSource,
        Step::Justification,
        Step::Alternatives,
        Step::PriceReasonableness,
    ];

    /// 1-based position.
    pub fn number(&self) -> u8 {
        match self {
            Step::Amount => 1,
            Step::SingleSource => 2,
            Step::Justification => 3,
            Step::Alternatives => 4,
            Step::PriceReasonableness => 5,
        }
    }

    pub fn next(&self) -> Option<Step> {
        Step::try_from(self.number() + 1).ok()
    }

    pub fn previous(&self) -> Option<Step> {
        Step::try_from(self.number() - 1).ok()
    }

    pub fn is_first(&self) -> bool {
        *self == Step::Amount
    }

    pub fn is_last(&self) -> bool {
        *self == Step::PriceReasonableness
    }

    pub fn descriptor(&self) -> &'static StepDescriptor {
        &STEPS[usize::from(self.number() - 1)]
    }
}

impl TryFrom<u8> for Step {
    type Error = StepOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Step::Amount),
            2 => Ok(Step::SingleSource),
            3 => Ok(Step::Justification),
            4 => Ok(Step::Alternatives),
            5 => Ok(Step::PriceReasonableness),
            other => Err(StepOutOfRange(other)),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {}", self.number())
    }
}

/// Single choice overwrites, multiple choice toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceKind {
    Single,
    Multiple,
}

/// A question bound to one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestionDescriptor {
    pub prompt: &'static str,
    pub field: Field,
    pub kind: ChoiceKind,
}

/// Static description of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepDescriptor {
    pub step: Step,
    pub title: &'static str,
    pub question: QuestionDescriptor,
    /// Conditional follow-up, shown only while
    /// [`AnswerRecord::reasons_visible`] holds.
    pub follow_up: Option<QuestionDescriptor>,
}

pub static STEPS: [StepDescriptor; 5] = [
    StepDescriptor {
        step: Step::Amount,
        title: "Step 1: Procurement Amount",
        question: QuestionDescriptor {
            prompt: "What is the estimated dollar amount of your procurement?",
            field: Field::Amount,
            kind: ChoiceKind::Single,
        },
        follow_up: None,
    },
    StepDescriptor {
        step: Step::SingleSource,
        title: "Step 2: Single Source Status",
        question: QuestionDescriptor {
            prompt: "Is the good or service available from only one vendor?",
            field: Field::SingleSource,
            kind: ChoiceKind::Single,
        },
        follow_up: None,
    },
    StepDescriptor {
        step: Step::Justification,
        title: "Step 3: Justification",
        question: QuestionDescriptor {
            prompt: "Why is this vendor the only acceptable source? Select all that apply.",
            field: Field::Justification,
            kind: ChoiceKind::Multiple,
        },
        follow_up: None,
    },
    StepDescriptor {
        step: Step::Alternatives,
        title: "Step 4: Alternatives Research",
        question: QuestionDescriptor {
            prompt: "Have you researched alternative vendors or products?",
            field: Field::AlternativesResearched,
            kind: ChoiceKind::Single,
        },
        follow_up: Some(QuestionDescriptor {
            prompt: "Why were alternatives not researched? Select all that apply.",
            field: Field::AlternativeReasons,
            kind: ChoiceKind::Multiple,
        }),
    },
    StepDescriptor {
        step: Step::PriceReasonableness,
        title: "Step 5: Price Reasonableness",
        question: QuestionDescriptor {
            prompt: "How did you determine that the price is fair and reasonable? Select all that apply.",
            field: Field::PriceReasonable,
            kind: ChoiceKind::Multiple,
        },
        follow_up: None,
    },
];

/// An option with its current selection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    #[serde(flatten)]
    pub option: OptionDescriptor,
    pub selected: bool,
}

/// A question ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub prompt: &'static str,
    pub field: Field,
    pub kind: ChoiceKind,
    pub options: Vec<OptionView>,
}

impl QuestionView {
    pub fn build(question: &QuestionDescriptor, catalog: &Catalog, record: &AnswerRecord) -> Self {
        let options = catalog
            .options(question.field)
            .into_iter()
            .map(|option| OptionView {
                selected: record.is_selected(question.field, &option.key),
                option,
            })
            .collect();
        Self {
            prompt: question.prompt,
            field: question.field,
            kind: question.kind,
            options,
        }
    }
}

/// Everything a renderer needs for the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step: Step,
    pub number: u8,
    pub total: u8,
    pub title: &'static str,
    pub questions: Vec<QuestionView>,
    pub can_retreat: bool,
    pub can_advance: bool,
    /// "Submit" on the last step, "Next" elsewhere.
    pub advance_label: &'static str,
}

impl StepView {
    pub fn build(step: Step, catalog: &Catalog, record: &AnswerRecord) -> Self {
        let descriptor = step.descriptor();
        let mut questions = vec![QuestionView::build(&descriptor.question, catalog, record)];
        if let Some(follow_up) = &descriptor.follow_up {
            if record.reasons_visible() {
                questions.push(QuestionView::build(follow_up, catalog, record));
            }
        }
        Self {
            step,
            number: step.number(),
            total: TOTAL_STEPS,
            title: descriptor.title,
            questions,
            can_retreat: !step.is_first(),
            can_advance: record.is_step_complete(step),
            advance_label: if step.is_last() { "Submit" } else { "Next" },
        }
    }

    /// Completed fraction for a progress indicator, in percent.
    pub fn progress_percent(&self) -> u8 {
        self.number * 100 / self.total
    }
}
