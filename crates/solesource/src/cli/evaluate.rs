//! `solesource evaluate`: run the questionnaire from an answers file.
//!
//! Answers are fed through the wizard one step at a time, exactly as the
//! interactive flow would: select every answer for the current step, then
//! advance. Rules about hidden questions and the exemption short-circuit
//! therefore apply unchanged.

use crate::cli::config::AppConfig;
use crate::cli::error::HelpfulError;
use crate::cli::export::{self, ExportedFile};
use crate::cli::output::print_determination;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solesource_core::{AnswerRecord, Determination, Field, SessionId, Step, Wizard, PRICE_NONE_KEY};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, clap::Args)]
pub struct EvaluateArgs {
    /// Answers file (.toml or .json)
    pub answers: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the plain-text report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Write the PDF document to this file
    #[arg(long, value_name = "FILE")]
    pub document: Option<PathBuf>,
}

/// Answers as written by the user. Keys are the catalog keys shown by
/// `solesource steps`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnswersFile {
    pub amount: Option<String>,
    pub single_source: Option<String>,
    #[serde(default)]
    pub justification: Vec<String>,
    pub alternatives_researched: Option<String>,
    #[serde(default)]
    pub alternatives_reason_options: Vec<String>,
    #[serde(default)]
    pub price_reasonable: Vec<String>,
}

impl AnswersFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HelpfulError::file_not_found(path).into());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let parsed: Result<Self, String> = match ext.as_deref() {
            Some("toml") => toml::from_str(&content).map_err(|e| e.to_string()),
            Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
            _ => return Err(HelpfulError::unsupported_answers_format(path).into()),
        };
        parsed.map_err(|details| HelpfulError::answers_parse_error(path, &details).into())
    }

    /// Answers belonging to `step`, in file order.
    pub fn answers_for(&self, step: Step) -> Vec<(Field, &str)> {
        match step {
            Step::Amount => single(Field::Amount, &self.amount),
            Step::SingleSource => single(Field::SingleSource, &self.single_source),
            Step::Justification => many(Field::Justification, &self.justification),
            Step::Alternatives => {
                let mut answers = single(Field::AlternativesResearched, &self.alternatives_researched);
                answers.extend(many(
                    Field::AlternativeReasons,
                    &self.alternatives_reason_options,
                ));
                answers
            }
            Step::PriceReasonableness => many(Field::PriceReasonable, &self.price_reasonable),
        }
    }

    /// `none` may not be listed beside a price method.
    fn check_price_answers(&self) -> Result<(), HelpfulError> {
        let has_none = self.price_reasonable.iter().any(|k| k == PRICE_NONE_KEY);
        let methods: Vec<&str> = self
            .price_reasonable
            .iter()
            .map(String::as_str)
            .filter(|k| *k != PRICE_NONE_KEY)
            .collect();
        if has_none && !methods.is_empty() {
            return Err(HelpfulError::conflicting_price_answers(&methods));
        }
        Ok(())
    }
}

fn single(field: Field, value: &Option<String>) -> Vec<(Field, &str)> {
    value.iter().map(|v| (field, v.as_str())).collect()
}

fn many(field: Field, values: &[String]) -> Vec<(Field, &str)> {
    values.iter().map(|v| (field, v.as_str())).collect()
}

/// Select each step's answers and advance until submitted.
///
/// Repeated keys in a list are applied once, since selecting a set member
/// twice would toggle it back off.
pub fn drive(wizard: &mut Wizard, answers: &AnswersFile) -> Result<(), HelpfulError> {
    answers.check_price_answers()?;
    while let Some(step) = wizard.state().step() {
        for (field, value) in answers.answers_for(step) {
            if field.is_multi() && wizard.record().is_selected(field, value) {
                continue;
            }
            wizard
                .select(step, field, value)
                .map_err(|err| HelpfulError::rejected_answer(&err))?;
        }
        wizard
            .advance()
            .map_err(|err| HelpfulError::rejected_answer(&err))?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct EvaluateOutput<'a> {
    session_id: SessionId,
    determination: &'a Determination,
    answers: &'a AnswerRecord,
    exports: Vec<ExportedFile>,
}

pub fn run(args: EvaluateArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let answers = AnswersFile::load(&args.answers)?;

    let mut wizard = Wizard::new(config.shared_catalog()?, config.wizard);
    drive(&mut wizard, &answers)?;

    let skipped = wizard.record().single_source.is_none() && answers.single_source.is_some();
    if skipped {
        warn!("amount is under the delegated authority limit; remaining answers were not used");
    }

    let result = wizard
        .result()
        .context("questionnaire ended without a determination")?;
    info!(
        session = %wizard.session_id(),
        code = %result.code,
        file = %args.answers.display(),
        "evaluated answers file"
    );

    let mut exports = Vec::new();
    if args.report.is_some() || args.document.is_some() {
        let lines = export::report_lines(&wizard, &config.report)
            .context("questionnaire ended without a report")?;
        if let Some(target) = &args.report {
            let artifact = export::text_artifact(&lines, &export::default_text_name(&wizard));
            exports.push(export::write_to_path(target, artifact)?);
        }
        if let Some(target) = &args.document {
            let artifact =
                export::document_artifact(&lines, &export::default_document_name(&wizard))?;
            exports.push(export::write_to_path(target, artifact)?);
        }
    }

    if args.json {
        let output = EvaluateOutput {
            session_id: wizard.session_id(),
            determination: result,
            answers: wizard.record(),
            exports,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_determination(result);
    if skipped {
        println!("Amount is under $10,000; the remaining answers were not needed.");
    }
    for file in &exports {
        println!("Wrote {} ({} bytes)", file.path.display(), file.bytes);
    }
    Ok(())
}
