//! `solesource wizard`: interactive questionnaire in the terminal.

use crate::cli::config::{exports_dir, AppConfig};
use crate::cli::export;
use crate::cli::output::{print_determination, progress_bar};
use anyhow::{Context, Result};
use dialoguer::{Confirm, MultiSelect, Select};
use solesource_core::steps::{QuestionView, StepView};
use solesource_core::{ChoiceKind, Field, FsDownloader, ReportProfile, Wizard, PRICE_NONE_KEY};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, clap::Args)]
pub struct WizardArgs {
    /// Directory for exported reports (default: ~/.solesource/exports)
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavAction {
    Advance,
    AnswerAgain,
    Retreat,
    StartOver,
    Quit,
}

impl NavAction {
    fn label(&self, view: &StepView) -> &'static str {
        match self {
            NavAction::Advance => view.advance_label,
            NavAction::AnswerAgain => "Change answers",
            NavAction::Retreat => "Back",
            NavAction::StartOver => "Start over",
            NavAction::Quit => "Quit",
        }
    }
}

/// Navigation offered under a step. Advancing is only offered when the step
/// is complete; going back only after step 1.
fn nav_actions(view: &StepView) -> Vec<NavAction> {
    let mut actions = Vec::new();
    if view.can_advance {
        actions.push(NavAction::Advance);
    }
    actions.push(NavAction::AnswerAgain);
    if view.can_retreat {
        actions.push(NavAction::Retreat);
    }
    actions.push(NavAction::StartOver);
    actions.push(NavAction::Quit);
    actions
}

/// Option indices whose membership differs between the current selection
/// and the user's pick. Removals come first so exclusive options settle on
/// what was picked.
fn toggles(current: &[bool], picked: &[usize]) -> Vec<usize> {
    let wanted: Vec<bool> = (0..current.len()).map(|i| picked.contains(&i)).collect();
    let removed = (0..current.len()).filter(|&i| current[i] && !wanted[i]);
    let added = (0..current.len()).filter(|&i| !current[i] && wanted[i]);
    removed.chain(added).collect()
}

/// Whether the picks combine the price `none` option with a price method.
fn mixes_none(question: &QuestionView, picked: &[usize]) -> bool {
    question.field == Field::PriceReasonable
        && picked.len() > 1
        && picked
            .iter()
            .any(|&i| question.options[i].option.key == PRICE_NONE_KEY)
}

fn ask(wizard: &mut Wizard, question: &QuestionView) -> Result<()> {
    let step = wizard.state().step().context("questionnaire already submitted")?;
    let labels: Vec<&str> = question
        .options
        .iter()
        .map(|o| o.option.label.as_str())
        .collect();

    match question.kind {
        ChoiceKind::Single => {
            let default = question.options.iter().position(|o| o.selected).unwrap_or(0);
            let index = Select::new()
                .with_prompt(question.prompt)
                .items(&labels)
                .default(default)
                .interact()
                .context("prompt failed")?;
            wizard.select(step, question.field, &question.options[index].option.key)?;
        }
        ChoiceKind::Multiple => {
            let current: Vec<bool> = question.options.iter().map(|o| o.selected).collect();
            let picked = loop {
                let picked = MultiSelect::new()
                    .with_prompt(format!("{} (space to toggle, enter to confirm)", question.prompt))
                    .items(&labels)
                    .defaults(&current)
                    .interact()
                    .context("prompt failed")?;
                if !mixes_none(question, &picked) {
                    break picked;
                }
                println!("\"None of the above\" cannot be combined with other answers.");
            };
            for index in toggles(&current, &picked) {
                wizard.select(step, question.field, &question.options[index].option.key)?;
            }
        }
    }
    Ok(())
}

/// Ask every visible question of the current step. The follow-up question
/// appears only after the main answer makes it visible, so the view is
/// rebuilt between questions.
fn ask_step(wizard: &mut Wizard) -> Result<()> {
    let mut asked = 0;
    while let Some(view) = wizard.view() {
        let Some(question) = view.questions.get(asked) else {
            break;
        };
        ask(wizard, question)?;
        asked += 1;
    }
    Ok(())
}

fn offer_exports(wizard: &Wizard, profile: &ReportProfile, dir: PathBuf) -> Result<()> {
    let export = Confirm::new()
        .with_prompt("Export the document and text report?")
        .default(true)
        .interact()
        .context("prompt failed")?;
    if !export {
        return Ok(());
    }

    let lines = export::report_lines(wizard, profile).context("no determination to export")?;
    let downloader = FsDownloader::new(dir);
    let artifacts = [
        export::document_artifact(&lines, &export::default_document_name(wizard))?,
        export::text_artifact(&lines, &export::default_text_name(wizard)),
    ];
    for artifact in &artifacts {
        let written = export::deliver(&downloader, artifact)?;
        println!("Saved {}", written.path.display());
    }
    Ok(())
}

pub fn run(args: WizardArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let mut wizard = Wizard::new(config.shared_catalog()?, config.wizard);
    let export_dir = args.export_dir.unwrap_or_else(exports_dir);
    info!(session = %wizard.session_id(), "interactive session started");

    println!("Sole Source Eligibility Questionnaire");
    println!("Answer five short questions to see whether your purchase may qualify.");

    loop {
        let Some(view) = wizard.view() else {
            let Some(result) = wizard.result() else {
                break;
            };
            println!();
            print_determination(result);
            offer_exports(&wizard, &config.report, export_dir.clone())?;

            let again = Confirm::new()
                .with_prompt("Start a new questionnaire?")
                .default(false)
                .interact()
                .context("prompt failed")?;
            if !again {
                break;
            }
            wizard.reset();
            continue;
        };

        println!();
        println!("{}  {}", view.title, progress_bar(view.number, view.total));
        ask_step(&mut wizard)?;

        let Some(view) = wizard.view() else {
            continue;
        };
        if !view.can_advance {
            println!("Please answer the question to continue.");
        }
        let actions = nav_actions(&view);
        let labels: Vec<&str> = actions.iter().map(|a| a.label(&view)).collect();
        let choice = Select::new()
            .items(&labels)
            .default(0)
            .interact()
            .context("prompt failed")?;

        match actions[choice] {
            NavAction::Advance => {
                wizard.advance()?;
            }
            NavAction::AnswerAgain => {}
            NavAction::Retreat => {
                wizard.retreat()?;
            }
            NavAction::StartOver => {
                wizard.reset();
            }
            NavAction::Quit => {
                info!(session = %wizard.session_id(), "interactive session abandoned");
                return Ok(());
            }
        }
    }

    info!(session = %wizard.session_id(), "interactive session finished");
    Ok(())
}
