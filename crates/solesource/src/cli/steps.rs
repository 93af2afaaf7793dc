//! `solesource steps`: list the questions and the keys each one accepts.

use crate::cli::config::AppConfig;
use crate::cli::output::print_table;
use serde::Serialize;
use solesource_core::catalog::Catalog;
use solesource_core::record::AnswerRecord;
use solesource_core::steps::{QuestionView, STEPS};
use solesource_core::{ChoiceKind, Field};

#[derive(Debug, clap::Args)]
pub struct StepsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StepListing {
    number: u8,
    title: &'static str,
    questions: Vec<QuestionListing>,
}

#[derive(Debug, Serialize)]
struct QuestionListing {
    #[serde(flatten)]
    question: QuestionView,
    /// Only asked when alternatives were not researched.
    conditional: bool,
}

#[derive(Debug, Serialize)]
struct StepsOutput<'a> {
    steps: Vec<StepListing>,
    catalog: &'a Catalog,
}

fn listings(catalog: &Catalog) -> Vec<StepListing> {
    let empty = AnswerRecord::new();
    STEPS
        .iter()
        .map(|descriptor| {
            let mut questions = vec![QuestionListing {
                question: QuestionView::build(&descriptor.question, catalog, &empty),
                conditional: false,
            }];
            if let Some(follow_up) = &descriptor.follow_up {
                questions.push(QuestionListing {
                    question: QuestionView::build(follow_up, catalog, &empty),
                    conditional: true,
                });
            }
            StepListing {
                number: descriptor.step.number(),
                title: descriptor.title,
                questions,
            }
        })
        .collect()
}

fn tag_for(catalog: &Catalog, field: Field, key: &str) -> String {
    match field {
        Field::Justification => catalog
            .justification_category(key)
            .map(|c| c.to_string())
            .unwrap_or_default(),
        Field::AlternativeReasons => catalog
            .reason_weight(key)
            .map(|w| w.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

pub fn run(args: StepsArgs) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let catalog = config.catalog()?;
    let steps = listings(&catalog);

    if args.json {
        let output = StepsOutput {
            steps,
            catalog: &catalog,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for step in &steps {
        println!("{}", step.title);
        for listing in &step.questions {
            let question = &listing.question;
            let kind = match question.kind {
                ChoiceKind::Single => "choose one",
                ChoiceKind::Multiple => "choose any",
            };
            let when = if listing.conditional {
                " (only when alternatives_researched = no)"
            } else {
                ""
            };
            println!("  {} [{}: {}]{}", question.prompt, question.field, kind, when);

            let rows = question
                .options
                .iter()
                .map(|o| {
                    vec![
                        o.option.key.clone(),
                        o.option.label.clone(),
                        tag_for(&catalog, question.field, &o.option.key),
                    ]
                })
                .collect();
            print_table(&["Key", "Label", "Tag"], rows);
        }
        println!();
    }
    Ok(())
}
