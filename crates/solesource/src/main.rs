//! solesource: sole source eligibility questionnaire
//!
//! Walks a purchaser through five questions, scores the answers, and
//! exports a report. Run `solesource wizard` for the interactive flow or
//! `solesource evaluate answers.toml` to score a prepared answers file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use solesource_logging::{init_logging, LogConfig};
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(
    name = "solesource",
    version,
    about = "Sole source eligibility questionnaire"
)]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer the questionnaire interactively
    Wizard(cli::wizard::WizardArgs),

    /// Score a prepared answers file (.toml or .json)
    Evaluate(cli::evaluate::EvaluateArgs),

    /// List the questions and the option keys each accepts
    Steps(cli::steps::StepsArgs),

    /// Show paths and effective settings
    Config(cli::config::ConfigArgs),
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Wizard(_) => false,
        Commands::Evaluate(args) => args.json,
        Commands::Steps(args) => args.json,
        Commands::Config(args) => args.json,
    }
}

fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Wizard(args) => cli::wizard::run(args),
        Commands::Evaluate(args) => cli::evaluate::run(args),
        Commands::Steps(args) => cli::steps::run(args),
        Commands::Config(args) => cli::config::run(args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let json_mode = command_wants_json(&cli.command);
    let interactive = matches!(cli.command, Commands::Wizard(_));
    init_logging(LogConfig {
        app_name: "solesource",
        verbose: cli.verbose,
        interactive: interactive || json_mode,
    });

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = %format!("{:#}", err), "command failed");
            if json_mode {
                cli::error::print_json_error(&err);
            } else if let Some(helpful) = err.downcast_ref::<cli::error::HelpfulError>() {
                eprint!("{}", helpful);
            } else {
                eprintln!("ERROR: {:#}", err);
            }
            ExitCode::from(1)
        }
    }
}
