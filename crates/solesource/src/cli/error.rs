//! User-facing errors for CLI commands
//!
//! Every error carries what went wrong, optional context, and suggestions
//! for fixing it.

use solesource_core::{Field, WizardError};
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// What went wrong
    pub message: String,
    /// What the command was doing when it failed
    pub context: Option<String>,
    /// `TRY:` lines, printed in order
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    /// Create an error with no context or suggestions
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    /// Set the context line
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Append one suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Append several suggestions
    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// The answers file path does not exist
    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The answers file does not exist")
            .with_suggestions([
                format!("TRY: Check the path: ls -la {}", path.display()),
                "TRY: List the questions and their keys: solesource steps".to_string(),
            ])
    }

    /// The answers file is neither `.toml` nor `.json`
    pub fn unsupported_answers_format(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(no extension)");
        Self::new(format!("Unsupported answers file type: {}", ext))
            .with_context(format!("Cannot read answers from {}", path.display()))
            .with_suggestion("TRY: Use a .toml or .json file")
    }

    /// The answers file did not deserialize
    pub fn answers_parse_error(path: &Path, details: &str) -> Self {
        Self::new(format!("Cannot parse answers: {}", details))
            .with_context(format!("Failed to parse {}", path.display()))
            .with_suggestions([
                "TRY: Keys are amount, single_source, justification, alternatives_researched, \
                 alternatives_reason_options, price_reasonable"
                    .to_string(),
                "TRY: List fields (justification, price_reasonable, ...) take arrays of keys"
                    .to_string(),
            ])
    }

    /// An answer the questionnaire refused.
    pub fn rejected_answer(err: &WizardError) -> Self {
        let base = Self::new(format!("Answer rejected: {}", err));
        match err {
            WizardError::UnknownOption { field, .. } => base
                .with_context(format!("'{}' only accepts keys from its catalog", field))
                .with_suggestion(list_options_hint(*field)),
            WizardError::StepIncomplete(step) => base
                .with_context(format!("{} has no answer", step))
                .with_suggestion("TRY: Provide every required answer in the answers file"),
            WizardError::HiddenQuestion(_) => base
                .with_context("Reasons only apply when alternatives_researched = \"no\"")
                .with_suggestion("TRY: Remove alternatives_reason_options or answer \"no\""),
            _ => base,
        }
    }

    /// An answers file that lists `none` beside actual price methods.
    pub fn conflicting_price_answers(methods: &[&str]) -> Self {
        Self::new("price_reasonable cannot combine \"none\" with price methods")
            .with_context(format!("Also listed: {}", methods.join(", ")))
            .with_suggestions([
                "TRY: Remove \"none\" if the price was checked with the listed methods",
                "TRY: Keep only \"none\" if the price was not evaluated",
            ])
    }

    /// An export could not be written to disk
    pub fn cannot_write_export(path: &Path, reason: &str) -> Self {
        Self::new(format!("Cannot write export: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Check that the directory exists and is writable".to_string(),
                "TRY: Choose another output location".to_string(),
            ])
    }
}

fn list_options_hint(field: Field) -> String {
    format!("TRY: List valid keys for {}: solesource steps", field)
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// JSON form of a command failure, printed to stdout in `--json` mode.
pub fn json_error(err: &anyhow::Error) -> serde_json::Value {
    match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => serde_json::json!({
            "error": helpful.message,
            "context": helpful.context,
            "suggestions": helpful.suggestions,
        }),
        None => {
            let context = err
                .chain()
                .skip(1)
                .map(|cause| cause.to_string())
                .collect::<Vec<_>>();
            serde_json::json!({
                "error": err.to_string(),
                "context": if context.is_empty() { None } else { Some(context.join(": ")) },
                "suggestions": Vec::<String>::new(),
            })
        }
    }
}

pub fn print_json_error(err: &anyhow::Error) {
    let value = json_error(err);
    match serde_json::to_string_pretty(&value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}
