//! Plain-text report of a finished questionnaire.
//!
//! The report is an ordered list of lines derived only from the record, the
//! determination, the catalog used for labels, the report profile, and the
//! generation time. Export renderers consume the lines as-is.

use crate::catalog::{Catalog, JustificationCategory, ReasonWeight};
use crate::engine::{Determination, DeterminationCode};
use crate::record::{AnswerRecord, Field};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const RULE: &str = "============================================================";

pub const DEFAULT_DISCLAIMER: &str = "This report is guidance based on your responses and is \
not an official sole source approval. Final determinations are made by Procurement Services \
after review of the completed sole source documentation.";

/// Organization details printed in the resources and contact block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportProfile {
    pub organization: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub resources: Vec<String>,
    pub disclaimer: String,
}

impl Default for ReportProfile {
    fn default() -> Self {
        Self {
            organization: "Procurement Services".to_string(),
            contact_name: "Procurement Services Help Desk".to_string(),
            contact_email: "procurement@example.edu".to_string(),
            contact_phone: "(555) 010-2000".to_string(),
            resources: vec![
                "Sole Source Justification Form".to_string(),
                "Purchasing Policy: Competitive Bidding Thresholds".to_string(),
                "Guide to Documenting Price Reasonableness".to_string(),
            ],
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
        }
    }
}

/// Build the report lines.
pub fn format_report(
    record: &AnswerRecord,
    result: &Determination,
    catalog: &Catalog,
    profile: &ReportProfile,
    generated_at: DateTime<Utc>,
) -> Vec<String> {
    let mut lines = vec![
        "SOLE SOURCE DETERMINATION REPORT".to_string(),
        profile.organization.clone(),
        RULE.to_string(),
        String::new(),
    ];

    push_determination(&mut lines, result);
    lines.push(String::new());
    push_responses(&mut lines, record, result, catalog);
    lines.push(String::new());
    push_resources(&mut lines, profile);
    lines.push(String::new());

    lines.push("DISCLAIMER".to_string());
    lines.push(profile.disclaimer.clone());
    lines.push(String::new());
    lines.push(format!(
        "Generated: {}",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines
}

/// [`format_report`] stamped with the current time.
pub fn format_report_now(
    record: &AnswerRecord,
    result: &Determination,
    catalog: &Catalog,
    profile: &ReportProfile,
) -> Vec<String> {
    format_report(record, result, catalog, profile, Utc::now())
}

fn push_determination(lines: &mut Vec<String>, result: &Determination) {
    lines.push("DETERMINATION".to_string());
    lines.push(format!("Result: {}", result.title));
    lines.push(result.message.clone());
    if let Some(score) = result.score {
        lines.push(format!("Score: {}", score));
        for component in &result.breakdown {
            lines.push(format!(
                "  {}: {:+}",
                component.rule.description(),
                component.points
            ));
        }
    }
}

fn push_responses(
    lines: &mut Vec<String>,
    record: &AnswerRecord,
    result: &Determination,
    catalog: &Catalog,
) {
    lines.push("YOUR RESPONSES".to_string());

    if let Some(amount) = record.amount {
        lines.push(format!("Procurement amount: {}", amount.label()));
    }
    // Only the amount decides a delegated-authority result.
    if result.code == DeterminationCode::DelegatedAuthority {
        lines.push("Remaining questions were not required for this amount.".to_string());
        return;
    }
    if let Some(single_source) = record.single_source {
        lines.push(format!("Single source status: {}", single_source.label()));
    }
    if !record.justification.is_empty() {
        lines.push("Justification:".to_string());
        for category in JustificationCategory::ALL {
            let keys: Vec<&String> = record
                .justification
                .iter()
                .filter(|key| justification_bucket(catalog, key) == category)
                .collect();
            push_group(lines, category.heading(), &keys, Field::Justification, catalog);
        }
    }
    if let Some(researched) = record.alternatives_researched {
        lines.push(format!("Alternatives researched: {}", researched.label()));
    }
    if !record.alternatives_reason_options.is_empty() {
        lines.push("Reasons alternatives were not researched:".to_string());
        for weight in ReasonWeight::ALL {
            let keys: Vec<&String> = record
                .alternatives_reason_options
                .iter()
                .filter(|key| catalog.reason_weight(key).unwrap_or(ReasonWeight::Weak) == weight)
                .collect();
            push_group(lines, weight.heading(), &keys, Field::AlternativeReasons, catalog);
        }
    }
    if !record.price_reasonable.is_empty() {
        lines.push("Price reasonableness:".to_string());
        push_items(lines, "  ", &record.price_reasonable, Field::PriceReasonable, catalog);
    }
}

fn justification_bucket(catalog: &Catalog, key: &str) -> JustificationCategory {
    catalog
        .justification_category(key)
        .unwrap_or(JustificationCategory::Invalid)
}

fn push_group(
    lines: &mut Vec<String>,
    heading: &str,
    keys: &[&String],
    field: Field,
    catalog: &Catalog,
) {
    if keys.is_empty() {
        return;
    }
    lines.push(format!("  {}:", heading));
    for key in keys {
        lines.push(format!("    - {}", label_or_key(catalog, field, key)));
    }
}

fn push_items(
    lines: &mut Vec<String>,
    indent: &str,
    keys: &BTreeSet<String>,
    field: Field,
    catalog: &Catalog,
) {
    for key in keys {
        lines.push(format!("{}- {}", indent, label_or_key(catalog, field, key)));
    }
}

fn label_or_key<'a>(catalog: &'a Catalog, field: Field, key: &'a str) -> &'a str {
    catalog.label(field, key).unwrap_or(key)
}

fn push_resources(lines: &mut Vec<String>, profile: &ReportProfile) {
    lines.push("RESOURCES".to_string());
    for resource in &profile.resources {
        lines.push(format!("  - {}", resource));
    }
    lines.push(format!("Contact: {}", profile.contact_name));
    lines.push(format!("  Email: {}", profile.contact_email));
    lines.push(format!("  Phone: {}", profile.contact_phone));
}
