//! Paths and settings for solesource.
//!
//! Everything lives under `$SOLESOURCE_HOME` (default `~/.solesource`). The
//! optional `config.toml` there adjusts wizard behaviour, the report
//! profile, and the option catalogs. A missing file means built-in defaults.

use serde::{Deserialize, Serialize};
use solesource_core::{
    Catalog, CatalogError, JustificationEntry, PriceMethodEntry, ReasonEntry, ReportProfile,
    WizardOptions,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub use solesource_logging::{logs_dir, solesource_home};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid catalog in {path}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
}

/// `<home>/config.toml`
pub fn config_path() -> PathBuf {
    solesource_home().join(CONFIG_FILE)
}

/// Default directory for exported reports: `<home>/exports`
pub fn exports_dir() -> PathBuf {
    solesource_home().join("exports")
}

/// Catalog lists from the config file. A list that is present replaces the
/// built-in list of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justifications: Option<Vec<JustificationEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_reasons: Option<Vec<ReasonEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_methods: Option<Vec<PriceMethodEntry>>,
}

impl CatalogOverrides {
    pub fn is_empty(&self) -> bool {
        self.justifications.is_none()
            && self.alternative_reasons.is_none()
            && self.price_methods.is_none()
    }

    /// Built-in catalog with the configured lists swapped in.
    pub fn apply(&self) -> Catalog {
        let mut catalog = Catalog::default();
        if let Some(list) = &self.justifications {
            catalog.justifications = list.clone();
        }
        if let Some(list) = &self.alternative_reasons {
            catalog.alternative_reasons = list.clone();
        }
        if let Some(list) = &self.price_methods {
            catalog.price_methods = list.clone();
        }
        catalog
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub wizard: WizardOptions,
    pub report: ReportProfile,
    pub catalog: CatalogOverrides,
}

impl AppConfig {
    /// Load `<home>/config.toml`, or defaults when the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.catalog().map_err(|source| ConfigError::Catalog {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// The effective, validated catalog.
    pub fn catalog(&self) -> Result<Catalog, CatalogError> {
        let catalog = self.catalog.apply();
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn shared_catalog(&self) -> Result<Arc<Catalog>, CatalogError> {
        self.catalog().map(Arc::new)
    }
}

/// Arguments for the config command
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Show resolved paths and settings as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the config command: show paths and effective settings.
pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let home = solesource_home();
    let config_file = config_path();
    let logs = logs_dir();
    let exports = exports_dir();
    let config = AppConfig::load()?;
    let catalog = config.catalog()?;

    if args.json {
        let value = serde_json::json!({
            "home": home.to_string_lossy(),
            "config_file": {
                "path": config_file.to_string_lossy(),
                "exists": config_file.exists(),
            },
            "logs": {
                "path": logs.to_string_lossy(),
                "exists": logs.exists(),
            },
            "exports": {
                "path": exports.to_string_lossy(),
                "exists": exports.exists(),
            },
            "wizard": config.wizard,
            "report": config.report,
            "catalog": {
                "justifications": catalog.justifications.len(),
                "alternative_reasons": catalog.alternative_reasons.len(),
                "price_methods": catalog.price_methods.len(),
                "overridden": !config.catalog.is_empty(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let exists = |p: &Path| if p.exists() { "exists" } else { "not found" };

    println!("SOLESOURCE CONFIGURATION");
    println!("========================");
    println!();
    println!("Home:     {}", home.display());
    println!("Config:   {} ({})", config_file.display(), exists(&config_file));
    println!("Logs:     {} ({})", logs.display(), exists(&logs));
    println!("Exports:  {} ({})", exports.display(), exists(&exports));
    println!();
    println!(
        "Exemption short-circuit: {}",
        if config.wizard.exemption_short_circuit { "on" } else { "off" }
    );
    println!("Organization:            {}", config.report.organization);
    println!(
        "Contact:                 {} <{}>",
        config.report.contact_name, config.report.contact_email
    );
    println!();
    println!(
        "Catalog: {} justifications, {} alternative reasons, {} price methods{}",
        catalog.justifications.len(),
        catalog.alternative_reasons.len(),
        catalog.price_methods.len(),
        if config.catalog.is_empty() { "" } else { " (customized)" }
    );

    Ok(())
}
