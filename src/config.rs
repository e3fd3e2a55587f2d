//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

/// SLA hour thresholds for the three ticket phases.
///
/// Passed explicitly into the SLA tracker rather than read from a hidden
/// global, so per-deployment overrides and deterministic tests are both
/// straightforward.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlaConfig {
    /// Hours from ticket open until a technician must be assigned.
    #[serde(default = "default_assignment_hours")]
    pub assignment_hours: u32,
    /// Hours from assignment until the technician must be on site.
    #[serde(default = "default_onsite_hours")]
    pub onsite_hours: u32,
    /// Hours from arrival until resolution proof must be submitted.
    #[serde(default = "default_resolution_hours")]
    pub resolution_hours: u32,
    /// Remaining-time window below which a phase reports `at_risk`.
    #[serde(default = "default_at_risk_window_hours")]
    pub at_risk_window_hours: u32,
}

fn default_assignment_hours() -> u32 {
    4
}

fn default_onsite_hours() -> u32 {
    24
}

fn default_resolution_hours() -> u32 {
    48
}

fn default_at_risk_window_hours() -> u32 {
    2
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            assignment_hours: default_assignment_hours(),
            onsite_hours: default_onsite_hours(),
            resolution_hours: default_resolution_hours(),
            at_risk_window_hours: default_at_risk_window_hours(),
        }
    }
}

/// Time-to-live settings for technician action tokens.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TokenConfig {
    /// TTL in hours for on-site (arrival proof) tokens.
    #[serde(default = "default_onsite_ttl_hours")]
    pub onsite_ttl_hours: u32,
    /// TTL in hours for resolution (completion proof) tokens.
    #[serde(default = "default_resolution_ttl_hours")]
    pub resolution_ttl_hours: u32,
}

fn default_onsite_ttl_hours() -> u32 {
    12
}

fn default_resolution_ttl_hours() -> u32 {
    24
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            onsite_ttl_hours: default_onsite_ttl_hours(),
            resolution_ttl_hours: default_resolution_ttl_hours(),
        }
    }
}

fn default_max_transition_retries() -> u32 {
    3
}

fn default_review_confidence_threshold() -> f64 {
    0.6
}

fn default_audit_log_dir() -> PathBuf {
    PathBuf::from(".fieldline/logs")
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Path to the `SQLite` database file.
    pub db_path: PathBuf,
    /// Directory for daily-rotating JSONL audit logs.
    #[serde(default = "default_audit_log_dir")]
    pub audit_log_dir: PathBuf,
    /// Retries for a transition that loses an optimistic-version race.
    #[serde(default = "default_max_transition_retries")]
    pub max_transition_retries: u32,
    /// Ingestion confidence below which a ticket opens in `needs_review`.
    #[serde(default = "default_review_confidence_threshold")]
    pub review_confidence_threshold: f64,
    /// SLA phase thresholds.
    #[serde(default)]
    pub sla: SlaConfig,
    /// Action-token TTLs.
    #[serde(default)]
    pub tokens: TokenConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// A configuration suitable for in-memory test databases.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            db_path: PathBuf::from(":memory:"),
            audit_log_dir: default_audit_log_dir(),
            max_transition_retries: default_max_transition_retries(),
            review_confidence_threshold: default_review_confidence_threshold(),
            sla: SlaConfig::default(),
            tokens: TokenConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sla.assignment_hours == 0
            || self.sla.onsite_hours == 0
            || self.sla.resolution_hours == 0
        {
            return Err(AppError::Config(
                "sla phase hours must be greater than zero".into(),
            ));
        }

        if self.tokens.onsite_ttl_hours == 0 || self.tokens.resolution_ttl_hours == 0 {
            return Err(AppError::Config(
                "token ttl hours must be greater than zero".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.review_confidence_threshold) {
            return Err(AppError::Config(
                "review_confidence_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        Ok(())
    }
}
