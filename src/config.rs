// ⚙️ Run configuration
//
// Everything the engine needs to know about the target installation is
// passed in explicitly. Loaded from JSON the same way classification rules are.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ScrubError;

/// CiviCRM country id of The Netherlands
pub const DEFAULT_DOMESTIC_COUNTRY_ID: i64 = 1152;

/// CiviCRM phone_type_id for mobile lines
pub const DEFAULT_MOBILE_PHONE_TYPE_ID: i64 = 2;

pub const DEFAULT_PROGRESS_BATCH_SIZE: u64 = 10_000;

// ============================================================================
// LOCALE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "nl_NL")]
    Dutch,
    #[serde(rename = "en_US")]
    English,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::Dutch => "nl_NL",
            Locale::English => "en_US",
        }
    }

    /// Sort-name rule used when the config does not pick one
    pub fn default_sort_name_style(&self) -> SortNameStyle {
        match self {
            Locale::Dutch => SortNameStyle::SurnamePrefixLast,
            Locale::English => SortNameStyle::LastCommaFirst,
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::Dutch
    }
}

impl std::str::FromStr for Locale {
    type Err = ScrubError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "nl_NL" | "nl" => Ok(Locale::Dutch),
            "en_US" | "en" => Ok(Locale::English),
            other => Err(ScrubError::Config(format!("unsupported locale '{}'", other))),
        }
    }
}

/// How `sort_name` is composed from first and last name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortNameStyle {
    /// "van den Berg, Jan"
    LastCommaFirst,
    /// "Berg, Jan van den" - surname prefixes move behind the first name
    SurnamePrefixLast,
}

/// A custom-field column that receives a derived value keyed by contact id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub table: String,
    pub column: String,
}

// ============================================================================
// SCRUB CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrubConfig {
    /// Contact ids that are never read or modified
    pub keep_contact_ids: BTreeSet<i64>,

    /// Contact subtypes that are never read or modified
    pub keep_contact_subtypes: BTreeSet<String>,

    /// Membership status ids considered "current" (computed by the caller)
    pub current_membership_statuses: BTreeSet<i64>,

    /// Addresses in this country are replaced, all others deleted
    pub domestic_country_id: i64,

    pub locale: Locale,

    pub sort_name_style: Option<SortNameStyle>,

    /// Fixed seed for reproducible output; drawn at random when absent
    pub seed: Option<u64>,

    pub mobile_phone_type_ids: BTreeSet<i64>,

    /// Where initials are upserted; `null` skips the initials statement
    pub initials_field: Option<CustomField>,

    /// Auxiliary tables emptied after the address phase
    pub truncate_tables: Vec<String>,

    /// City names drawn for mandate signatures
    pub mandate_cities: Vec<String>,

    pub progress_batch_size: u64,

    /// Overrides "now" so date ranges and the header timestamp are reproducible
    pub reference_time: Option<NaiveDateTime>,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        ScrubConfig {
            keep_contact_ids: BTreeSet::new(),
            keep_contact_subtypes: BTreeSet::new(),
            current_membership_statuses: BTreeSet::new(),
            domestic_country_id: DEFAULT_DOMESTIC_COUNTRY_ID,
            locale: Locale::default(),
            sort_name_style: None,
            seed: None,
            mobile_phone_type_ids: BTreeSet::from([DEFAULT_MOBILE_PHONE_TYPE_ID]),
            initials_field: Some(CustomField {
                table: "civicrm_value_migratie_1".to_string(),
                column: "voorletters_1".to_string(),
            }),
            truncate_tables: vec![
                "civicrm_value_futureaddress".to_string(),
                "civicrm_value_address_history".to_string(),
            ],
            mandate_cities: ["ROTTERDAM", "AMSTERDAM", "DEN HAAG", "UTRECHT"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            progress_batch_size: DEFAULT_PROGRESS_BATCH_SIZE,
            reference_time: None,
        }
    }
}

impl ScrubConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: ScrubConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    pub fn sort_name_style(&self) -> SortNameStyle {
        self.sort_name_style
            .unwrap_or_else(|| self.locale.default_sort_name_style())
    }

    /// Reject values that would produce an unusable script
    pub fn validate(&self) -> std::result::Result<(), ScrubError> {
        if self.progress_batch_size == 0 {
            return Err(ScrubError::Config(
                "progress_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.mandate_cities.is_empty() {
            return Err(ScrubError::Config(
                "mandate_cities must contain at least one city".to_string(),
            ));
        }
        for table in &self.truncate_tables {
            check_identifier(table)?;
        }
        if let Some(field) = &self.initials_field {
            check_identifier(&field.table)?;
            check_identifier(&field.column)?;
        }
        Ok(())
    }
}

/// `<temp dir>/contact_scrub_<unix seconds>.sql`
pub fn default_output_path() -> PathBuf {
    std::env::temp_dir().join(format!("contact_scrub_{}.sql", chrono::Utc::now().timestamp()))
}

/// Table and column names are written unquoted, so only plain identifiers pass
pub fn check_identifier(name: &str) -> std::result::Result<(), ScrubError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());

    if valid {
        Ok(())
    } else {
        Err(ScrubError::Format(format!("invalid SQL identifier '{}'", name)))
    }
}
