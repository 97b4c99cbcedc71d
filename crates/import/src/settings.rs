use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};
use crate::rules::DEFAULT_PURPOSE_PREFIX_LEN;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Days between booking dates within which stored statements are checked
    /// for duplicates of an incoming one.
    #[serde(default = "default_date_window_days")]
    pub date_window_days: i64,
    /// Characters of the normalized purpose that go into the classification
    /// fingerprint.
    #[serde(default = "default_purpose_prefix_len")]
    pub purpose_prefix_len: usize,
    /// chrono formats tried in order when parsing feed dates.
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    /// Currency for feed records that carry none.
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

fn default_date_window_days() -> i64 {
    3
}

fn default_purpose_prefix_len() -> usize {
    DEFAULT_PURPOSE_PREFIX_LEN
}

fn default_date_formats() -> Vec<String> {
    vec![
        "%Y-%m-%d".to_string(),
        "%d.%m.%Y".to_string(),
        "%d.%m.%y".to_string(),
    ]
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            date_window_days: default_date_window_days(),
            purpose_prefix_len: default_purpose_prefix_len(),
            date_formats: default_date_formats(),
            default_currency: default_currency(),
        }
    }
}

impl ImportSettings {
    pub fn from_toml(toml_content: &str) -> Result<Self> {
        let settings: ImportSettings = toml::from_str(toml_content)
            .map_err(|e| ImportError::Settings(format!("Failed to parse TOML: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.date_window_days < 0 {
            return Err(ImportError::Settings(
                "date_window_days must not be negative".to_string(),
            ));
        }
        if self.date_formats.is_empty() {
            return Err(ImportError::Settings(
                "at least one date format is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        assert_eq!(ImportSettings::from_toml("").unwrap(), ImportSettings::default());
    }

    #[test]
    fn partial_toml_overrides_some_keys() {
        let settings = ImportSettings::from_toml(
            r#"
            date_window_days = 7
            default_currency = "CHF"
            "#,
        )
        .unwrap();
        assert_eq!(settings.date_window_days, 7);
        assert_eq!(settings.default_currency, "CHF");
        assert_eq!(settings.purpose_prefix_len, DEFAULT_PURPOSE_PREFIX_LEN);
        assert_eq!(settings.date_formats.len(), 3);
    }

    #[test]
    fn rejects_negative_window() {
        assert!(matches!(
            ImportSettings::from_toml("date_window_days = -1"),
            Err(ImportError::Settings(_))
        ));
    }

    #[test]
    fn rejects_empty_date_formats() {
        assert!(ImportSettings::from_toml("date_formats = []").is_err());
    }
}
