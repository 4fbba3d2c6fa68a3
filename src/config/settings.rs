//! Render configuration (affidavit.yml)

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::paginate::Measurement;
use crate::placeholders::constants::{contains_constant_token, is_constant_name};

/// Main render configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub format: FormatSettings,

    /// Overrides merged over the built-in `[[NAME]]` constants
    #[serde(default)]
    pub constants: IndexMap<String, String>,
}

impl RenderConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: RenderConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.validate()?;
        tracing::debug!("Loaded render config from {:?}", path);
        Ok(config)
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.constants {
            if !is_constant_name(name) {
                bail!(
                    "Invalid constant name {:?}; use letters, digits and underscores, starting with a letter",
                    name
                );
            }
            if contains_constant_token(value) {
                bail!(
                    "Constant {} refers to another constant; constant values must be literal",
                    name
                );
            }
        }

        if Measurement::parse(&self.page.width).is_none() {
            bail!("Invalid page width: {}", self.page.width);
        }

        if self.page.padding_px >= self.page.height_px {
            bail!(
                "Page padding ({}px) leaves no usable height on a {}px page",
                self.page.padding_px,
                self.page.height_px
            );
        }

        Ok(())
    }
}

/// Page geometry used by the paginator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// CSS length, e.g. `8.5in` or `816px`
    pub width: String,
    pub height_px: f64,
    /// Combined top and bottom allowance
    pub padding_px: f64,
    /// Class that designates a page container
    pub page_class: String,
}

impl PageConfig {
    /// Height available to content once padding is taken off
    pub fn usable_height(&self) -> f64 {
        self.height_px - self.padding_px
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            width: "8.5in".to_string(),
            height_px: 1056.0,
            padding_px: 96.0,
            page_class: "page".to_string(),
        }
    }
}

/// Locale and date/time formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatSettings {
    pub locale: String,
    /// IANA zone used for timestamps that carry an offset
    pub timezone: Option<String>,
    pub date_format: String,
    pub long_date_format: String,
    pub time_format: String,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            timezone: None,
            date_format: "MM/DD/YYYY".to_string(),
            long_date_format: "MMMM D, YYYY".to_string(),
            time_format: "h:mm A".to_string(),
        }
    }
}

impl FormatSettings {
    /// Resolve the configured time zone, ignoring names chrono-tz does not know
    pub fn tz(&self) -> Option<chrono_tz::Tz> {
        let name = self.timezone.as_deref()?;
        match name.parse::<chrono_tz::Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                tracing::warn!("Unknown timezone {}, using timestamp offsets as-is", name);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.page.width, "8.5in");
        assert_eq!(config.page.usable_height(), 960.0);
        assert_eq!(config.format.date_format, "MM/DD/YYYY");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
page:
  width: 210mm
  height_px: 1123
format:
  locale: de-DE
  timezone: Europe/Berlin
constants:
  FONT_FAMILY: Georgia, serif
"#;
        let config: RenderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.page.width, "210mm");
        assert_eq!(config.page.padding_px, 96.0);
        assert_eq!(config.format.locale, "de-DE");
        assert_eq!(config.format.tz(), Some(chrono_tz::Europe::Berlin));
        assert_eq!(config.constants["FONT_FAMILY"], "Georgia, serif");
    }

    #[test]
    fn test_load_rejects_recursive_constant() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "constants:\n  TEXT_COLOR: \"[[ACCENT_COLOR]]\"").unwrap();
        assert!(RenderConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_rejects_untokenizable_constant_name() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "constants:\n  accent-color: \"#ff0000\"").unwrap();
        let err = RenderConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("accent-color"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "constants:\n  accent_color: \"#ff0000\"").unwrap();
        assert!(RenderConfig::load(file.path()).is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page:\n  padding_px: 120").unwrap();
        let config = RenderConfig::load(file.path()).unwrap();
        assert_eq!(config.page.usable_height(), 936.0);
    }

    #[test]
    fn test_unknown_timezone_is_ignored() {
        let settings = FormatSettings {
            timezone: Some("Mars/Olympus".to_string()),
            ..FormatSettings::default()
        };
        assert!(settings.tz().is_none());
    }
}
