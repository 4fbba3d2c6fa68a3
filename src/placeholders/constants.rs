//! Static `[[NAME]]` constants substituted before any template evaluation

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::config::RenderConfig;

lazy_static! {
    static ref CONSTANT_TOKEN: Regex =
        Regex::new(r"\[\[([A-Z][A-Z0-9_]*)\]\]").expect("constant token pattern");
    static ref CONSTANT_NAME: Regex = Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("constant name pattern");
}

/// True if the name, upper-cased, can appear inside a `[[NAME]]` token
pub fn is_constant_name(name: &str) -> bool {
    CONSTANT_NAME.is_match(&name.to_ascii_uppercase())
}

/// True if the text contains anything shaped like a constant token
pub fn contains_constant_token(text: &str) -> bool {
    CONSTANT_TOKEN.is_match(text)
}

/// Authoring constants, independent of any data context
#[derive(Debug, Clone)]
pub struct Constants {
    values: IndexMap<String, String>,
}

impl Constants {
    /// Built-in constants for the configured page, with overrides applied
    pub fn from_config(config: &RenderConfig) -> Self {
        let page = &config.page;
        let mut values = IndexMap::new();
        let mut set = |name: &str, value: String| {
            values.insert(name.to_string(), value);
        };

        set("PAGE_WIDTH", page.width.clone());
        set("PAGE_HEIGHT", format!("{}px", page.height_px));
        set("PAGE_PADDING", format!("{}px", page.padding_px / 2.0));
        set("FONT_FAMILY", "'Times New Roman', Times, serif".to_string());
        set("FONT_SIZE", "12pt".to_string());
        set("LINE_HEIGHT", "1.5".to_string());
        set("TEXT_COLOR", "#000000".to_string());
        set("MUTED_COLOR", "#555555".to_string());
        set("BORDER_COLOR", "#000000".to_string());
        set("ACCENT_COLOR", "#1a3d7c".to_string());
        set("SPACING_XS", "4px".to_string());
        set("SPACING_SM", "8px".to_string());
        set("SPACING_MD", "16px".to_string());
        set("SPACING_LG", "24px".to_string());
        set("SPACING_XL", "48px".to_string());
        set("SIGNATURE_LINE_WIDTH", "3in".to_string());

        for (name, value) in &config.constants {
            if !is_constant_name(name) {
                tracing::warn!("Ignoring constant {:?}, names are letters, digits and underscores", name);
                continue;
            }
            if contains_constant_token(value) {
                tracing::warn!("Ignoring constant {} whose value contains a constant token", name);
                continue;
            }
            values.insert(name.to_ascii_uppercase(), value.clone());
        }

        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Replace every known `[[NAME]]`; unknown tokens are left for the author to see
    pub fn apply(&self, template: &str) -> String {
        CONSTANT_TOKEN
            .replace_all(template, |caps: &Captures| match self.values.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

impl Default for Constants {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}
