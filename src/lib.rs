//! affidavit-engine: templating and pagination for legal affidavits
//!
//! Job data is rendered through an affidavit template (flat `{{placeholder}}`
//! substitution or a structured dialect with blocks, helpers and operators)
//! into one resolved HTML document, which the paginator then splits into
//! self-contained, fixed-height page fragments.

pub mod commands;
pub mod config;
pub mod helpers;
pub mod paginate;
pub mod placeholders;
pub mod render;
pub mod template;

use anyhow::Result;
use std::path::Path;

use crate::config::RenderConfig;
use crate::paginate::{EstimatingMeasurer, Measurement, Paginator};
use crate::render::Renderer;

/// Render a template against a JSON data context with default settings
///
/// Never fails: syntax errors come back as an error block in the document.
pub fn render(template: &str, context: &serde_json::Value) -> String {
    Renderer::default().render_json(template, context)
}

/// Split a resolved document into pages with the estimating measurer
///
/// Always returns at least one fragment.
pub fn paginate(document: &str, page_width: Measurement) -> Vec<String> {
    Paginator::default().paginate(document, page_width)
}

/// Settings shared by the CLI commands
#[derive(Debug, Clone, Default)]
pub struct Affidavit {
    pub config: RenderConfig,
}

impl Affidavit {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Load settings from a YAML file, or use defaults when none is given
    pub fn load<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        let config = match config_path {
            Some(path) => RenderConfig::load(path)?,
            None => RenderConfig::default(),
        };
        Ok(Self::new(config))
    }

    pub fn renderer(&self) -> Renderer {
        Renderer::new(&self.config)
    }

    pub fn paginator(&self) -> Paginator<EstimatingMeasurer> {
        Paginator::new(EstimatingMeasurer::default(), self.config.page.clone())
    }

    /// Configured page width; validated when the config was loaded
    pub fn page_width(&self) -> Measurement {
        Measurement::parse(&self.config.page.width).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_entry_point() {
        assert_eq!(
            render(
                "Hello {{recipient_name}}, served on {{service_date_short}}",
                &json!({"recipient_name": "J. Doe", "service_date": "2024-03-15"})
            ),
            "Hello J. Doe, served on 03/15/2024"
        );
        assert_eq!(render("{{name}}", &json!({})), "");
    }

    #[test]
    fn test_paginate_entry_point_never_empty() {
        for document in ["", "text only", "<div class=\"page\"></div>", "<p>one</p>"] {
            assert!(!paginate(document, Measurement::default()).is_empty());
        }
    }

    #[test]
    fn test_render_then_paginate() {
        let template = r#"<div class="page">{{#each sections}}<div style="height: 400px">{{this}}</div>{{/each}}</div>"#;
        let html = render(template, &json!({"sections": ["a", "b", "c", "d", "e"]}));
        let pages = paginate(&html, Measurement::inches(8.5));
        assert_eq!(pages.len(), 3);
        assert!(pages[2].contains(">e</div>"));
    }

    #[test]
    fn test_paginate_keeps_unwrapped_content() {
        let pages = paginate("<p>one</p><p>two</p><p>three</p>", Measurement::default());
        let joined = pages.concat();
        for text in ["one", "two", "three"] {
            assert!(joined.contains(&format!("<p>{}</p>", text)));
        }
    }
}
