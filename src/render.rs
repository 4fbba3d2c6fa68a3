//! Template rendering entry point
//!
//! A render call runs the constants pass, picks a dialect once, and then
//! either substitutes flat placeholders or evaluates the structured
//! template. The result is always a string: structured syntax errors come
//! back as a visible error block inside the document.

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

use crate::config::{FormatSettings, RenderConfig};
use crate::helpers::html::error_block;
use crate::helpers::{Clock, HelperRegistry, SystemClock};
use crate::placeholders::{self, AffidavitFacts, Constants};
use crate::template::{Engine, Template, TemplateError, Value};

lazy_static! {
    static ref MUSTACHE: Regex = Regex::new(r"(?s)\{\{(.*?)\}\}").expect("mustache pattern");
}

/// Which evaluator a template needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Only `{{identifier}}` placeholders
    Flat,
    /// Blocks, helper calls, operators or triple-stash output
    Structured,
}

/// Decide the dialect from the template's `{{...}}` tokens
pub fn detect_dialect(template: &str) -> Dialect {
    let structured = MUSTACHE.captures_iter(template).any(|caps| {
        let inner = &caps[1];
        inner.starts_with('{') || !placeholders::is_flat_token(inner)
    });
    if structured {
        Dialect::Structured
    } else {
        Dialect::Flat
    }
}

/// A template after the constants pass, ready for its dialect
#[derive(Debug, Clone)]
pub enum Prepared {
    Flat(String),
    Structured(Template),
}

/// Renders affidavit templates against data contexts
pub struct Renderer {
    engine: Engine,
    constants: Constants,
    settings: FormatSettings,
    clock: Arc<dyn Clock>,
}

impl Renderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Renderer whose `current_date` and `now` read from `clock`
    pub fn with_clock(config: &RenderConfig, clock: Arc<dyn Clock>) -> Self {
        let helpers = HelperRegistry::builtin_with_clock(&config.format, clock.clone());
        Self {
            engine: Engine::new(helpers),
            constants: Constants::from_config(config),
            settings: config.format.clone(),
            clock,
        }
    }

    /// Replace the helper registry used by structured templates
    pub fn with_helpers(mut self, helpers: HelperRegistry) -> Self {
        self.engine = Engine::new(helpers);
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Constants pass plus dialect selection
    pub fn prepare(&self, template: &str) -> Result<Prepared, TemplateError> {
        let source = self.constants.apply(template);
        match detect_dialect(&source) {
            Dialect::Flat => Ok(Prepared::Flat(source)),
            Dialect::Structured => self.engine.parse(&source).map(Prepared::Structured),
        }
    }

    /// Render a prepared template
    pub fn render_prepared(&self, prepared: &Prepared, data: &Value) -> String {
        let facts = AffidavitFacts::compute(data, &self.settings, self.clock.now());
        match prepared {
            Prepared::Flat(source) => placeholders::substitute(source, &facts),
            Prepared::Structured(template) => {
                let globals = placeholders::globals(&facts);
                self.engine.render_with_globals(template, data, &globals)
            }
        }
    }

    /// Render a template string; never fails
    pub fn render(&self, template: &str, data: &Value) -> String {
        match self.prepare(template) {
            Ok(prepared) => {
                tracing::debug!(
                    "Rendering {} template",
                    match &prepared {
                        Prepared::Flat(_) => "flat",
                        Prepared::Structured(_) => "structured",
                    }
                );
                self.render_prepared(&prepared, data)
            }
            Err(e) => {
                tracing::warn!("Template error: {}", e);
                error_block(&e.to_string())
            }
        }
    }

    /// Render against a JSON data context
    pub fn render_json(&self, template: &str, data: &serde_json::Value) -> String {
        self.render(template, &Value::from_json(data))
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(&RenderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::FixedClock;
    use chrono::NaiveDate;
    use serde_json::json;

    fn renderer() -> Renderer {
        let now = NaiveDate::from_ymd_opt(2024, 4, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        Renderer::with_clock(&RenderConfig::default(), Arc::new(FixedClock(now)))
    }

    #[test]
    fn test_detect_dialect() {
        assert_eq!(detect_dialect("Hello {{name}} {{ company.name }}"), Dialect::Flat);
        assert_eq!(detect_dialect("plain html"), Dialect::Flat);
        assert_eq!(detect_dialect("{{#if a}}x{{/if}}"), Dialect::Structured);
        assert_eq!(detect_dialect("{{formatDate service_date}}"), Dialect::Structured);
        assert_eq!(detect_dialect("{{{notes}}}"), Dialect::Structured);
        assert_eq!(detect_dialect("{{! note }}{{name}}"), Dialect::Structured);
    }

    #[test]
    fn test_render_flat() {
        let out = renderer().render_json(
            "Hello {{recipient_name}}, served on {{service_date_short}}",
            &json!({"recipient_name": "J. Doe", "service_date": "2024-03-15"}),
        );
        assert_eq!(out, "Hello J. Doe, served on 03/15/2024");
    }

    #[test]
    fn test_render_structured() {
        let out = renderer().render_json(
            "{{#each attempts}}{{this.status}} {{/each}}",
            &json!({"attempts": [{"status": "not_served"}, {"status": "served"}]}),
        );
        assert_eq!(out, "not_served served ");
    }

    #[test]
    fn test_structured_sees_placeholder_table() {
        let out = renderer().render_json(
            "{{#if attempts}}{{plaintiff}} - {{current_date_short}} - {{formatCurrency fee}}{{/if}}",
            &json!({"attempts": [{"status": "served"}], "case_caption": "A v. B", "fee": 1234.5}),
        );
        assert_eq!(out, "A - 04/02/2024 - $1,234.50");
    }

    #[test]
    fn test_constants_run_before_both_dialects() {
        let r = renderer();
        assert_eq!(
            r.render_json("<div style=\"width:[[PAGE_WIDTH]]\">{{name}}</div>", &json!({"name": "x"})),
            "<div style=\"width:8.5in\">x</div>"
        );
        assert_eq!(
            r.render_json("{{#if name}}[[FONT_SIZE]]{{/if}}", &json!({"name": "x"})),
            "12pt"
        );
    }

    #[test]
    fn test_syntax_error_becomes_error_block() {
        let out = renderer().render_json("{{#each a}}{{/if}}", &json!({}));
        assert!(out.contains("template-error"));
        assert!(out.contains("Mismatched block at line 1"));
    }

    #[test]
    fn test_render_is_total_on_empty_context() {
        let r = renderer();
        for template in [
            "{{missing}}",
            "{{#each missing}}x{{/each}}",
            "{{formatDate missing}}{{divide 1 0}}",
            "{{a.b.c.d}}",
        ] {
            let out = r.render_json(template, &json!({}));
            assert!(!out.contains("{{"), "{} -> {}", template, out);
        }
    }

    #[test]
    fn test_offset_date_pattern_renders() {
        let out = renderer().render_json(
            "{{formatDate service_date 'YYYY ZZ'}}",
            &json!({"service_date": "2024-03-15"}),
        );
        assert_eq!(out, "2024 +0000");
    }

    #[test]
    fn test_custom_helpers() {
        let mut helpers = HelperRegistry::builtin(&FormatSettings::default());
        helpers.register("badge", |args: &[Value]| {
            Value::String(format!("[{}]", args.first().map(Value::to_output_string).unwrap_or_default()))
        });
        let r = renderer().with_helpers(helpers);
        assert_eq!(r.render_json("{{badge status}}", &json!({"status": "ok"})), "[ok]");
    }
}
