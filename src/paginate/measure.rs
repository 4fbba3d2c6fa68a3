//! Lengths and the measurement surface used by the paginator

use kuchiki::traits::TendrilSink;
use kuchiki::{ElementData, NodeData, NodeRef};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::css::{self, Stylesheet};

/// CSS pixels per inch
pub const PX_PER_INCH: f64 = 96.0;

/// Errors from a measurement surface
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasureError {
    #[error("Invalid length: {0}")]
    InvalidLength(String),

    #[error("Measurement surface unavailable: {0}")]
    Unavailable(String),

    #[error("Could not measure block: {0}")]
    Failed(String),
}

/// An absolute CSS length, stored in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    px: f64,
}

impl Measurement {
    pub fn px(px: f64) -> Self {
        Self { px }
    }

    pub fn inches(inches: f64) -> Self {
        Self {
            px: inches * PX_PER_INCH,
        }
    }

    /// Parse `816px`, `8.5in`, `612pt`, `215.9mm` or `21.59cm`; a bare number is pixels
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let value: f64 = number.parse().ok().filter(|v: &f64| v.is_finite())?;
        let px = match unit.trim() {
            "" | "px" => value,
            "in" => value * PX_PER_INCH,
            "pt" => value * PX_PER_INCH / 72.0,
            "pc" => value * PX_PER_INCH / 6.0,
            "mm" => value * PX_PER_INCH / 25.4,
            "cm" => value * PX_PER_INCH / 2.54,
            _ => return None,
        };
        Some(Self { px })
    }

    pub fn to_px(self) -> f64 {
        self.px
    }
}

impl Default for Measurement {
    /// US Letter width
    fn default() -> Self {
        Self::inches(8.5)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.px)
    }
}

impl FromStr for Measurement {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| MeasureError::InvalidLength(s.to_string()))
    }
}

/// Something that can lay out HTML and report its height
///
/// Each call must use its own scratch surface; nothing is shared between calls.
pub trait MeasurementPort {
    /// Rendered height in CSS pixels of `html` laid out at `width` with `styles` in effect
    fn measure_height(&self, html: &str, width: Measurement, styles: &str)
        -> Result<f64, MeasureError>;
}

impl<M: MeasurementPort + ?Sized> MeasurementPort for &M {
    fn measure_height(&self, html: &str, width: Measurement, styles: &str) -> Result<f64, MeasureError> {
        (**self).measure_height(html, width, styles)
    }
}

/// Box-model estimator that needs no browser
///
/// Text is wrapped at an average glyph width; block elements stack their
/// line boxes plus vertical margin and padding. Bare `tag` and `.class`
/// rules from the supplied styles are cascaded under the inline style. An
/// explicit `height` on an element wins over its content, and
/// `display: contents` wrappers add nothing of their own.
#[derive(Debug, Clone)]
pub struct EstimatingMeasurer {
    pub font_size_px: f64,
    pub line_height: f64,
    /// Average glyph advance as a fraction of the font size
    pub glyph_width_em: f64,
}

impl Default for EstimatingMeasurer {
    fn default() -> Self {
        Self {
            font_size_px: 16.0,
            line_height: 1.5,
            glyph_width_em: 0.5,
        }
    }
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "dt", "dd", "fieldset", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "tbody", "thead", "tfoot", "tr", "ul",
];

const SKIPPED_TAGS: &[&str] = &["head", "link", "meta", "script", "style", "template", "title"];

/// Lower-cased local name of an element
pub(crate) fn element_tag(element: &ElementData) -> String {
    element.name.local.to_string().to_ascii_lowercase()
}

fn heading_scale(tag: &str) -> f64 {
    match tag {
        "h1" => 2.0,
        "h2" => 1.5,
        "h3" => 1.17,
        "h5" => 0.83,
        "h6" => 0.67,
        _ => 1.0,
    }
}

impl EstimatingMeasurer {
    fn line_px(&self, scale: f64) -> f64 {
        self.font_size_px * scale * self.line_height
    }

    fn text_height(&self, text: &str, width_px: f64, scale: f64) -> f64 {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return 0.0;
        }
        let per_line = (width_px / (self.font_size_px * scale * self.glyph_width_em)).max(1.0);
        let lines = (text.chars().count() as f64 / per_line).ceil();
        lines * self.line_px(scale)
    }

    fn length_px(&self, value: &str, scale: f64) -> Option<f64> {
        let value = value.trim();
        if let Some(em) = value.strip_suffix("em") {
            return em.trim().parse::<f64>().ok().map(|v| v * self.font_size_px * scale);
        }
        Measurement::parse(value).map(Measurement::to_px)
    }

    /// Vertical margin and padding; later declarations replace earlier ones per side
    fn vertical_extra(&self, style: &str, scale: f64) -> f64 {
        // margin top/bottom, padding top/bottom
        let mut sides = [0.0; 4];
        for (name, value) in css::declarations(style) {
            let px = |v: &str| self.length_px(v, scale).unwrap_or(0.0);
            let (base, longhand) = match name.split_once('-') {
                Some((base, side)) => (base, Some(side)),
                None => (name.as_str(), None),
            };
            let offset = match base {
                "margin" => 0,
                "padding" => 2,
                _ => continue,
            };
            match longhand {
                Some("top") => sides[offset] = px(&value),
                Some("bottom") => sides[offset + 1] = px(&value),
                Some(_) => {}
                None => {
                    let parts: Vec<f64> = value.split_whitespace().map(px).collect();
                    let (top, bottom) = match parts.as_slice() {
                        [all] => (*all, *all),
                        [vertical, _] => (*vertical, *vertical),
                        [top, _, bottom] | [top, _, bottom, _] => (*top, *bottom),
                        _ => continue,
                    };
                    sides[offset] = top;
                    sides[offset + 1] = bottom;
                }
            }
        }
        sides.iter().sum()
    }

    /// Font scale after an element's own `font-size`, or its heading size when it declares none
    fn font_scale(&self, style: &str, tag: &str, scale: f64) -> f64 {
        match css::declaration(style, "font-size") {
            Some(size) => match size.trim().strip_suffix("em") {
                Some(em) if !em.ends_with('r') => em.trim().parse::<f64>().map(|v| scale * v).unwrap_or(scale),
                _ => self
                    .length_px(&size, scale)
                    .map(|px| px / self.font_size_px)
                    .unwrap_or(scale),
            },
            None => scale * heading_scale(tag),
        }
    }

    fn node_height(&self, node: &NodeRef, sheet: &Stylesheet, width_px: f64, scale: f64) -> f64 {
        match node.data() {
            NodeData::Text(text) => self.text_height(&text.borrow(), width_px, scale),
            NodeData::Element(element) => {
                let tag = element_tag(element);
                if SKIPPED_TAGS.contains(&tag.as_str()) {
                    return 0.0;
                }
                let attrs = element.attributes.borrow();
                let style = sheet.cascade(&tag, attrs.get("class"), attrs.get("style").unwrap_or(""));
                let scale = self.font_scale(&style, &tag, scale);
                match css::declaration(&style, "display").as_deref() {
                    Some("none") => return 0.0,
                    Some("contents") => return self.children_height(node, sheet, width_px, scale),
                    _ => {}
                }
                let extra = self.vertical_extra(&style, scale);
                if let Some(height) = css::declaration(&style, "height")
                    .and_then(|h| self.length_px(&h, scale))
                {
                    return height + extra;
                }
                match tag.as_str() {
                    "br" => self.line_px(scale),
                    "hr" => 2.0 + extra,
                    "img" => {
                        attrs
                            .get("height")
                            .and_then(|h| self.length_px(h, scale))
                            .unwrap_or(0.0)
                            + extra
                    }
                    _ => self.children_height(node, sheet, width_px, scale) + extra,
                }
            }
            NodeData::Document(_) | NodeData::DocumentFragment => {
                self.children_height(node, sheet, width_px, scale)
            }
            _ => 0.0,
        }
    }

    /// Stack block children; runs of inline content become line boxes
    fn children_height(&self, node: &NodeRef, sheet: &Stylesheet, width_px: f64, scale: f64) -> f64 {
        let mut total = 0.0;
        let mut inline_text = String::new();
        for child in node.children() {
            let tag = child.as_element().map(element_tag);
            let tag = tag.as_deref();
            if tag.map(|t| SKIPPED_TAGS.contains(&t)).unwrap_or(false) {
                continue;
            }
            let is_block = tag.map(|t| BLOCK_TAGS.contains(&t)).unwrap_or(false);
            if is_block || tag == Some("br") {
                total += self.text_height(&inline_text, width_px, scale);
                inline_text.clear();
                total += self.node_height(&child, sheet, width_px, scale);
            } else {
                inline_text.push_str(&child.text_contents());
                inline_text.push(' ');
            }
        }
        total + self.text_height(&inline_text, width_px, scale)
    }
}

impl MeasurementPort for EstimatingMeasurer {
    fn measure_height(&self, html: &str, width: Measurement, styles: &str) -> Result<f64, MeasureError> {
        let width_px = width.to_px();
        if width_px <= 0.0 {
            return Err(MeasureError::InvalidLength(width.to_string()));
        }
        let scratch = kuchiki::parse_html().one(format!("{}{}", styles, html));
        let body = scratch
            .select_first("body")
            .map_err(|_| MeasureError::Failed("no body in scratch document".to_string()))?;
        let sheet = match scratch.select("style") {
            Ok(found) => Stylesheet::parse(&found.map(|s| s.text_contents()).collect::<Vec<_>>().join("\n")),
            Err(_) => Stylesheet::default(),
        };
        let height = self.children_height(body.as_node(), &sheet, width_px, 1.0);
        tracing::debug!("Estimated {:.1}px for {} bytes of markup", height, html.len());
        Ok(height)
    }
}
