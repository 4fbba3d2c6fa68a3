//! Just enough CSS reading for break rules and box estimates

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RULE: Regex = Regex::new(r"(?s)([^{}]+)\{([^{}]*)\}").expect("css rule pattern");
    static ref COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").expect("css comment pattern");
    static ref SIMPLE_SELECTOR: Regex =
        Regex::new(r"^(?:([A-Za-z][A-Za-z0-9]*)|\.([A-Za-z_][A-Za-z0-9_-]*))$")
            .expect("selector pattern");
}

/// `name: value` pairs of a declaration block, names lower-cased
pub fn declarations(block: &str) -> Vec<(String, String)> {
    block
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_end_matches("!important").trim();
            Some((name, value.to_string()))
        })
        .collect()
}

/// Last value declared for `name`
pub fn declaration(block: &str, name: &str) -> Option<String> {
    declarations(block)
        .into_iter()
        .rev()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}

/// Does the declaration block ask the element not to be broken across pages
pub fn avoids_break_inside(block: &str) -> bool {
    declarations(block).iter().any(|(name, value)| {
        (name == "page-break-inside" || name == "break-inside")
            && matches!(value.to_ascii_lowercase().as_str(), "avoid" | "avoid-page")
    })
}

#[derive(Debug, Clone)]
enum Selector {
    Tag(String),
    Class(String),
}

impl Selector {
    fn matches(&self, tag: &str, class_attr: Option<&str>) -> bool {
        match self {
            Selector::Tag(t) => t.eq_ignore_ascii_case(tag),
            Selector::Class(c) => class_attr
                .map(|classes| classes.split_whitespace().any(|x| x == c))
                .unwrap_or(false),
        }
    }
}

/// Rules of a stylesheet keyed by simple selectors
///
/// Only bare `tag` and `.class` selectors are kept; anything compound is
/// dropped. Rules stay in source order so later ones win.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<(Selector, String)>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let css = COMMENT.replace_all(css, "");
        let mut rules = Vec::new();
        for caps in RULE.captures_iter(&css) {
            for selector in caps[1].split(',').map(str::trim) {
                let Some(simple) = SIMPLE_SELECTOR.captures(selector) else {
                    continue;
                };
                let selector = match (simple.get(1), simple.get(2)) {
                    (Some(tag), _) => Selector::Tag(tag.as_str().to_ascii_lowercase()),
                    (_, Some(class)) => Selector::Class(class.as_str().to_string()),
                    _ => continue,
                };
                rules.push((selector, caps[2].to_string()));
            }
        }
        Self { rules }
    }

    /// Declarations of every matching rule joined in source order
    pub fn declarations_for(&self, tag: &str, class_attr: Option<&str>) -> String {
        self.rules
            .iter()
            .filter(|(selector, _)| selector.matches(tag, class_attr))
            .map(|(_, block)| block.trim())
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Rule declarations followed by the inline style, so inline values come last
    pub fn cascade(&self, tag: &str, class_attr: Option<&str>, inline: &str) -> String {
        let sheet = self.declarations_for(tag, class_attr);
        match (sheet.is_empty(), inline.trim().is_empty()) {
            (true, _) => inline.to_string(),
            (false, true) => sheet,
            (false, false) => format!("{};{}", sheet, inline),
        }
    }

    /// Does a matching rule ask the element not to be broken across pages
    pub fn keeps_together(&self, tag: &str, class_attr: Option<&str>) -> bool {
        avoids_break_inside(&self.declarations_for(tag, class_attr))
    }
}
