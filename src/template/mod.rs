//! Template engine for structured affidavit templates
//!
//! A template goes through a Lexer + Parser into a block tree once; the tree
//! can then be rendered any number of times against different data.

pub mod evaluator;
pub mod expr;
pub mod lexer;
pub mod parser;
pub mod value;

use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

use crate::helpers::HelperRegistry;
pub use evaluator::Evaluator;
pub use parser::Node;
pub use value::Value;

/// Template parsing errors
///
/// Rendering itself cannot fail; every variant here is a syntax problem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Invalid expression `{expr}` at line {line}: {message}")]
    InvalidExpression {
        line: usize,
        expr: String,
        message: String,
    },

    #[error("Unclosed block #{name} opened at line {line}")]
    UnclosedBlock { name: String, line: usize },

    #[error("Mismatched block at line {line}: expected {{{{/{expected}}}}}, found {{{{/{found}}}}}")]
    MismatchedBlock {
        expected: String,
        found: String,
        line: usize,
    },

    #[error("Unexpected {{{{/{name}}}}} at line {line} with no open block")]
    UnexpectedClose { name: String, line: usize },

    #[error("Unknown block helper #{name} at line {line}")]
    UnknownBlock { name: String, line: usize },
}

/// Represents a parsed template
#[derive(Debug, Clone)]
pub struct Template {
    pub ast: Vec<Node>,
}

/// The template engine
#[derive(Clone, Default)]
pub struct Engine {
    helpers: Arc<HelperRegistry>,
}

impl Engine {
    /// Create an engine bound to a helper registry
    pub fn new(helpers: HelperRegistry) -> Self {
        Self {
            helpers: Arc::new(helpers),
        }
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    /// Parse a template string
    pub fn parse(&self, source: &str) -> Result<Template, TemplateError> {
        // Lexer: source -> tokens
        let tokens = lexer::Lexer::new(source).tokenize()?;

        // Parser: tokens -> AST
        let ast = parser::Parser::new(tokens).parse()?;

        Ok(Template { ast })
    }

    /// Render a parsed template with the given data
    pub fn render(&self, template: &Template, data: &Value) -> String {
        Evaluator::new(data, None, &self.helpers).render(&template.ast)
    }

    /// Render with fallback values for names the data does not define
    pub fn render_with_globals(
        &self,
        template: &Template,
        data: &Value,
        globals: &IndexMap<String, Value>,
    ) -> String {
        Evaluator::new(data, Some(globals), &self.helpers).render(&template.ast)
    }

    /// Parse and render in one step
    pub fn render_str(&self, source: &str, data: &Value) -> Result<String, TemplateError> {
        let template = self.parse(source)?;
        Ok(self.render(&template, data))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("helpers", &self.helpers)
            .finish()
    }
}
