//! Template lexer
//!
//! Splits a template into literal text and `{{ ... }}` tags. Tags are
//! classified here (output, block open/close, else, comment) but their
//! expressions are left as source text for the expression parser.

use super::TemplateError;

/// Token types produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Raw text content
    Text(String),
    /// Output: `{{ expr }}` or `{{{ expr }}}`
    Output { expr: String, line: usize },
    /// Block opener: `{{#each expr}}`
    Open {
        name: String,
        expr: String,
        line: usize,
    },
    /// Block closer: `{{/each}}`
    Close { name: String, line: usize },
    /// `{{else}}`, `{{^}}` or `{{else if expr}}`
    Else { chain: Option<String>, line: usize },
    /// `{{! ... }}` and `{{!-- ... --}}`
    Comment,
}

/// Lexer for templates - uses character-based iteration to handle Unicode
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    trim_next_text: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            trim_next_text: false,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, TemplateError> {
        let mut tokens = Vec::new();

        while self.pos < self.chars.len() {
            if self.starts_with("{{") {
                let (token, trim_before, trim_after) = self.read_tag()?;
                if trim_before {
                    if let Some(Token::Text(text)) = tokens.last_mut() {
                        let trimmed = text.trim_end().len();
                        text.truncate(trimmed);
                    }
                }
                self.trim_next_text = trim_after;
                tokens.push(token);
            } else {
                let mut text = self.read_text();
                if std::mem::take(&mut self.trim_next_text) {
                    text = text.trim_start().to_string();
                }
                if !text.is_empty() {
                    tokens.push(Token::Text(text));
                }
            }
        }

        tokens.retain(|t| !matches!(t, Token::Text(s) if s.is_empty()));
        Ok(tokens)
    }

    fn starts_with(&self, s: &str) -> bool {
        let mut idx = self.pos;
        for c in s.chars() {
            if self.chars.get(idx) != Some(&c) {
                return false;
            }
            idx += 1;
        }
        true
    }

    fn read_text(&mut self) -> String {
        let mut result = String::new();
        while self.pos < self.chars.len() && !self.starts_with("{{") {
            let c = self.chars[self.pos];
            if c == '\n' {
                self.line += 1;
            }
            result.push(c);
            self.pos += 1;
        }
        result
    }

    /// Read everything up to `close`, returning the enclosed text
    fn read_until(&mut self, close: &str, start_line: usize) -> Result<String, TemplateError> {
        let start = self.pos;
        while self.pos < self.chars.len() {
            if self.starts_with(close) {
                let content: String = self.chars[start..self.pos].iter().collect();
                self.pos += close.chars().count();
                return Ok(content);
            }
            if self.chars[self.pos] == '\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
        Err(TemplateError::ParseError {
            line: start_line,
            message: format!("Unclosed tag, expected `{}`", close),
        })
    }

    /// Read one tag; returns the token plus the `~` trim markers
    fn read_tag(&mut self) -> Result<(Token, bool, bool), TemplateError> {
        let line = self.line;

        if self.starts_with("{{!--") {
            self.pos += 5;
            self.read_until("--}}", line)?;
            return Ok((Token::Comment, false, false));
        }

        let triple = self.starts_with("{{{");
        self.pos += if triple { 3 } else { 2 };
        let raw = self.read_until(if triple { "}}}" } else { "}}" }, line)?;

        let mut content = raw.as_str();
        let trim_before = content.starts_with('~');
        if trim_before {
            content = &content[1..];
        }
        let trim_after = content.ends_with('~');
        if trim_after {
            content = &content[..content.len() - 1];
        }
        let content = content.trim();

        if triple {
            return Ok((Token::Output { expr: content.to_string(), line }, trim_before, trim_after));
        }

        let token = if content.starts_with('!') {
            Token::Comment
        } else if let Some(rest) = content.strip_prefix('#') {
            let rest = rest.trim_start();
            let (name, expr) = match rest.find(char::is_whitespace) {
                Some(idx) => (&rest[..idx], rest[idx..].trim()),
                None => (rest, ""),
            };
            if name.is_empty() {
                return Err(TemplateError::ParseError {
                    line,
                    message: "Block tag without a name".to_string(),
                });
            }
            Token::Open {
                name: name.to_string(),
                expr: expr.to_string(),
                line,
            }
        } else if let Some(rest) = content.strip_prefix('/') {
            Token::Close {
                name: rest.trim().to_string(),
                line,
            }
        } else if content == "else" || content == "^" {
            Token::Else { chain: None, line }
        } else if let Some(rest) = content.strip_prefix("else ") {
            Token::Else {
                chain: Some(rest.trim().to_string()),
                line,
            }
        } else if let Some(rest) = content.strip_prefix('&') {
            Token::Output {
                expr: rest.trim().to_string(),
                line,
            }
        } else {
            Token::Output {
                expr: content.to_string(),
                line,
            }
        };

        Ok((token, trim_before, trim_after))
    }
}
