//! Parser - tokens to a block tree

use super::expr::{parse_expression, Expr};
use super::lexer::Token;
use super::TemplateError;

/// AST node types
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Raw text to output
    Text(String),

    /// Expression output, inserted without escaping
    Output(Expr),

    /// `#if` with optional `else if` chain and `else`
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        else_branch: Option<Vec<Node>>,
    },

    /// `#unless`
    Unless {
        condition: Expr,
        body: Vec<Node>,
        else_branch: Option<Vec<Node>>,
    },

    /// `#each`; the else branch renders when nothing was iterated
    Each {
        iterable: Expr,
        body: Vec<Node>,
        else_branch: Option<Vec<Node>>,
    },

    /// `#with`; rebinds `this`
    With {
        target: Expr,
        body: Vec<Node>,
        else_branch: Option<Vec<Node>>,
    },
}

/// Why a run of nodes stopped
enum Stop {
    Else { chain: Option<String>, line: usize },
    Close { name: String, line: usize },
    Eof,
}

/// Parser that converts tokens to AST
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse tokens into AST nodes
    pub fn parse(&mut self) -> Result<Vec<Node>, TemplateError> {
        let (nodes, stop) = self.parse_nodes()?;
        match stop {
            Stop::Eof => Ok(nodes),
            Stop::Else { line, .. } => Err(TemplateError::ParseError {
                line,
                message: "`{{else}}` outside of a block".to_string(),
            }),
            Stop::Close { name, line } => Err(TemplateError::UnexpectedClose { name, line }),
        }
    }

    /// Parse nodes until an else, a block closer, or the end of input
    fn parse_nodes(&mut self) -> Result<(Vec<Node>, Stop), TemplateError> {
        let mut nodes = Vec::new();

        while self.pos < self.tokens.len() {
            let token = self.tokens[self.pos].clone();
            self.pos += 1;

            match token {
                Token::Text(text) => nodes.push(Node::Text(text)),
                Token::Comment => {}
                Token::Output { expr, line } => nodes.push(Node::Output(parse_at(&expr, line)?)),
                Token::Open { name, expr, line } => nodes.push(self.parse_block(&name, &expr, line)?),
                Token::Else { chain, line } => return Ok((nodes, Stop::Else { chain, line })),
                Token::Close { name, line } => return Ok((nodes, Stop::Close { name, line })),
            }
        }

        Ok((nodes, Stop::Eof))
    }

    /// Parse a block body through its matching closer
    fn parse_block(&mut self, name: &str, expr: &str, line: usize) -> Result<Node, TemplateError> {
        if !matches!(name, "if" | "unless" | "each" | "with") {
            return Err(TemplateError::UnknownBlock {
                name: name.to_string(),
                line,
            });
        }

        let head = parse_at(expr, line)?;
        let (body, mut stop) = self.parse_nodes()?;
        let mut branches = vec![(head, body)];
        let mut else_branch = None;

        loop {
            match stop {
                Stop::Close { name: found, line: close_line } => {
                    if found != name {
                        return Err(TemplateError::MismatchedBlock {
                            expected: name.to_string(),
                            found,
                            line: close_line,
                        });
                    }
                    break;
                }
                Stop::Eof => {
                    return Err(TemplateError::UnclosedBlock {
                        name: name.to_string(),
                        line,
                    })
                }
                Stop::Else { chain: None, line: else_line } => {
                    if else_branch.is_some() {
                        return Err(TemplateError::ParseError {
                            line: else_line,
                            message: format!("Duplicate `{{{{else}}}}` in #{}", name),
                        });
                    }
                    let (nodes, next) = self.parse_nodes()?;
                    else_branch = Some(nodes);
                    stop = next;
                }
                Stop::Else {
                    chain: Some(chain),
                    line: else_line,
                } => {
                    let condition = match chain.strip_prefix("if ") {
                        Some(cond) if name == "if" && else_branch.is_none() => cond,
                        _ => {
                            return Err(TemplateError::ParseError {
                                line: else_line,
                                message: format!("Unsupported `{{{{else {}}}}}` in #{}", chain, name),
                            })
                        }
                    };
                    let condition = parse_at(condition, else_line)?;
                    let (nodes, next) = self.parse_nodes()?;
                    branches.push((condition, nodes));
                    stop = next;
                }
            }
        }

        let node = match name {
            "if" => Node::If {
                branches,
                else_branch,
            },
            _ => {
                let (head, body) = branches.remove(0);
                match name {
                    "unless" => Node::Unless {
                        condition: head,
                        body,
                        else_branch,
                    },
                    "each" => Node::Each {
                        iterable: head,
                        body,
                        else_branch,
                    },
                    _ => Node::With {
                        target: head,
                        body,
                        else_branch,
                    },
                }
            }
        };
        Ok(node)
    }
}

fn parse_at(src: &str, line: usize) -> Result<Expr, TemplateError> {
    parse_expression(src).map_err(|message| TemplateError::InvalidExpression {
        line,
        expr: src.to_string(),
        message,
    })
}
