//! Evaluator - renders the block tree against a data context
//!
//! Evaluation is total: missing data, type mismatches and unknown helpers
//! degrade to empty output, `false` or zero. Only parsing can fail.

use indexmap::IndexMap;

use super::expr::{BinaryOp, Expr, PathExpr, PathScope, UnaryOp};
use super::parser::Node;
use super::value::Value;
use crate::helpers::{compare, math, HelperRegistry};

/// One level of `this` binding
struct Frame {
    this: Value,
    index: Option<usize>,
    len: usize,
}

/// Evaluator that renders AST nodes to output
pub struct Evaluator<'a> {
    root: &'a Value,
    globals: Option<&'a IndexMap<String, Value>>,
    helpers: &'a HelperRegistry,
    frames: Vec<Frame>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        root: &'a Value,
        globals: Option<&'a IndexMap<String, Value>>,
        helpers: &'a HelperRegistry,
    ) -> Self {
        Self {
            root,
            globals,
            helpers,
            frames: vec![Frame {
                this: root.clone(),
                index: None,
                len: 0,
            }],
        }
    }

    /// Render AST nodes to string
    pub fn render(&mut self, nodes: &[Node]) -> String {
        let mut output = String::new();
        self.render_nodes(nodes, &mut output);
        output
    }

    fn render_nodes(&mut self, nodes: &[Node], output: &mut String) {
        for node in nodes {
            self.render_node(node, output);
        }
    }

    fn render_node(&mut self, node: &Node, output: &mut String) {
        match node {
            Node::Text(text) => output.push_str(text),
            Node::Output(expr) => {
                let value = self.evaluate(expr);
                output.push_str(&value.to_output_string());
            }
            Node::If {
                branches,
                else_branch,
            } => {
                for (condition, body) in branches {
                    if self.evaluate(condition).is_truthy() {
                        self.render_nodes(body, output);
                        return;
                    }
                }
                if let Some(else_body) = else_branch {
                    self.render_nodes(else_body, output);
                }
            }
            Node::Unless {
                condition,
                body,
                else_branch,
            } => {
                if !self.evaluate(condition).is_truthy() {
                    self.render_nodes(body, output);
                } else if let Some(else_body) = else_branch {
                    self.render_nodes(else_body, output);
                }
            }
            Node::Each {
                iterable,
                body,
                else_branch,
            } => {
                let items = match self.evaluate(iterable) {
                    Value::Array(items) => items,
                    _ => Vec::new(),
                };
                if items.is_empty() {
                    if let Some(else_body) = else_branch {
                        self.render_nodes(else_body, output);
                    }
                    return;
                }
                let len = items.len();
                for (idx, item) in items.into_iter().enumerate() {
                    self.frames.push(Frame {
                        this: item,
                        index: Some(idx),
                        len,
                    });
                    self.render_nodes(body, output);
                    self.frames.pop();
                }
            }
            Node::With {
                target,
                body,
                else_branch,
            } => {
                let value = self.evaluate(target);
                if value.is_truthy() {
                    self.frames.push(Frame {
                        this: value,
                        index: None,
                        len: 0,
                    });
                    self.render_nodes(body, output);
                    self.frames.pop();
                } else if let Some(else_body) = else_branch {
                    self.render_nodes(else_body, output);
                }
            }
        }
    }

    /// Evaluate an expression to a value
    pub fn evaluate(&self, expr: &Expr) -> Value {
        match expr {
            Expr::Literal(value) => value.clone(),
            Expr::Path(path) => {
                let value = self.resolve(path);
                if value.is_undefined() {
                    if let Some(name) = path.bare_name() {
                        if self.helpers.contains(name) {
                            return self.helpers.call(name, &[]);
                        }
                    }
                }
                value
            }
            Expr::Call { name, args } => {
                let args: Vec<Value> = args.iter().map(|a| self.evaluate(a)).collect();
                if !self.helpers.contains(name) {
                    tracing::debug!("Unknown helper {} resolves to undefined", name);
                }
                self.helpers.call(name, &args)
            }
            Expr::Unary { op, operand } => {
                let value = self.evaluate(operand);
                match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.as_number()),
                }
            }
            Expr::Binary { op, left, right } => self.evaluate_binary(*op, left, right),
        }
    }

    fn evaluate_binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Value {
        // short-circuit before touching the right operand
        match op {
            BinaryOp::Or => {
                let l = self.evaluate(left);
                return Value::Bool(l.is_truthy() || self.evaluate(right).is_truthy());
            }
            BinaryOp::And => {
                let l = self.evaluate(left);
                return Value::Bool(l.is_truthy() && self.evaluate(right).is_truthy());
            }
            _ => {}
        }

        let l = self.evaluate(left);
        let r = self.evaluate(right);
        match op {
            BinaryOp::Eq => compare::eq(&l, &r),
            BinaryOp::Ne => compare::ne(&l, &r),
            BinaryOp::StrictEq => Value::Bool(l == r),
            BinaryOp::StrictNe => Value::Bool(l != r),
            BinaryOp::Lt => compare::lt(&l, &r),
            BinaryOp::Le => compare::lte(&l, &r),
            BinaryOp::Gt => compare::gt(&l, &r),
            BinaryOp::Ge => compare::gte(&l, &r),
            BinaryOp::Add => math::plus(&l, &r),
            BinaryOp::Sub => math::subtract(&l, &r),
            BinaryOp::Mul => math::multiply(&l, &r),
            BinaryOp::Div => math::divide(&l, &r),
            BinaryOp::Rem => math::remainder(&l, &r),
            BinaryOp::Or | BinaryOp::And => Value::Undefined,
        }
    }

    fn frame(&self, depth: usize) -> &Frame {
        let idx = self.frames.len().saturating_sub(1 + depth);
        &self.frames[idx]
    }

    fn resolve(&self, path: &PathExpr) -> Value {
        let frame = self.frame(path.depth);
        let rest = path.segments.join(".");

        match &path.scope {
            PathScope::This => frame.this.lookup(&rest),
            PathScope::Root => self.root.lookup(&rest),
            PathScope::Data(name) => match (name.as_str(), frame.index) {
                ("index", Some(idx)) => Value::Number(idx as f64),
                ("first", Some(idx)) => Value::Bool(idx == 0),
                ("last", Some(idx)) => Value::Bool(idx + 1 == frame.len),
                _ => Value::Undefined,
            },
            PathScope::Implicit => {
                let found = frame.this.lookup(&rest);
                if !found.is_undefined() {
                    return found;
                }
                if path.depth == 0 {
                    let found = self.root.lookup(&rest);
                    if !found.is_undefined() {
                        return found;
                    }
                }
                self.resolve_global(&path.segments)
            }
        }
    }

    fn resolve_global(&self, segments: &[String]) -> Value {
        let Some(globals) = self.globals else {
            return Value::Undefined;
        };
        match segments.split_first() {
            Some((head, tail)) => match globals.get(head) {
                Some(value) => value.lookup(&tail.join(".")),
                None => Value::Undefined,
            },
            None => Value::Undefined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::lexer::Lexer;
    use crate::template::parser::Parser;
    use serde_json::json;

    fn render(src: &str, data: serde_json::Value) -> String {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let nodes = Parser::new(tokens).parse().unwrap();
        let data = Value::from_json(&data);
        let helpers = HelperRegistry::default();
        Evaluator::new(&data, None, &helpers).render(&nodes)
    }

    #[test]
    fn test_each_binds_this() {
        let out = render(
            "{{#each attempts}}{{this.status}} {{/each}}",
            json!({"attempts": [{"status": "not_served"}, {"status": "served"}]}),
        );
        assert_eq!(out, "not_served served ");
    }

    #[test]
    fn test_each_over_non_sequence_iterates_zero_times() {
        assert_eq!(render("[{{#each missing}}x{{/each}}]", json!({})), "[]");
        assert_eq!(render("[{{#each name}}x{{/each}}]", json!({"name": "J"})), "[]");
        assert_eq!(
            render("{{#each missing}}x{{else}}none{{/each}}", json!({})),
            "none"
        );
    }

    #[test]
    fn test_loop_frame_variables() {
        let out = render(
            "{{#each docs}}{{@index}}:{{title}}{{#unless @last}}, {{/unless}}{{/each}}",
            json!({"docs": [{"title": "Summons"}, {"title": "Complaint"}]}),
        );
        assert_eq!(out, "0:Summons, 1:Complaint");
    }

    #[test]
    fn test_parent_scope_access() {
        let out = render(
            "{{#each attempts}}{{../case_number}}-{{@root.case_number}}{{/each}}",
            json!({"case_number": "24-1", "attempts": [{}]}),
        );
        assert_eq!(out, "24-1-24-1");
    }

    #[test]
    fn test_if_else_if_with_operators() {
        let src = "{{#if count > 2}}many{{else if count == 1}}one{{else}}other{{/if}}";
        assert_eq!(render(src, json!({"count": 3})), "many");
        assert_eq!(render(src, json!({"count": "1"})), "one");
        assert_eq!(render(src, json!({})), "other");
    }

    #[test]
    fn test_helper_calls_in_conditions() {
        let src = "{{#if (eq status 'served')}}yes{{else}}no{{/if}}";
        assert_eq!(render(src, json!({"status": "served"})), "yes");
        assert_eq!(render(src, json!({"status": "pending"})), "no");
    }

    #[test]
    fn test_with_block() {
        let out = render(
            "{{#with company}}{{name}}{{else}}none{{/with}}",
            json!({"company": {"name": "Acme Process"}}),
        );
        assert_eq!(out, "Acme Process");
        assert_eq!(render("{{#with company}}x{{else}}none{{/with}}", json!({})), "none");
    }

    #[test]
    fn test_missing_data_renders_empty() {
        assert_eq!(render("[{{a.b.c}}][{{nope 1 2}}]", json!({})), "[][]");
    }

    #[test]
    fn test_globals_fallback() {
        let tokens = Lexer::new("{{service_date_short}}").tokenize().unwrap();
        let nodes = Parser::new(tokens).parse().unwrap();
        let data = Value::from_json(&json!({}));
        let mut globals = IndexMap::new();
        globals.insert("service_date_short".to_string(), Value::from("03/15/2024"));
        let helpers = HelperRegistry::default();
        let out = Evaluator::new(&data, Some(&globals), &helpers).render(&nodes);
        assert_eq!(out, "03/15/2024");
    }

    #[test]
    fn test_arithmetic_and_concat() {
        assert_eq!(render("{{fee + 10}}", json!({"fee": 65})), "75");
        assert_eq!(render("{{'No. ' + n}}", json!({"n": 4})), "No. 4");
        assert_eq!(render("{{total / 0}}", json!({"total": 5})), "0");
    }
}
