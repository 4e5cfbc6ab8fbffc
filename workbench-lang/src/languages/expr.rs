use std::collections::HashMap;

use workbench_grammar::{Grammar, Node, Shake, Token, Visitor};

use crate::languages::{is_token, loaded, range_of, LoadedGrammar};
use crate::{EvalError, LangError, Language};

lazy_static! {
    static ref GRAMMAR: LoadedGrammar = Grammar::load("expr", include_str!("../../grammars/expr.xbnf"));
}

/// Arithmetic expressions: `+ - * / %`, unary minus, parentheses, integers and variables.
#[derive(Debug, Default)]
pub struct LanguageExpr;

impl LanguageExpr {
    pub fn new() -> Self {
        LanguageExpr
    }
}

impl Language for LanguageExpr {
    fn name(&self) -> &'static str {
        "expr"
    }

    fn extensions(&self) -> Vec<&'static str> {
        vec!["expr"]
    }

    fn grammar(&self) -> Result<&'static Grammar, LangError> {
        loaded(&GRAMMAR)
    }

    fn shaker(&self) -> Shake {
        Shake::new().splice(["primary"])
    }
}

/// Compute the value of a shaken expression with wrapping 32 bit arithmetic, looking up the
/// variables in `env`.
pub fn evaluate(ast: &Node, env: &HashMap<String, i32>) -> Result<i32, EvalError> {
    Evaluate { env }.visit(ast, &mut ())
}

struct Evaluate<'e> {
    env: &'e HashMap<String, i32>,
}

fn malformed(node: &Node, message: &str) -> EvalError {
    EvalError::Malformed {
        message: message.to_string(),
        range: range_of(node),
    }
}

impl Evaluate<'_> {
    /// Fold `operand (operator operand)*`.
    fn fold(&mut self, node: &Node) -> Result<i32, EvalError> {
        let children = node.children();
        let (first, rest) = children
            .split_first()
            .ok_or_else(|| malformed(node, "empty operation"))?;
        let mut value = self.visit(first, &mut ())?;
        for pair in rest.chunks(2) {
            let [op, operand] = pair else {
                return Err(malformed(node, "dangling operator"));
            };
            let rhs = self.visit(operand, &mut ())?;
            let op = op.token().map(|t| t.lexeme.as_str()).unwrap_or_default();
            value = match op {
                "+" => value.wrapping_add(rhs),
                "-" => value.wrapping_sub(rhs),
                "*" => value.wrapping_mul(rhs),
                "/" | "%" if rhs == 0 => {
                    return Err(EvalError::DivisionByZero {
                        range: range_of(operand),
                    })
                }
                "/" => value.wrapping_div(rhs),
                "%" => value.wrapping_rem(rhs),
                _ => return Err(malformed(node, "unknown operator")),
            };
        }
        Ok(value)
    }

    fn unary(&mut self, node: &Node) -> Result<i32, EvalError> {
        match node.children() {
            [minus, operand] if is_token(minus, "-") => {
                Ok(self.visit(operand, &mut ())?.wrapping_neg())
            }
            [open, inner, close] if is_token(open, "(") && is_token(close, ")") => {
                self.visit(inner, &mut ())
            }
            [single] => self.visit(single, &mut ()),
            _ => Err(malformed(node, "invalid unary expression")),
        }
    }
}

impl Visitor for Evaluate<'_> {
    type Output = i32;
    type Context = ();
    type Error = EvalError;

    fn dispatch(&mut self, node: &Node, _ctx: &mut ()) -> Option<Result<i32, EvalError>> {
        let result = match node.ty.as_str() {
            "sum" | "product" => self.fold(node),
            "unary" => self.unary(node),
            "number" => node
                .token()
                .and_then(Token::int)
                .map(|v| v as i32)
                .ok_or_else(|| malformed(node, "invalid number")),
            "variable" => {
                let name = node.text();
                self.env
                    .get(&name)
                    .copied()
                    .ok_or(EvalError::UnboundVariable {
                        name,
                        range: range_of(node),
                    })
            }
            _ => return None,
        };
        Some(result)
    }

    fn visit_nonterminal(&mut self, node: &Node, ctx: &mut ()) -> Result<i32, EvalError> {
        match node.children() {
            [single] => self.visit(single, ctx),
            _ => Err(malformed(node, "unexpected node")),
        }
    }

    fn visit_terminal(&mut self, node: &Node, _token: &Token, _ctx: &mut ()) -> Result<i32, EvalError> {
        Err(malformed(node, "unexpected token"))
    }
}
