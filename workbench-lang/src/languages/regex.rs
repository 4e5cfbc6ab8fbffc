use workbench_grammar::{print, Grammar, Layout, Node, Token, Visitor};

use crate::languages::{is_token, loaded, range_of, LoadedGrammar};
use crate::{LangError, Language};

lazy_static! {
    static ref GRAMMAR: LoadedGrammar =
        Grammar::load("regex", include_str!("../../grammars/regex.xbnf"));
}

/// Regular expressions over words: alternation, concatenation, `* + ?`, `.` and groups. The
/// atoms are identifiers, integers and quoted strings, all matched literally.
#[derive(Debug, Default)]
pub struct LanguageRegex;

impl LanguageRegex {
    pub fn new() -> Self {
        LanguageRegex
    }
}

impl Language for LanguageRegex {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn extensions(&self) -> Vec<&'static str> {
        vec!["regex", "re"]
    }

    fn grammar(&self) -> Result<&'static Grammar, LangError> {
        loaded(&GRAMMAR)
    }

    fn print(&self, ast: &Node) -> String {
        print(ast, &RegexLayout)
    }
}

/// Quantifiers stick to their atom.
struct RegexLayout;

impl Layout for RegexLayout {
    fn space_between(&self, prev: &Token, next: &Token) -> bool {
        prev.lexeme != "("
            && !matches!(next.lexeme.as_str(), ")" | "*" | "+" | "?")
    }
}

/// Lower a shaken regex tree to the syntax of the `regex` crate.
pub fn to_pattern(ast: &Node) -> String {
    match ToPattern.visit(ast, &mut ()) {
        Ok(pattern) => pattern,
        Err(never) => match never {},
    }
}

/// Lower a shaken regex tree and compile it, anchored at both ends.
pub fn to_regex(ast: &Node) -> Result<::regex::Regex, LangError> {
    let pattern = format!("^(?:{})$", to_pattern(ast));
    debug!("Compiling regex {:?} ({})", pattern, range_of(ast));
    Ok(::regex::Regex::new(&pattern)?)
}

struct ToPattern;

impl Visitor for ToPattern {
    type Output = String;
    type Context = ();
    type Error = std::convert::Infallible;

    fn dispatch(&mut self, node: &Node, ctx: &mut ()) -> Option<Result<String, Self::Error>> {
        let result = match node.ty.as_str() {
            "repetition" => {
                let parts = match self.visit_children(node, ctx) {
                    Ok(parts) => parts,
                    Err(never) => match never {},
                };
                let needs_group =
                    parts.len() > 1 && node.child(0).map_or(false, is_long_literal);
                Ok(match (needs_group, parts.split_first()) {
                    (true, Some((atom, quantifier))) => {
                        format!("(?:{}){}", atom, quantifier.concat())
                    }
                    _ => parts.concat(),
                })
            }
            "any" => Ok(".".to_string()),
            _ => return None,
        };
        Some(result)
    }

    fn visit_nonterminal(&mut self, node: &Node, ctx: &mut ()) -> Result<String, Self::Error> {
        // groups keep their parentheses, made non-capturing
        let children = node.children();
        if let [open, inner, close] = children {
            if is_token(open, "(") && is_token(close, ")") {
                return Ok(format!("(?:{})", self.visit(inner, ctx)?));
            }
        }
        Ok(self.visit_children(node, ctx)?.concat())
    }

    fn visit_terminal(&mut self, node: &Node, token: &Token, _ctx: &mut ()) -> Result<String, Self::Error> {
        Ok(match node.ty.as_str() {
            "\"|\"" | "\"*\"" | "\"+\"" | "\"?\"" => token.lexeme.clone(),
            _ => ::regex::escape(&atom_text(token)),
        })
    }
}

/// Whether a `<primary>` is a literal of more than one character, which a quantifier would
/// otherwise only apply to the last character of.
fn is_long_literal(primary: &Node) -> bool {
    primary
        .child(0)
        .filter(|c| c.ty == "literal")
        .and_then(|c| c.child(0))
        .and_then(Node::token)
        .map_or(false, |t| atom_text(t).chars().count() > 1)
}

/// The text matched by an atom: the unescaped content of strings, the lexeme otherwise.
fn atom_text(token: &Token) -> String {
    token.string().unwrap_or(&token.lexeme).to_string()
}
