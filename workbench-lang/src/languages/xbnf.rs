use workbench_grammar::xbnf::XBNF;
use workbench_grammar::{print, Grammar, Layout, Node, Token};

use crate::languages::{loaded, LoadedGrammar};
use crate::{LangError, Language};

lazy_static! {
    static ref GRAMMAR: LoadedGrammar = Grammar::load(XBNF, include_str!("../../grammars/xbnf.xbnf"));
}

/// XBNF itself, parsed by the grammar generated from its own source.
#[derive(Debug, Default)]
pub struct LanguageXbnf;

impl LanguageXbnf {
    pub fn new() -> Self {
        LanguageXbnf
    }
}

impl Language for LanguageXbnf {
    fn name(&self) -> &'static str {
        "xbnf"
    }

    fn extensions(&self) -> Vec<&'static str> {
        vec!["xbnf"]
    }

    fn grammar(&self) -> Result<&'static Grammar, LangError> {
        loaded(&GRAMMAR)
    }

    fn print(&self, ast: &Node) -> String {
        print(ast, &XbnfLayout)
    }
}

/// One declaration per line, nonterminals and labels written without inner spaces.
struct XbnfLayout;

impl Layout for XbnfLayout {
    fn space_between(&self, prev: &Token, next: &Token) -> bool {
        !matches!(prev.lexeme.as_str(), "(" | "<" | "=")
            && !matches!(
                next.lexeme.as_str(),
                ")" | ">" | ";" | "=" | "?" | "*" | "+"
            )
    }

    fn newline_after(&self, token: &Token) -> bool {
        token.lexeme == ";"
    }
}
