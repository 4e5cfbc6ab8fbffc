use workbench_diagnostics::CursorRange;
use workbench_grammar::{Grammar, Node};

use crate::LangError;

pub mod a;
pub mod b;
pub mod expr;
pub mod regex;
pub mod xbnf;

/// The grammar of a language, loaded once from its XBNF source.
pub(crate) type LoadedGrammar = Result<Grammar, workbench_grammar::Error>;

pub(crate) fn loaded(grammar: &'static LoadedGrammar) -> Result<&'static Grammar, LangError> {
    grammar.as_ref().map_err(|e| LangError::Grammar(e.clone()))
}

/// Whether `node` is a terminal with exactly this text.
pub(crate) fn is_token(node: &Node, text: &str) -> bool {
    node.token().map_or(false, |t| t.lexeme == text)
}

/// The range of `node`, or a default one for empty nodes.
pub(crate) fn range_of(node: &Node) -> CursorRange {
    node.range().unwrap_or_default()
}
