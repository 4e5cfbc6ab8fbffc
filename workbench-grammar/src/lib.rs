//! The grammar engine of the workbench.
//!
//! Source text is split into [`Token`]s by a [`Lexer`] driven by a [`Vocabulary`], then parsed
//! into a tree of [`Node`]s by a [`Grammar`]. Grammars are either built by hand with a
//! [`GrammarBuilder`] or loaded from their XBNF source with [`Grammar::load`]. Trees are walked
//! with [`Visitor`]s, like [`Shake`] which rebuilds them in a canonical form, and printed back to
//! source with [`print`].
//!
//! ```
//! use workbench_grammar::{print, DefaultLayout, Grammar};
//!
//! let grammar = Grammar::load("pair", r#"<pair> ::= "(" identifier "," identifier ")";"#)?;
//! let tree = grammar.parse("( a , b )")?;
//! assert_eq!(print(&tree, &DefaultLayout), "(a, b)");
//! # Ok::<(), workbench_grammar::Error>(())
//! ```

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

mod ast;
mod error;
pub mod grammar;
mod lexer;
mod parser;
mod print;
mod shake;
mod token;
pub mod visitor;
pub mod vocabulary;
pub mod xbnf;

pub use ast::{Node, NodeKind};
pub use error::{Error, GrammarError, LexError, ParseError};
pub use grammar::{Grammar, GrammarBuilder, TermSpec};
pub use lexer::Lexer;
pub use parser::Parser;
pub use print::{print, print_tokens, DefaultLayout, Layout, LINE_WIDTH};
pub use shake::{is_generated, Shake};
pub use token::{Literal, Token};
pub use visitor::Visitor;
pub use vocabulary::{Vocabulary, VocabularyEntry};
