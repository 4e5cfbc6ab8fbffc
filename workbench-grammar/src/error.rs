use thiserror::Error;

use workbench_diagnostics::{Cursor, CursorRange, Diagnostic};

fn near(found: &Option<String>) -> String {
    match found {
        Some(token) => format!(" near {}", token),
        None => " at end of input".to_string(),
    }
}

/// The source text cannot be split into tokens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("{cursor}: invalid character {character:?}")]
    InvalidCharacter { cursor: Cursor, character: char },
}

impl LexError {
    pub fn cursor(&self) -> Cursor {
        match self {
            LexError::InvalidCharacter { cursor, .. } => *cursor,
        }
    }
}

/// The token stream does not match the grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The entry point did not match at all. The cursor is the furthest token reached.
    #[error("{cursor}: failed to parse{}", near(.found))]
    Failed {
        cursor: Cursor,
        found: Option<String>,
    },
    /// The entry point matched a prefix of the input only.
    #[error("{cursor}: did not parse until end of file{}", near(.found))]
    Incomplete {
        cursor: Cursor,
        found: Option<String>,
    },
}

impl ParseError {
    pub fn cursor(&self) -> Cursor {
        match self {
            ParseError::Failed { cursor, .. } | ParseError::Incomplete { cursor, .. } => *cursor,
        }
    }
}

/// A grammar definition is not valid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("nonterminal <{name}> is used but never defined")]
    UndefinedNonterminal { name: String },
    #[error("unknown terminal {name}")]
    UnknownTerminal { name: String },
    #[error("nonterminal <{name}> is defined more than once")]
    DuplicateRule { name: String },
    #[error("grammar {name} has no entry point <{name}>")]
    MissingEntryPoint { name: String },
    #[error("invalid pattern /{pattern}/: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("malformed grammar tree at {range}: {message}")]
    Malformed { range: CursorRange, message: String },
    #[error("cannot lex the grammar: {0}")]
    Lex(#[from] LexError),
    #[error("cannot parse the grammar: {0}")]
    Parse(#[from] ParseError),
}

/// Any error of the grammar engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

impl Error {
    /// Make a [`Diagnostic`] out of this error, pointing at the offending position if known.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.to_string());
        match self {
            Error::Lex(e) => diagnostic.with_range(CursorRange::at(e.cursor())),
            Error::Parse(e) => diagnostic.with_range(CursorRange::at(e.cursor())),
            Error::Grammar(GrammarError::Malformed { range, .. }) => {
                diagnostic.with_range(*range)
            }
            Error::Grammar(_) => diagnostic,
        }
    }
}
