use std::fmt::{Display, Formatter};

use serde::Serialize;

use workbench_diagnostics::{Cursor, CursorRange};

/// The semantic value of a token, produced by its vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Literal {
    Int(i64),
    Str(String),
}

impl Literal {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(value) => Some(*value),
            Literal::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Int(_) => None,
            Literal::Str(value) => Some(value),
        }
    }
}

/// A lexeme recognized by the lexer.
///
/// Two tokens are equal when they have the same type, lexeme and literal: the range is not
/// considered, so that trees parsed from differently formatted sources can be compared.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    /// The name of the vocabulary entry that matched.
    pub ty: String,
    /// The matched text.
    pub lexeme: String,
    /// The value generated from the lexeme, if the entry generates one.
    pub literal: Option<Literal>,
    /// Where the lexeme is in the source.
    pub range: CursorRange,
}

impl Token {
    pub fn new(
        ty: impl Into<String>,
        lexeme: impl Into<String>,
        literal: Option<Literal>,
        range: CursorRange,
    ) -> Self {
        Self {
            ty: ty.into(),
            lexeme: lexeme.into(),
            literal,
            range,
        }
    }

    /// A token with no text, used for the empty terminal and the end of input.
    pub fn empty(ty: impl Into<String>, cursor: Cursor) -> Self {
        Self::new(ty, "", None, CursorRange::at(cursor))
    }

    pub fn is_empty(&self) -> bool {
        self.lexeme.is_empty()
    }

    /// The integer value of this token, if it has one.
    pub fn int(&self) -> Option<i64> {
        self.literal.as_ref().and_then(Literal::as_int)
    }

    /// The string value of this token, if it has one.
    pub fn string(&self) -> Option<&str> {
        self.literal.as_ref().and_then(Literal::as_str)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.lexeme == other.lexeme && self.literal == other.literal
    }
}

impl Eq for Token {}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}('{}')", self.ty, self.lexeme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_range() {
        let a = Token::new("identifier", "x", None, CursorRange::at(Cursor::new(1, 1)));
        let b = Token::new("identifier", "x", None, CursorRange::at(Cursor::new(7, 3)));
        assert_eq!(a, b);
        let c = Token::new("identifier", "y", None, CursorRange::at(Cursor::new(1, 1)));
        assert_ne!(a, c);
    }

    #[test]
    fn test_display() {
        let token = Token::new(
            "decimal_integer",
            "42",
            Some(Literal::Int(42)),
            CursorRange::default(),
        );
        assert_eq!(token.to_string(), "decimal_integer('42')");
        assert_eq!(token.int(), Some(42));
        assert_eq!(token.string(), None);
    }
}
