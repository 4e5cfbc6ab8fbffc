use workbench_diagnostics::{Cursor, CursorRange};

use crate::{LexError, Token, Vocabulary, VocabularyEntry};

/// Splits source text into tokens using the entries of a [`Vocabulary`].
///
/// At every position the ignore patterns are drained first, then every entry is tried and the
/// longest match wins. On a tie the exact-text entry for the matched lexeme is preferred (so that
/// keywords beat identifiers), otherwise the entry declared first.
#[derive(Debug, Clone, Copy)]
pub struct Lexer<'v> {
    vocabulary: &'v Vocabulary,
}

impl<'v> Lexer<'v> {
    pub fn new(vocabulary: &'v Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Tokenize the whole `source`.
    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut position = 0;
        let mut cursor = Cursor::start();
        loop {
            position += self.skip_ignored(&source[position..], &mut cursor);
            let rest = &source[position..];
            let Some(first) = rest.chars().next() else {
                break;
            };
            let Some((entry, len)) = self.longest_match(rest) else {
                return Err(LexError::InvalidCharacter {
                    cursor,
                    character: first,
                });
            };
            let lexeme = &rest[..len];
            let start = cursor;
            let mut end = cursor;
            let mut chars = lexeme.chars().peekable();
            while let Some(c) = chars.next() {
                cursor.advance(c);
                if chars.peek().is_some() {
                    end.advance(c);
                }
            }
            let token = Token::new(
                entry.name(),
                lexeme,
                entry.generate(lexeme),
                CursorRange::new(start, end),
            );
            trace!("{} at {}", token, token.range);
            tokens.push(token);
            position += len;
        }
        Ok(tokens)
    }

    /// Skip all the ignored text at the start of `text`, returning its length.
    fn skip_ignored(&self, text: &str, cursor: &mut Cursor) -> usize {
        let mut skipped = 0;
        loop {
            let before = skipped;
            for pattern in self.vocabulary.ignored() {
                if let Some(m) = pattern.find(&text[skipped..]) {
                    cursor.advance_str(m.as_str());
                    skipped += m.end();
                }
            }
            if skipped == before {
                return skipped;
            }
        }
    }

    fn longest_match(&self, text: &str) -> Option<(&'v VocabularyEntry, usize)> {
        let mut best: Option<(&VocabularyEntry, usize)> = None;
        for entry in self.vocabulary.entries() {
            let Some(len) = entry.matches(text) else {
                continue;
            };
            if len == 0 {
                continue;
            }
            best = match best {
                None => Some((entry, len)),
                Some((_, best_len)) if len > best_len => Some((entry, len)),
                Some((current, best_len))
                    if len == best_len
                        && !current.is_exact_for(&text[..len])
                        && entry.is_exact_for(&text[..len]) =>
                {
                    Some((entry, len))
                }
                keep => keep,
            };
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use speculoos::prelude::*;

    use crate::vocabulary::{DECIMAL_INTEGER, ESCAPED_STRING, IDENTIFIER};
    use crate::Literal;

    use super::*;

    fn vocabulary() -> Vocabulary {
        let mut vocabulary = Vocabulary::new();
        vocabulary.add_builtin(IDENTIFIER).unwrap();
        vocabulary.add_builtin(DECIMAL_INTEGER).unwrap();
        vocabulary.add_builtin(ESCAPED_STRING).unwrap();
        for text in ["while", "=", "==", "(", ")", ";"] {
            vocabulary.add_exact(text).unwrap();
        }
        vocabulary.add_ignore(r"//[^\n]*").unwrap();
        vocabulary
    }

    fn types(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.ty.as_str()).collect()
    }

    #[test]
    fn test_keywords_beat_identifiers() {
        let vocabulary = vocabulary();
        let tokens = Lexer::new(&vocabulary).tokenize("while whiles").unwrap();
        assert_eq!(types(&tokens), vec!["\"while\"", "identifier"]);
    }

    #[test]
    fn test_longest_match() {
        let vocabulary = vocabulary();
        let tokens = Lexer::new(&vocabulary).tokenize("a==b=1").unwrap();
        assert_eq!(
            types(&tokens),
            vec!["identifier", "\"==\"", "identifier", "\"=\"", "decimal_integer"]
        );
        assert_eq!(tokens[4].literal, Some(Literal::Int(1)));
    }

    #[test]
    fn test_ranges() {
        let vocabulary = vocabulary();
        let tokens = Lexer::new(&vocabulary)
            .tokenize("x = \"hi\";\n  // comment\n  while")
            .unwrap();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[2].range.start, Cursor::new(1, 5));
        assert_eq!(tokens[2].range.end, Cursor::new(1, 8));
        assert_eq!(tokens[2].string(), Some("hi"));
        assert_eq!(tokens[4].range.start, Cursor::new(3, 3));
        assert_eq!(tokens[4].range.end, Cursor::new(3, 7));
    }

    #[test]
    fn test_invalid_character() {
        let vocabulary = vocabulary();
        let error = Lexer::new(&vocabulary).tokenize("x = 1\n  @").unwrap_err();
        assert_eq!(
            error,
            LexError::InvalidCharacter {
                cursor: Cursor::new(2, 3),
                character: '@'
            }
        );
    }

    #[test]
    fn test_only_ignored() {
        let vocabulary = vocabulary();
        let tokens = Lexer::new(&vocabulary).tokenize("  // nothing\n\t").unwrap();
        assert_that!(tokens).is_empty();
    }
}
