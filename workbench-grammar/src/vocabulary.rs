//! Named token definitions.
//!
//! A [`Vocabulary`] is an ordered set of [`VocabularyEntry`]s, each made of an anchored matcher
//! and a literal generator, plus a list of patterns to skip between tokens.

use indexmap::IndexMap;
use regex::Regex;

use crate::{GrammarError, Literal};

/// Name of the built-in identifier token.
pub const IDENTIFIER: &str = "identifier";
/// Name of the built-in unsigned decimal integer token.
pub const DECIMAL_INTEGER: &str = "decimal_integer";
/// Name of the built-in double quoted string token.
pub const ESCAPED_STRING: &str = "escaped_string";
/// Name of the built-in slash delimited regex token.
pub const REGEX: &str = "regex";
/// The empty terminal: matches without consuming anything.
pub const EMPTY: &str = "e";
/// The end of input terminal: matches only after the last token, without consuming it.
pub const END: &str = "$";

/// Patterns skipped between tokens when nothing else is declared.
const DEFAULT_IGNORE: &str = r"\s+";

/// A function building the literal value of a lexeme.
pub type LiteralGenerator = fn(&str) -> Option<Literal>;

lazy_static! {
    static ref BUILTINS: IndexMap<&'static str, VocabularyEntry> = {
        let entries = [
            VocabularyEntry::new(IDENTIFIER, r"[A-Za-z_][A-Za-z0-9_]*", no_literal),
            VocabularyEntry::new(DECIMAL_INTEGER, r"[0-9]+", integer_literal),
            VocabularyEntry::new(ESCAPED_STRING, r#""(?:[^"\\\n]|\\.)*""#, string_literal),
            VocabularyEntry::new(REGEX, r"/(?:[^/\\\n]|\\.)*/", regex_literal),
        ];
        entries
            .into_iter()
            .map(|entry| entry.expect("built-in token patterns are valid"))
            .map(|entry| (builtin_name(&entry.name), entry))
            .collect()
    };
}

fn builtin_name(name: &str) -> &'static str {
    match name {
        IDENTIFIER => IDENTIFIER,
        DECIMAL_INTEGER => DECIMAL_INTEGER,
        ESCAPED_STRING => ESCAPED_STRING,
        _ => REGEX,
    }
}

/// Whether `name` is one of the terminals that are never scanned (`e` and `$`).
pub fn is_reserved(name: &str) -> bool {
    name == EMPTY || name == END
}

/// Whether `name` is a built-in scanned token.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains_key(name)
}

fn no_literal(_: &str) -> Option<Literal> {
    None
}

fn integer_literal(lexeme: &str) -> Option<Literal> {
    lexeme.parse().ok().map(Literal::Int)
}

fn string_literal(lexeme: &str) -> Option<Literal> {
    let inner = lexeme.strip_prefix('"')?.strip_suffix('"')?;
    unescape(inner).map(Literal::Str)
}

fn regex_literal(lexeme: &str) -> Option<Literal> {
    let inner = lexeme.strip_prefix('/')?.strip_suffix('/')?;
    Some(Literal::Str(inner.replace("\\/", "/")))
}

/// Escape `text` so that it can be written between double quotes.
pub fn escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            '\0' => result.push_str("\\0"),
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            c => result.push(c),
        }
    }
    result
}

/// Undo [`escape`]. Returns `None` on an unknown or truncated escape sequence.
pub fn unescape(text: &str) -> Option<String> {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next()? {
            'n' => result.push('\n'),
            't' => result.push('\t'),
            'r' => result.push('\r'),
            '0' => result.push('\0'),
            '\\' => result.push('\\'),
            '"' => result.push('"'),
            _ => return None,
        }
    }
    Some(result)
}

/// The name of the exact-text entry matching `text`: the text quoted and escaped.
pub fn quote(text: &str) -> String {
    format!("\"{}\"", escape(text))
}

fn anchored(pattern: &str) -> Result<Regex, GrammarError> {
    Regex::new(&format!(r"\A(?:{})", pattern)).map_err(|e| GrammarError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// A named token definition.
#[derive(Debug, Clone)]
pub struct VocabularyEntry {
    name: String,
    matcher: Regex,
    generator: LiteralGenerator,
}

impl VocabularyEntry {
    /// Make an entry matching `pattern`, anchored at the current position.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        generator: LiteralGenerator,
    ) -> Result<Self, GrammarError> {
        Ok(Self {
            name: name.into(),
            matcher: anchored(pattern)?,
            generator,
        })
    }

    /// Make an entry matching exactly `text`. Its name is the quoted text.
    pub fn exact(text: &str) -> Result<Self, GrammarError> {
        Self::new(quote(text), &regex::escape(text), no_literal)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The length in bytes of the match at the start of `text`, if any.
    pub fn matches(&self, text: &str) -> Option<usize> {
        self.matcher.find(text).map(|m| m.end())
    }

    /// Build the literal value of a lexeme matched by this entry.
    pub fn generate(&self, lexeme: &str) -> Option<Literal> {
        (self.generator)(lexeme)
    }

    /// Whether this is the exact-text entry for `lexeme`.
    pub fn is_exact_for(&self, lexeme: &str) -> bool {
        self.name.starts_with('"') && self.name == quote(lexeme)
    }
}

/// An ordered set of token definitions and the patterns to skip between them.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entries: IndexMap<String, VocabularyEntry>,
    ignore: Vec<Regex>,
}

impl Vocabulary {
    /// An empty vocabulary which skips whitespace.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            // the default pattern is a constant, it always compiles
            ignore: anchored(DEFAULT_IGNORE).into_iter().collect(),
        }
    }

    /// Add an entry. If an entry with the same name is already present it is kept and `false`
    /// is returned.
    pub fn add(&mut self, entry: VocabularyEntry) -> bool {
        if self.entries.contains_key(entry.name()) {
            return false;
        }
        self.entries.insert(entry.name.clone(), entry);
        true
    }

    /// Add the exact-text entry for `text`, returning its name.
    pub fn add_exact(&mut self, text: &str) -> Result<String, GrammarError> {
        let entry = VocabularyEntry::exact(text)?;
        let name = entry.name.clone();
        self.add(entry);
        Ok(name)
    }

    /// Add one of the built-in entries by name.
    pub fn add_builtin(&mut self, name: &str) -> Result<(), GrammarError> {
        let entry = BUILTINS
            .get(name)
            .ok_or_else(|| GrammarError::UnknownTerminal {
                name: name.to_string(),
            })?;
        self.add(entry.clone());
        Ok(())
    }

    /// Add a pattern to skip between tokens.
    pub fn add_ignore(&mut self, pattern: &str) -> Result<(), GrammarError> {
        self.ignore.push(anchored(pattern)?);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&VocabularyEntry> {
        self.entries.get(name)
    }

    /// Whether a grammar can use `name` as a terminal with this vocabulary.
    pub fn knows_terminal(&self, name: &str) -> bool {
        is_reserved(name) || self.entries.contains_key(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &VocabularyEntry> {
        self.entries.values()
    }

    pub fn ignored(&self) -> &[Regex] {
        &self.ignore
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;

    #[test]
    fn test_escape_roundtrip() {
        let text = "a \"quoted\"\tline\n\\";
        assert_eq!(unescape(&escape(text)).unwrap(), text);
        assert_that!(unescape("bad \\q")).is_none();
        assert_that!(unescape("dangling \\")).is_none();
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("while"), "\"while\"");
        assert_eq!(quote("\n"), "\"\\n\"");
    }

    #[test]
    fn test_builtin_literals() {
        let mut vocabulary = Vocabulary::new();
        vocabulary.add_builtin(DECIMAL_INTEGER).unwrap();
        vocabulary.add_builtin(ESCAPED_STRING).unwrap();
        vocabulary.add_builtin(REGEX).unwrap();
        let int = vocabulary.get(DECIMAL_INTEGER).unwrap();
        assert_eq!(int.matches("123abc"), Some(3));
        assert_eq!(int.generate("123"), Some(Literal::Int(123)));
        let string = vocabulary.get(ESCAPED_STRING).unwrap();
        assert_eq!(string.matches(r#""a\"b" rest"#), Some(6));
        assert_eq!(
            string.generate(r#""hi\n""#),
            Some(Literal::Str("hi\n".to_string()))
        );
        let regex = vocabulary.get(REGEX).unwrap();
        assert_eq!(
            regex.generate(r"/a\/b/"),
            Some(Literal::Str("a/b".to_string()))
        );
    }

    #[test]
    fn test_matches_are_anchored() {
        let entry = VocabularyEntry::exact("+").unwrap();
        assert_eq!(entry.matches("+1"), Some(1));
        assert_eq!(entry.matches("1+"), None);
        assert!(entry.is_exact_for("+"));
    }

    #[test]
    fn test_unknown_builtin() {
        let mut vocabulary = Vocabulary::new();
        assert_that!(vocabulary.add_builtin("number")).is_err();
    }

    #[test]
    fn test_first_entry_wins() {
        let mut vocabulary = Vocabulary::new();
        assert!(vocabulary.add(VocabularyEntry::exact("if").unwrap()));
        assert!(!vocabulary.add(VocabularyEntry::exact("if").unwrap()));
        assert_eq!(vocabulary.len(), 1);
        assert!(vocabulary.knows_terminal("\"if\""));
        assert!(vocabulary.knows_terminal(EMPTY));
        assert!(!vocabulary.knows_terminal(IDENTIFIER));
    }

    #[test]
    fn test_invalid_ignore() {
        let mut vocabulary = Vocabulary::new();
        let error = vocabulary.add_ignore("(").unwrap_err();
        assert!(matches!(error, GrammarError::InvalidPattern { .. }));
    }
}
