//! The languages of the workbench.
//!
//! Every language implements the [`Language`] trait: a grammar loaded from its XBNF source plus
//! the way its trees are shaken and printed. The [`LanguageManager`] knows all of them and finds
//! the language of a file from its extension, or of a source by trying every parser.
//!
//! Besides parsing and formatting, some languages have a back end:
//! - B is compiled to the source of an A program by [`compile`];
//! - A is assembled into an MP0 [`Program`](workbench_mp0::Program) by [`assemble`];
//! - Expr expressions are computed by [`evaluate`];
//! - regexes are lowered to the syntax of the `regex` crate by [`to_pattern`].
//!
//! # Example
//!
//! ```
//! use workbench_lang::LanguageManager;
//!
//! let lang = LanguageManager::detect_language("sum.expr").unwrap();
//! assert_eq!(lang.format("(a+b)*c").unwrap(), "(a + b) * c");
//! ```

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

mod error;
mod language;
mod languages;

pub use error::{AssemblyError, CompileError, EvalError, LangError};
pub use language::Language;
pub use languages::a::{assemble, LanguageA, Line, Listing, Operand};
pub use languages::b::{compile, LanguageB, MAX_PARAMETERS};
pub use languages::expr::{evaluate, LanguageExpr};
pub use languages::regex::{to_pattern, to_regex, LanguageRegex};
pub use languages::xbnf::LanguageXbnf;

use std::path::Path;
use std::sync::Arc;

/// Manager of all the known languages, use this to get [`Language`] instances.
pub struct LanguageManager {
    /// The list of all the known languages.
    known_languages: Vec<Arc<dyn Language>>,
}

impl LanguageManager {
    fn new() -> LanguageManager {
        LanguageManager {
            // in the order they are tried when guessing
            known_languages: vec![
                Arc::new(LanguageB::new()),
                Arc::new(LanguageA::new()),
                Arc::new(LanguageExpr::new()),
                Arc::new(LanguageRegex::new()),
                Arc::new(LanguageXbnf::new()),
            ],
        }
    }

    /// All the known languages, in guessing order.
    pub fn languages() -> Vec<Arc<dyn Language>> {
        LANGUAGE_MANAGER_SINGL.known_languages.clone()
    }

    /// Given a path to a file guess its language from the extension.
    pub fn detect_language<P: AsRef<Path>>(path: P) -> Option<Arc<dyn Language>> {
        let manager = &LANGUAGE_MANAGER_SINGL;
        let ext = path
            .as_ref()
            .extension()
            .map(|s| s.to_string_lossy())
            .unwrap_or_else(|| "".into())
            .to_lowercase();
        for lang in manager.known_languages.iter() {
            for lang_ext in lang.extensions().iter() {
                if ext == *lang_ext {
                    return Some(lang.clone());
                }
            }
        }
        None
    }

    /// Search between the known languages the one with the specified name.
    pub fn from_name<S: AsRef<str>>(name: S) -> Option<Arc<dyn Language>> {
        let manager = &LANGUAGE_MANAGER_SINGL;
        for lang in manager.known_languages.iter() {
            if lang.name() == name.as_ref() {
                return Some(lang.clone());
            }
        }
        None
    }

    /// The first language, in guessing order, whose parser accepts `source`.
    pub fn guess(source: &str) -> Option<Arc<dyn Language>> {
        let manager = &LANGUAGE_MANAGER_SINGL;
        for lang in manager.known_languages.iter() {
            match lang.parse(source) {
                Ok(_) => {
                    debug!("The source looks like {}", lang.name());
                    return Some(lang.clone());
                }
                Err(e) => trace!("Not {}: {}", lang.name(), e),
            }
        }
        None
    }
}

lazy_static! {
    /// The singleton instance of the `LanguageManager`.
    static ref LANGUAGE_MANAGER_SINGL: LanguageManager = LanguageManager::new();
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;

    #[test]
    fn test_detect_language() {
        let lang = LanguageManager::detect_language("foo.b").unwrap();
        assert_that!(lang.name()).is_equal_to("b");
        let lang = LanguageManager::detect_language("dir/foo.ASM").unwrap();
        assert_that!(lang.name()).is_equal_to("a");
    }

    #[test]
    fn test_detect_language_unknown() {
        assert_that!(LanguageManager::detect_language("foo.blah")).is_none();
        assert_that!(LanguageManager::detect_language("foo")).is_none();
    }

    #[test]
    fn test_from_name() {
        for name in ["b", "a", "expr", "regex", "xbnf"] {
            let lang = LanguageManager::from_name(name).unwrap();
            assert_that!(lang.name()).is_equal_to(name);
        }
        assert_that!(LanguageManager::from_name("c")).is_none();
    }

    #[test]
    fn test_every_grammar_loads() {
        for lang in LanguageManager::languages() {
            assert_that!(lang.grammar()).is_ok();
        }
    }

    #[test]
    fn test_guess() {
        let guess = |source| LanguageManager::guess(source).map(|l| l.name());
        assert_that!(guess("fn main() return 0;")).is_equal_to(Some("b"));
        assert_that!(guess(".code exitv 0")).is_equal_to(Some("a"));
        assert_that!(guess("(a + 1) * 2")).is_equal_to(Some("expr"));
        assert_that!(guess("(a | b)* c")).is_equal_to(Some("regex"));
        assert_that!(guess("<x> ::= \"x\";")).is_equal_to(Some("xbnf"));
        assert_that!(guess("}")).is_none();
    }
}
