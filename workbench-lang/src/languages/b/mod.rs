use workbench_grammar::{print, vocabulary, Grammar, Layout, Node, Shake, Token};

use crate::languages::{loaded, LoadedGrammar};
use crate::{LangError, Language};

mod aggregate;
mod compile;
mod symbols;

pub use compile::{compile, MAX_PARAMETERS};

lazy_static! {
    static ref GRAMMAR: LoadedGrammar = Grammar::load("b", include_str!("../../../grammars/b.xbnf"));
}

/// A small imperative language with functions, loops, memory access and the env calls as
/// built-in functions, compiled to A.
#[derive(Debug, Default)]
pub struct LanguageB;

impl LanguageB {
    pub fn new() -> Self {
        LanguageB
    }
}

impl Language for LanguageB {
    fn name(&self) -> &'static str {
        "b"
    }

    fn extensions(&self) -> Vec<&'static str> {
        vec!["b"]
    }

    fn grammar(&self) -> Result<&'static Grammar, LangError> {
        loaded(&GRAMMAR)
    }

    fn shaker(&self) -> Shake {
        Shake::new().splice(["statement", "primary"])
    }

    fn print(&self, ast: &Node) -> String {
        print(ast, &BLayout)
    }
}

/// C-like layout: one statement per line, blocks indented, calls written `f(x)`.
struct BLayout;

impl Layout for BLayout {
    fn space_between(&self, prev: &Token, next: &Token) -> bool {
        if next.lexeme == "(" && prev.ty == vocabulary::IDENTIFIER {
            return false;
        }
        !matches!(prev.lexeme.as_str(), "(" | "[" | "!")
            && !matches!(next.lexeme.as_str(), ")" | "]" | "," | ";")
    }

    fn newline_after(&self, token: &Token) -> bool {
        matches!(token.lexeme.as_str(), "{" | ";" | "}")
    }

    fn indent_after(&self, token: &Token) -> bool {
        token.lexeme == "{"
    }

    fn dedent_before(&self, token: &Token) -> bool {
        token.lexeme == "}"
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_format() {
        let lang = LanguageB::new();
        let formatted = lang
            .format("fn main(){x=0;while(x<3){printi(x);x=x+1;}if(!x)return 1;else return[x+4];}")
            .unwrap();
        let expected = [
            "fn main() {",
            "    x = 0;",
            "    while (x < 3) {",
            "        printi(x);",
            "        x = x + 1;",
            "    }",
            "    if (!x) return 1;",
            "    else return [x + 4];",
            "}",
        ]
        .join("\n");
        assert_eq!(formatted, expected);
        assert_eq!(lang.format(&formatted).unwrap(), formatted);
    }

    #[test]
    fn test_shake() {
        let lang = LanguageB::new();
        let shaken = lang.shake(&lang.parse("fn f(a, b) return a - -b;").unwrap());
        assert_eq!(lang.shake(&shaken), shaken);
        let function = &shaken.children()[0];
        assert_eq!(function.labeled("body").map(|b| b.ty.as_str()), Some("return"));
    }
}
