use workbench_grammar::{print, Grammar, Layout, Node, Shake, Token};

use crate::languages::{loaded, LoadedGrammar};
use crate::{LangError, Language};

mod assembler;

pub use assembler::{assemble, Line, Listing, Operand};

lazy_static! {
    static ref GRAMMAR: LoadedGrammar = Grammar::load("a", include_str!("../../../grammars/a.xbnf"));
}

/// The assembly language of the MP0 machine.
#[derive(Debug, Default)]
pub struct LanguageA;

impl LanguageA {
    pub fn new() -> Self {
        LanguageA
    }
}

impl Language for LanguageA {
    fn name(&self) -> &'static str {
        "a"
    }

    fn extensions(&self) -> Vec<&'static str> {
        vec!["a", "asm"]
    }

    fn grammar(&self) -> Result<&'static Grammar, LangError> {
        loaded(&GRAMMAR)
    }

    fn shaker(&self) -> Shake {
        Shake::new().splice(["line"])
    }

    /// One constant, label or instruction per line, instructions indented.
    fn print(&self, ast: &Node) -> String {
        let mut lines = Vec::new();
        for section in ast.children() {
            let mut items = Vec::new();
            flatten(section, &mut items);
            let Some((header, items)) = items.split_first() else {
                continue;
            };
            lines.push(header.text());
            for item in items {
                let text = print(item, &ALayout);
                if item.ty == "label" {
                    lines.push(text);
                } else {
                    lines.push(format!("{}{}", ALayout.indent_unit(), text));
                }
            }
        }
        lines.join("\n")
    }
}

/// The items of a section, looking through `line` nodes of raw trees.
fn flatten<'n>(node: &'n Node, items: &mut Vec<&'n Node>) {
    for child in node.children() {
        if child.ty == "line" || workbench_grammar::is_generated(&child.ty) {
            flatten(child, items);
        } else {
            items.push(child);
        }
    }
}

struct ALayout;

impl Layout for ALayout {
    fn space_between(&self, prev: &Token, next: &Token) -> bool {
        !matches!(prev.lexeme.as_str(), "-" | "=") && next.lexeme != ":"
    }
}
