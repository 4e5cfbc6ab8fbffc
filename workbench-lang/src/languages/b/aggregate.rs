use indexmap::IndexSet;

use workbench_grammar::{Node, Token, Visitor};

use crate::languages::range_of;
use crate::CompileError;

/// The distinct string literals of a program, in order of first appearance. The index of a
/// literal is the index of its constant in the data section.
pub(crate) fn constants(ast: &Node) -> Result<IndexSet<String>, CompileError> {
    let mut constants = IndexSet::new();
    Aggregate.visit(ast, &mut constants)?;
    Ok(constants)
}

struct Aggregate;

impl Visitor for Aggregate {
    type Output = ();
    type Context = IndexSet<String>;
    type Error = CompileError;

    fn dispatch(
        &mut self,
        node: &Node,
        constants: &mut IndexSet<String>,
    ) -> Option<Result<(), CompileError>> {
        if node.ty != "string" {
            return None;
        }
        let result = match node.token().and_then(Token::string) {
            Some(text) => {
                constants.insert(text.to_string());
                Ok(())
            }
            None => Err(CompileError::Malformed {
                message: "invalid string literal".into(),
                range: range_of(node),
            }),
        };
        Some(result)
    }

    fn visit_nonterminal(
        &mut self,
        node: &Node,
        constants: &mut IndexSet<String>,
    ) -> Result<(), CompileError> {
        self.visit_children(node, constants).map(|_| ())
    }

    fn visit_terminal(
        &mut self,
        _node: &Node,
        _token: &Token,
        _constants: &mut IndexSet<String>,
    ) -> Result<(), CompileError> {
        Ok(())
    }
}
