use indexmap::IndexSet;

use workbench_grammar::{Node, Token, Visitor};

/// The stack slots of the named values of a function.
///
/// Slot 0 holds the return address. The parameters take the next slots, then every assigned
/// variable in order of first assignment. Slot `k` lives at `[sp + 4k]`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Symbols {
    names: IndexSet<String>,
}

impl Symbols {
    /// Allocate the slots of a function with these parameters and this body.
    pub(crate) fn allocate(parameters: &[String], body: &Node) -> Symbols {
        let mut names: IndexSet<String> = parameters.iter().cloned().collect();
        match AllocateSymbols.visit(body, &mut names) {
            Ok(()) => {}
            Err(never) => match never {},
        }
        Symbols { names }
    }

    pub(crate) fn slot(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name).map(|index| index + 1)
    }

    /// How many slots are taken by named values.
    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}

struct AllocateSymbols;

impl Visitor for AllocateSymbols {
    type Output = ();
    type Context = IndexSet<String>;
    type Error = std::convert::Infallible;

    fn dispatch(
        &mut self,
        node: &Node,
        names: &mut IndexSet<String>,
    ) -> Option<Result<(), Self::Error>> {
        if node.ty != "assignment" {
            return None;
        }
        if let Some(target) = node.labeled("target") {
            names.insert(target.text());
        }
        Some(Ok(()))
    }

    fn visit_nonterminal(
        &mut self,
        node: &Node,
        names: &mut IndexSet<String>,
    ) -> Result<(), Self::Error> {
        self.visit_children(node, names).map(|_| ())
    }

    fn visit_terminal(
        &mut self,
        _node: &Node,
        _token: &Token,
        _names: &mut IndexSet<String>,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}
