use std::collections::HashSet;
use std::convert::Infallible;

use crate::{Node, Token, Visitor};

/// Whether `ty` is a node type generated by the grammar rather than written by its author:
/// multiplicity wrappers (`x?`, `x*`, `x+`) and auxiliary rules (`x:0`, `x~0`).
pub fn is_generated(ty: &str) -> bool {
    ty.ends_with(['?', '*', '+']) || ty.contains([':', '~'])
}

/// Rebuilds a raw tree into the canonical form of a language.
///
/// Generated nodes and the types configured with [`Shake::splice`] are replaced by their
/// children. A node of a type configured with [`Shake::chain`] whose last child has the same
/// type absorbs the children of that child, so that right recursive lists become flat.
/// Shaking a shaken tree changes nothing.
#[derive(Debug, Clone, Default)]
pub struct Shake {
    splice: HashSet<String>,
    chain: HashSet<String>,
}

impl Shake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splice the nodes of these types into their parent.
    pub fn splice<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.splice.extend(types.into_iter().map(Into::into));
        self
    }

    /// Flatten chains of nodes of these types.
    pub fn chain<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chain.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn is_spliced(&self, ty: &str) -> bool {
        is_generated(ty) || self.splice.contains(ty)
    }

    /// Shake a whole tree. The root is kept even if its type is spliced.
    pub fn shake(&mut self, root: &Node) -> Node {
        match self.visit_children(root, &mut ()) {
            Ok(children) => self.rebuild(root, children.into_iter().flatten().collect()),
            Err(never) => match never {},
        }
    }

    fn rebuild(&self, node: &Node, mut children: Vec<Node>) -> Node {
        if self.chain.contains(&node.ty)
            && children.last().map_or(false, |last| last.ty == node.ty)
        {
            if let Some(last) = children.pop() {
                children.extend(last.children().iter().cloned());
            }
        }
        node.with_children(children)
    }
}

impl Visitor for Shake {
    type Output = Vec<Node>;
    type Context = ();
    type Error = Infallible;

    fn visit_nonterminal(&mut self, node: &Node, ctx: &mut ()) -> Result<Vec<Node>, Infallible> {
        let children: Vec<Node> = self.visit_children(node, ctx)?.into_iter().flatten().collect();
        if !self.is_spliced(&node.ty) {
            return Ok(vec![self.rebuild(node, children)]);
        }
        // the label of a spliced node moves to its children
        Ok(children
            .into_iter()
            .map(|child| match child.label {
                Some(_) => child,
                None => {
                    let label = node.label.clone();
                    child.with_label(label)
                }
            })
            .collect())
    }

    fn visit_terminal(
        &mut self,
        node: &Node,
        _token: &Token,
        _ctx: &mut (),
    ) -> Result<Vec<Node>, Infallible> {
        Ok(vec![node.clone()])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use speculoos::prelude::*;

    use crate::grammar::{GrammarBuilder, TermSpec};
    use crate::vocabulary::IDENTIFIER;
    use crate::{Grammar, Vocabulary};

    use super::*;

    #[test]
    fn test_is_generated() {
        assert_that!(is_generated("body:0*")).is_true();
        assert_that!(is_generated("item~1")).is_true();
        assert_that!(is_generated("identifier?")).is_true();
        assert_that!(is_generated("statement")).is_false();
    }

    /// `list ::= identifier ("," list)?` and `block ::= "{" list "}"`.
    fn grammar() -> Grammar {
        let mut vocabulary = Vocabulary::new();
        vocabulary.add_builtin(IDENTIFIER).unwrap();
        for text in [",", "{", "}"] {
            vocabulary.add_exact(text).unwrap();
        }
        let mut builder = GrammarBuilder::new("block", vocabulary);
        builder.rule(
            "block",
            vec![vec![
                TermSpec::exact("{"),
                TermSpec::rule("list").labeled("items"),
                TermSpec::exact("}"),
            ]],
        );
        builder.rule(
            "list",
            vec![vec![
                TermSpec::terminal(IDENTIFIER),
                TermSpec::group(vec![vec![TermSpec::exact(","), TermSpec::rule("list")]])
                    .optional(),
            ]],
        );
        builder.build().unwrap()
    }

    #[test]
    fn test_chain_and_splice() {
        let tree = grammar().parse("{ a, b, c }").unwrap();
        let mut shake = Shake::new().chain(["list"]);
        let shaken = shake.shake(&tree);
        assert_eq!(
            shaken.to_string(),
            "(<block> \"{\"('{') items=(<list> identifier('a') \",\"(',') identifier('b') \
             \",\"(',') identifier('c')) \"}\"('}'))"
        );
        assert_eq!(shake.shake(&shaken), shaken);
    }

    #[test]
    fn test_splice_moves_label() {
        let tree = grammar().parse("{ a }").unwrap();
        let mut shake = Shake::new().splice(["list"]);
        let shaken = shake.shake(&tree);
        assert_eq!(
            shaken.to_string(),
            "(<block> \"{\"('{') items=identifier('a') \"}\"('}'))"
        );
        assert_eq!(shake.shake(&shaken), shaken);
    }
}
