use crate::{Node, Token};

/// A tree walk over syntax trees.
///
/// Implementors handle specific node types in [`Visitor::dispatch`], returning `None` for the
/// types they don't care about: those fall back to [`Visitor::visit_nonterminal`] or
/// [`Visitor::visit_terminal`]. The state of a walk lives in the `Context`, not in the visitor.
pub trait Visitor {
    type Output;
    type Context;
    type Error;

    /// Handle a node by its type, or return `None` to use the defaults.
    fn dispatch(
        &mut self,
        _node: &Node,
        _ctx: &mut Self::Context,
    ) -> Option<Result<Self::Output, Self::Error>> {
        None
    }

    /// Default for nonterminal and choice nodes.
    fn visit_nonterminal(
        &mut self,
        node: &Node,
        ctx: &mut Self::Context,
    ) -> Result<Self::Output, Self::Error>;

    /// Default for terminal and alias nodes.
    fn visit_terminal(
        &mut self,
        node: &Node,
        token: &Token,
        ctx: &mut Self::Context,
    ) -> Result<Self::Output, Self::Error>;

    fn visit(&mut self, node: &Node, ctx: &mut Self::Context) -> Result<Self::Output, Self::Error> {
        if let Some(result) = self.dispatch(node, ctx) {
            return result;
        }
        match node.token() {
            Some(token) => self.visit_terminal(node, token, ctx),
            None => self.visit_nonterminal(node, ctx),
        }
    }

    /// Visit all the children of `node`, in order.
    fn visit_children(
        &mut self,
        node: &Node,
        ctx: &mut Self::Context,
    ) -> Result<Vec<Self::Output>, Self::Error> {
        node.children()
            .iter()
            .map(|child| self.visit(child, ctx))
            .collect()
    }

    /// Visit all the children of `node` and fold their results with `combine`.
    fn visit_all<F>(
        &mut self,
        node: &Node,
        ctx: &mut Self::Context,
        init: Self::Output,
        mut combine: F,
    ) -> Result<Self::Output, Self::Error>
    where
        F: FnMut(Self::Output, Self::Output) -> Self::Output,
    {
        let mut result = init;
        for child in node.children() {
            let value = self.visit(child, ctx)?;
            result = combine(result, value);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use pretty_assertions::assert_eq;
    use workbench_diagnostics::CursorRange;

    use super::*;

    /// Joins lexemes, upper-casing identifiers and counting nodes.
    struct Shout;

    impl Visitor for Shout {
        type Output = String;
        type Context = usize;
        type Error = Infallible;

        fn dispatch(&mut self, node: &Node, ctx: &mut usize) -> Option<Result<String, Infallible>> {
            match node.ty.as_str() {
                "identifier" => {
                    *ctx += 1;
                    Some(Ok(node.text().to_uppercase()))
                }
                _ => None,
            }
        }

        fn visit_nonterminal(&mut self, node: &Node, ctx: &mut usize) -> Result<String, Infallible> {
            *ctx += 1;
            self.visit_all(node, ctx, String::new(), |a, b| {
                if a.is_empty() {
                    b
                } else {
                    format!("{} {}", a, b)
                }
            })
        }

        fn visit_terminal(
            &mut self,
            _node: &Node,
            token: &Token,
            ctx: &mut usize,
        ) -> Result<String, Infallible> {
            *ctx += 1;
            Ok(token.lexeme.clone())
        }
    }

    fn leaf(ty: &str, lexeme: &str) -> Node {
        Node::terminal(Token::new(ty, lexeme, None, CursorRange::default()))
    }

    #[test]
    fn test_dispatch_and_defaults() {
        let tree = Node::nonterminal(
            "call",
            vec![
                leaf("identifier", "print"),
                Node::nonterminal("args", vec![leaf("\"(\"", "("), leaf("identifier", "x")]),
            ],
        );
        let mut count = 0;
        let text = Shout.visit(&tree, &mut count).unwrap();
        assert_eq!(text, "PRINT ( X");
        assert_eq!(count, 5);
        let children = Shout.visit_children(&tree, &mut count).unwrap();
        assert_eq!(children, vec!["PRINT", "( X"]);
    }
}
