use std::fmt::{Display, Formatter};

use serde::Serialize;

use workbench_diagnostics::CursorRange;

use crate::Token;

/// A node of a syntax tree produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// The node type: the name of the rule that produced it, or the token type for terminals.
    pub ty: String,
    /// The label given to the term that produced this node, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// An ordered list of children.
    Nonterminal { children: Vec<Node> },
    /// The children of the alternative with index `choice`.
    Choice { choice: usize, children: Vec<Node> },
    /// A nonterminal defined as a single terminal.
    Alias { terminal: String, token: Token },
    /// A single token.
    Terminal { token: Token },
}

impl Node {
    pub fn nonterminal(ty: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            ty: ty.into(),
            label: None,
            kind: NodeKind::Nonterminal { children },
        }
    }

    pub fn choice(ty: impl Into<String>, choice: usize, children: Vec<Node>) -> Self {
        Self {
            ty: ty.into(),
            label: None,
            kind: NodeKind::Choice { choice, children },
        }
    }

    pub fn alias(ty: impl Into<String>, terminal: impl Into<String>, token: Token) -> Self {
        Self {
            ty: ty.into(),
            label: None,
            kind: NodeKind::Alias {
                terminal: terminal.into(),
                token,
            },
        }
    }

    /// A terminal node, whose type is the type of the token.
    pub fn terminal(token: Token) -> Self {
        Self {
            ty: token.ty.clone(),
            label: None,
            kind: NodeKind::Terminal { token },
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    /// The children of this node, empty for terminals and aliases.
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Nonterminal { children } | NodeKind::Choice { children, .. } => children,
            NodeKind::Alias { .. } | NodeKind::Terminal { .. } => &[],
        }
    }

    /// Replace the children of this node, keeping type, label and choice.
    pub fn with_children(&self, new_children: Vec<Node>) -> Node {
        let kind = match &self.kind {
            NodeKind::Nonterminal { .. } => NodeKind::Nonterminal {
                children: new_children,
            },
            NodeKind::Choice { choice, .. } => NodeKind::Choice {
                choice: *choice,
                children: new_children,
            },
            leaf => leaf.clone(),
        };
        Node {
            ty: self.ty.clone(),
            label: self.label.clone(),
            kind,
        }
    }

    /// The `index`-th child, if present.
    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children().get(index)
    }

    /// The first child with the given label.
    pub fn labeled(&self, label: &str) -> Option<&Node> {
        self.children()
            .iter()
            .find(|c| c.label.as_deref() == Some(label))
    }

    /// The token of a terminal or alias node.
    pub fn token(&self) -> Option<&Token> {
        match &self.kind {
            NodeKind::Alias { token, .. } | NodeKind::Terminal { token } => Some(token),
            _ => None,
        }
    }

    /// Which alternative produced this node, if it comes from a choice.
    pub fn choice_index(&self) -> Option<usize> {
        match &self.kind {
            NodeKind::Choice { choice, .. } => Some(*choice),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.token().is_some()
    }

    /// All the tokens under this node, in source order.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut tokens = Vec::new();
        self.collect_tokens(&mut tokens);
        tokens
    }

    fn collect_tokens<'a>(&'a self, tokens: &mut Vec<&'a Token>) {
        match self.token() {
            Some(token) => tokens.push(token),
            None => {
                for child in self.children() {
                    child.collect_tokens(tokens);
                }
            }
        }
    }

    /// The source range covered by the non-empty tokens of this node.
    pub fn range(&self) -> Option<CursorRange> {
        self.tokens()
            .into_iter()
            .filter(|t| !t.is_empty())
            .map(|t| t.range)
            .reduce(|a, b| a.merge(&b))
    }

    /// The lexeme of a leaf node, or the lexemes of all the tokens separated by a space.
    pub fn text(&self) -> String {
        self.tokens()
            .into_iter()
            .filter(|t| !t.is_empty())
            .map(|t| t.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Display for Node {
    /// An s-expression of the tree, for debugging.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{}=", label)?;
        }
        match &self.kind {
            NodeKind::Terminal { token } => write!(f, "{}", token),
            NodeKind::Alias { token, .. } => write!(f, "<{}>:{}", self.ty, token),
            NodeKind::Nonterminal { children } | NodeKind::Choice { children, .. } => {
                write!(f, "(<{}>", self.ty)?;
                for child in children {
                    write!(f, " {}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use workbench_diagnostics::Cursor;

    use super::*;

    fn token(ty: &str, lexeme: &str, line: usize, column: usize) -> Token {
        let start = Cursor::new(line, column);
        let end = Cursor::new(line, column + lexeme.len() - 1);
        Token::new(ty, lexeme, None, CursorRange::new(start, end))
    }

    fn sum() -> Node {
        Node::choice(
            "sum",
            1,
            vec![
                Node::terminal(token("identifier", "a", 1, 1)),
                Node::terminal(token("\"+\"", "+", 1, 3)).with_label(Some("op".into())),
                Node::alias("value", "decimal_integer", token("decimal_integer", "12", 2, 1)),
            ],
        )
    }

    #[test]
    fn test_tokens_and_range() {
        let node = sum();
        assert_eq!(node.text(), "a + 12");
        let range = node.range().unwrap();
        assert_eq!(range.start, Cursor::new(1, 1));
        assert_eq!(range.end, Cursor::new(2, 2));
        assert_eq!(node.labeled("op").unwrap().text(), "+");
        assert_eq!(node.choice_index(), Some(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sum().to_string(),
            "(<sum> identifier('a') op=\"+\"('+') <value>:decimal_integer('12'))"
        );
    }

    #[test]
    fn test_with_children_keeps_choice() {
        let node = sum().with_children(vec![]);
        assert_eq!(node.choice_index(), Some(1));
        assert!(node.children().is_empty());
        assert_eq!(node.range(), None);
    }
}
