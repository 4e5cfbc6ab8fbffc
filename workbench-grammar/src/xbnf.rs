//! The XBNF meta-grammar and the loading of grammars written in it.
//!
//! The bootstrap grammar is built by hand with a [`GrammarBuilder`]; every other grammar is
//! parsed with it, then two visitors turn the tree into a [`Vocabulary`] and into the rules of
//! a new [`GrammarBuilder`].
//!
//! ```text
//! <xbnf> ::= <declaration>*;
//! <declaration> ::= <rule> | <alias_rule> | <ignore_rule>;
//! <rule> ::= <nonterminal> "::=" <body> ";";
//! <alias_rule> ::= "alias" <nonterminal> "::=" <terminal> ";";
//! <ignore_rule> ::= "ignore" regex ";";
//! <body> ::= <expression> ("|" <expression>)*;
//! <expression> ::= <term>+;
//! <term> ::= (identifier "=")? <atom> <multiplicity>?;
//! <atom> ::= <nonterminal> | <terminal> | "(" <body> ")";
//! <terminal> ::= escaped_string | identifier | "$";
//! <nonterminal> ::= "<" identifier ">";
//! <multiplicity> ::= "?" | "*" | "+";
//! ```

use crate::grammar::{Atom, GrammarBuilder, Multiplicity, TermSpec};
use crate::vocabulary::{is_builtin, quote, ESCAPED_STRING, IDENTIFIER, REGEX};
use crate::{Error, Grammar, GrammarError, Node, Token, Visitor, Vocabulary};

/// Name of the meta-grammar, and of its entry rule.
pub const XBNF: &str = "xbnf";

lazy_static! {
    static ref BOOTSTRAP: Result<Grammar, GrammarError> = bootstrap();
}

/// The hand-built grammar parsing XBNF sources.
pub fn bootstrap_grammar() -> Result<&'static Grammar, GrammarError> {
    BOOTSTRAP.as_ref().map_err(Clone::clone)
}

fn bootstrap() -> Result<Grammar, GrammarError> {
    let mut vocabulary = Vocabulary::new();
    vocabulary.add_ignore(r"#[^\n]*")?;
    for builtin in [IDENTIFIER, ESCAPED_STRING, REGEX] {
        vocabulary.add_builtin(builtin)?;
    }
    for text in [
        "::=", ";", "|", "=", "(", ")", "<", ">", "?", "*", "+", "$", "alias", "ignore",
    ] {
        vocabulary.add_exact(text)?;
    }

    let rule = TermSpec::rule;
    let exact = TermSpec::exact;
    let terminal = TermSpec::terminal;
    let mut builder = GrammarBuilder::new(XBNF, vocabulary);
    builder
        .rule(XBNF, vec![vec![rule("declaration").star()]])
        .rule(
            "declaration",
            vec![
                vec![rule("rule")],
                vec![rule("alias_rule")],
                vec![rule("ignore_rule")],
            ],
        )
        .rule(
            "rule",
            vec![vec![
                rule("nonterminal"),
                exact("::="),
                rule("body"),
                exact(";"),
            ]],
        )
        .rule(
            "alias_rule",
            vec![vec![
                exact("alias"),
                rule("nonterminal"),
                exact("::="),
                rule("terminal"),
                exact(";"),
            ]],
        )
        .rule(
            "ignore_rule",
            vec![vec![exact("ignore"), terminal(REGEX), exact(";")]],
        )
        .rule(
            "body",
            vec![vec![
                rule("expression"),
                TermSpec::group(vec![vec![exact("|"), rule("expression")]]).star(),
            ]],
        )
        .rule("expression", vec![vec![rule("term").plus()]])
        .rule(
            "term",
            vec![vec![
                TermSpec::group(vec![vec![terminal(IDENTIFIER), exact("=")]]).optional(),
                rule("atom"),
                rule("multiplicity").optional(),
            ]],
        )
        .rule(
            "atom",
            vec![
                vec![rule("nonterminal")],
                vec![rule("terminal")],
                vec![exact("("), rule("body"), exact(")")],
            ],
        )
        .rule(
            "terminal",
            vec![
                vec![terminal(ESCAPED_STRING)],
                vec![terminal(IDENTIFIER)],
                vec![exact("$")],
            ],
        )
        .rule(
            "nonterminal",
            vec![vec![exact("<"), terminal(IDENTIFIER), exact(">")]],
        )
        .rule(
            "multiplicity",
            vec![vec![exact("?")], vec![exact("*")], vec![exact("+")]],
        );
    builder.build()
}

/// Parse an XBNF source with the bootstrap grammar, returning the raw tree.
pub fn parse_xbnf(source: &str) -> Result<Node, Error> {
    bootstrap_grammar()?.parse(source)
}

impl Grammar {
    /// Load the grammar named `name` from its XBNF source.
    ///
    /// The entry rule of the grammar must be called `name`.
    pub fn load(name: &str, source: &str) -> Result<Grammar, Error> {
        let tree = parse_xbnf(source)?;
        let mut vocabulary = Vocabulary::new();
        GenerateVocabulary.visit(&tree, &mut vocabulary)?;
        debug!(
            "Grammar {} uses {} token types",
            name,
            vocabulary.len()
        );
        let mut builder = GrammarBuilder::new(name, vocabulary);
        GenerateNodeParsers.visit(&tree, &mut builder)?;
        Ok(builder.build()?)
    }
}

fn malformed(node: &Node, message: impl Into<String>) -> GrammarError {
    GrammarError::Malformed {
        range: node.range().unwrap_or_default(),
        message: message.into(),
    }
}

/// The name of the terminal described by a `<terminal>` node.
fn terminal_name(node: &Node) -> Result<String, GrammarError> {
    let token = node
        .child(0)
        .and_then(Node::token)
        .ok_or_else(|| malformed(node, "empty terminal"))?;
    match node.choice_index() {
        Some(0) => token
            .string()
            .map(quote)
            .ok_or_else(|| malformed(node, "invalid escaped string")),
        _ => Ok(token.lexeme.clone()),
    }
}

/// Collects the token definitions referenced by an XBNF tree: exact texts, the built-ins used
/// by name and the ignore patterns.
pub struct GenerateVocabulary;

impl Visitor for GenerateVocabulary {
    type Output = ();
    type Context = Vocabulary;
    type Error = GrammarError;

    fn dispatch(&mut self, node: &Node, ctx: &mut Vocabulary) -> Option<Result<(), GrammarError>> {
        match node.ty.as_str() {
            "terminal" => {
                let token = node.child(0).and_then(Node::token);
                Some(match (node.choice_index(), token) {
                    (Some(0), Some(token)) => token
                        .string()
                        .ok_or_else(|| malformed(node, "invalid escaped string"))
                        .and_then(|text| ctx.add_exact(text).map(|_| ())),
                    (_, Some(token)) if is_builtin(&token.lexeme) => ctx.add_builtin(&token.lexeme),
                    // reserved and unknown names are checked when the rules are built
                    _ => Ok(()),
                })
            }
            "ignore_rule" => Some(
                node.child(1)
                    .and_then(Node::token)
                    .and_then(Token::string)
                    .ok_or_else(|| malformed(node, "missing ignore pattern"))
                    .and_then(|pattern| ctx.add_ignore(pattern)),
            ),
            _ => None,
        }
    }

    fn visit_nonterminal(&mut self, node: &Node, ctx: &mut Vocabulary) -> Result<(), GrammarError> {
        self.visit_children(node, ctx).map(|_| ())
    }

    fn visit_terminal(
        &mut self,
        _node: &Node,
        _token: &Token,
        _ctx: &mut Vocabulary,
    ) -> Result<(), GrammarError> {
        Ok(())
    }
}

/// The pieces of a rule definition, as produced while walking an XBNF tree.
#[derive(Debug, Clone)]
pub enum Fragment {
    None,
    Many(Vec<Fragment>),
    Token(Token),
    Name(String),
    Terminal(String),
    Multiplicity(Multiplicity),
    Atom(Atom),
    Term(TermSpec),
    Expression(Vec<TermSpec>),
    Body(Vec<Vec<TermSpec>>),
}

impl Fragment {
    /// Expand nested lists and drop empty fragments.
    fn flatten(self) -> Vec<Fragment> {
        match self {
            Fragment::None => vec![],
            Fragment::Many(fragments) => fragments.into_iter().flat_map(Fragment::flatten).collect(),
            other => vec![other],
        }
    }
}

/// Turns the rules and aliases of an XBNF tree into [`GrammarBuilder`] definitions.
pub struct GenerateNodeParsers;

impl GenerateNodeParsers {
    fn parts(&mut self, node: &Node, ctx: &mut GrammarBuilder) -> Result<Vec<Fragment>, GrammarError> {
        Ok(self.visit_nonterminal(node, ctx)?.flatten())
    }

    /// The name inside `"<" identifier ">"`.
    fn name(&mut self, node: &Node, ctx: &mut GrammarBuilder) -> Result<String, GrammarError> {
        self.parts(node, ctx)?
            .into_iter()
            .find_map(|f| match f {
                Fragment::Token(token) if token.ty == IDENTIFIER => Some(token.lexeme),
                _ => None,
            })
            .ok_or_else(|| malformed(node, "missing nonterminal name"))
    }

    fn rule(&mut self, node: &Node, ctx: &mut GrammarBuilder) -> Result<Fragment, GrammarError> {
        let mut name = None;
        let mut body = None;
        for fragment in self.parts(node, ctx)? {
            match fragment {
                Fragment::Name(n) => name = Some(n),
                Fragment::Body(b) => body = Some(b),
                _ => {}
            }
        }
        match (name, body) {
            (Some(name), Some(body)) => {
                ctx.rule(name, body);
                Ok(Fragment::None)
            }
            _ => Err(malformed(node, "incomplete rule")),
        }
    }

    fn alias(&mut self, node: &Node, ctx: &mut GrammarBuilder) -> Result<Fragment, GrammarError> {
        let mut name = None;
        let mut terminal = None;
        for fragment in self.parts(node, ctx)? {
            match fragment {
                Fragment::Name(n) => name = Some(n),
                Fragment::Terminal(t) => terminal = Some(t),
                _ => {}
            }
        }
        match (name, terminal) {
            (Some(name), Some(terminal)) => {
                ctx.alias(name, terminal);
                Ok(Fragment::None)
            }
            _ => Err(malformed(node, "incomplete alias")),
        }
    }

    fn body(&mut self, node: &Node, ctx: &mut GrammarBuilder) -> Result<Fragment, GrammarError> {
        let alternatives: Vec<_> = self
            .parts(node, ctx)?
            .into_iter()
            .filter_map(|f| match f {
                Fragment::Expression(terms) => Some(terms),
                _ => None,
            })
            .collect();
        if alternatives.is_empty() {
            return Err(malformed(node, "empty body"));
        }
        Ok(Fragment::Body(alternatives))
    }

    fn expression(&mut self, node: &Node, ctx: &mut GrammarBuilder) -> Result<Fragment, GrammarError> {
        Ok(Fragment::Expression(
            self.parts(node, ctx)?
                .into_iter()
                .filter_map(|f| match f {
                    Fragment::Term(term) => Some(term),
                    _ => None,
                })
                .collect(),
        ))
    }

    fn term(&mut self, node: &Node, ctx: &mut GrammarBuilder) -> Result<Fragment, GrammarError> {
        let mut label = None;
        let mut atom = None;
        let mut multiplicity = Multiplicity::One;
        for fragment in self.parts(node, ctx)? {
            match fragment {
                // the only token before the atom is the label
                Fragment::Token(token) if atom.is_none() && token.ty == IDENTIFIER => {
                    label = Some(token.lexeme)
                }
                Fragment::Atom(a) => atom = Some(a),
                Fragment::Multiplicity(m) => multiplicity = m,
                _ => {}
            }
        }
        let atom = atom.ok_or_else(|| malformed(node, "missing atom"))?;
        Ok(Fragment::Term(TermSpec {
            atom,
            multiplicity,
            label,
        }))
    }

    fn atom(&mut self, node: &Node, ctx: &mut GrammarBuilder) -> Result<Fragment, GrammarError> {
        let parts = self.parts(node, ctx)?;
        let atom = parts.into_iter().find_map(|f| match f {
            Fragment::Name(name) => Some(Atom::Rule(name)),
            Fragment::Terminal(name) => Some(Atom::Terminal(name)),
            Fragment::Body(body) => Some(Atom::Group(body)),
            _ => None,
        });
        atom.map(Fragment::Atom)
            .ok_or_else(|| malformed(node, "empty atom"))
    }
}

impl Visitor for GenerateNodeParsers {
    type Output = Fragment;
    type Context = GrammarBuilder;
    type Error = GrammarError;

    fn dispatch(
        &mut self,
        node: &Node,
        ctx: &mut GrammarBuilder,
    ) -> Option<Result<Fragment, GrammarError>> {
        let result = match node.ty.as_str() {
            "rule" => self.rule(node, ctx),
            "alias_rule" => self.alias(node, ctx),
            "ignore_rule" => Ok(Fragment::None),
            "body" => self.body(node, ctx),
            "expression" => self.expression(node, ctx),
            "term" => self.term(node, ctx),
            "atom" => self.atom(node, ctx),
            "nonterminal" => self.name(node, ctx).map(Fragment::Name),
            "terminal" => terminal_name(node).map(Fragment::Terminal),
            "multiplicity" => Multiplicity::from_suffix(&node.text())
                .map(Fragment::Multiplicity)
                .ok_or_else(|| malformed(node, "invalid multiplicity")),
            _ => return None,
        };
        Some(result)
    }

    fn visit_nonterminal(
        &mut self,
        node: &Node,
        ctx: &mut GrammarBuilder,
    ) -> Result<Fragment, GrammarError> {
        Ok(Fragment::Many(self.visit_children(node, ctx)?))
    }

    fn visit_terminal(
        &mut self,
        _node: &Node,
        token: &Token,
        _ctx: &mut GrammarBuilder,
    ) -> Result<Fragment, GrammarError> {
        Ok(Fragment::Token(token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use speculoos::prelude::*;

    use crate::{Shake, Visitor};

    use super::*;

    const LIST: &str = r#"
        # a comma separated list
        <list> ::= <items> $;
        <items> ::= <item> ("," <item>)*;
        <item> ::= name=identifier | <number> | "(" <items>? ")";
        alias <number> ::= decimal_integer;
        ignore /\/\/[^\n]*/;
    "#;

    #[test]
    fn test_bootstrap_builds() {
        let grammar = bootstrap_grammar().unwrap();
        assert_that!(grammar.diagnostics().is_empty()).is_true();
        assert_eq!(grammar.name(), XBNF);
    }

    #[test]
    fn test_load() {
        let grammar = Grammar::load("list", LIST).unwrap();
        assert_eq!(
            grammar.to_string(),
            "<list> ::= <items> $;\n\
             <items> ::= <item> <items:0>*;\n\
             <item> ::= name=identifier | <number> | \"(\" <items>? \")\";\n\
             alias <number> ::= decimal_integer;\n\
             <items:0> ::= \",\" <item>;\n"
        );
        let tree = grammar.parse("1, (a, b) // trailing comment").unwrap();
        assert_eq!(tree.text(), "1 , ( a , b )");
        let item = tree.child(0).unwrap().child(0).unwrap();
        assert_eq!(item.child(0).unwrap().ty, "number");
    }

    #[test]
    fn test_labels() {
        let grammar = Grammar::load("list", LIST).unwrap();
        let tree = grammar.parse("x").unwrap();
        let item = tree.child(0).unwrap().child(0).unwrap();
        assert_eq!(item.labeled("name").unwrap().text(), "x");
    }

    #[test]
    fn test_vocabulary_only_has_used_builtins() {
        let grammar = Grammar::load("list", LIST).unwrap();
        let names: Vec<_> = grammar.vocabulary().entries().map(|e| e.name()).collect();
        assert_eq!(names, vec!["\",\"", "identifier", "\"(\"", "\")\"", "decimal_integer"]);
    }

    #[test]
    fn test_group_alternatives() {
        let grammar = Grammar::load(
            "s",
            r#"<s> ::= ("a" "b" | "c")+ ;"#,
        )
        .unwrap();
        assert_eq!(
            grammar.to_string(),
            "<s> ::= <s:0>+;\n<s:0> ::= <s~0> | \"c\";\n<s~0> ::= \"a\" \"b\";\n"
        );
        let tree = grammar.parse("a b c a b").unwrap();
        let shaken = Shake::new().shake(&tree);
        assert_eq!(shaken.children().len(), 5);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Grammar::load("s", "<s> ::= <t>;"),
            Err(Error::Grammar(GrammarError::UndefinedNonterminal { .. }))
        ));
        assert!(matches!(
            Grammar::load("s", "<s> ::= number;"),
            Err(Error::Grammar(GrammarError::UnknownTerminal { .. }))
        ));
        assert!(matches!(
            Grammar::load("s", "<t> ::= \"x\";"),
            Err(Error::Grammar(GrammarError::MissingEntryPoint { .. }))
        ));
        assert!(matches!(
            Grammar::load("s", "<s> ::= \"x\""),
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            Grammar::load("s", "<s> ::= @;"),
            Err(Error::Lex(_))
        ));
    }

    #[test]
    fn test_unreachable_warning() {
        let grammar = Grammar::load("s", "<s> ::= \"x\"; <t> ::= \"y\";").unwrap();
        assert_eq!(grammar.diagnostics().warnings().count(), 1);
        // the token of an unreachable rule is still known
        assert_that!(grammar.parse("y")).is_err();
    }

    #[test]
    fn test_generate_vocabulary_ignores() {
        let tree = parse_xbnf(LIST).unwrap();
        let mut vocabulary = Vocabulary::new();
        GenerateVocabulary.visit(&tree, &mut vocabulary).unwrap();
        assert_eq!(vocabulary.ignored().len(), 2);
    }
}
