use std::collections::HashMap;

use workbench_diagnostics::Cursor;

use crate::grammar::{Expression, Multiplicity, NodeParser, RuleId, Symbol};
use crate::vocabulary::{EMPTY, END};
use crate::{Grammar, Node, ParseError, Token};

#[derive(Debug, Clone)]
enum Memo {
    /// The rule is being parsed at this position: entering it again is left recursion.
    InProgress,
    /// The node and the number of tokens it consumed.
    Done(Option<(Node, usize)>),
}

/// A recursive descent parser over a token list, driven by the rules of a [`Grammar`].
///
/// Every alternative of a rule is tried from the same position and the one consuming the most
/// tokens is kept, the first one on a tie.
pub struct Parser<'a> {
    grammar: &'a Grammar,
    tokens: &'a [Token],
    position: usize,
    /// The furthest position where a token was examined, for error reporting.
    furthest: usize,
    memo: HashMap<(RuleId, usize), Memo>,
    /// How many times a rule was found in progress. Results depending on such a hit are not
    /// memoized since they may differ in another context.
    recursion_hits: usize,
}

impl<'a> Parser<'a> {
    pub fn new(grammar: &'a Grammar, tokens: &'a [Token]) -> Self {
        Self {
            grammar,
            tokens,
            position: 0,
            furthest: 0,
            memo: HashMap::new(),
            recursion_hits: 0,
        }
    }

    /// Parse the whole token list starting from the entry rule of the grammar.
    pub fn parse(mut self) -> Result<Node, ParseError> {
        let entry = self.grammar.entry();
        match self.parse_rule(entry) {
            None => Err(ParseError::Failed {
                cursor: self.cursor_at(self.furthest),
                found: self.found_at(self.furthest),
            }),
            Some(_) if self.position < self.tokens.len() => {
                let position = self.furthest.max(self.position);
                Err(ParseError::Incomplete {
                    cursor: self.cursor_at(position),
                    found: self.found_at(position),
                })
            }
            Some(node) => Ok(node),
        }
    }

    /// The next token, if any.
    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    /// Consume the next token if it has type `ty`.
    pub fn expect(&mut self, ty: &str) -> Option<Token> {
        self.furthest = self.furthest.max(self.position);
        let token = self.peek().filter(|t| t.ty == ty)?;
        self.position += 1;
        Some(token.clone())
    }

    pub fn save(&self) -> usize {
        self.position
    }

    pub fn backtrack(&mut self, position: usize) {
        self.position = position;
    }

    fn cursor_at(&self, position: usize) -> Cursor {
        match self.tokens.get(position) {
            Some(token) => token.range.start,
            None => self.end_cursor(),
        }
    }

    fn found_at(&self, position: usize) -> Option<String> {
        self.tokens.get(position).map(|t| t.to_string())
    }

    /// The position right after the last token.
    fn end_cursor(&self) -> Cursor {
        match self.tokens.last() {
            Some(token) => Cursor::new(token.range.end.line, token.range.end.column + 1),
            None => Cursor::start(),
        }
    }

    fn parse_rule(&mut self, id: RuleId) -> Option<Node> {
        let start = self.position;
        match self.memo.get(&(id, start)) {
            Some(Memo::InProgress) => {
                self.recursion_hits += 1;
                return None;
            }
            Some(Memo::Done(result)) => {
                let (node, consumed) = result.clone()?;
                self.position = start + consumed;
                return Some(node);
            }
            None => {}
        }
        self.memo.insert((id, start), Memo::InProgress);
        let hits = self.recursion_hits;
        let grammar = self.grammar;
        let rule = grammar.rule(id);
        let result = match &rule.parser {
            NodeParser::Alias { terminal } => self
                .parse_terminal(terminal)
                .map(|token| Node::alias(&rule.name, terminal, token)),
            NodeParser::Choice { alternatives } => self.parse_choice(id, alternatives),
        };
        if result.is_none() {
            self.position = start;
        }
        if hits == self.recursion_hits {
            let consumed = self.position - start;
            let memo = Memo::Done(result.clone().map(|node| (node, consumed)));
            self.memo.insert((id, start), memo);
        } else {
            self.memo.remove(&(id, start));
        }
        result
    }

    fn parse_choice(&mut self, id: RuleId, alternatives: &'a [Expression]) -> Option<Node> {
        let start = self.position;
        let mut best: Option<(usize, Vec<Node>, usize)> = None;
        for (index, alternative) in alternatives.iter().enumerate() {
            self.position = start;
            let Some(children) = self.parse_expression(alternative) else {
                continue;
            };
            let consumed = self.position - start;
            if best.as_ref().map_or(true, |(_, _, c)| consumed > *c) {
                best = Some((index, children, consumed));
            }
        }
        let (index, children, consumed) = best?;
        self.position = start + consumed;
        let rule = self.grammar.rule(id);
        if alternatives.len() > 1 {
            trace!(
                "<{}> at {}: alternative {} ({}) consumed {} tokens",
                rule.name,
                start,
                index,
                self.grammar.fmt_expression(&alternatives[index]),
                consumed
            );
        }
        Some(Node::choice(&rule.name, index, children))
    }

    fn parse_expression(&mut self, expression: &Expression) -> Option<Vec<Node>> {
        let mut children = Vec::with_capacity(expression.terms.len());
        for term in &expression.terms {
            let node = match term.multiplicity {
                Multiplicity::One => self.parse_symbol(&term.symbol)?,
                multiplicity => {
                    let items = self.parse_repeated(&term.symbol, multiplicity)?;
                    let name = self.grammar.symbol_name(&term.symbol);
                    Node::nonterminal(format!("{}{}", name, multiplicity.suffix()), items)
                }
            };
            children.push(node.with_label(term.label.clone()));
        }
        Some(children)
    }

    fn parse_repeated(&mut self, symbol: &Symbol, multiplicity: Multiplicity) -> Option<Vec<Node>> {
        let mut items = Vec::new();
        loop {
            let before = self.position;
            let Some(node) = self.parse_symbol(symbol) else {
                self.position = before;
                break;
            };
            let progressed = self.position > before;
            if progressed || (multiplicity == Multiplicity::Plus && items.is_empty()) {
                items.push(node);
            }
            if !progressed || multiplicity == Multiplicity::Optional {
                break;
            }
        }
        if multiplicity == Multiplicity::Plus && items.is_empty() {
            return None;
        }
        Some(items)
    }

    fn parse_symbol(&mut self, symbol: &Symbol) -> Option<Node> {
        match symbol {
            Symbol::Rule(id) => self.parse_rule(*id),
            Symbol::Terminal(name) => self.parse_terminal(name).map(Node::terminal),
        }
    }

    fn parse_terminal(&mut self, name: &str) -> Option<Token> {
        match name {
            EMPTY => Some(Token::empty(EMPTY, self.cursor_at(self.position))),
            END => {
                self.furthest = self.furthest.max(self.position);
                if self.position == self.tokens.len() {
                    Some(Token::empty(END, self.end_cursor()))
                } else {
                    None
                }
            }
            _ => self.expect(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use speculoos::prelude::*;

    use crate::grammar::{GrammarBuilder, TermSpec};
    use crate::vocabulary::{DECIMAL_INTEGER, IDENTIFIER};
    use crate::{Error, Vocabulary};

    use super::*;

    fn vocabulary() -> Vocabulary {
        let mut vocabulary = Vocabulary::new();
        vocabulary.add_builtin(IDENTIFIER).unwrap();
        vocabulary.add_builtin(DECIMAL_INTEGER).unwrap();
        for text in ["+", "(", ")", ",", "-"] {
            vocabulary.add_exact(text).unwrap();
        }
        vocabulary
    }

    /// `sum ::= value ("+" value)*` where a value is a number, a name or a call.
    fn sums() -> Grammar {
        let mut builder = GrammarBuilder::new("sum", vocabulary());
        builder.rule(
            "sum",
            vec![vec![
                TermSpec::rule("value").labeled("first"),
                TermSpec::group(vec![vec![TermSpec::exact("+"), TermSpec::rule("value")]]).star(),
            ]],
        );
        builder.rule(
            "value",
            vec![
                vec![TermSpec::terminal(IDENTIFIER)],
                vec![TermSpec::rule("number")],
                vec![
                    TermSpec::terminal(IDENTIFIER),
                    TermSpec::exact("("),
                    TermSpec::rule("sum").optional(),
                    TermSpec::exact(")"),
                ],
            ],
        );
        builder.alias("number", DECIMAL_INTEGER);
        builder.build().unwrap()
    }

    #[test]
    fn test_longest_alternative_wins() {
        let grammar = sums();
        let node = grammar.parse("f(1) + x").unwrap();
        assert_eq!(
            node.to_string(),
            "(<sum> first=(<value> identifier('f') \"(\"('(') (<sum?> (<sum> first=(<value> \
             <number>:decimal_integer('1')) (<sum:0*>))) \")\"(')')) (<sum:0*> (<sum:0> \
             \"+\"('+') (<value> identifier('x')))))"
        );
        assert_eq!(node.child(0).unwrap().choice_index(), Some(2));
    }

    #[test]
    fn test_failed() {
        let grammar = sums();
        let error = grammar.parse("+ 1").unwrap_err();
        assert_eq!(
            error,
            Error::Parse(ParseError::Failed {
                cursor: Cursor::new(1, 1),
                found: Some("\"+\"('+')".into())
            })
        );
    }

    #[test]
    fn test_incomplete_reports_furthest_token() {
        let grammar = sums();
        let error = match grammar.parse("a + b c") {
            Err(Error::Parse(error)) => error,
            other => panic!("expected a parse error, got {:?}", other),
        };
        assert!(matches!(error, ParseError::Incomplete { .. }));
        assert_eq!(error.cursor(), Cursor::new(1, 7));
        assert_eq!(
            error.to_string(),
            "1:7: did not parse until end of file near identifier('c')"
        );
    }

    #[test]
    fn test_failed_at_end_of_input() {
        let grammar = sums();
        let error = grammar.parse("").unwrap_err();
        assert_eq!(error.to_string(), "1:1: failed to parse at end of input");
        // `f` alone is a value, the unclosed call is reported where it stops
        let error = grammar.parse("f(1").unwrap_err();
        assert_eq!(
            error.to_string(),
            "1:4: did not parse until end of file at end of input"
        );
    }

    #[test]
    fn test_left_recursion_fails() {
        let mut builder = GrammarBuilder::new("expr", vocabulary());
        builder.rule(
            "expr",
            vec![
                vec![
                    TermSpec::rule("expr"),
                    TermSpec::exact("-"),
                    TermSpec::terminal(DECIMAL_INTEGER),
                ],
                vec![TermSpec::terminal(DECIMAL_INTEGER)],
            ],
        );
        let grammar = builder.build().unwrap();
        assert_that!(grammar.parse("1")).is_ok();
        assert_that!(grammar.parse("1 - 2")).is_err();
    }

    #[test]
    fn test_empty_and_end() {
        let mut builder = GrammarBuilder::new("list", vocabulary());
        builder.rule(
            "list",
            vec![vec![
                TermSpec::rule("item").star(),
                TermSpec::terminal(END),
            ]],
        );
        builder.rule(
            "item",
            vec![vec![TermSpec::terminal(IDENTIFIER)], vec![TermSpec::terminal(EMPTY)]],
        );
        let grammar = builder.build().unwrap();
        let node = grammar.parse("a b").unwrap();
        assert_eq!(node.child(0).unwrap().children().len(), 2);
        assert_eq!(node.child(1).unwrap().ty, "$");
        let node = grammar.parse("").unwrap();
        assert_that!(node.child(0).unwrap().children().to_vec()).is_empty();
    }

    #[test]
    fn test_plus_requires_one() {
        let mut builder = GrammarBuilder::new("list", vocabulary());
        builder.rule("list", vec![vec![TermSpec::terminal(IDENTIFIER).plus()]]);
        let grammar = builder.build().unwrap();
        assert_that!(grammar.parse("")).is_err();
        let node = grammar.parse("a b c").unwrap();
        assert_eq!(node.child(0).unwrap().ty, "identifier+");
        assert_eq!(node.text(), "a b c");
    }
}
