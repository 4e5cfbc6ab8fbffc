//! Grammars as arenas of rules.
//!
//! A [`Grammar`] owns a vector of [`Rule`]s indexed by [`RuleId`]; terms refer to other rules by
//! index, so there are no references between rules and a grammar can be freely shared by many
//! parsers. Grammars are made with a [`GrammarBuilder`], which lowers groups into auxiliary
//! rules and validates the result.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use itertools::Itertools;

use workbench_diagnostics::{Diagnostic, DiagnosticContext};

use crate::parser::Parser;
use crate::{Error, GrammarError, Lexer, Node, Token, Vocabulary};

/// Index of a rule inside its grammar.
pub type RuleId = usize;

/// How many times a term may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    One,
    Optional,
    Star,
    Plus,
}

impl Multiplicity {
    /// The suffix used in sources and in the name of the wrapper nodes.
    pub fn suffix(&self) -> &'static str {
        match self {
            Multiplicity::One => "",
            Multiplicity::Optional => "?",
            Multiplicity::Star => "*",
            Multiplicity::Plus => "+",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "" => Some(Multiplicity::One),
            "?" => Some(Multiplicity::Optional),
            "*" => Some(Multiplicity::Star),
            "+" => Some(Multiplicity::Plus),
            _ => None,
        }
    }
}

/// What a term matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Rule(RuleId),
    Terminal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub symbol: Symbol,
    pub multiplicity: Multiplicity,
    pub label: Option<String>,
}

/// An ordered list of terms: one alternative of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expression {
    pub terms: Vec<Term>,
}

/// How the nodes of a rule are parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeParser {
    /// The rule is another name for a single terminal.
    Alias { terminal: String },
    /// The rule is a list of alternatives, the longest match wins.
    Choice { alternatives: Vec<Expression> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub parser: NodeParser,
}

/// A vocabulary together with the rules that parse its tokens.
#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    vocabulary: Vocabulary,
    rules: Vec<Rule>,
    index: HashMap<String, RuleId>,
    entry: RuleId,
    diagnostics: DiagnosticContext,
}

impl Grammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.index.get(name).copied()
    }

    /// The rule every parse starts from, named like the grammar.
    pub fn entry(&self) -> RuleId {
        self.entry
    }

    /// The warnings produced while building the grammar.
    pub fn diagnostics(&self) -> &DiagnosticContext {
        &self.diagnostics
    }

    /// The name of a symbol: the rule name or the terminal name.
    pub fn symbol_name<'a>(&'a self, symbol: &'a Symbol) -> &'a str {
        match symbol {
            Symbol::Rule(id) => &self.rules[*id].name,
            Symbol::Terminal(name) => name,
        }
    }

    pub fn lexer(&self) -> Lexer<'_> {
        Lexer::new(&self.vocabulary)
    }

    /// Tokenize `source` with the vocabulary of this grammar.
    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, Error> {
        Ok(self.lexer().tokenize(source)?)
    }

    /// Parse already tokenized input.
    pub fn parse_tokens(&self, tokens: &[Token]) -> Result<Node, Error> {
        Ok(Parser::new(self, tokens).parse()?)
    }

    /// Tokenize and parse `source`, starting from the entry rule.
    pub fn parse(&self, source: &str) -> Result<Node, Error> {
        let tokens = self.tokenize(source)?;
        self.parse_tokens(&tokens)
    }

    fn fmt_term(&self, term: &Term) -> String {
        let symbol = match &term.symbol {
            Symbol::Rule(id) => format!("<{}>", self.rules[*id].name),
            Symbol::Terminal(name) => name.clone(),
        };
        match &term.label {
            Some(label) => format!("{}={}{}", label, symbol, term.multiplicity.suffix()),
            None => format!("{}{}", symbol, term.multiplicity.suffix()),
        }
    }

    /// Render an alternative of a rule, for logging.
    pub fn fmt_expression(&self, expression: &Expression) -> String {
        if expression.terms.is_empty() {
            return "e".to_string();
        }
        expression
            .terms
            .iter()
            .map(|t| self.fmt_term(t))
            .join(" ")
    }
}

impl Display for Grammar {
    /// The lowered rules of the grammar, one per line.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for rule in &self.rules {
            match &rule.parser {
                NodeParser::Alias { terminal } => {
                    writeln!(f, "alias <{}> ::= {};", rule.name, terminal)?
                }
                NodeParser::Choice { alternatives } => writeln!(
                    f,
                    "<{}> ::= {};",
                    rule.name,
                    alternatives
                        .iter()
                        .map(|e| self.fmt_expression(e))
                        .join(" | ")
                )?,
            }
        }
        Ok(())
    }
}

/// The atom of a term as written in a grammar source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    /// A reference to a rule, by name.
    Rule(String),
    /// A terminal name: a built-in, a reserved name or a quoted exact text.
    Terminal(String),
    /// A parenthesized list of alternatives.
    Group(Vec<Vec<TermSpec>>),
}

/// A term as written in a grammar source, before lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermSpec {
    pub atom: Atom,
    pub multiplicity: Multiplicity,
    pub label: Option<String>,
}

impl TermSpec {
    pub fn new(atom: Atom) -> Self {
        Self {
            atom,
            multiplicity: Multiplicity::One,
            label: None,
        }
    }

    pub fn rule(name: impl Into<String>) -> Self {
        Self::new(Atom::Rule(name.into()))
    }

    pub fn terminal(name: impl Into<String>) -> Self {
        Self::new(Atom::Terminal(name.into()))
    }

    /// A terminal matching exactly `text`.
    pub fn exact(text: &str) -> Self {
        Self::terminal(crate::vocabulary::quote(text))
    }

    pub fn group(alternatives: Vec<Vec<TermSpec>>) -> Self {
        Self::new(Atom::Group(alternatives))
    }

    pub fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    pub fn optional(self) -> Self {
        self.with_multiplicity(Multiplicity::Optional)
    }

    pub fn star(self) -> Self {
        self.with_multiplicity(Multiplicity::Star)
    }

    pub fn plus(self) -> Self {
        self.with_multiplicity(Multiplicity::Plus)
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone)]
enum RuleSpec {
    Alias(String),
    Body(Vec<Vec<TermSpec>>),
}

/// Collects rule definitions and builds a validated [`Grammar`].
#[derive(Debug)]
pub struct GrammarBuilder {
    name: String,
    vocabulary: Vocabulary,
    rules: IndexMap<String, RuleSpec>,
    error: Option<GrammarError>,
    diagnostics: DiagnosticContext,
}

impl GrammarBuilder {
    /// Start a grammar named `name`: its entry rule must be called the same.
    pub fn new(name: impl Into<String>, vocabulary: Vocabulary) -> Self {
        Self {
            name: name.into(),
            vocabulary,
            rules: IndexMap::new(),
            error: None,
            diagnostics: DiagnosticContext::new(),
        }
    }

    pub fn vocabulary_mut(&mut self) -> &mut Vocabulary {
        &mut self.vocabulary
    }

    /// Define a rule with a list of alternatives.
    pub fn rule(&mut self, name: impl Into<String>, alternatives: Vec<Vec<TermSpec>>) -> &mut Self {
        let name = name.into();
        if self.rules.contains_key(&name) {
            self.error
                .get_or_insert(GrammarError::DuplicateRule { name });
        } else {
            self.rules.insert(name, RuleSpec::Body(alternatives));
        }
        self
    }

    /// Define a rule as another name for `terminal`. A repeated alias is ignored with a warning.
    pub fn alias(&mut self, name: impl Into<String>, terminal: impl Into<String>) -> &mut Self {
        let name = name.into();
        match self.rules.get(&name) {
            Some(RuleSpec::Alias(_)) => {
                let message = format!("alias <{}> is defined more than once, keeping the first", name);
                warn!("{}: {}", self.name, message);
                self.diagnostics.add_diagnostic(Diagnostic::warning(message));
            }
            Some(RuleSpec::Body(_)) => {
                self.error
                    .get_or_insert(GrammarError::DuplicateRule { name });
            }
            None => {
                self.rules.insert(name, RuleSpec::Alias(terminal.into()));
            }
        }
        self
    }

    /// Lower and validate all the rules.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let mut lowering = Lowering {
            vocabulary: &self.vocabulary,
            rules: Vec::with_capacity(self.rules.len()),
            index: HashMap::new(),
            counters: HashMap::new(),
        };
        for (id, name) in self.rules.keys().enumerate() {
            lowering.index.insert(name.clone(), id);
            // placeholder until the body is lowered, auxiliary rules are pushed after these
            lowering.rules.push(Rule {
                name: name.clone(),
                parser: NodeParser::Choice {
                    alternatives: vec![],
                },
            });
        }
        for (id, (name, spec)) in self.rules.iter().enumerate() {
            let parser = match spec {
                RuleSpec::Alias(terminal) => {
                    lowering.check_terminal(terminal)?;
                    NodeParser::Alias {
                        terminal: terminal.clone(),
                    }
                }
                RuleSpec::Body(alternatives) => NodeParser::Choice {
                    alternatives: lowering.lower_alternatives(name, alternatives)?,
                },
            };
            lowering.rules[id].parser = parser;
        }
        let entry = *lowering
            .index
            .get(&self.name)
            .ok_or_else(|| GrammarError::MissingEntryPoint {
                name: self.name.clone(),
            })?;
        let Lowering { rules, index, .. } = lowering;
        let mut grammar = Grammar {
            name: self.name,
            vocabulary: self.vocabulary,
            rules,
            index,
            entry,
            diagnostics: self.diagnostics,
        };
        grammar.warn_unreachable(self.rules.len());
        debug!(
            "Built grammar {} with {} rules ({} auxiliary)",
            grammar.name,
            grammar.rules.len(),
            grammar.rules.len() - self.rules.len()
        );
        Ok(grammar)
    }
}

impl Grammar {
    /// Warn about the declared rules that cannot be reached from the entry rule.
    fn warn_unreachable(&mut self, declared: usize) {
        let mut seen = HashSet::from([self.entry]);
        let mut queue = VecDeque::from([self.entry]);
        while let Some(id) = queue.pop_front() {
            if let NodeParser::Choice { alternatives } = &self.rules[id].parser {
                for term in alternatives.iter().flat_map(|e| &e.terms) {
                    if let Symbol::Rule(next) = term.symbol {
                        if seen.insert(next) {
                            queue.push_back(next);
                        }
                    }
                }
            }
        }
        for id in 0..declared {
            if !seen.contains(&id) {
                let message = format!("rule <{}> is never used", self.rules[id].name);
                warn!("{}: {}", self.name, message);
                self.diagnostics.add_diagnostic(Diagnostic::warning(message));
            }
        }
    }
}

struct Lowering<'a> {
    vocabulary: &'a Vocabulary,
    rules: Vec<Rule>,
    index: HashMap<String, RuleId>,
    /// Next group and branch numbers for each left hand side.
    counters: HashMap<String, (usize, usize)>,
}

impl Lowering<'_> {
    fn check_terminal(&self, name: &str) -> Result<(), GrammarError> {
        if self.vocabulary.knows_terminal(name) {
            Ok(())
        } else {
            Err(GrammarError::UnknownTerminal {
                name: name.to_string(),
            })
        }
    }

    fn lower_alternatives(
        &mut self,
        lhs: &str,
        alternatives: &[Vec<TermSpec>],
    ) -> Result<Vec<Expression>, GrammarError> {
        alternatives
            .iter()
            .map(|terms| {
                Ok(Expression {
                    terms: terms
                        .iter()
                        .map(|t| self.lower_term(lhs, t))
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect()
    }

    fn lower_term(&mut self, lhs: &str, term: &TermSpec) -> Result<Term, GrammarError> {
        let symbol = match &term.atom {
            Atom::Rule(name) => Symbol::Rule(*self.index.get(name).ok_or_else(|| {
                GrammarError::UndefinedNonterminal { name: name.clone() }
            })?),
            Atom::Terminal(name) => {
                self.check_terminal(name)?;
                Symbol::Terminal(name.clone())
            }
            Atom::Group(alternatives) => Symbol::Rule(self.lower_group(lhs, alternatives)?),
        };
        Ok(Term {
            symbol,
            multiplicity: term.multiplicity,
            label: term.label.clone(),
        })
    }

    fn lower_group(
        &mut self,
        lhs: &str,
        alternatives: &[Vec<TermSpec>],
    ) -> Result<RuleId, GrammarError> {
        let group = self.next_group(lhs);
        let id = self.push(format!("{}:{}", lhs, group), vec![]);
        let mut lowered = Vec::with_capacity(alternatives.len());
        for terms in alternatives {
            if alternatives.len() > 1 && terms.len() > 1 {
                let branch = self.next_branch(lhs);
                let branch_id = self.push(format!("{}~{}", lhs, branch), vec![]);
                let expression = self.lower_alternatives(lhs, std::slice::from_ref(terms))?;
                self.rules[branch_id].parser = NodeParser::Choice {
                    alternatives: expression,
                };
                lowered.push(Expression {
                    terms: vec![Term {
                        symbol: Symbol::Rule(branch_id),
                        multiplicity: Multiplicity::One,
                        label: None,
                    }],
                });
            } else {
                lowered.extend(self.lower_alternatives(lhs, std::slice::from_ref(terms))?);
            }
        }
        self.rules[id].parser = NodeParser::Choice {
            alternatives: lowered,
        };
        Ok(id)
    }

    fn push(&mut self, name: String, alternatives: Vec<Expression>) -> RuleId {
        let id = self.rules.len();
        self.index.insert(name.clone(), id);
        self.rules.push(Rule {
            name,
            parser: NodeParser::Choice { alternatives },
        });
        id
    }

    fn next_group(&mut self, lhs: &str) -> usize {
        let counters = self.counters.entry(lhs.to_string()).or_default();
        counters.0 += 1;
        counters.0 - 1
    }

    fn next_branch(&mut self, lhs: &str) -> usize {
        let counters = self.counters.entry(lhs.to_string()).or_default();
        counters.1 += 1;
        counters.1 - 1
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use speculoos::prelude::*;

    use crate::vocabulary::{DECIMAL_INTEGER, IDENTIFIER};

    use super::*;

    fn vocabulary() -> Vocabulary {
        let mut vocabulary = Vocabulary::new();
        vocabulary.add_builtin(IDENTIFIER).unwrap();
        vocabulary.add_builtin(DECIMAL_INTEGER).unwrap();
        for text in [",", "(", ")", "+"] {
            vocabulary.add_exact(text).unwrap();
        }
        vocabulary
    }

    #[test]
    fn test_groups_are_hoisted() {
        let mut builder = GrammarBuilder::new("list", vocabulary());
        builder.rule(
            "list",
            vec![vec![
                TermSpec::rule("item"),
                TermSpec::group(vec![vec![TermSpec::exact(","), TermSpec::rule("item")]]).star(),
            ]],
        );
        builder.rule(
            "item",
            vec![vec![TermSpec::group(vec![
                vec![TermSpec::terminal(IDENTIFIER)],
                vec![TermSpec::exact("("), TermSpec::rule("list"), TermSpec::exact(")")],
            ])]],
        );
        let grammar = builder.build().unwrap();
        assert_eq!(
            grammar.to_string(),
            "<list> ::= <item> <list:0>*;\n\
             <item> ::= <item:0>;\n\
             <list:0> ::= \",\" <item>;\n\
             <item:0> ::= identifier | <item~0>;\n\
             <item~0> ::= \"(\" <list> \")\";\n"
        );
        assert_that!(grammar.diagnostics().is_empty()).is_true();
    }

    #[test]
    fn test_undefined_nonterminal() {
        let mut builder = GrammarBuilder::new("list", vocabulary());
        builder.rule("list", vec![vec![TermSpec::rule("nope")]]);
        assert_eq!(
            builder.build().unwrap_err(),
            GrammarError::UndefinedNonterminal {
                name: "nope".into()
            }
        );
    }

    #[test]
    fn test_unknown_terminal() {
        let mut builder = GrammarBuilder::new("list", vocabulary());
        builder.rule("list", vec![vec![TermSpec::exact("while")]]);
        assert!(matches!(
            builder.build(),
            Err(GrammarError::UnknownTerminal { .. })
        ));
    }

    #[test]
    fn test_missing_entry_and_duplicates() {
        let mut builder = GrammarBuilder::new("list", vocabulary());
        builder.rule("other", vec![vec![]]);
        assert!(matches!(
            builder.build(),
            Err(GrammarError::MissingEntryPoint { .. })
        ));

        let mut builder = GrammarBuilder::new("list", vocabulary());
        builder.rule("list", vec![vec![]]);
        builder.rule("list", vec![vec![]]);
        assert!(matches!(
            builder.build(),
            Err(GrammarError::DuplicateRule { .. })
        ));
    }

    #[test]
    fn test_warnings() {
        let mut builder = GrammarBuilder::new("list", vocabulary());
        builder.rule("list", vec![vec![TermSpec::rule("number")]]);
        builder.alias("number", DECIMAL_INTEGER);
        builder.alias("number", IDENTIFIER);
        builder.rule("orphan", vec![vec![TermSpec::terminal("e")]]);
        let grammar = builder.build().unwrap();
        let warnings: Vec<_> = grammar
            .diagnostics()
            .warnings()
            .map(|d| d.message().to_string())
            .collect();
        assert_eq!(
            warnings,
            vec![
                "alias <number> is defined more than once, keeping the first",
                "rule <orphan> is never used"
            ]
        );
        let number = grammar.rule_id("number").unwrap();
        assert_eq!(
            grammar.rule(number).parser,
            NodeParser::Alias {
                terminal: DECIMAL_INTEGER.into()
            }
        );
    }
}
