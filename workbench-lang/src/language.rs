use workbench_grammar::{print, DefaultLayout, Grammar, Node, Shake};

use crate::LangError;

/// A language of the workbench: a grammar plus the way its trees are shaken and printed.
///
/// Every language gets the same four stages: source text, raw tree, shaken tree and formatted
/// text. Only [`Language::name`], [`Language::extensions`] and [`Language::grammar`] are
/// required, the rest have blanket implementations that fit most languages.
pub trait Language: std::fmt::Debug + Send + Sync {
    /// Short name of the language, unique between all the languages. It is also the prefix of
    /// the artifact kinds of the language.
    fn name(&self) -> &'static str;

    /// File extensions of the sources in this language, without the dot.
    fn extensions(&self) -> Vec<&'static str>;

    /// The grammar parsing sources in this language.
    fn grammar(&self) -> Result<&'static Grammar, LangError>;

    /// The shaker turning raw trees into the canonical form of the language.
    fn shaker(&self) -> Shake {
        Shake::new()
    }

    /// Parse `source` into a raw tree.
    fn parse(&self, source: &str) -> Result<Node, LangError> {
        Ok(self.grammar()?.parse(source)?)
    }

    /// Rebuild a raw tree in canonical form.
    fn shake(&self, raw: &Node) -> Node {
        self.shaker().shake(raw)
    }

    /// Print a tree back to source.
    fn print(&self, ast: &Node) -> String {
        print(ast, &DefaultLayout)
    }

    /// Parse, shake and print `source`.
    fn format(&self, source: &str) -> Result<String, LangError> {
        let raw = self.parse(source)?;
        Ok(self.print(&self.shake(&raw)))
    }
}
