use std::fmt::{Display, Formatter};

use anyhow::{bail, Context, Error};

use workbench_grammar::Node;
use workbench_mp0::Program;

/// A value flowing through the synthesis graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Source text of some language.
    Text(String),
    /// A syntax tree, raw or shaken.
    Ast(Node),
    /// An assembled MP0 program.
    Program(Program),
}

impl Artifact {
    /// What kind of value this is, for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Artifact::Text(_) => "text",
            Artifact::Ast(_) => "syntax tree",
            Artifact::Program(_) => "program",
        }
    }

    pub fn as_text(&self) -> Result<&str, Error> {
        match self {
            Artifact::Text(text) => Ok(text),
            other => bail!("Expecting text, found a {}", other.describe()),
        }
    }

    pub fn as_ast(&self) -> Result<&Node, Error> {
        match self {
            Artifact::Ast(node) => Ok(node),
            other => bail!("Expecting a syntax tree, found a {}", other.describe()),
        }
    }

    pub fn as_program(&self) -> Result<&Program, Error> {
        match self {
            Artifact::Program(program) => Ok(program),
            other => bail!("Expecting a program, found a {}", other.describe()),
        }
    }

    /// A printable form: text as is, trees as JSON and programs as hex words.
    pub fn render(&self) -> Result<String, Error> {
        Ok(match self {
            Artifact::Text(text) => text.clone(),
            Artifact::Ast(node) => {
                serde_json::to_string_pretty(node).context("Failed to serialize the tree")?
            }
            Artifact::Program(program) => program.to_hex(),
        })
    }
}

impl Display for Artifact {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Artifact::Text(text) => write!(f, "{}", text),
            Artifact::Ast(node) => write!(f, "{}", node),
            Artifact::Program(program) => write!(f, "{}", program),
        }
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;

    #[test]
    fn test_accessors() {
        let text = Artifact::Text("x".into());
        assert_that!(text.as_text().unwrap()).is_equal_to("x");
        assert_that!(text.as_ast()).is_err();
        assert_that!(text.render().unwrap()).is_equal_to("x".to_string());
        let program = Artifact::Program(Program::new(&[], vec![0x1234]));
        assert_that!(program.as_program()).is_ok();
        assert_that!(program.as_text()).is_err();
    }
}
