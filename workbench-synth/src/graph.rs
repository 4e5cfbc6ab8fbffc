use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Error};
use indexmap::IndexSet;
use itertools::Itertools;

use workbench_lang::{assemble, compile, to_pattern, Language, LanguageManager};

use crate::{Artifact, Pipeline};

/// A single step transform between two artifact kinds.
pub type Transform = Box<dyn Fn(Artifact) -> Result<Artifact, Error> + Send + Sync>;

/// The kind of a compiled MP0 program.
pub const PROGRAM_KIND: &str = "mp0";

/// An edge of the [`SynthesisGraph`].
pub struct Edge {
    pub from: String,
    pub to: String,
    transform: Transform,
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// The artifact kinds of a language: its source, raw tree, shaken tree and formatted source.
pub fn raw_ast_kind(lang: &str) -> String {
    format!("{}-raw-ast", lang)
}

pub fn ast_kind(lang: &str) -> String {
    format!("{}-ast", lang)
}

pub fn formatted_kind(lang: &str) -> String {
    format!("{}-formatted", lang)
}

/// A directed graph of artifact kinds whose edges are single step transforms.
///
/// Synthesizing an artifact means finding the shortest chain of transforms from the kind of the
/// source to the target kind, then running it as a [`Pipeline`].
#[derive(Debug, Default)]
pub struct SynthesisGraph {
    kinds: IndexSet<String>,
    edges: Vec<Edge>,
}

impl SynthesisGraph {
    /// Make an empty graph.
    pub fn new() -> SynthesisGraph {
        SynthesisGraph::default()
    }

    /// Make a graph with all the known languages and the transforms between them.
    pub fn with_languages() -> SynthesisGraph {
        let mut graph = SynthesisGraph::new();
        for lang in LanguageManager::languages() {
            graph.register_language(lang);
        }
        graph.add_edge(ast_kind("b"), "a", |artifact| {
            Ok(Artifact::Text(compile(artifact.as_ast()?)?))
        });
        graph.add_edge(ast_kind("a"), PROGRAM_KIND, |artifact| {
            Ok(Artifact::Program(assemble(artifact.as_ast()?)?))
        });
        graph.add_edge(ast_kind("regex"), "regex-pattern", |artifact| {
            Ok(Artifact::Text(to_pattern(artifact.as_ast()?)))
        });
        graph
    }

    /// Add a transform from the kind `from` to the kind `to`.
    pub fn add_edge<F>(&mut self, from: impl Into<String>, to: impl Into<String>, transform: F)
    where
        F: Fn(Artifact) -> Result<Artifact, Error> + Send + Sync + 'static,
    {
        let (from, to) = (from.into(), to.into());
        self.kinds.insert(from.clone());
        self.kinds.insert(to.clone());
        self.edges.push(Edge {
            from,
            to,
            transform: Box::new(transform),
        });
    }

    /// Add the cycle `lang -> lang-raw-ast -> lang-ast -> lang-formatted -> lang`.
    pub fn register_language(&mut self, lang: Arc<dyn Language>) {
        let name = lang.name();
        debug!("Registering language {}", name);
        let parser = lang.clone();
        self.add_edge(name, raw_ast_kind(name), move |artifact| {
            Ok(Artifact::Ast(parser.parse(artifact.as_text()?)?))
        });
        let shaker = lang.clone();
        self.add_edge(raw_ast_kind(name), ast_kind(name), move |artifact| {
            Ok(Artifact::Ast(shaker.shake(artifact.as_ast()?)))
        });
        let printer = lang;
        self.add_edge(ast_kind(name), formatted_kind(name), move |artifact| {
            Ok(Artifact::Text(printer.print(artifact.as_ast()?)))
        });
        self.add_edge(formatted_kind(name), name, Ok);
    }

    /// All the artifact kinds, in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.iter().map(String::as_str)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The shortest chain of edges from `from` to `to`, passing through `waypoints` in order.
    pub fn path(&self, from: &str, to: &str, waypoints: &[&str]) -> Result<Vec<usize>, Error> {
        for kind in std::iter::once(&from).chain(waypoints).chain([&to]) {
            if !self.kinds.contains(*kind) {
                bail!(
                    "Unknown artifact kind {}, the known ones are: {}",
                    kind,
                    self.kinds.iter().join(", ")
                );
            }
        }
        let stops: Vec<&str> = std::iter::once(from)
            .chain(waypoints.iter().copied())
            .chain([to])
            .collect();
        let mut path = Vec::new();
        for (start, end) in stops.iter().tuple_windows() {
            path.extend(self.shortest_path(start, end)?);
        }
        Ok(path)
    }

    /// Breadth first search of the edges from `from` to `to`.
    fn shortest_path(&self, from: &str, to: &str) -> Result<Vec<usize>, Error> {
        // the edge used to reach each kind
        let mut reached: HashMap<&str, Option<usize>> = HashMap::new();
        reached.insert(from, None);
        let mut queue = VecDeque::from([from]);
        while let Some(kind) = queue.pop_front() {
            if kind == to {
                break;
            }
            for (index, edge) in self.edges.iter().enumerate() {
                if edge.from == kind && !reached.contains_key(edge.to.as_str()) {
                    reached.insert(&edge.to, Some(index));
                    queue.push_back(&edge.to);
                }
            }
        }
        let mut path = Vec::new();
        let mut kind = to;
        loop {
            match reached.get(kind) {
                None => bail!("Cannot synthesize {} from {}", to, from),
                Some(None) => break,
                Some(Some(index)) => {
                    path.push(*index);
                    kind = &self.edges[*index].from;
                }
            }
        }
        path.reverse();
        Ok(path)
    }

    /// Turn `source` of kind `from` into an artifact of kind `to` through `waypoints`.
    pub fn synthesize(
        &self,
        to: &str,
        source: Artifact,
        from: &str,
        waypoints: &[&str],
    ) -> Result<Artifact, Error> {
        let path = self.path(from, to, waypoints)?;
        info!(
            "Synthesizing {} from {}: {}",
            to,
            from,
            std::iter::once(from)
                .chain(path.iter().map(|i| self.edges[*i].to.as_str()))
                .join(" -> ")
        );
        let mut pipeline = Pipeline::new(source);
        for index in path {
            let edge = &self.edges[index];
            pipeline = pipeline.then(&edge.to, |artifact, _| (edge.transform)(artifact))?;
        }
        Ok(pipeline.into_value())
    }

    /// Turn `source` into an artifact of kind `to`. When `lang` is not given the language of the
    /// source is guessed by trying the parsers of all the languages.
    pub fn synthesize_source(
        &self,
        to: &str,
        source: &str,
        lang: Option<&str>,
        waypoints: &[&str],
    ) -> Result<Artifact, Error> {
        let lang = match lang {
            Some(name) => LanguageManager::from_name(name)
                .ok_or_else(|| anyhow!("Unknown language {}", name))?,
            None => LanguageManager::guess(source)
                .context("The source is not valid in any of the known languages")?,
        };
        self.synthesize(to, Artifact::Text(source.to_string()), lang.name(), waypoints)
            .with_context(|| format!("Failed to synthesize {} from {}", to, lang.name()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use speculoos::prelude::*;

    use super::*;

    fn kinds_of(graph: &SynthesisGraph, path: &[usize]) -> Vec<String> {
        path.iter().map(|i| graph.edges()[*i].to.clone()).collect()
    }

    #[test]
    fn test_language_cycle() {
        let graph = SynthesisGraph::with_languages();
        let path = graph.path("b", "b", &["b-formatted"]).unwrap();
        assert_eq!(
            kinds_of(&graph, &path),
            vec!["b-raw-ast", "b-ast", "b-formatted", "b"]
        );
    }

    #[test]
    fn test_shortest_path() {
        let graph = SynthesisGraph::with_languages();
        let path = graph.path("b", PROGRAM_KIND, &[]).unwrap();
        assert_eq!(
            kinds_of(&graph, &path),
            vec!["b-raw-ast", "b-ast", "a", "a-raw-ast", "a-ast", "mp0"]
        );
        assert_that!(graph.path("mp0", "b", &[])).is_err();
        assert_that!(graph.path("b", "c", &[])).is_err();
    }

    #[test]
    fn test_synthesize() {
        let graph = SynthesisGraph::with_languages();
        let formatted = graph
            .synthesize_source("expr-formatted", "(a+b)*c", None, &[])
            .unwrap();
        assert_eq!(formatted, Artifact::Text("(a + b) * c".into()));
        let pattern = graph
            .synthesize_source("regex-pattern", "a b*", Some("regex"), &[])
            .unwrap();
        assert_eq!(pattern, Artifact::Text("ab*".into()));
        let program = graph
            .synthesize_source(PROGRAM_KIND, "fn main() return 3;", None, &["a-formatted"])
            .unwrap();
        assert_that!(program.as_program()).is_ok();
    }

    #[test]
    fn test_custom_edges() {
        let mut graph = SynthesisGraph::new();
        graph.add_edge("x", "y", |a| Ok(Artifact::Text(format!("{}y", a.as_text()?))));
        graph.add_edge("y", "z", |a| Ok(Artifact::Text(format!("{}z", a.as_text()?))));
        graph.add_edge("x", "z", |_| Ok(Artifact::Text("direct".into())));
        let direct = graph.synthesize("z", Artifact::Text("x".into()), "x", &[]).unwrap();
        assert_eq!(direct, Artifact::Text("direct".into()));
        let through = graph.synthesize("z", Artifact::Text("x".into()), "x", &["y"]).unwrap();
        assert_eq!(through, Artifact::Text("xyz".into()));
        assert_that!(graph.kinds().collect::<Vec<_>>()).is_equal_to(vec!["x", "y", "z"]);
    }
}
