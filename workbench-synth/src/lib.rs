//! Turning sources into other artifacts.
//!
//! A [`Pipeline`] chains fallible stages over a value, keeping named intermediate results in a
//! [`Stash`]. The [`SynthesisGraph`] knows the kinds of [`Artifact`] (`b`, `b-raw-ast`, `b-ast`,
//! `b-formatted`, `a`, ..., `mp0`) and the transforms between them: asking for an artifact runs
//! the shortest chain of transforms from the source as a pipeline.
//!
//! ```
//! use workbench_synth::{Artifact, SynthesisGraph};
//!
//! let graph = SynthesisGraph::with_languages();
//! let formatted = graph.synthesize_source("expr-formatted", "1+2*x", None, &[])?;
//! assert_eq!(formatted, Artifact::Text("1 + 2 * x".into()));
//! # Ok::<(), anyhow::Error>(())
//! ```

#[macro_use]
extern crate log;

mod artifact;
mod graph;
mod pipeline;

pub use artifact::Artifact;
pub use graph::{ast_kind, formatted_kind, raw_ast_kind, Edge, SynthesisGraph, Transform, PROGRAM_KIND};
pub use pipeline::{Pipeline, Stash};
