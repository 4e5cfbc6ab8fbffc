use anyhow::{Context, Error};

use workbench_synth::{Artifact, SynthesisGraph};

use crate::commands::{explain, Source};
use crate::opt::SynthOpt;

pub fn main_synth(opt: SynthOpt) -> Result<(), Error> {
    let source = Source::load(&opt.source)?;
    let graph = SynthesisGraph::with_languages();
    let via: Vec<&str> = opt.via.iter().map(String::as_str).collect();
    let artifact = graph
        .synthesize_source(&opt.to, &source.text, source.lang.as_deref(), &via)
        .inspect_err(|e| explain(e, &opt.source.file, &source))?;

    match (&opt.output, &artifact) {
        (Some(path), Artifact::Program(program)) => std::fs::write(path, program.to_bytes())
            .with_context(|| format!("Cannot write {}", path.display()))?,
        (Some(path), other) => std::fs::write(path, other.render()?)
            .with_context(|| format!("Cannot write {}", path.display()))?,
        (None, other) => println!("{}", other.render()?),
    }
    Ok(())
}
