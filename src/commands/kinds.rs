use anyhow::Error;
use itertools::Itertools;

use workbench_lang::LanguageManager;
use workbench_synth::SynthesisGraph;

pub fn main_kinds() -> Result<(), Error> {
    for lang in LanguageManager::languages() {
        println!("{:<6} .{}", lang.name(), lang.extensions().iter().join(" ."));
    }
    println!();
    let graph = SynthesisGraph::with_languages();
    for edge in graph.edges() {
        println!("{} -> {}", edge.from, edge.to);
    }
    Ok(())
}
