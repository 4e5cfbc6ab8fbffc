use std::io::{BufRead, Write};

use anyhow::{Context, Error};

use workbench_mp0::{Machine, MachineConfig, Program};
use workbench_synth::{SynthesisGraph, PROGRAM_KIND};

use crate::commands::{explain, Source};
use crate::opt::RunOpt;

/// Extension of the binary MP0 programs written by `synth --output`.
const PROGRAM_EXTENSION: &str = "mp0";

pub fn main_run(opt: RunOpt) -> Result<i32, Error> {
    let config = opt.machine.config();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    let path = &opt.source.file;
    let code = if path.extension().map_or(false, |ext| ext == PROGRAM_EXTENSION) {
        let bytes =
            std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
        let program = Program::from_bytes(&bytes).context("Invalid program file")?;
        run_program(&program, config, stdin.lock(), &mut stdout)?
    } else {
        let source = Source::load(&opt.source)?;
        run_source(&source.text, source.lang.as_deref(), config, stdin.lock(), &mut stdout)
            .inspect_err(|e| explain(e, path, &source))?
    };
    stdout.flush().context("Failed to flush stdout")?;
    Ok(code)
}

/// Synthesize the MP0 program of `source` and run it, returning its exit code.
pub fn run_source<R: BufRead, W: Write>(
    source: &str,
    lang: Option<&str>,
    config: MachineConfig,
    stdin: R,
    stdout: W,
) -> Result<i32, Error> {
    let graph = SynthesisGraph::with_languages();
    let artifact = graph.synthesize_source(PROGRAM_KIND, source, lang, &[])?;
    run_program(artifact.as_program()?, config, stdin, stdout)
}

/// Run an MP0 program until it stops, returning its exit code.
pub fn run_program<R: BufRead, W: Write>(
    program: &Program,
    config: MachineConfig,
    stdin: R,
    stdout: W,
) -> Result<i32, Error> {
    let mut machine =
        Machine::new(config, program, stdin, stdout).context("Cannot load the program")?;
    let code = machine.run().context("The program failed")?;
    info!("Exit code {} after {} steps", code, machine.steps());
    Ok(code)
}
