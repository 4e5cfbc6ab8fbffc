use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use workbench_mp0::MachineConfig;

#[derive(Parser, Debug)]
#[clap(
    name = "workbench",
    version,
    about = "Parse, format, compile and run the languages of the workbench"
)]
pub struct Opt {
    #[clap(flatten)]
    pub logger: LoggerOpt,

    /// What to do with the source
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a source down to an MP0 program and run it, exiting with its exit code
    Run(RunOpt),
    /// Turn a source into another kind of artifact and print it
    Synth(SynthOpt),
    /// Print a source in the canonical layout of its language
    Format(SourceOpt),
    /// List the languages and the artifact kinds that can be synthesized
    Kinds,
}

#[derive(Args, Debug, Clone)]
pub struct SourceOpt {
    /// Path to the source file
    #[clap(value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Language of the source.
    ///
    /// When omitted the language is detected from the extension of the file, or guessed by
    /// trying the parsers of all the languages.
    #[clap(long)]
    pub lang: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunOpt {
    #[clap(flatten)]
    pub source: SourceOpt,

    #[clap(flatten, next_help_heading = Some("MACHINE"))]
    pub machine: MachineOpt,
}

#[derive(Args, Debug, Clone)]
pub struct SynthOpt {
    #[clap(flatten)]
    pub source: SourceOpt,

    /// Kind of the artifact to produce, like `b-ast`, `a` or `mp0`
    #[clap(long)]
    pub to: String,

    /// Kinds to pass through, in order
    #[clap(long)]
    pub via: Vec<String>,

    /// Write the artifact to this file instead of printing it. Programs are written in binary
    #[clap(long, short, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct MachineOpt {
    /// Size of the memory of the machine, in bytes
    #[clap(long)]
    pub mem_size: Option<usize>,

    /// Size of the stack region at the top of the memory, in bytes
    #[clap(long)]
    pub stack_size: Option<usize>,

    /// Abort the program after this many instructions
    #[clap(long)]
    pub max_steps: Option<u64>,
}

impl MachineOpt {
    /// The configuration from the environment, overridden by the command line.
    pub fn config(&self) -> MachineConfig {
        let mut config = MachineConfig::from_env();
        if let Some(mem_size) = self.mem_size {
            config.mem_size(mem_size);
        }
        if let Some(stack_size) = self.stack_size {
            config.stack_size(stack_size);
        }
        if self.max_steps.is_some() {
            config.max_steps(self.max_steps);
        }
        config
    }
}

#[derive(Args, Debug, Clone)]
pub struct LoggerOpt {
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[clap(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl LoggerOpt {
    pub fn enable_log(&self) {
        if self.verbose > 0 {
            std::env::set_var("RUST_BACKTRACE", "1");
            match self.verbose {
                0 => unreachable!(),
                1 => std::env::set_var("RUST_LOG", "info"),
                2 => std::env::set_var("RUST_LOG", "debug"),
                _ => std::env::set_var("RUST_LOG", "trace"),
            }
        }

        env_logger::Builder::from_default_env()
            .format_timestamp_nanos()
            .init();
        better_panic::install();
    }
}
