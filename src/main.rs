use clap::Parser;

use workbench::error::NiceError;
use workbench::opt::{Command, Opt};
use workbench::{main_format, main_kinds, main_run, main_synth};

fn main() {
    let opt = Opt::parse();
    opt.logger.enable_log();

    let code = match opt.command {
        Command::Run(opt) => main_run(opt),
        Command::Synth(opt) => main_synth(opt).map(|_| 0),
        Command::Format(opt) => main_format(opt).map(|_| 0),
        Command::Kinds => main_kinds().map(|_| 0),
    }
    .nice_unwrap();
    std::process::exit(code);
}
