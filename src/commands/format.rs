use anyhow::Error;

use crate::commands::{explain, Source};
use crate::opt::SourceOpt;

pub fn main_format(opt: SourceOpt) -> Result<(), Error> {
    let source = Source::load(&opt)?;
    let lang = source.language()?;
    let formatted = lang
        .format(&source.text)
        .map_err(Error::from)
        .inspect_err(|e| explain(e, &opt.file, &source))?;
    println!("{}", formatted);
    Ok(())
}
