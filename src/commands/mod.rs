//! The subcommands of the `workbench` binary.

use std::path::Path;

use anyhow::{Context, Error};

use workbench_diagnostics::CodeSpan;
use workbench_lang::{AssemblyError, CompileError, Language, LanguageManager, LangError};

use crate::opt::SourceOpt;

mod format;
mod kinds;
mod run;
mod synth;

pub use format::main_format;
pub use kinds::main_kinds;
pub use run::{main_run, run_program, run_source};
pub use synth::main_synth;

/// A source file read from disk.
#[derive(Debug, Clone)]
pub struct Source {
    pub text: String,
    /// The language given on the command line or detected from the extension.
    pub lang: Option<String>,
}

impl Source {
    pub fn load(opt: &SourceOpt) -> Result<Source, Error> {
        let text = std::fs::read_to_string(&opt.file)
            .with_context(|| format!("Cannot read {}", opt.file.display()))?;
        let lang = match &opt.lang {
            Some(lang) => Some(lang.clone()),
            None => LanguageManager::detect_language(&opt.file).map(|l| l.name().to_string()),
        };
        debug!("Loaded {} ({:?})", opt.file.display(), lang);
        Ok(Source { text, lang })
    }

    /// The language of the source: the known one, or the first whose parser accepts it.
    pub fn language(&self) -> Result<std::sync::Arc<dyn Language>, Error> {
        match &self.lang {
            Some(name) => LanguageManager::from_name(name)
                .ok_or_else(|| LangError::UnknownLanguage(name.clone()).into()),
            None => LanguageManager::guess(&self.text)
                .context("The source is not valid in any of the known languages"),
        }
    }
}

/// Print the language error inside `error`, if any, pointing at the offending part of the source
/// when the error is about the source itself.
pub fn explain(error: &Error, path: &Path, source: &Source) {
    let Some((lang_error, about_source)) = error.chain().find_map(|e| {
        if let Some(e) = e.downcast_ref::<LangError>() {
            return Some((e.clone(), matches!(e, LangError::Grammar(_))));
        }
        if let Some(e) = e.downcast_ref::<CompileError>() {
            return Some((e.clone().into(), true));
        }
        e.downcast_ref::<AssemblyError>()
            .map(|e| (e.clone().into(), source.lang.as_deref() == Some("a")))
    }) else {
        return;
    };
    let mut diagnostic = lang_error.to_diagnostic();
    if let (true, Some(range)) = (about_source, diagnostic.range()) {
        match CodeSpan::from_range(path, &source.text, range) {
            Ok(span) => diagnostic = diagnostic.with_code_span(span),
            Err(e) => debug!("Cannot show the source: {}", e),
        }
    }
    eprint!("{}", diagnostic);
}
