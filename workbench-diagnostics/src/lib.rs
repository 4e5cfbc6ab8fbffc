//! Source positions and user facing diagnostics.
//!
//! Every stage of the workbench (lexing, parsing, grammar loading, assembling, running) reports
//! the position it refers to with a [`Cursor`] or a [`CursorRange`]. When the source text is at
//! hand, a [`Diagnostic`] can carry a [`CodeSpan`] which renders the offending line with the
//! range underlined.

mod cursor;
mod span;

use std::fmt::{Display, Formatter};

use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};

pub use cursor::{Cursor, CursorRange};
pub use span::CodeSpan;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

impl DiagnosticLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticLevel::Error => "Error",
            DiagnosticLevel::Warning => "Warning",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            DiagnosticLevel::Warning => Color::BrightYellow,
            DiagnosticLevel::Error => Color::BrightRed,
        }
    }
}

impl Display for DiagnosticLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    level: DiagnosticLevel,
    message: String,
    note: Option<String>,
    help: Option<String>,
    range: Option<CursorRange>,
    code_span: Option<CodeSpan>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message: message.into(),
            note: None,
            help: None,
            range: None,
            code_span: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
            note: None,
            help: None,
            range: None,
            code_span: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach the range of source this diagnostic is about.
    pub fn with_range(mut self, range: CursorRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_code_span(mut self, code_span: CodeSpan) -> Self {
        self.code_span = Some(code_span);
        self
    }

    pub fn print(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let level = self.level.as_str();
        let pad = level.len();
        write!(f, "{}: ", level.color(self.level.color()).bold())?;
        if let Some(range) = &self.range {
            write!(f, "{}: ", range)?;
        }
        writeln!(f, "{}", self.message)?;
        if let Some(note) = &self.note {
            write!(f, "{:>pad$}: ", "Note".bold(), pad = pad)?;
            let mut lines = note.lines();
            if let Some(line) = lines.next() {
                writeln!(f, "{}", line)?;
            }
            for line in lines {
                writeln!(f, "{:>pad$}  {}", "", line, pad = pad)?;
            }
        }
        if let Some(help) = &self.help {
            writeln!(f, "{:>pad$}: {}", "Help".bold(), help, pad = pad)?;
        }
        if let Some(code_span) = &self.code_span {
            for line in code_span.to_string(self.level).lines() {
                writeln!(f, "{:>pad$} {}", "", line, pad = pad + 1)?;
            }
        }
        Ok(())
    }

    pub fn level(&self) -> DiagnosticLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn range(&self) -> Option<CursorRange> {
        self.range
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.print(f)
    }
}

/// An ordered collection of diagnostics produced by a stage.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DiagnosticContext {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Iterate over the diagnostics that are only warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.level == DiagnosticLevel::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_levels() {
        let mut context = DiagnosticContext::new();
        assert!(context.is_empty());
        context.add_diagnostic(Diagnostic::warning("rule <x> is never used"));
        assert!(!context.has_errors());
        context.add_diagnostic(
            Diagnostic::error("boom").with_range(CursorRange::at(Cursor::new(2, 3))),
        );
        assert!(context.has_errors());
        assert_eq!(context.warnings().count(), 1);
        assert_eq!(context.diagnostics()[1].range().unwrap().start.column, 3);
    }

    #[test]
    fn test_print_contains_message() {
        colored::control::set_override(false);
        let diagnostic = Diagnostic::error("invalid character")
            .with_range(CursorRange::at(Cursor::new(1, 4)))
            .with_help("remove it");
        let text = diagnostic.to_string();
        assert!(text.starts_with("Error: 1:4: invalid character"));
        assert!(text.contains("Help: remove it"));
    }
}
