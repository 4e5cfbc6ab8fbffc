use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{bail, Error};
use colored::Colorize;

use crate::{Cursor, CursorRange, DiagnosticLevel};

/// A [`CodeSpan`] represent a slice of code, with the line it lives in.
///
/// Ranges spanning multiple lines are clipped at the end of their first line.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct CodeSpan {
    /// The path of the file where this span comes from.
    file_name: PathBuf,
    /// The line number inside the file.
    line_number: NonZeroUsize,
    /// The column of the first character of the span, starting from 1.
    column: usize,
    /// The length of the span, in characters.
    len: usize,
    /// The content of the line.
    line: String,
}

impl CodeSpan {
    /// Create a new [`CodeSpan`] from the content of a file and a range of cursors inside it.
    pub fn from_range(
        file_name: impl Into<PathBuf>,
        content: impl AsRef<str>,
        range: CursorRange,
    ) -> Result<Self, Error> {
        let Some(line_number) = NonZeroUsize::new(range.start.line) else {
            bail!("Lines start from 1");
        };
        let Some(line) = content.as_ref().split('\n').nth(range.start.line - 1) else {
            bail!("The range starts after the end of the file");
        };
        let line = line.trim_end_matches('\r');
        let line_len = line.chars().count();
        // a cursor right after the last character is allowed: it points at the end of input
        if range.start.column > line_len + 1 {
            bail!("The range starts after the end of line {}", range.start.line);
        }
        let end_column = if range.end.line == range.start.line {
            range.end.column.min(line_len)
        } else {
            line_len
        };
        let len = (end_column + 1).saturating_sub(range.start.column);
        Ok(Self {
            file_name: file_name.into(),
            line_number,
            column: range.start.column,
            len,
            line: line.into(),
        })
    }

    /// Create a new [`CodeSpan`] pointing at a single character.
    pub fn from_cursor(
        file_name: impl Into<PathBuf>,
        content: impl AsRef<str>,
        cursor: Cursor,
    ) -> Result<Self, Error> {
        Self::from_range(file_name, content, CursorRange::at(cursor))
    }

    /// Get the content of the span as a `String`.
    pub fn as_string(&self) -> String {
        self.line
            .chars()
            .skip(self.column - 1)
            .take(self.len)
            .collect()
    }

    /// Obtain a string (with colors) of this span.
    pub fn to_string(&self, level: DiagnosticLevel) -> String {
        let mut result = String::new();

        result += &format!(
            "{}:{}:{}\n",
            self.file_name.display(),
            self.line_number,
            self.column
        );

        let line_number = self.line_number.get().to_string();
        result += &format!("{} | {}\n", line_number, self.line);

        let pad = line_number.len() + 3 + self.column - 1;
        result += &" ".repeat(pad);

        let color = level.color();
        for _ in 0..(self.len.max(1)) {
            result += &format!("{}", "^".color(color).bold());
        }
        result += "\n";
        result
    }
}
