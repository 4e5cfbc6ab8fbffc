use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A position inside a source file. Both the line and the column start from 1.
///
/// Cursors are ordered first by line, then by column.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    /// The line number, starting from 1.
    pub line: usize,
    /// The column number, starting from 1.
    pub column: usize,
}

impl Cursor {
    /// Make a new cursor. Zero lines or columns are bumped to 1.
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line: line.max(1),
            column: column.max(1),
        }
    }

    /// The cursor at the very beginning of a file.
    pub fn start() -> Self {
        Self { line: 1, column: 1 }
    }

    /// Move the cursor past the character `c`.
    pub fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    /// Move the cursor past all the characters of `text`.
    pub fn advance_str(&mut self, text: &str) {
        for c in text.chars() {
            self.advance(c);
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::start()
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A range of characters between two cursors, both inclusive.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub struct CursorRange {
    /// The position of the first character.
    pub start: Cursor,
    /// The position of the last character.
    pub end: Cursor,
}

impl CursorRange {
    /// Make a new range. The bounds are swapped if given in the wrong order.
    pub fn new(start: Cursor, end: Cursor) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// A range covering a single position.
    pub fn at(cursor: Cursor) -> Self {
        Self {
            start: cursor,
            end: cursor,
        }
    }

    /// The smallest range containing both `self` and `other`.
    pub fn merge(&self, other: &CursorRange) -> CursorRange {
        CursorRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Whether the cursor falls inside this range.
    pub fn contains(&self, cursor: Cursor) -> bool {
        self.start <= cursor && cursor <= self.end
    }
}

impl Display for CursorRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
