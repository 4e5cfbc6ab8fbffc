//! Pretty printing of syntax trees back to source text.

use crate::{Node, Token};

/// Default maximum line width.
pub const LINE_WIDTH: usize = 80;

/// Where a language wants spaces, newlines and indentation between tokens.
pub trait Layout {
    /// Whether a space goes between two tokens on the same line.
    fn space_between(&self, prev: &Token, next: &Token) -> bool {
        !matches!(prev.lexeme.as_str(), "(" | "[")
            && !matches!(next.lexeme.as_str(), ")" | "]" | "," | ";" | ":")
    }

    fn newline_before(&self, _token: &Token) -> bool {
        false
    }

    fn newline_after(&self, _token: &Token) -> bool {
        false
    }

    /// Whether the lines after this token are indented one more level.
    fn indent_after(&self, _token: &Token) -> bool {
        false
    }

    /// Whether this token and the lines after it are indented one less level.
    fn dedent_before(&self, _token: &Token) -> bool {
        false
    }

    fn indent_unit(&self) -> &str {
        "    "
    }

    fn width(&self) -> usize {
        LINE_WIDTH
    }
}

/// Single line layout with the default spacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLayout;

impl Layout for DefaultLayout {}

/// Lays out tokens one at a time.
struct Printer<'l, L: Layout + ?Sized> {
    layout: &'l L,
    output: String,
    column: usize,
    indent: usize,
    pending_newline: bool,
    prev: Option<Token>,
}

impl<'l, L: Layout + ?Sized> Printer<'l, L> {
    fn new(layout: &'l L) -> Self {
        Self {
            layout,
            output: String::new(),
            column: 0,
            indent: 0,
            pending_newline: false,
            prev: None,
        }
    }

    fn newline(&mut self) {
        self.output.push('\n');
        self.column = 0;
    }

    fn push(&mut self, token: &Token) {
        if token.is_empty() {
            return;
        }
        if self.layout.dedent_before(token) {
            self.indent = self.indent.saturating_sub(1);
        }
        let len = token.lexeme.chars().count();
        if let Some(prev) = &self.prev {
            if self.pending_newline || self.layout.newline_before(token) {
                self.newline();
            } else if self.layout.space_between(prev, token) {
                if self.column + 1 + len > self.layout.width() {
                    self.newline();
                } else {
                    self.output.push(' ');
                    self.column += 1;
                }
            }
        }
        if self.column == 0 {
            let unit = self.layout.indent_unit();
            for _ in 0..self.indent {
                self.output.push_str(unit);
                self.column += unit.chars().count();
            }
        }
        self.output.push_str(&token.lexeme);
        self.column += len;
        self.pending_newline = self.layout.newline_after(token);
        if self.layout.indent_after(token) {
            self.indent += 1;
        }
        self.prev = Some(token.clone());
    }
}

/// Print the tokens of `node` following `layout`.
pub fn print<L: Layout + ?Sized>(node: &Node, layout: &L) -> String {
    print_tokens(node.tokens(), layout)
}

/// Print a list of tokens following `layout`.
pub fn print_tokens<'t, I, L>(tokens: I, layout: &L) -> String
where
    I: IntoIterator<Item = &'t Token>,
    L: Layout + ?Sized,
{
    let mut printer = Printer::new(layout);
    for token in tokens {
        printer.push(token);
    }
    printer.output
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use workbench_diagnostics::CursorRange;

    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        text.split(' ')
            .map(|lexeme| Token::new("t", lexeme, None, CursorRange::default()))
            .collect()
    }

    #[test]
    fn test_default_spacing() {
        let tokens = tokens("f ( a , b ) [ 1 ] ;");
        assert_eq!(print_tokens(&tokens, &DefaultLayout), "f (a, b) [1];");
    }

    #[test]
    fn test_line_breaks() {
        let text = vec!["word"; 20].join(" ");
        let printed = print_tokens(&tokens(&text), &DefaultLayout);
        let lines: Vec<_> = printed.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 79);
        assert!(lines.iter().all(|l| l.len() <= LINE_WIDTH));
    }

    struct Braces;

    impl Layout for Braces {
        fn newline_after(&self, token: &Token) -> bool {
            matches!(token.lexeme.as_str(), "{" | ";" | "}")
        }

        fn indent_after(&self, token: &Token) -> bool {
            token.lexeme == "{"
        }

        fn dedent_before(&self, token: &Token) -> bool {
            token.lexeme == "}"
        }
    }

    #[test]
    fn test_indentation() {
        let tokens = tokens("while x { x = 1 ; }");
        assert_eq!(
            print_tokens(&tokens, &Braces),
            "while x {\n    x = 1;\n}"
        );
    }
}
