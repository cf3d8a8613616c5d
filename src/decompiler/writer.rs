//! Indentation-aware text output.

use std::fmt::{self, Write};

use crate::decompiler::BraceStyle;

/// Accumulates generated source, indenting every line to the current block depth.
///
/// Implements [`fmt::Write`], so `write!`/`writeln!` work directly; indentation is inserted
/// lazily at the first character of each non-empty line.
pub(crate) struct CodeWriter {
    out: String,
    indentation: String,
    level: usize,
    line_start: bool,
}

impl CodeWriter {
    pub(crate) fn new(indentation: &str) -> Self {
        CodeWriter {
            out: String::new(),
            indentation: indentation.to_string(),
            level: 0,
            line_start: true,
        }
    }

    pub(crate) fn indent(&mut self) {
        self.level += 1;
    }

    pub(crate) fn outdent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Terminate a header line with an opening brace and indent.
    pub(crate) fn open_block(&mut self, style: BraceStyle) -> fmt::Result {
        match style {
            BraceStyle::EndOfLine => self.write_str(" {\n")?,
            BraceStyle::NextLine => self.write_str("\n{\n")?,
        }
        self.indent();
        Ok(())
    }

    /// Outdent and write a closing brace.
    pub(crate) fn close_block(&mut self) -> fmt::Result {
        self.outdent();
        self.write_str("}\n")
    }

    pub(crate) fn blank_line(&mut self) -> fmt::Result {
        self.write_str("\n")
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

impl Write for CodeWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for piece in s.split_inclusive('\n') {
            if self.line_start && piece != "\n" {
                for _ in 0..self.level {
                    self.out.push_str(&self.indentation);
                }
            }
            self.out.push_str(piece);
            self.line_start = piece.ends_with('\n');
        }
        Ok(())
    }
}
