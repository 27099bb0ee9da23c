use std::io::Write;

use crate::ansi::{self, EraseMode};

/// Bytes for one reconciliation of the terminal with the console state.
///
/// Compositors append to a `Frame`; the console then hands the whole frame
/// to the output stream in a single write.
///
/// ```rust,ignore
/// let mut frame = Frame::new();
/// frame.cursor_to(0, 0);
/// frame.line("Task A: 10%");
/// out.write_all(frame.as_bytes())?;
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Frame {
    buf: Vec<u8>,
    lines: usize,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the cursor to a 0-indexed row and column.
    pub fn cursor_to(&mut self, row: usize, col: usize) {
        self.push(&ansi::cursor_position(row, Some(col)));
    }

    /// Writes `text` followed by erase-to-end-of-line, so that a longer
    /// line painted there earlier leaves no trailing characters.
    pub fn line(&mut self, text: &str) {
        self.push(text);
        self.push(ansi::erase_line(EraseMode::ToEnd));
    }

    /// Moves to the next row, scrolling the terminal when on the last one.
    pub fn newline(&mut self) {
        self.push("\n");
    }

    /// Writes raw text or control sequences.
    pub fn push(&mut self, s: &str) {
        self.lines += s.bytes().filter(|&b| b == b'\n').count();
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Number of newlines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Write for Frame {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.lines += buf.iter().filter(|&&b| b == b'\n').count();
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
