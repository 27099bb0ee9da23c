//! ANSI/VT control sequences and display-width aware string clamping.
//!
//! Everything here is pure. Widths are measured per grapheme cluster with
//! [`unicode_width`], and escape sequences (SGR colors, OSC hyperlinks, ...)
//! are measured as zero columns and are never split.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const ESC: char = '\x1b';
const CSI: &str = "\x1b[";

/// Resets all SGR attributes (colors, bold, ...).
pub const RESET_ATTRIBUTES: &str = "\x1b[0m";

/// Makes the cursor visible again.
pub const SHOW_CURSOR: &str = "\x1b[?25h";

/// Moves the cursor to an absolute position (CUP).
///
/// `row` and `col` are 0-indexed. Without a column the parameter is left
/// empty and the terminal falls back to its default, column 1.
///
/// ```
/// use tally_bars::ansi::cursor_position;
/// assert_eq!(cursor_position(0, Some(0)), "\x1b[1;1H");
/// assert_eq!(cursor_position(4, None), "\x1b[5;H");
/// ```
pub fn cursor_position(row: usize, col: Option<usize>) -> String {
    match col {
        Some(col) => format!("{CSI}{};{}H", row + 1, col + 1),
        None => format!("{CSI}{};H", row + 1),
    }
}

/// Which part of the current line [`erase_line`] clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EraseMode {
    /// From the cursor to the end of the line.
    #[default]
    ToEnd,
    /// From the start of the line up to the cursor.
    ToStart,
    /// The whole line.
    All,
}

/// Which part of the screen [`erase_display`] clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EraseDisplay {
    /// From the cursor to the end of the screen.
    #[default]
    ToEnd,
    /// From the start of the screen up to the cursor.
    ToStart,
    /// The whole screen.
    All,
    /// The whole screen and the scrollback buffer.
    AllAndScrollback,
}

/// Erases part of the current line (EL). The cursor does not move.
pub fn erase_line(mode: EraseMode) -> &'static str {
    match mode {
        EraseMode::ToEnd => "\x1b[0K",
        EraseMode::ToStart => "\x1b[1K",
        EraseMode::All => "\x1b[2K",
    }
}

/// Erases part of the screen (ED). The cursor does not move.
pub fn erase_display(mode: EraseDisplay) -> &'static str {
    match mode {
        EraseDisplay::ToEnd => "\x1b[0J",
        EraseDisplay::ToStart => "\x1b[1J",
        EraseDisplay::All => "\x1b[2J",
        EraseDisplay::AllAndScrollback => "\x1b[3J",
    }
}

/// A run of text that is either one escape sequence or one grapheme cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment<'a> {
    text: &'a str,
    width: usize,
    escape: bool,
}

struct Segments<'a> {
    rest: &'a str,
}

fn segments(s: &str) -> Segments<'_> {
    Segments { rest: s }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let (text, escape) = if self.rest.starts_with(ESC) {
            (&self.rest[..escape_len(self.rest)], true)
        } else {
            let grapheme = self.rest.graphemes(true).next()?;
            (grapheme, false)
        };
        self.rest = &self.rest[text.len()..];
        let width = if escape { 0 } else { text.width() };
        Some(Segment {
            text,
            width,
            escape,
        })
    }
}

/// Byte length of the escape sequence at the start of `s` (which begins with ESC).
fn escape_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    match bytes.get(1) {
        // CSI: parameters and intermediates, then one final byte in 0x40..=0x7e.
        Some(b'[') => bytes[2..]
            .iter()
            .position(|b| (0x40..=0x7e).contains(b))
            .map_or(bytes.len(), |end| end + 3),
        // OSC: terminated by BEL or by ST (ESC \).
        Some(b']') => {
            let mut i = 2;
            while i < bytes.len() {
                match bytes[i] {
                    0x07 => return i + 1,
                    0x1b if bytes.get(i + 1) == Some(&b'\\') => return i + 2,
                    _ => i += 1,
                }
            }
            bytes.len()
        }
        // Two-character sequences (ESC 7, ESC c, ...). Stay on a char boundary.
        Some(_) => 1 + s[1..].chars().next().map_or(0, char::len_utf8),
        None => 1,
    }
}

/// Rendered width of `s` in terminal columns.
///
/// Escape sequences count zero, wide graphemes count two.
///
/// ```
/// use tally_bars::ansi::display_width;
/// assert_eq!(display_width("abc"), 3);
/// assert_eq!(display_width("\x1b[31mred\x1b[0m"), 3);
/// assert_eq!(display_width("日本"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    segments(s).map(|seg| seg.width).sum()
}

/// Returns the longest prefix of `text` that fits in `width` columns.
///
/// Never splits a grapheme cluster or an escape sequence. Escape sequences
/// directly at the cut point are kept, so a trailing color reset survives.
///
/// ```
/// use tally_bars::ansi::clamp_to_width;
/// assert_eq!(clamp_to_width("hello world", 5), "hello");
/// assert_eq!(clamp_to_width("日本語", 5), "日本");
/// assert_eq!(clamp_to_width("fits", 10), "fits");
/// ```
pub fn clamp_to_width(text: &str, width: usize) -> &str {
    let mut used = 0;
    let mut end = 0;
    for seg in segments(text) {
        if !seg.escape {
            if used + seg.width > width {
                break;
            }
            used += seg.width;
        }
        end += seg.text.len();
    }
    &text[..end]
}

/// Splits `text` on newlines and hard-wraps every line to `width` columns.
///
/// An empty input line produces one empty output line. A grapheme that is
/// wider than `width` on its own can never be shown and is dropped.
///
/// ```
/// use tally_bars::ansi::split_and_clamp;
/// assert_eq!(split_and_clamp("abcdef\ngh", 4), vec!["abcd", "ef", "gh"]);
/// ```
pub fn split_and_clamp(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let mut chunk = String::new();
        let mut used = 0;
        for seg in segments(line) {
            if seg.escape {
                chunk.push_str(seg.text);
                continue;
            }
            if seg.width > width {
                continue;
            }
            if used + seg.width > width {
                lines.push(std::mem::take(&mut chunk));
                used = 0;
            }
            chunk.push_str(seg.text);
            used += seg.width;
        }
        lines.push(chunk);
    }
    lines
}

/// Pads `text` on the left with spaces up to `width` columns.
pub fn pad_start(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(display_width(text));
    format!("{}{}", " ".repeat(pad), text)
}

/// Pads `text` on the right with spaces up to `width` columns.
pub fn pad_end(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(display_width(text));
    format!("{}{}", text, " ".repeat(pad))
}

/// Repeats the graphemes of `pattern` until exactly `width` columns are filled.
///
/// A wide grapheme that would overflow the last column is replaced by a space.
pub fn repeat_to_width(pattern: &str, width: usize) -> String {
    let graphemes: Vec<(&str, usize)> = segments(pattern)
        .filter(|seg| !seg.escape && seg.width > 0)
        .map(|seg| (seg.text, seg.width))
        .collect();
    let mut out = String::new();
    if graphemes.is_empty() {
        return " ".repeat(width);
    }
    let mut used = 0;
    for (g, w) in graphemes.iter().cycle() {
        if used + w > width {
            break;
        }
        out.push_str(g);
        used += w;
    }
    out.push_str(&" ".repeat(width - used));
    out
}
