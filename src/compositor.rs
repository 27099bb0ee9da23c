//! Placement of the progress and log regions on the terminal.
//!
//! A [`Compositor`] owns a [`Screen`] and knows where its rows go. The
//! console picks one implementation at construction and keeps it behind a
//! `Box<dyn Compositor>` for its whole lifetime.

use crate::ansi::{self, EraseDisplay};
use crate::error::ConsoleError;
use crate::frame::Frame;
use crate::screen::{Edge, Screen, Viewport};

/// Where the progress region is pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    /// Progress rows first, log lines below them.
    #[default]
    Top,
    /// Log lines scroll at the top, progress rows sit on the last rows.
    Bottom,
}

/// Reconciles the terminal with a [`Screen`].
///
/// State changes return the log lines they pushed out of the log region;
/// the console collects them and passes them to the next [`paint`], which
/// must write them ahead of the frame so they land in the scrollback.
///
/// [`paint`]: Compositor::paint
pub trait Compositor: Send {
    fn anchor(&self) -> Anchor;

    fn screen(&self) -> &Screen;

    fn screen_mut(&mut self) -> &mut Screen;

    /// Writes `evicted` followed by the full current frame.
    fn paint(&self, evicted: &[String], frame: &mut Frame);

    /// Final placement at teardown. Called once.
    fn finish(&mut self, evicted: &[String], frame: &mut Frame);

    fn upsert_progress(&mut self, index: usize, data: &str) -> Vec<String> {
        self.screen_mut().upsert(index, data)
    }

    fn remove_progress_slot(&mut self) -> Result<(), ConsoleError> {
        self.screen_mut().remove_slot()
    }

    fn set_border(&mut self, edge: Edge, text: Option<&str>) -> Vec<String> {
        self.screen_mut().set_border(edge, text)
    }

    fn log(&mut self, text: &str) -> Vec<String> {
        self.screen_mut().push_log(text)
    }

    fn resize(&mut self, viewport: Viewport) -> Vec<String> {
        self.screen_mut().resize(viewport)
    }

    fn refresh(&self, frame: &mut Frame) {
        self.paint(&[], frame);
    }

    fn done(&mut self, evicted: &[String], frame: &mut Frame) {
        self.finish(evicted, frame);
    }
}

/// Writes the evicted lines from row 0, then `rows`, one per terminal row.
///
/// The frame spans exactly `height + evicted.len()` rows and ends without a
/// newline, so the terminal scrolls by exactly the evicted lines.
fn paint_rows(evicted: &[String], rows: &[&str], frame: &mut Frame) {
    frame.cursor_to(0, 0);
    for line in evicted {
        frame.line(line);
        frame.newline();
    }
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            frame.newline();
        }
        frame.line(row);
    }
}

/// Prints every progress line once when they cannot all be shown.
///
/// The log region is empty in that case, so the screen only holds progress
/// rows. It is cleared and `evicted` is written first, keeping log lines
/// ahead of the progress lines in the scrollback.
fn dump_progress(screen: &Screen, evicted: &[String], frame: &mut Frame) {
    frame.cursor_to(0, 0);
    frame.push(ansi::erase_display(EraseDisplay::ToEnd));
    for line in evicted {
        frame.line(line);
        frame.newline();
    }
    for row in screen.all_progress_rows() {
        frame.line(row);
        frame.newline();
    }
}

fn restore_terminal(frame: &mut Frame) {
    frame.push(ansi::RESET_ATTRIBUTES);
    frame.push(ansi::SHOW_CURSOR);
}

/// Moves the cursor to `row`, scrolling one line when it is past the screen.
fn park_cursor(screen: &Screen, row: usize, frame: &mut Frame) {
    if screen.height() == 0 {
        return;
    }
    if row < screen.height() {
        frame.cursor_to(row, 0);
        frame.push(ansi::erase_display(EraseDisplay::ToEnd));
    } else {
        frame.cursor_to(screen.height() - 1, 0);
        frame.newline();
    }
}

/// Progress region on rows `[0, progress_height)`, logs right below.
#[derive(Debug, Clone)]
pub struct TopAnchored {
    screen: Screen,
}

impl TopAnchored {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            screen: Screen::new(viewport),
        }
    }

    fn rows(&self) -> Vec<&str> {
        let s = &self.screen;
        let mut rows = s.progress_rows();
        rows.extend(s.logs().iter().map(String::as_str));
        rows.resize(s.height(), "");
        rows
    }
}

impl Compositor for TopAnchored {
    fn anchor(&self) -> Anchor {
        Anchor::Top
    }

    fn screen(&self) -> &Screen {
        &self.screen
    }

    fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    fn paint(&self, evicted: &[String], frame: &mut Frame) {
        paint_rows(evicted, &self.rows(), frame);
    }

    fn finish(&mut self, evicted: &[String], frame: &mut Frame) {
        if self.screen.overflows() {
            dump_progress(&self.screen, evicted, frame);
        } else {
            self.paint(evicted, frame);
            let end = self.screen.progress_height() + self.screen.logs().len();
            park_cursor(&self.screen, end, frame);
        }
        restore_terminal(frame);
    }
}

/// Logs scroll from row 0, progress region on the last `progress_height` rows.
#[derive(Debug, Clone)]
pub struct BottomAnchored {
    screen: Screen,
}

impl BottomAnchored {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            screen: Screen::new(viewport),
        }
    }

    fn rows(&self) -> Vec<&str> {
        let s = &self.screen;
        let mut rows: Vec<&str> = s.logs().iter().map(String::as_str).collect();
        rows.resize(s.console_height(), "");
        rows.extend(s.progress_rows());
        rows
    }
}

impl Compositor for BottomAnchored {
    fn anchor(&self) -> Anchor {
        Anchor::Bottom
    }

    fn screen(&self) -> &Screen {
        &self.screen
    }

    fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    fn paint(&self, evicted: &[String], frame: &mut Frame) {
        paint_rows(evicted, &self.rows(), frame);
    }

    fn finish(&mut self, evicted: &[String], frame: &mut Frame) {
        if self.screen.overflows() {
            dump_progress(&self.screen, evicted, frame);
        } else {
            self.paint(evicted, frame);
            park_cursor(&self.screen, self.screen.height(), frame);
        }
        restore_terminal(frame);
    }
}

/// Fallback for output that is not an interactive terminal.
///
/// Log lines are printed through as they arrive, progress updates are only
/// recorded, and the final progress lines are printed once at teardown.
#[derive(Debug, Clone)]
pub struct Plain {
    screen: Screen,
    anchor: Anchor,
}

impl Plain {
    pub fn new(viewport: Viewport, anchor: Anchor) -> Self {
        Self {
            screen: Screen::new(viewport),
            anchor,
        }
    }
}

impl Compositor for Plain {
    fn anchor(&self) -> Anchor {
        self.anchor
    }

    fn screen(&self) -> &Screen {
        &self.screen
    }

    fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    fn log(&mut self, text: &str) -> Vec<String> {
        text.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect()
    }

    fn paint(&self, evicted: &[String], frame: &mut Frame) {
        for line in evicted {
            frame.push(line);
            frame.newline();
        }
    }

    fn finish(&mut self, evicted: &[String], frame: &mut Frame) {
        self.paint(evicted, frame);
        for row in self.screen.all_progress_rows() {
            frame.push(row);
            frame.newline();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(frame: &Frame) -> String {
        String::from_utf8(frame.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn top_rows_put_progress_first() {
        let mut c = TopAnchored::new(Viewport::new(20, 5));
        c.upsert_progress(0, "bar");
        c.log("hello");
        assert_eq!(c.rows(), vec!["bar", "hello", "", "", ""]);
    }

    #[test]
    fn bottom_rows_put_progress_last() {
        let mut c = BottomAnchored::new(Viewport::new(20, 5));
        c.upsert_progress(1, "bar 1");
        c.log("hello");
        assert_eq!(c.rows(), vec!["hello", "", "", "", "bar 1"]);
    }

    #[test]
    fn frame_starts_at_origin_and_erases_every_row() {
        let mut c = TopAnchored::new(Viewport::new(20, 3));
        c.upsert_progress(0, "bar");
        let mut frame = Frame::new();
        c.refresh(&mut frame);
        assert_eq!(
            text(&frame),
            "\x1b[1;1Hbar\x1b[0K\n\x1b[0K\n\x1b[0K",
        );
        assert_eq!(frame.lines(), 2);
    }

    #[test]
    fn evicted_lines_precede_the_frame() {
        let mut c = BottomAnchored::new(Viewport::new(20, 2));
        c.upsert_progress(0, "bar");
        c.log("old");
        let evicted = c.log("new");
        assert_eq!(evicted, vec!["old"]);
        let mut frame = Frame::new();
        c.paint(&evicted, &mut frame);
        let out = text(&frame);
        assert!(out.starts_with("\x1b[1;1Hold\x1b[0K\n"));
        assert!(out.find("old").unwrap() < out.find("bar").unwrap());
        // One row scrolled away, one frame of two rows.
        assert_eq!(frame.lines(), 2);
    }

    #[test]
    fn top_finish_parks_cursor_below_content() {
        let mut c = TopAnchored::new(Viewport::new(20, 10));
        c.upsert_progress(0, "bar");
        c.log("log");
        let mut frame = Frame::new();
        c.done(&[], &mut frame);
        let out = text(&frame);
        assert!(out.contains("\x1b[3;1H\x1b[0J"));
        assert!(out.ends_with("\x1b[0m\x1b[?25h"));
    }

    #[test]
    fn finish_dumps_everything_on_overflow() {
        let mut c = BottomAnchored::new(Viewport::new(20, 3));
        for i in 0..5 {
            c.upsert_progress(i, &format!("task {i}"));
        }
        let mut frame = Frame::new();
        c.done(&[], &mut frame);
        let out = text(&frame);
        for i in 0..5 {
            assert!(out.contains(&format!("task {i}\x1b[0K\n")));
        }
    }

    #[test]
    fn overflow_finish_writes_evicted_after_the_erase() {
        let mut c = TopAnchored::new(Viewport::new(20, 2));
        for i in 0..3 {
            c.upsert_progress(i, &format!("task {i}"));
        }
        let evicted = c.log("late");
        assert_eq!(evicted, vec!["late"]);
        let mut frame = Frame::new();
        c.done(&evicted, &mut frame);
        let out = text(&frame);
        assert!(out.starts_with("\x1b[1;1H\x1b[0Jlate\x1b[0K\ntask 0"));
        assert_eq!(out.matches("late").count(), 1);
    }

    #[test]
    fn plain_prints_logs_through_without_escapes() {
        let mut c = Plain::new(Viewport::new(4, 2), Anchor::Top);
        c.upsert_progress(0, "progress");
        let evicted = c.log("a long line\nsecond");
        let mut frame = Frame::new();
        c.paint(&evicted, &mut frame);
        assert_eq!(text(&frame), "a long line\nsecond\n");

        let mut frame = Frame::new();
        c.done(&[], &mut frame);
        assert_eq!(text(&frame), "prog\n");
    }
}
