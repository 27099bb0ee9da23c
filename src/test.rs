use std::io::Write;

use crate::compositor::Anchor;
use crate::console::{ConsoleOptions, VirtualConsole};
use crate::screen::Viewport;
use crate::tasks::{AddTask, MultiProgress, ProgressOptions, UpdateTask};

/// A small terminal emulator: a fixed grid of rows with a cursor, plus the
/// lines that scrolled off the top.
///
/// Understands the sequences the console emits (CUP, EL, ED), ignores SGR
/// and private modes, and treats `\n` as CR+LF the way a tty does.
pub struct VirtualTerm {
    rows: Vec<Vec<char>>,
    scrollback: Vec<String>,
    row: usize,
    col: usize,
    frames: usize,
    buf: Vec<u8>,
}

impl VirtualTerm {
    pub fn new(height: usize) -> Self {
        Self {
            rows: vec![Vec::new(); height.max(1)],
            scrollback: Vec::new(),
            row: 0,
            col: 0,
            frames: 0,
            buf: Vec::new(),
        }
    }

    /// Visible rows, trailing blanks trimmed.
    pub fn screen(&self) -> Vec<String> {
        self.rows.iter().map(|r| trimmed(r)).collect()
    }

    /// Lines that scrolled off the top, oldest first.
    pub fn scrollback(&self) -> &[String] {
        &self.scrollback
    }

    /// Number of flushed writes.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// How often `line` appears in the scrollback and on screen together.
    pub fn count(&self, line: &str) -> usize {
        self.scrollback
            .iter()
            .cloned()
            .chain(self.screen())
            .filter(|l| l == line)
            .count()
    }

    fn put(&mut self, c: char) {
        let row = &mut self.rows[self.row];
        if row.len() <= self.col {
            row.resize(self.col + 1, ' ');
        }
        row[self.col] = c;
        self.col += 1;
    }

    fn line_feed(&mut self) {
        self.col = 0;
        if self.row + 1 < self.rows.len() {
            self.row += 1;
        } else {
            let top = self.rows.remove(0);
            self.scrollback.push(trimmed(&top));
            self.rows.push(Vec::new());
        }
    }

    fn csi(&mut self, params: &str, action: char) {
        let mode = params.parse::<usize>().unwrap_or(0);
        match action {
            'H' => {
                let mut parts = params.split(';');
                let mut next = || {
                    parts
                        .next()
                        .and_then(|p| p.parse::<usize>().ok())
                        .unwrap_or(1)
                };
                self.row = (next() - 1).min(self.rows.len() - 1);
                self.col = next() - 1;
            }
            'K' => {
                let col = self.col;
                let row = &mut self.rows[self.row];
                match mode {
                    0 => row.truncate(col),
                    1 => row.iter_mut().take(col + 1).for_each(|c| *c = ' '),
                    _ => row.clear(),
                }
            }
            'J' => match mode {
                0 => {
                    self.rows[self.row].truncate(self.col);
                    self.rows[self.row + 1..].iter_mut().for_each(Vec::clear);
                }
                1 => self.rows[..self.row].iter_mut().for_each(Vec::clear),
                2 => self.rows.iter_mut().for_each(Vec::clear),
                _ => self.scrollback.clear(),
            },
            'm' | 'h' | 'l' => {}
            other => panic!("unexpected control sequence {params}{other}"),
        }
    }

    fn process(&mut self, s: &str) {
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            match c {
                '\x1b' => {
                    assert_eq!(chars.next(), Some('['), "only CSI sequences are expected");
                    let mut params = String::new();
                    for c in chars.by_ref() {
                        if c.is_ascii_alphabetic() {
                            self.csi(params.trim_start_matches('?'), c);
                            break;
                        }
                        params.push(c);
                    }
                }
                '\n' => self.line_feed(),
                '\r' => self.col = 0,
                c => self.put(c),
            }
        }
    }
}

fn trimmed(row: &[char]) -> String {
    row.iter().collect::<String>().trim_end().to_string()
}

impl Write for VirtualTerm {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.buf.is_empty() {
            let s = String::from_utf8(std::mem::take(&mut self.buf)).unwrap();
            self.frames += 1;
            self.process(&s);
        }
        Ok(())
    }
}

fn console(width: usize, height: usize, anchor: Anchor) -> VirtualConsole<VirtualTerm> {
    let options = ConsoleOptions::new()
        .anchor(anchor)
        .viewport(Viewport::new(width, height));
    VirtualConsole::new(VirtualTerm::new(height), options)
}

fn screen(c: &VirtualConsole<VirtualTerm>) -> Vec<String> {
    c.get_ref().screen()
}

#[test]
fn preamble_clears_the_screen() {
    let mut term = VirtualTerm::new(3);
    term.write_all(b"old prompt").unwrap();
    term.flush().unwrap();
    let c = VirtualConsole::new(term, ConsoleOptions::new().viewport(Viewport::new(20, 3)));
    assert_eq!(screen(&c), vec!["", "", ""]);
    assert_eq!(c.get_ref().scrollback(), &["old prompt"]);
}

#[test]
fn sparse_slot_leaves_log_line_in_place() {
    let mut c = console(80, 24, Anchor::Top);
    c.upsert_progress(0, "Task A: 10%");
    c.log("build started");
    c.upsert_progress(2, "Task C: 0%");

    assert_eq!((c.progress_height(), c.console_height()), (3, 21));
    let rows = screen(&c);
    assert_eq!(&rows[..4], &["Task A: 10%", "", "Task C: 0%", "build started"]);
    assert!(rows[4..].iter().all(String::is_empty));
    assert_eq!(c.get_ref().count("build started"), 1);
}

#[test]
fn overflowing_logs_reach_scrollback_once() {
    let mut c = console(20, 4, Anchor::Top);
    c.upsert_progress(0, "bar");
    for i in 0..10 {
        c.log(format!("log {i}"));
    }
    assert_eq!(screen(&c), vec!["bar", "log 7", "log 8", "log 9"]);
    for i in 0..10 {
        assert_eq!(c.get_ref().count(&format!("log {i}")), 1, "log {i}");
    }
    let history: Vec<&String> = c.get_ref().scrollback().iter().filter(|l| !l.is_empty()).collect();
    assert_eq!(history.len(), 7);
    assert_eq!(history[0], "log 0");
}

#[test]
fn extension_pushes_displaced_logs_into_scrollback() {
    let mut c = console(20, 4, Anchor::Top);
    c.upsert_progress(0, "bar");
    c.log("a\nb\nc");
    c.upsert_progress(2, "bar 2");
    assert_eq!(screen(&c), vec!["bar", "", "bar 2", "c"]);
    assert_eq!(c.get_ref().count("a"), 1);
    assert_eq!(c.get_ref().count("b"), 1);
}

#[test]
fn bottom_anchor_keeps_bars_on_last_rows() {
    let mut c = console(20, 4, Anchor::Bottom);
    c.upsert_progress(0, "bar");
    c.log("a");
    c.log("b");
    assert_eq!(screen(&c), vec!["a", "b", "", "bar"]);
    c.log("c\nd");
    assert_eq!(screen(&c), vec!["b", "c", "d", "bar"]);
    assert_eq!(c.get_ref().count("a"), 1);
}

#[test]
fn borders_frame_the_slots() {
    let mut c = console(20, 5, Anchor::Top);
    c.set_top_border(Some("== top =="));
    c.set_bottom_border(Some("-- end --"));
    c.upsert_progress(0, "bar");
    c.log("log");
    assert_eq!(screen(&c), vec!["== top ==", "bar", "-- end --", "log", ""]);
    c.set_top_border(None);
    assert_eq!(screen(&c), vec!["bar", "-- end --", "log", "", ""]);
}

#[test]
fn done_with_too_many_slots_prints_all_once() {
    let mut c = console(20, 5, Anchor::Top);
    for i in 0..10 {
        c.upsert_progress(i, &format!("slot {i}"));
    }
    // Only the newest slots fit.
    assert_eq!(screen(&c), (5..10).map(|i| format!("slot {i}")).collect::<Vec<_>>());

    let frames = c.get_ref().frames();
    c.done();
    assert_eq!(c.get_ref().frames(), frames + 1);
    for i in 0..10 {
        assert_eq!(c.get_ref().count(&format!("slot {i}")), 1, "slot {i}");
    }
}

#[test]
fn bottom_done_with_too_many_slots_prints_all_once() {
    let mut c = console(20, 5, Anchor::Bottom);
    for i in 0..10 {
        c.upsert_progress(i, &format!("slot {i}"));
    }
    assert_eq!(screen(&c), (5..10).map(|i| format!("slot {i}")).collect::<Vec<_>>());

    let frames = c.get_ref().frames();
    c.done();
    assert_eq!(c.get_ref().frames(), frames + 1);
    for i in 0..10 {
        assert_eq!(c.get_ref().count(&format!("slot {i}")), 1, "slot {i}");
    }
    assert_eq!(&screen(&c)[3..], &["slot 9", ""]);
}

#[test]
fn queued_logs_survive_the_overflow_dump() {
    for anchor in [Anchor::Top, Anchor::Bottom] {
        let mut c = console(20, 3, anchor);
        for i in 0..5 {
            c.upsert_progress(i, &format!("slot {i}"));
        }
        c.log_handle().log("last words");
        c.done();

        let term = c.get_ref();
        assert_eq!(term.count("last words"), 1, "{anchor:?}");
        for i in 0..5 {
            assert_eq!(term.count(&format!("slot {i}")), 1, "{anchor:?} slot {i}");
        }
        let position = |line: &str| term.scrollback().iter().position(|l| l == line);
        assert!(position("last words") < position("slot 0"), "{anchor:?}");
        assert_eq!(screen(&c), vec!["slot 3", "slot 4", ""]);
    }
}

#[test]
fn bottom_done_parks_cursor_below_the_bars() {
    let mut c = console(20, 6, Anchor::Bottom);
    c.upsert_progress(0, "bar");
    c.log("log");
    c.done();
    assert_eq!(screen(&c), vec!["", "", "", "", "bar", ""]);
    assert_eq!(c.get_ref().count("log"), 1);

    c.log("after");
    assert_eq!(&screen(&c)[3..5], &["bar", "after"]);
}

#[test]
fn done_parks_cursor_below_content() {
    let mut c = console(20, 6, Anchor::Top);
    c.upsert_progress(0, "bar");
    c.log("log");
    c.done();
    assert_eq!(screen(&c), vec!["bar", "log", "", "", "", ""]);
}

#[test]
fn shell_output_after_done_follows_the_content() {
    let mut c = console(20, 6, Anchor::Top);
    c.upsert_progress(0, "bar");
    c.log("log");
    c.done();
    c.log("after");
    assert_eq!(&screen(&c)[..3], &["bar", "log", "after"]);
}

#[test]
fn handle_messages_join_the_log_region() {
    let mut c = console(20, 4, Anchor::Top);
    let handle = c.log_handle();
    c.upsert_progress(0, "bar");
    std::thread::spawn(move || handle.log("from worker"))
        .join()
        .unwrap();
    c.flush_logs();
    assert_eq!(&screen(&c)[..2], &["bar", "from worker"]);
}

#[test]
fn plain_console_prints_logs_and_final_bars() {
    let options = ConsoleOptions::new().interactive(false);
    let mut c = VirtualConsole::new(VirtualTerm::new(10), options);
    c.upsert_progress(0, "bar 0");
    c.log("one");
    c.upsert_progress(0, "bar 1");
    c.log("two");
    c.done();
    assert_eq!(&screen(&c)[..3], &["one", "two", "bar 1"]);
}

#[test]
fn multi_progress_end_to_end() {
    let options = ProgressOptions::new()
        .progress_width(10)
        .init_message("$ build")
        .console(ConsoleOptions::new().viewport(Viewport::new(60, 8)));
    let mut p = MultiProgress::new(VirtualTerm::new(8), options);
    p.add_task("compile", AddTask::percentage()).unwrap();
    p.add_task("fetch", AddTask::indefinite().message("crates")).unwrap();
    p.update_task("compile", UpdateTask::new().percentage(0.5).message("lib.rs"))
        .unwrap();
    let log = p.log_handle();
    log.log("warning: unused");
    p.tick();
    p.done("fetch", Some("fetched")).unwrap();

    let rows = p.console().get_ref().screen();
    assert_eq!(rows[0], "compile: █████       50% | lib.rs");
    assert_eq!(rows[1], "  fetch: ██████████ fetched");
    assert_eq!(rows[2], "$ build");
    assert_eq!(rows[3], "warning: unused");

    p.close();
    assert!(!log.is_attached());
}
