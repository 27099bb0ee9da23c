use std::collections::VecDeque;

use tracing::debug;

use crate::ansi::{clamp_to_width, split_and_clamp};
use crate::error::ConsoleError;

/// Size of the terminal in display columns and rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Reads the current size of the controlling terminal.
    #[cfg(feature = "detect")]
    pub fn detect() -> Option<Self> {
        crossterm::terminal::size()
            .ok()
            .map(|(cols, rows)| Self::new(cols as usize, rows as usize))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// One of the two decorative lines pinned around the progress region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
}

/// What the terminal should show, independent of where it is anchored.
///
/// Holds the progress slots, the visible tail of the log and the borders,
/// and keeps `progress_height + console_height == viewport.height`.
/// Every mutation returns the log lines that no longer fit; those have to be
/// written out exactly once, ahead of the next frame.
#[derive(Debug, Clone)]
pub struct Screen {
    viewport: Viewport,
    progress: Vec<String>,
    logs: VecDeque<String>,
    top_border: Option<String>,
    bottom_border: Option<String>,
    progress_height: usize,
    console_height: usize,
}

impl Screen {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            progress: Vec::new(),
            logs: VecDeque::new(),
            top_border: None,
            bottom_border: None,
            progress_height: 0,
            console_height: viewport.height,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn width(&self) -> usize {
        self.viewport.width
    }

    pub fn height(&self) -> usize {
        self.viewport.height
    }

    pub fn progress_height(&self) -> usize {
        self.progress_height
    }

    pub fn console_height(&self) -> usize {
        self.console_height
    }

    /// All progress slots, including the ones that do not fit on screen.
    pub fn progress(&self) -> &[String] {
        &self.progress
    }

    /// Log lines currently shown in the log region, oldest first.
    pub fn logs(&self) -> &VecDeque<String> {
        &self.logs
    }

    pub fn border(&self, edge: Edge) -> Option<&str> {
        match edge {
            Edge::Top => self.top_border.as_deref(),
            Edge::Bottom => self.bottom_border.as_deref(),
        }
    }

    pub fn border_rows(&self) -> usize {
        usize::from(self.top_border.is_some()) + usize::from(self.bottom_border.is_some())
    }

    /// Whether the progress block needs more rows than the terminal has.
    pub fn overflows(&self) -> bool {
        self.progress.len() + self.border_rows() > self.viewport.height
    }

    /// Writes slot `index`, reserving blank slots up to it when needed.
    pub fn upsert(&mut self, index: usize, data: &str) -> Vec<String> {
        let line = clamp_to_width(data, self.viewport.width).to_string();
        if index >= self.progress.len() {
            let extension = index + 1 - self.progress.len();
            debug!(index, extension, "reserving progress slots");
            self.progress.resize(index + 1, String::new());
        }
        self.progress[index] = line;
        self.reflow()
    }

    /// Drops the last progress slot and hands its row back to the log region.
    pub fn remove_slot(&mut self) -> Result<(), ConsoleError> {
        self.progress.pop().ok_or(ConsoleError::NoProgressSlots)?;
        // Growing the log region never evicts.
        self.reflow();
        Ok(())
    }

    pub fn set_border(&mut self, edge: Edge, text: Option<&str>) -> Vec<String> {
        let line = text.map(|t| clamp_to_width(t, self.viewport.width).to_string());
        match edge {
            Edge::Top => self.top_border = line,
            Edge::Bottom => self.bottom_border = line,
        }
        self.reflow()
    }

    /// Appends `text` to the log region, split and wrapped to the viewport width.
    pub fn push_log(&mut self, text: &str) -> Vec<String> {
        self.logs
            .extend(split_and_clamp(text, self.viewport.width));
        self.evict_overflow()
    }

    pub fn resize(&mut self, viewport: Viewport) -> Vec<String> {
        debug!(width = viewport.width, height = viewport.height, "viewport resized");
        self.viewport = viewport;
        let width = viewport.width;
        let clamp = |line: &mut String| {
            let end = clamp_to_width(line, width).len();
            line.truncate(end);
        };
        self.progress.iter_mut().for_each(clamp);
        self.logs.iter_mut().for_each(clamp);
        self.top_border.iter_mut().for_each(clamp);
        self.bottom_border.iter_mut().for_each(clamp);
        self.reflow()
    }

    /// The rows of the progress block, top to bottom, `progress_height` of them.
    ///
    /// When slots outnumber the available rows the highest slots are shown.
    pub fn progress_rows(&self) -> Vec<&str> {
        let slot_rows = self.progress_height.saturating_sub(self.border_rows());
        let window = &self.progress[self.progress.len() - slot_rows..];
        let mut rows = Vec::with_capacity(self.progress_height + 2);
        rows.extend(self.top_border.as_deref());
        rows.extend(window.iter().map(String::as_str));
        rows.extend(self.bottom_border.as_deref());
        rows.truncate(self.progress_height);
        rows
    }

    /// Every progress line including borders, for the final dump.
    pub fn all_progress_rows(&self) -> Vec<&str> {
        let mut rows = Vec::with_capacity(self.progress.len() + 2);
        rows.extend(self.top_border.as_deref());
        rows.extend(self.progress.iter().map(String::as_str));
        rows.extend(self.bottom_border.as_deref());
        rows
    }

    fn reflow(&mut self) -> Vec<String> {
        self.progress_height = (self.progress.len() + self.border_rows()).min(self.viewport.height);
        self.console_height = self.viewport.height - self.progress_height;
        self.evict_overflow()
    }

    fn evict_overflow(&mut self) -> Vec<String> {
        let overflow = self.logs.len().saturating_sub(self.console_height);
        if overflow > 0 {
            debug!(overflow, "evicting log lines into scrollback");
        }
        self.logs.drain(..overflow).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn screen(width: usize, height: usize) -> Screen {
        Screen::new(Viewport::new(width, height))
    }

    fn heights(s: &Screen) -> (usize, usize) {
        (s.progress_height(), s.console_height())
    }

    #[test]
    fn first_slot_takes_one_row() {
        let mut s = screen(80, 24);
        assert!(s.upsert(0, "Task A: 10%").is_empty());
        assert_eq!(heights(&s), (1, 23));
    }

    #[test]
    fn sparse_write_reserves_blank_slots() {
        let mut s = screen(80, 24);
        s.upsert(0, "Task A: 10%");
        s.push_log("build started");
        let evicted = s.upsert(2, "Task C: 0%");
        assert_eq!(heights(&s), (3, 21));
        assert_eq!(s.progress(), &["Task A: 10%", "", "Task C: 0%"]);
        // The log line still fits below the bars.
        assert!(evicted.is_empty());
        assert_eq!(s.logs().len(), 1);
    }

    #[test]
    fn extension_evicts_exactly_the_displaced_lines() {
        let mut s = screen(20, 6);
        s.upsert(0, "bar");
        for i in 0..5 {
            s.push_log(&format!("log {i}"));
        }
        assert_eq!(s.logs().len(), 5);

        let evicted = s.upsert(3, "bar 3");
        assert_eq!(evicted, vec!["log 0", "log 1", "log 2"]);
        assert_eq!(heights(&s), (4, 2));
        assert_eq!(s.logs(), &["log 3", "log 4"]);
    }

    #[test]
    fn updating_existing_slot_keeps_heights() {
        let mut s = screen(80, 10);
        s.upsert(1, "b");
        s.upsert(0, "a");
        assert_eq!(heights(&s), (2, 8));
        assert_eq!(s.progress(), &["a", "b"]);
    }

    #[test]
    fn progress_lines_are_clamped() {
        let mut s = screen(5, 10);
        s.upsert(0, "0123456789");
        assert_eq!(s.progress()[0], "01234");
    }

    #[test]
    fn log_overflow_evicts_oldest() {
        let mut s = screen(10, 3);
        s.upsert(0, "bar");
        assert!(s.push_log("a\nb").is_empty());
        assert_eq!(s.push_log("c"), vec!["a"]);
        assert_eq!(s.logs(), &["b", "c"]);
    }

    #[test]
    fn long_log_lines_wrap() {
        let mut s = screen(4, 10);
        s.push_log("abcdefgh");
        assert_eq!(s.logs(), &["abcd", "efgh"]);
    }

    #[test]
    fn border_set_then_clear_restores_heights() {
        let mut s = screen(80, 24);
        s.upsert(4, "e");
        let before = heights(&s);
        s.set_border(Edge::Top, Some("== top =="));
        assert_eq!(heights(&s), (before.0 + 1, before.1 - 1));
        s.set_border(Edge::Top, None);
        assert_eq!(heights(&s), before);
    }

    #[test]
    fn border_pair_is_neutral_when_full() {
        let mut s = screen(80, 3);
        s.upsert(3, "d");
        let before = heights(&s);
        s.set_border(Edge::Bottom, Some("--"));
        s.set_border(Edge::Bottom, None);
        assert_eq!(heights(&s), before);
    }

    #[test]
    fn replacing_a_border_does_not_grow_region() {
        let mut s = screen(80, 24);
        s.set_border(Edge::Top, Some("a"));
        s.set_border(Edge::Top, Some("b"));
        assert_eq!(heights(&s), (1, 23));
        assert_eq!(s.border(Edge::Top), Some("b"));
    }

    #[test]
    fn remove_slot_returns_row_to_logs() {
        let mut s = screen(80, 24);
        s.upsert(1, "b");
        s.remove_slot().unwrap();
        assert_eq!(heights(&s), (1, 23));
        s.remove_slot().unwrap();
        assert_eq!(heights(&s), (0, 24));
        assert_eq!(s.remove_slot(), Err(ConsoleError::NoProgressSlots));
        assert_eq!(heights(&s), (0, 24));
    }

    #[test]
    fn progress_rows_show_newest_slots_when_overflowing() {
        let mut s = screen(80, 4);
        s.set_border(Edge::Top, Some("top"));
        for i in 0..6 {
            s.upsert(i, &format!("slot {i}"));
        }
        assert!(s.overflows());
        assert_eq!(s.progress_rows(), vec!["top", "slot 3", "slot 4", "slot 5"]);
        assert_eq!(s.all_progress_rows().len(), 7);
    }

    #[test]
    fn progress_rows_drop_bottom_border_before_top() {
        let mut s = screen(80, 1);
        s.set_border(Edge::Top, Some("top"));
        s.set_border(Edge::Bottom, Some("bottom"));
        assert_eq!(s.progress_rows(), vec!["top"]);
    }

    #[test]
    fn resize_reclamps_and_evicts() {
        let mut s = screen(10, 6);
        s.upsert(0, "0123456789");
        s.push_log("one\ntwo\nthree\nfour");
        let evicted = s.resize(Viewport::new(4, 3));
        assert_eq!(evicted, vec!["one", "two"]);
        assert_eq!(s.progress()[0], "0123");
        assert_eq!(s.logs(), &["thre", "four"]);
        assert_eq!(heights(&s), (1, 2));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Upsert(usize),
        Border(bool, bool),
        Remove,
        Log(usize),
        Resize(usize, usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..40).prop_map(Op::Upsert),
            (any::<bool>(), any::<bool>()).prop_map(|(top, set)| Op::Border(top, set)),
            Just(Op::Remove),
            (1usize..5).prop_map(Op::Log),
            (1usize..120, 0usize..50).prop_map(|(w, h)| Op::Resize(w, h)),
        ]
    }

    proptest! {
        #[test]
        fn heights_always_sum_to_viewport(ops in proptest::collection::vec(op(), 0..60)) {
            let mut s = screen(80, 24);
            for op in ops {
                match op {
                    Op::Upsert(i) => { s.upsert(i, "bar"); }
                    Op::Border(top, set) => {
                        let edge = if top { Edge::Top } else { Edge::Bottom };
                        s.set_border(edge, set.then_some("border"));
                    }
                    Op::Remove => { let _ = s.remove_slot(); }
                    Op::Log(n) => { s.push_log(&vec!["line"; n].join("\n")); }
                    Op::Resize(w, h) => { s.resize(Viewport::new(w, h)); }
                }
                prop_assert_eq!(s.progress_height() + s.console_height(), s.height());
                prop_assert!(s.logs().len() <= s.console_height());
                prop_assert_eq!(s.progress_rows().len(), s.progress_height());
            }
        }
    }
}
