use std::fmt::Display;
use std::io::{IsTerminal, Write};

use tracing::{debug, trace, warn};

use crate::ansi::{self, EraseDisplay};
use crate::compositor::{Anchor, BottomAnchored, Compositor, Plain, TopAnchored};
use crate::error::ConsoleError;
use crate::frame::Frame;
use crate::log::{LogHandle, LogSink};
use crate::screen::{Edge, Screen, Viewport};

/// Construction options for a [`VirtualConsole`].
///
/// ```rust,ignore
/// let options = ConsoleOptions::new()
///     .anchor(Anchor::Bottom)
///     .viewport(Viewport::new(120, 40));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleOptions {
    anchor: Anchor,
    viewport: Viewport,
    interactive: bool,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            anchor: Anchor::Top,
            viewport: Viewport::default(),
            interactive: true,
        }
    }
}

impl ConsoleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options matching the process's stdout: its size when it is a
    /// terminal, and plain print-through when it is not.
    pub fn for_stdout() -> Self {
        #[cfg(feature = "detect")]
        let viewport = Viewport::detect().unwrap_or_default();
        #[cfg(not(feature = "detect"))]
        let viewport = Viewport::default();
        Self {
            anchor: Anchor::Top,
            viewport,
            interactive: std::io::stdout().is_terminal(),
        }
    }

    /// Where the progress region is pinned.
    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Initial terminal size.
    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Whether the output is an interactive terminal. When `false` the console
    /// prints log lines through and emits no control sequences.
    pub fn interactive(mut self, yes: bool) -> Self {
        self.interactive = yes;
        self
    }
}

/// Terminal compositor keeping a progress region and a log region apart.
///
/// Every operation updates the in-memory model and then writes one frame
/// that brings the terminal in line with it. Log lines pushed out of the
/// log region are written once ahead of the frame and so end up in the
/// terminal's scrollback.
///
/// ```rust,ignore
/// let mut console = VirtualConsole::new(std::io::stdout(), ConsoleOptions::for_stdout());
/// console.upsert_progress(0, "Task A: 10%");
/// console.log("build started");
/// console.upsert_progress(2, "Task C: 0%");
/// console.done();
/// ```
pub struct VirtualConsole<W: Write> {
    compositor: Box<dyn Compositor>,
    out: W,
    sink: LogSink,
    pending: Vec<String>,
    done: bool,
}

impl VirtualConsole<std::io::Stdout> {
    /// A console on the process's stdout, sized and configured by [`ConsoleOptions::for_stdout`].
    pub fn stdout() -> Self {
        Self::new(std::io::stdout(), ConsoleOptions::for_stdout())
    }
}

impl<W: Write> VirtualConsole<W> {
    /// Creates the console and clears the viewport, pushing whatever was on
    /// screen into the scrollback.
    pub fn new(out: W, options: ConsoleOptions) -> Self {
        let viewport = options.viewport;
        let compositor: Box<dyn Compositor> = match (options.interactive, options.anchor) {
            (false, anchor) => Box::new(Plain::new(viewport, anchor)),
            (true, Anchor::Top) => Box::new(TopAnchored::new(viewport)),
            (true, Anchor::Bottom) => Box::new(BottomAnchored::new(viewport)),
        };
        debug!(
            anchor = ?options.anchor,
            interactive = options.interactive,
            width = viewport.width,
            height = viewport.height,
            "virtual console created"
        );
        let mut console = Self {
            compositor,
            out,
            sink: LogSink::new(),
            pending: Vec::new(),
            done: false,
        };
        if options.interactive {
            let mut frame = Frame::new();
            frame.push(&"\n".repeat(viewport.height));
            frame.cursor_to(0, 0);
            frame.push(ansi::erase_display(EraseDisplay::ToEnd));
            console.write_frame(&frame);
        }
        console
    }

    /// Current display columns. Callers composing their own lines (borders,
    /// padded task names) clamp against this.
    pub fn width(&self) -> usize {
        self.screen().width()
    }

    pub fn height(&self) -> usize {
        self.screen().height()
    }

    pub fn progress_height(&self) -> usize {
        self.screen().progress_height()
    }

    pub fn console_height(&self) -> usize {
        self.screen().console_height()
    }

    /// Number of progress slots, including those scrolled out of view.
    pub fn slots(&self) -> usize {
        self.screen().progress().len()
    }

    pub fn anchor(&self) -> Anchor {
        self.compositor.anchor()
    }

    /// Whether [`done`](Self::done) has run.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The output stream.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub(crate) fn screen(&self) -> &Screen {
        self.compositor.screen()
    }

    /// A handle that writes into the log region. Hand it to any code that
    /// would otherwise print directly to the terminal.
    pub fn log_handle(&self) -> LogHandle {
        self.sink.handle()
    }

    /// Writes progress slot `index` and repaints.
    pub fn upsert_progress(&mut self, index: usize, data: &str) {
        self.apply(|c| c.upsert_progress(index, data));
    }

    /// Writes progress slot `index` without repainting. The change shows up
    /// with the next [`refresh`](Self::refresh) or repainting operation.
    pub fn stage_progress(&mut self, index: usize, data: &str) {
        self.stage(|c| c.upsert_progress(index, data));
    }

    /// Sets or clears a border line without repainting.
    pub fn stage_border(&mut self, edge: Edge, text: Option<&str>) {
        self.stage(|c| c.set_border(edge, text));
    }

    /// Applies a terminal resize without repainting.
    pub fn stage_resize(&mut self, width: usize, height: usize) {
        self.stage(|c| c.resize(Viewport::new(width, height)));
    }

    /// Shrinks the progress region by one slot, giving the row back to the log region.
    pub fn remove_progress_slot(&mut self) -> Result<(), ConsoleError> {
        if self.done {
            return Ok(());
        }
        self.collect_logs();
        self.compositor.remove_progress_slot()?;
        self.repaint();
        Ok(())
    }

    /// Sets or clears the line pinned above the progress slots.
    pub fn set_top_border(&mut self, text: Option<&str>) {
        self.apply(|c| c.set_border(Edge::Top, text));
    }

    /// Sets or clears the line pinned below the progress slots.
    pub fn set_bottom_border(&mut self, text: Option<&str>) {
        self.apply(|c| c.set_border(Edge::Bottom, text));
    }

    /// Appends `message` to the log region.
    ///
    /// After [`done`](Self::done) the message is printed through as a plain line.
    pub fn log(&mut self, message: impl Display) {
        let text = message.to_string();
        if self.done {
            let mut frame = Frame::new();
            frame.push(&text);
            frame.newline();
            self.write_frame(&frame);
            return;
        }
        self.apply(|c| c.log(&text));
    }

    /// Composes messages queued by [`LogHandle`]s and repaints if there were any.
    pub fn flush_logs(&mut self) {
        if self.done {
            return;
        }
        if self.collect_logs() {
            self.repaint();
        }
    }

    /// Writes the full current frame. Calling it again without a state change
    /// writes the same bytes.
    pub fn refresh(&mut self) {
        if self.done {
            return;
        }
        self.collect_logs();
        self.repaint();
    }

    /// Applies a terminal resize and repaints.
    pub fn on_resize(&mut self, width: usize, height: usize) {
        self.apply(|c| c.resize(Viewport::new(width, height)));
    }

    /// Releases the log region and leaves the terminal in a usable state.
    ///
    /// If there are more progress lines than terminal rows all of them are
    /// printed once; otherwise the final frame is painted and the cursor is
    /// parked below it. Only the first call has an effect.
    pub fn done(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        self.sink.release();
        self.collect_logs();

        let evicted = std::mem::take(&mut self.pending);
        let mut frame = Frame::new();
        self.compositor.done(&evicted, &mut frame);
        debug!(
            slots = self.slots(),
            overflow = self.screen().overflows(),
            "virtual console done"
        );
        self.write_frame(&frame);

        // Messages that raced the release.
        if let Some(text) = self.sink.drain() {
            let mut frame = Frame::new();
            frame.push(&text);
            frame.newline();
            self.write_frame(&frame);
        }
    }

    fn apply(&mut self, op: impl FnOnce(&mut dyn Compositor) -> Vec<String>) {
        if self.done {
            return;
        }
        self.collect_logs();
        self.stage(op);
        self.repaint();
    }

    fn stage(&mut self, op: impl FnOnce(&mut dyn Compositor) -> Vec<String>) {
        if self.done {
            return;
        }
        let evicted = op(self.compositor.as_mut());
        self.pending.extend(evicted);
    }

    /// Moves queued handle messages into the log region. Returns whether there were any.
    fn collect_logs(&mut self) -> bool {
        let Some(text) = self.sink.drain() else {
            return false;
        };
        let evicted = self.compositor.log(&text);
        self.pending.extend(evicted);
        true
    }

    fn repaint(&mut self) {
        let evicted = std::mem::take(&mut self.pending);
        let mut frame = Frame::new();
        self.compositor.paint(&evicted, &mut frame);
        self.write_frame(&frame);
    }

    fn write_frame(&mut self, frame: &Frame) {
        if frame.is_empty() {
            return;
        }
        trace!(bytes = frame.as_bytes().len(), lines = frame.lines(), "writing frame");
        let result = self
            .out
            .write_all(frame.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(err) = result {
            warn!(%err, "dropping frame after failed write");
        }
    }
}

impl<W: Write> Drop for VirtualConsole<W> {
    fn drop(&mut self) {
        self.done();
    }
}
