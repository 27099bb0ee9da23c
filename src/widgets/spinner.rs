use std::fmt;
use std::sync::Arc;

use crate::ansi::{clamp_to_width, pad_end, repeat_to_width};

// Braille cells tracing a space-filling path; even and odd columns use
// mirrored paths so neighbouring cells join up. Entries 8..11 are the tail
// left behind when a crawler moves to the next cell.
const CRAWL_EVEN: [char; 11] = ['⠁', '⠉', '⠙', '⠛', '⠞', '⡖', '⣆', '⣤', '⣠', '⢠', '⠠'];
const CRAWL_ODD: [char; 11] = ['⠄', '⡄', '⣄', '⣤', '⣰', '⢲', '⠳', '⠛', '⠋', '⠉', '⠈'];

type SpinnerFn = dyn Fn(usize, usize) -> String + Send + Sync;

/// Animation shown in place of the bar for indefinite tasks.
///
/// A spinner is a pure function of the animation step and the bar width;
/// [`render`](Spinner::render) always returns exactly `width` columns.
///
/// ```rust,ignore
/// let s = Spinner::crawler(4);
/// let frame = s.render(step, 40);
///
/// let s = Spinner::dots();              // ⠋ ⠙ ⠹ ...
/// let s = Spinner::custom(&["◐", "◓", "◑", "◒"]);
/// let s = Spinner::from_fn(|step, width| "=".repeat(step % (width + 1)));
/// ```
#[derive(Clone)]
pub enum Spinner {
    /// `crawlers` braille worms crawling left to right across the bar.
    Crawler { crawlers: usize },
    /// One frame per step, tiled across the bar.
    Frames(&'static [&'static str]),
    Custom(Arc<SpinnerFn>),
}

impl Spinner {
    pub fn crawler(crawlers: usize) -> Self {
        Self::Crawler { crawlers }
    }

    /// Braille dot spinner.
    pub fn dots() -> Self {
        Self::Frames(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
    }

    pub fn line() -> Self {
        Self::Frames(&["|", "/", "-", "\\"])
    }

    pub fn custom(frames: &'static [&'static str]) -> Self {
        Self::Frames(frames)
    }

    /// A generator `(step, width) -> frame`. Output is padded or clamped to `width`.
    pub fn from_fn(f: impl Fn(usize, usize) -> String + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn render(&self, step: usize, width: usize) -> String {
        match self {
            Self::Crawler { crawlers } => crawl(step, width, *crawlers),
            Self::Frames([]) => " ".repeat(width),
            Self::Frames(frames) => repeat_to_width(frames[step % frames.len()], width),
            Self::Custom(f) => {
                let out = f(step, width);
                pad_end(clamp_to_width(&out, width), width)
            }
        }
    }
}

impl Default for Spinner {
    fn default() -> Self {
        Self::crawler(4)
    }
}

impl fmt::Debug for Spinner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crawler { crawlers } => f.debug_struct("Crawler").field("crawlers", crawlers).finish(),
            Self::Frames(frames) => f.debug_tuple("Frames").field(frames).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Each crawler owns `width / crawlers` cells and spends 8 steps in each.
fn crawl(step: usize, width: usize, crawlers: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let span = (width / crawlers.clamp(1, width)) as isize;
    let cycle = 8 * span;
    let t = (step % cycle as usize) as isize;
    let tail = 8 - cycle;

    (0..width)
        .map(|col| {
            let path = if col % 2 == 0 { &CRAWL_EVEN } else { &CRAWL_ODD };
            let pos = t - 8 * (col as isize % span);
            if (tail..tail + 3).contains(&pos) {
                path[(cycle + pos) as usize]
            } else if (0..path.len() as isize).contains(&pos) {
                path[pos as usize]
            } else {
                ' '
            }
        })
        .collect()
}
