#![doc = include_str!("../README.md")]

pub mod ansi;
pub(crate) mod compositor;
pub(crate) mod console;
pub(crate) mod error;
pub(crate) mod frame;
#[cfg(feature = "layer")]
pub(crate) mod layer;
pub(crate) mod log;
pub(crate) mod runner;
pub(crate) mod screen;
pub(crate) mod tasks;
pub mod widgets;

#[cfg(test)]
mod test;

/// Re-exports of all public types and traits.
pub mod prelude {
    pub use crate::compositor::{Anchor, BottomAnchored, Compositor, Plain, TopAnchored};
    pub use crate::console::{ConsoleOptions, VirtualConsole};
    pub use crate::error::{ConsoleError, TaskError};
    pub use crate::frame::Frame;
    #[cfg(feature = "layer")]
    pub use crate::layer::{ConsoleLayer, DefaultFormat, EventFormat};
    pub use crate::log::LogHandle;
    pub use crate::runner::{MAX_FPS, RenderLoop, Ticker};
    pub use crate::screen::{Edge, Screen, Viewport};
    pub use crate::tasks::{
        AddTask, DEFAULT_INCREMENT, MultiProgress, ProgressOptions, Style, TaskKind, UpdateTask,
    };
    pub use crate::widgets::{Border, Placement, ProgressBar, Spinner};
}

pub use crate::prelude::*;
