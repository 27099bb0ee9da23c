//! Building blocks for task lines.
//!
//! # Progress bar
//!
//! [`ProgressBar`] draws a bar in eighth-block resolution:
//!
//! ```rust,ignore
//! let bar = ProgressBar::new(0.45).width(30);
//! // => █████████████▌
//! ```
//!
//! # Spinner
//!
//! [`Spinner`] renders the animation of indefinite tasks for a given step:
//!
//! ```rust,ignore
//! let s = Spinner::crawler(4);   // braille crawlers
//! let s = Spinner::dots();       // ⠋ ⠙ ⠹ ...
//! let s = Spinner::line();       // | / - \
//! let frame = s.render(step, 40);
//! ```
//!
//! # Border
//!
//! [`Border`] composes the header and footer lines:
//!
//! ```rust,ignore
//! let header = Border::default().message(" $ cargo build ").left(2);
//! // => ── $ cargo build ──────────────────
//! ```

mod border;
mod progress_bar;
mod spinner;

pub use border::*;
pub use progress_bar::*;
pub use spinner::*;
