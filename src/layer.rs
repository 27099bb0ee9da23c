//! `tracing` integration.
//!
//! [`ConsoleLayer`] turns every `tracing` event into a line in the log
//! region, so instrumented code can keep logging while progress bars are on
//! screen. Events emitted by this crate itself are skipped.
//!
//! ```rust,ignore
//! use tracing_subscriber::prelude::*;
//!
//! let console = VirtualConsole::stdout();
//! tracing_subscriber::registry()
//!     .with(ConsoleLayer::new(console.log_handle()))
//!     .init();
//! ```

use std::fmt::{self, Write as _};
use std::marker::PhantomData;

use owo_colors::OwoColorize;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::log::LogHandle;

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Turns a `tracing` event into the text written to the log region.
///
/// ```rust,ignore
/// struct Bare;
/// impl EventFormat for Bare {
///     fn format_event(event: &tracing::Event<'_>) -> String {
///         event.metadata().name().to_string()
///     }
/// }
/// let layer = ConsoleLayer::new(handle).with_format::<Bare>();
/// ```
pub trait EventFormat: 'static {
    fn format_event(event: &Event<'_>) -> String;
}

/// `LEVEL message key=value ...`, with the level colored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormat;

impl EventFormat for DefaultFormat {
    fn format_event(event: &Event<'_>) -> String {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        format!("{} {}", level_label(event.metadata().level()), visitor.finish())
    }
}

fn level_label(level: &Level) -> String {
    match *level {
        Level::ERROR => "ERROR".red().to_string(),
        Level::WARN => " WARN".yellow().to_string(),
        Level::INFO => " INFO".green().to_string(),
        Level::DEBUG => "DEBUG".blue().to_string(),
        Level::TRACE => "TRACE".magenta().to_string(),
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        self.message + &self.fields
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// A `tracing` [`Layer`] writing events into a console's log region.
pub struct ConsoleLayer<F = DefaultFormat> {
    handle: LogHandle,
    _format: PhantomData<fn() -> F>,
}

impl ConsoleLayer {
    pub fn new(handle: LogHandle) -> Self {
        Self {
            handle,
            _format: PhantomData,
        }
    }
}

impl<F: EventFormat> ConsoleLayer<F> {
    /// Replaces the event formatter.
    pub fn with_format<G: EventFormat>(self) -> ConsoleLayer<G> {
        ConsoleLayer {
            handle: self.handle,
            _format: PhantomData,
        }
    }
}

fn is_own_event(target: &str) -> bool {
    target == OWN_TARGET
        || target
            .strip_prefix(OWN_TARGET)
            .is_some_and(|rest| rest.starts_with("::"))
}

impl<S, F> Layer<S> for ConsoleLayer<F>
where
    S: Subscriber,
    F: EventFormat,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if is_own_event(event.metadata().target()) {
            return;
        }
        self.handle.log(F::format_event(event));
    }
}
