use crate::ansi::{clamp_to_width, display_width, repeat_to_width};

/// Where a [`Border`] message sits on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Columns from the left edge.
    Left(usize),
    /// Columns from the right edge.
    Right(usize),
    Center,
}

impl Default for Placement {
    fn default() -> Self {
        Self::Left(0)
    }
}

/// A full-width decorative line above or below the progress bars.
///
/// ```
/// use tally_bars::widgets::Border;
/// let line = Border::new("-").message(" build ").left(2).compose(12);
/// assert_eq!(line, "-- build ---");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Border {
    pattern: String,
    message: Option<String>,
    placement: Placement,
}

impl Default for Border {
    fn default() -> Self {
        Self::new("─")
    }
}

impl Border {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            message: None,
            placement: Placement::default(),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn left(mut self, offset: usize) -> Self {
        self.placement = Placement::Left(offset);
        self
    }

    pub fn right(mut self, offset: usize) -> Self {
        self.placement = Placement::Right(offset);
        self
    }

    pub fn center(mut self) -> Self {
        self.placement = Placement::Center;
        self
    }

    /// The border line for a terminal `width` columns wide.
    pub fn compose(&self, width: usize) -> String {
        let Some(message) = self.message.as_deref() else {
            return repeat_to_width(&self.pattern, width);
        };
        let message = clamp_to_width(message, width);
        let room = width - display_width(message);
        let start = match self.placement {
            Placement::Left(offset) => offset.min(room),
            Placement::Right(offset) => room.saturating_sub(offset),
            Placement::Center => room / 2,
        };
        format!(
            "{}{}{}",
            repeat_to_width(&self.pattern, start),
            message,
            repeat_to_width(&self.pattern, room - start),
        )
    }
}
