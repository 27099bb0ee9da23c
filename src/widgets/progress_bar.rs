use std::fmt;

const FULL: char = '█';
/// One to seven eighths of a cell.
const EIGHTHS: [char; 7] = ['▏', '▎', '▍', '▌', '▋', '▊', '▉'];

/// A fixed-width bar drawn with eighth-block characters.
///
/// The output is always exactly `width` columns: full blocks, at most one
/// partial block, then spaces.
///
/// ```
/// use tally_bars::widgets::ProgressBar;
/// assert_eq!(ProgressBar::new(0.5).width(4).to_string(), "██  ");
/// assert_eq!(ProgressBar::new(0.3).width(4).to_string(), "█▏  ");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressBar {
    ratio: f64,
    width: usize,
}

impl ProgressBar {
    pub fn new(ratio: f64) -> Self {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        Self { ratio, width: 40 }
    }

    pub fn width(mut self, w: usize) -> Self {
        self.width = w;
        self
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// The filled part (full blocks plus the partial block) and the blank
    /// remainder, so callers can color only the filled part.
    pub fn parts(&self) -> (String, String) {
        let scaled = self.ratio * self.width as f64;
        let full = (scaled.floor() as usize).min(self.width);
        let eighths = ((scaled - scaled.floor()) * 8.0).floor() as usize;

        let mut filled: String = std::iter::repeat_n(FULL, full).collect();
        let mut used = full;
        if full < self.width && eighths > 0 {
            filled.push(EIGHTHS[eighths - 1]);
            used += 1;
        }
        (filled, " ".repeat(self.width - used))
    }

    /// The bar at 100%.
    pub fn full(width: usize) -> String {
        std::iter::repeat_n(FULL, width).collect()
    }
}

impl fmt::Display for ProgressBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (filled, rest) = self.parts();
        write!(f, "{filled}{rest}")
    }
}
