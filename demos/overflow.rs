//! More progress lines than terminal rows, anchored at the bottom.
//!
//! While running only the newest bars fit; when the console is done every
//! bar is printed once.

use std::time::Duration;

use tally_bars::{Anchor, ConsoleOptions, Viewport, VirtualConsole, widgets::ProgressBar};

fn main() {
    let height = Viewport::detect().unwrap_or_default().height;
    let options = ConsoleOptions::for_stdout().anchor(Anchor::Bottom);
    let mut console = VirtualConsole::new(std::io::stdout(), options);
    let bars = height + 5;

    for tick in 0..=100usize {
        for i in 0..bars {
            let ratio = ((tick * (i + 1)) as f64 / 100.0 / bars as f64 * 2.0).min(1.0);
            let bar = ProgressBar::new(ratio).width(20);
            console.stage_progress(i, &format!("job {i:>3} {bar} {:>3.0}%", ratio * 100.0));
        }
        if tick % 10 == 0 {
            console.log(format!("tick {tick}"));
        }
        console.refresh();
        std::thread::sleep(Duration::from_millis(30));
    }
    console.done();
}
