use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

#[cfg(all(unix, feature = "signals"))]
use signal_hook::consts::signal::{SIGINT, SIGTERM, SIGWINCH};
#[cfg(all(unix, feature = "signals"))]
use signal_hook::iterator::Signals;
use tracing::debug;
#[cfg(all(unix, feature = "signals"))]
use tracing::warn;

#[cfg(all(unix, feature = "signals"))]
use crate::screen::Viewport;
use crate::tasks::MultiProgress;

/// Highest supported animation rate.
pub const MAX_FPS: u32 = 60;

/// Tracks whether the indefinite-task animation should be advancing, and how often.
///
/// [`start`](Ticker::start) and [`stop`](Ticker::stop) report whether they
/// changed anything, so callers can reset the animation only on a real start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    interval: Duration,
    running: bool,
}

impl Ticker {
    /// A stopped ticker firing `fps` times a second once started, capped at [`MAX_FPS`].
    pub fn from_fps(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / fps.clamp(1, MAX_FPS),
            running: false,
        }
    }

    /// Returns `true` if the ticker was stopped.
    pub fn start(&mut self) -> bool {
        !std::mem::replace(&mut self.running, true)
    }

    /// Returns `true` if the ticker was running.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::from_fps(10)
    }
}

/// A render loop that animates a shared [`MultiProgress`] and flushes queued
/// log lines on a fixed interval.
///
/// # Example
///
/// ```rust,ignore
/// let progress = Arc::new(Mutex::new(MultiProgress::stdout(ProgressOptions::new())));
/// let render = RenderLoop::new()
///     .interval(Duration::from_millis(50))
///     .spawn(Arc::clone(&progress));
///
/// // ... workers update tasks through the mutex ...
///
/// render.join().unwrap();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RenderLoop {
    interval: Duration,
    close_on_exit: bool,
    #[cfg(feature = "signals")]
    handle_signals: bool,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    /// Create a loop with sensible defaults (100 ms interval, close on exit).
    pub fn new() -> Self {
        Self {
            interval: Duration::from_millis(100),
            close_on_exit: true,
            #[cfg(feature = "signals")]
            handle_signals: false,
        }
    }

    /// A loop ticking at the animation rate configured on `progress`.
    pub fn for_progress<W: Write>(progress: &MultiProgress<W>) -> Self {
        Self::new().interval(progress.tick_interval())
    }

    /// Set the repaint interval.
    pub fn interval(mut self, d: Duration) -> Self {
        self.interval = d;
        self
    }

    /// Whether to [`close`](MultiProgress::close) the bars when the loop ends.
    /// Enabled by default, which leaves the terminal with the final frame.
    pub fn close_on_exit(mut self, yes: bool) -> Self {
        self.close_on_exit = yes;
        self
    }

    /// Whether the loop takes over SIGINT, SIGTERM and SIGWINCH while it runs.
    ///
    /// On SIGINT or SIGTERM the bars are closed, leaving the terminal usable,
    /// and the process exits with `128 + signal`. On SIGWINCH the bars are
    /// redrawn at the new terminal size. Off by default; Unix only.
    #[cfg(feature = "signals")]
    pub fn handle_signals(mut self, yes: bool) -> Self {
        self.handle_signals = yes;
        self
    }

    /// Runs until `stop` returns `true`. Blocks the calling thread.
    ///
    /// `stop` is evaluated with the lock held, right after each tick.
    pub fn run_until<W: Write>(
        &self, progress: &Mutex<MultiProgress<W>>, mut stop: impl FnMut(&MultiProgress<W>) -> bool,
    ) {
        #[cfg(all(unix, feature = "signals"))]
        let mut signals = self.listen();
        loop {
            let finished = {
                let mut p = lock(progress);
                #[cfg(all(unix, feature = "signals"))]
                handle_pending(signals.as_mut(), &mut p);
                p.tick();
                p.flush_logs();
                stop(&p)
            };
            if finished {
                break;
            }
            std::thread::sleep(self.interval);
        }
        debug!("render loop finished");
        if self.close_on_exit {
            lock(progress).close();
        }
    }

    /// Runs until every task is done.
    pub fn run_until_done<W: Write>(&self, progress: &Mutex<MultiProgress<W>>) {
        self.run_until(progress, MultiProgress::all_done);
    }

    /// Runs [`run_until_done`](Self::run_until_done) on a new thread.
    pub fn spawn<W>(self, progress: Arc<Mutex<MultiProgress<W>>>) -> JoinHandle<()>
    where
        W: Write + Send + 'static,
    {
        std::thread::spawn(move || self.run_until_done(&progress))
    }
}

#[cfg(all(unix, feature = "signals"))]
impl RenderLoop {
    fn listen(&self) -> Option<Signals> {
        if !self.handle_signals {
            return None;
        }
        match Signals::new([SIGINT, SIGTERM, SIGWINCH]) {
            Ok(signals) => {
                debug!("signal handlers installed");
                Some(signals)
            }
            Err(err) => {
                warn!(%err, "signal handlers not installed");
                None
            }
        }
    }
}

/// A signal translated into what the render loop does about it.
#[cfg(all(unix, feature = "signals"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Resize(Viewport),
    Terminate(i32),
}

#[cfg(all(unix, feature = "signals"))]
impl Interrupt {
    fn from_signal(signal: i32) -> Option<Self> {
        match signal {
            SIGWINCH => Viewport::detect().map(Interrupt::Resize),
            SIGINT | SIGTERM => Some(Interrupt::Terminate(signal)),
            _ => None,
        }
    }

    /// Applies the interrupt. Returns the exit code when the process must end.
    fn apply<W: Write>(self, progress: &mut MultiProgress<W>) -> Option<i32> {
        match self {
            Interrupt::Resize(viewport) => {
                progress.on_resize(viewport.width, viewport.height);
                None
            }
            Interrupt::Terminate(signal) => {
                warn!(signal, "termination signal received, closing progress");
                progress.close();
                Some(128 + signal)
            }
        }
    }
}

#[cfg(all(unix, feature = "signals"))]
fn handle_pending<W: Write>(signals: Option<&mut Signals>, progress: &mut MultiProgress<W>) {
    let Some(signals) = signals else {
        return;
    };
    for interrupt in signals.pending().filter_map(Interrupt::from_signal) {
        if let Some(code) = interrupt.apply(progress) {
            std::process::exit(code);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
