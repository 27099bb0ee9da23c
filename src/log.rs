use std::fmt::Display;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

/// A cloneable handle for writing into the log region of a
/// [`crate::VirtualConsole`].
///
/// Handles queue messages; the console composes them before its next
/// repaint (or on [`crate::VirtualConsole::flush_logs`]). Once the console is
/// done the handle prints straight to stdout, so code holding a handle keeps
/// working after teardown.
///
/// ```rust,ignore
/// let log = console.log_handle();
/// std::thread::spawn(move || log.log("from a worker"));
/// ```
#[derive(Debug, Clone)]
pub struct LogHandle {
    tx: Sender<String>,
    released: Arc<AtomicBool>,
}

impl LogHandle {
    /// Queues `message` for the log region.
    pub fn log(&self, message: impl Display) {
        let message = message.to_string();
        if self.released.load(Ordering::Acquire) {
            print_through(&message);
            return;
        }
        if let Err(returned) = self.tx.send(message) {
            print_through(&returned.0);
        }
    }

    /// Whether the console behind this handle still owns the log region.
    pub fn is_attached(&self) -> bool {
        !self.released.load(Ordering::Acquire)
    }
}

fn print_through(message: &str) {
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{message}");
}

/// Receiving end of the log handles, owned by the console.
#[derive(Debug)]
pub(crate) struct LogSink {
    tx: Sender<String>,
    rx: Receiver<String>,
    released: Arc<AtomicBool>,
}

impl LogSink {
    pub(crate) fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn handle(&self) -> LogHandle {
        LogHandle {
            tx: self.tx.clone(),
            released: Arc::clone(&self.released),
        }
    }

    /// All queued messages joined into one block of text, if there are any.
    pub(crate) fn drain(&self) -> Option<String> {
        let mut messages = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(message) => messages.push(message),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        (!messages.is_empty()).then(|| messages.join("\n"))
    }

    /// Detaches every handle. Returns `false` if this already happened.
    pub(crate) fn release(&self) -> bool {
        !self.released.swap(true, Ordering::AcqRel)
    }
}
