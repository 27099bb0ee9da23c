//! A fake build: a few compile jobs, a download spinner and `tracing`
//! output scrolling underneath.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use owo_colors::OwoColorize;
use tally_bars::{
    AddTask, Border, ConsoleLayer, DEFAULT_INCREMENT, MultiProgress, ProgressOptions, RenderLoop,
    UpdateTask,
};
use tracing_subscriber::prelude::*;

fn main() {
    let options = ProgressOptions::new()
        .progress_width(30)
        .border(Border::default().left(2));
    let progress = MultiProgress::stdout(options);
    tracing_subscriber::registry()
        .with(ConsoleLayer::new(progress.log_handle()))
        .init();

    let render = RenderLoop::for_progress(&progress).handle_signals(true);
    let progress = Arc::new(Mutex::new(progress));
    {
        let mut p = progress.lock().unwrap();
        p.set_footer(Border::new("·").message(" ctrl-c to cancel ").right(2));
        for name in ["core", "parser", "cli"] {
            p.add_task(name, AddTask::percentage().bar_style(|s| s.cyan().to_string()))
                .unwrap();
        }
        p.add_task("registry", AddTask::indefinite().message("fetching index"))
            .unwrap();
    }
    let handle = render.spawn(Arc::clone(&progress));

    let workers: Vec<_> = [("core", 7u64), ("parser", 11), ("cli", 5)]
        .into_iter()
        .map(|(name, ms)| {
            let progress = Arc::clone(&progress);
            std::thread::spawn(move || {
                for step in 0..100 {
                    std::thread::sleep(Duration::from_millis(ms * 4));
                    if step % 25 == 0 {
                        tracing::info!(crate_name = name, step, "compiling");
                    }
                    let mut p = progress.lock().unwrap();
                    p.increment_task(name, DEFAULT_INCREMENT, UpdateTask::new().message(format!("unit {step}")))
                        .unwrap();
                }
                let mut p = progress.lock().unwrap();
                p.done(name, None).unwrap();
            })
        })
        .collect();

    std::thread::sleep(Duration::from_secs(2));
    tracing::warn!("index is stale, using cached copy");
    let cached = "cached".yellow().to_string();
    progress
        .lock()
        .unwrap()
        .done("registry", Some(cached.as_str()))
        .unwrap();

    for worker in workers {
        worker.join().unwrap();
    }
    handle.join().unwrap();
}
