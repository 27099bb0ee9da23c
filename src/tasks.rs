//! Named progress tasks on top of a [`VirtualConsole`].
//!
//! [`MultiProgress`] keeps one line per task in the console's progress
//! region and formats it as
//!
//! ```text
//!  compile: ████████████▍                            31% | src/main.rs
//!     test: ⠁⠋  ⠁⠋  ⠁⠋  ⠁⠋   running
//! download: ████████████████████████████████████████ Finished
//! ```
//!
//! Percentage tasks show a bar and a percentage, indefinite tasks show the
//! configured [`Spinner`], finished tasks show a full bar and a message.

use std::fmt::Display;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use owo_colors::OwoColorize;
use tracing::debug;

use crate::ansi::{display_width, pad_start};
use crate::console::{ConsoleOptions, VirtualConsole};
use crate::error::TaskError;
use crate::log::LogHandle;
use crate::runner::Ticker;
use crate::screen::Edge;
use crate::widgets::{Border, ProgressBar, Spinner};

/// Step used by callers that have no better estimate of their progress.
pub const DEFAULT_INCREMENT: f64 = 0.01;

/// A transform applied to part of a task line, usually to color it.
pub type Style = Arc<dyn Fn(&str) -> String + Send + Sync>;

fn apply(style: Option<&Style>, text: &str) -> String {
    match style {
        Some(style) => style(text),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskKind {
    /// Bar and percentage.
    #[default]
    Percentage,
    /// Spinner animation, no percentage.
    Indefinite,
}

/// Options for [`MultiProgress::add_task`].
///
/// ```rust,ignore
/// progress.add_task("compile", AddTask::percentage().message("starting"))?;
/// progress.add_task("fetch", AddTask::indefinite().index(4).bar_style(|s| s.cyan().to_string()))?;
/// ```
#[derive(Clone, Default)]
pub struct AddTask {
    kind: TaskKind,
    index: Option<usize>,
    message: Option<String>,
    percentage: Option<f64>,
    bar_style: Option<Style>,
    name_style: Option<Style>,
}

impl AddTask {
    pub fn percentage() -> Self {
        Self::default()
    }

    pub fn indefinite() -> Self {
        Self {
            kind: TaskKind::Indefinite,
            ..Self::default()
        }
    }

    /// Progress slot for the task. Defaults to the lowest slot no other task owns.
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Initial percentage of a new task, `0.0..=1.0`.
    pub fn start_at(mut self, percentage: f64) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn bar_style(mut self, style: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.bar_style = Some(Arc::new(style));
        self
    }

    pub fn name_style(mut self, style: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.name_style = Some(Arc::new(style));
        self
    }
}

/// Fields to change on an existing task. Unset fields are kept.
#[derive(Clone, Default)]
pub struct UpdateTask {
    message: Option<String>,
    percentage: Option<f64>,
    bar_style: Option<Style>,
    name_style: Option<Style>,
}

impl UpdateTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// New percentage, `0.0..=1.0`. Anything above 1 finishes the task.
    pub fn percentage(mut self, percentage: f64) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn bar_style(mut self, style: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.bar_style = Some(Arc::new(style));
        self
    }

    pub fn name_style(mut self, style: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.name_style = Some(Arc::new(style));
        self
    }
}

struct Task {
    index: usize,
    kind: TaskKind,
    message: String,
    percentage: f64,
    done: bool,
    bar_style: Option<Style>,
    name_style: Option<Style>,
}

impl Task {
    fn merge(&mut self, update: UpdateTask) {
        if let Some(message) = update.message {
            self.message = message;
        }
        if let Some(percentage) = update.percentage {
            self.percentage = percentage.clamp(0.0, 1.0);
        }
        if update.bar_style.is_some() {
            self.bar_style = update.bar_style;
        }
        if update.name_style.is_some() {
            self.name_style = update.name_style;
        }
    }
}

/// Construction options for a [`MultiProgress`].
///
/// ```rust,ignore
/// let options = ProgressOptions::new()
///     .progress_width(30)
///     .spinner_fps(20)
///     .border(Border::default().left(2));
/// ```
#[derive(Debug, Clone)]
pub struct ProgressOptions {
    progress_width: usize,
    spinner_fps: u32,
    num_crawlers: usize,
    spinner: Option<Spinner>,
    init_message: Option<String>,
    border: Option<Border>,
    console: ConsoleOptions,
}

impl Default for ProgressOptions {
    fn default() -> Self {
        Self {
            progress_width: 40,
            spinner_fps: 10,
            num_crawlers: 4,
            spinner: None,
            init_message: None,
            border: None,
            console: ConsoleOptions::default(),
        }
    }
}

impl ProgressOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns taken by bars and spinners. Odd widths are rounded up.
    pub fn progress_width(mut self, width: usize) -> Self {
        self.progress_width = width;
        self
    }

    /// Animation rate of indefinite tasks, capped at [`crate::runner::MAX_FPS`].
    pub fn spinner_fps(mut self, fps: u32) -> Self {
        self.spinner_fps = fps;
        self
    }

    /// Crawlers of the default spinner. Reduced to a divisor of the progress width.
    pub fn num_crawlers(mut self, crawlers: usize) -> Self {
        self.num_crawlers = crawlers;
        self
    }

    /// Replaces the default crawler animation.
    pub fn spinner(mut self, spinner: Spinner) -> Self {
        self.spinner = Some(spinner);
        self
    }

    /// First line shown above the bars. Defaults to `$ ` followed by the
    /// program name; an empty message shows nothing.
    pub fn init_message(mut self, message: impl Into<String>) -> Self {
        self.init_message = Some(message.into());
        self
    }

    /// Draws a header border with the init message in it, instead of
    /// logging the init message.
    pub fn border(mut self, border: Border) -> Self {
        self.border = Some(border);
        self
    }

    pub fn console(mut self, console: ConsoleOptions) -> Self {
        self.console = console;
        self
    }
}

fn default_init_message() -> String {
    let args: Vec<String> = std::env::args()
        .map(|arg| {
            std::path::Path::new(&arg)
                .file_stem()
                .map_or(arg.clone(), |stem| stem.to_string_lossy().into_owned())
        })
        .collect();
    format!("$ {}", args.join(" "))
}

/// Largest crawler count not above `crawlers` that divides `width`.
fn fit_crawlers(width: usize, crawlers: usize) -> usize {
    (1..=crawlers.max(1))
        .rev()
        .find(|c| width % c == 0)
        .unwrap_or(1)
}

/// Named tasks rendered as progress bars above (or below) the log output.
///
/// ```rust,ignore
/// let mut progress = MultiProgress::stdout(ProgressOptions::new());
/// progress.add_task("compile", AddTask::percentage())?;
/// progress.add_task("fetch", AddTask::indefinite().message("crates.io"))?;
///
/// progress.update_task("compile", UpdateTask::new().percentage(0.4))?;
/// progress.log("warning: unused variable");
/// progress.done("fetch", None)?;
/// progress.close();
/// ```
pub struct MultiProgress<W: Write> {
    console: VirtualConsole<W>,
    tasks: IndexMap<String, Task>,
    progress_width: usize,
    spinner: Spinner,
    ticker: Ticker,
    step: usize,
    longest_name: usize,
    header: Option<Border>,
    footer: Option<Border>,
}

impl MultiProgress<std::io::Stdout> {
    /// Bars on the process's stdout, see [`ConsoleOptions::for_stdout`].
    pub fn stdout(options: ProgressOptions) -> Self {
        let options = ProgressOptions {
            console: ConsoleOptions::for_stdout(),
            ..options
        };
        Self::new(std::io::stdout(), options)
    }
}

impl<W: Write> MultiProgress<W> {
    pub fn new(out: W, options: ProgressOptions) -> Self {
        let progress_width = options.progress_width + options.progress_width % 2;
        let crawlers = fit_crawlers(progress_width, options.num_crawlers);
        let spinner = options
            .spinner
            .unwrap_or_else(|| Spinner::crawler(crawlers));
        let init_message = options.init_message.unwrap_or_else(default_init_message);
        debug!(progress_width, crawlers, fps = options.spinner_fps, "progress bars created");

        let mut progress = Self {
            console: VirtualConsole::new(out, options.console),
            tasks: IndexMap::new(),
            progress_width,
            spinner,
            ticker: Ticker::from_fps(options.spinner_fps),
            step: 0,
            longest_name: 0,
            header: None,
            footer: None,
        };
        match options.border {
            Some(border) if init_message.is_empty() => progress.set_header(border),
            Some(border) => progress.set_header(border.message(init_message)),
            None if init_message.is_empty() => {}
            None => progress.console.log(init_message),
        }
        progress
    }

    pub fn console(&self) -> &VirtualConsole<W> {
        &self.console
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Current animation step of indefinite tasks.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Interval between animation steps.
    pub fn tick_interval(&self) -> Duration {
        self.ticker.interval()
    }

    /// Whether any indefinite task is animating.
    pub fn is_animating(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn is_closed(&self) -> bool {
        self.console.is_done()
    }

    /// Adds a task, or resets an existing one to 0% while keeping its slot.
    pub fn add_task(&mut self, name: &str, options: AddTask) -> Result<(), TaskError> {
        let AddTask {
            kind,
            index,
            message,
            percentage,
            bar_style,
            name_style,
        } = options;
        if let Some(task) = self.tasks.get_mut(name) {
            task.kind = kind;
            task.percentage = 0.0;
            task.done = false;
            task.merge(UpdateTask {
                message,
                percentage: None,
                bar_style,
                name_style,
            });
            debug!(task = name, "task reset");
        } else {
            let index = match index {
                Some(index) => {
                    if let Some(owner) = self.owner_of(index) {
                        return Err(TaskError::SlotTaken {
                            index,
                            owner: owner.to_string(),
                        });
                    }
                    index
                }
                None => self.free_slot(),
            };
            self.tasks.insert(
                name.to_string(),
                Task {
                    index,
                    kind,
                    message: message.unwrap_or_default(),
                    percentage: percentage.unwrap_or(0.0).clamp(0.0, 1.0),
                    done: false,
                    bar_style,
                    name_style,
                },
            );
            debug!(task = name, index, ?kind, "task added");
        }

        if kind == TaskKind::Indefinite {
            self.start_animation();
        }
        // Names are right-aligned, a longer name shifts every line.
        let width = display_width(name);
        if width > self.longest_name {
            self.longest_name = width;
            self.rewrite_all();
        } else {
            self.write_task(name)?;
        }
        Ok(())
    }

    /// Changes a task. A percentage above 1 finishes it.
    pub fn update_task(&mut self, name: &str, update: UpdateTask) -> Result<(), TaskError> {
        if update.percentage.is_some_and(|p| p > 1.0) {
            return self.finish(name, update.message, update.bar_style);
        }
        let task = self.task_mut(name)?;
        task.merge(update);
        task.done = false;
        if task.kind == TaskKind::Indefinite {
            self.start_animation();
        }
        self.write_task(name)
    }

    /// Adds `delta` to a task's percentage, finishing it once it passes 1.
    /// Finished tasks are left alone.
    pub fn increment_task(&mut self, name: &str, delta: f64, update: UpdateTask) -> Result<(), TaskError> {
        let task = self.task(name)?;
        if task.done {
            return Ok(());
        }
        let percentage = task.percentage + delta;
        if percentage > 1.0 {
            return self.finish(name, update.message, update.bar_style);
        }
        self.update_task(name, update.percentage(percentage))
    }

    /// Marks a task finished: full bar and `message`, green "Finished" by default.
    pub fn done(&mut self, name: &str, message: Option<&str>) -> Result<(), TaskError> {
        self.finish(name, message.map(str::to_string), None)
    }

    /// Puts a task back to 0% and not done.
    pub fn restart(&mut self, name: &str, update: UpdateTask) -> Result<(), TaskError> {
        let task = self.task_mut(name)?;
        task.merge(UpdateTask {
            percentage: None,
            ..update
        });
        task.percentage = 0.0;
        task.done = false;
        if task.kind == TaskKind::Indefinite {
            self.start_animation();
        }
        debug!(task = name, "task restarted");
        self.write_task(name)
    }

    /// Removes a task. Tasks in higher slots move down by one and the
    /// progress region shrinks by one row.
    pub fn remove_task(&mut self, name: &str) -> Result<(), TaskError> {
        let removed = self
            .tasks
            .shift_remove(name)
            .ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;
        for task in self.tasks.values_mut() {
            if task.index > removed.index {
                task.index -= 1;
            }
        }
        self.longest_name = self.tasks.keys().map(|n| display_width(n)).max().unwrap_or(0);
        debug!(task = name, index = removed.index, "task removed");

        // Rewrite every remaining slot so no line of the removed task is left behind.
        let slots = self.console.slots().saturating_sub(1);
        let mut lines = vec![String::new(); slots];
        for (name, task) in &self.tasks {
            if let Some(line) = lines.get_mut(task.index) {
                *line = self.task_line(name, task);
            }
        }
        for (index, line) in lines.iter().enumerate() {
            self.console.stage_progress(index, line);
        }
        self.console.remove_progress_slot()?;

        if self.all_done() {
            self.ticker.stop();
        }
        Ok(())
    }

    pub fn is_done(&self, name: &str) -> Result<bool, TaskError> {
        Ok(self.task(name)?.done)
    }

    /// Whether every task is finished. True when there are no tasks.
    pub fn all_done(&self) -> bool {
        self.tasks.values().all(|t| t.done)
    }

    /// Pins a border line above the tasks.
    pub fn set_header(&mut self, border: Border) {
        let line = border.compose(self.console.width());
        self.console.set_top_border(Some(&line));
        self.header = Some(border);
    }

    /// Pins a border line below the tasks.
    pub fn set_footer(&mut self, border: Border) {
        let line = border.compose(self.console.width());
        self.console.set_bottom_border(Some(&line));
        self.footer = Some(border);
    }

    pub fn remove_header(&mut self) {
        self.header = None;
        self.console.set_top_border(None);
    }

    pub fn remove_footer(&mut self) {
        self.footer = None;
        self.console.set_bottom_border(None);
    }

    /// Advances the animation by one step and redraws indefinite tasks.
    /// Returns `false` and draws nothing when no indefinite task is active.
    pub fn tick(&mut self) -> bool {
        if !self.ticker.is_running() || self.console.is_done() {
            return false;
        }
        self.step = self.step.wrapping_add(1);
        for (name, task) in &self.tasks {
            if task.kind == TaskKind::Indefinite && !task.done {
                let line = self.task_line(name, task);
                self.console.stage_progress(task.index, &line);
            }
        }
        self.console.refresh();
        true
    }

    pub fn log(&mut self, message: impl Display) {
        self.console.log(message);
    }

    /// A handle for logging from other threads, see [`LogHandle`].
    pub fn log_handle(&self) -> LogHandle {
        self.console.log_handle()
    }

    /// Draws messages queued through [`LogHandle`]s.
    pub fn flush_logs(&mut self) {
        self.console.flush_logs();
    }

    /// Applies a terminal resize, recomposing borders at the new width.
    /// Writes a single frame.
    pub fn on_resize(&mut self, width: usize, height: usize) {
        self.console.stage_resize(width, height);
        if let Some(header) = &self.header {
            let line = header.compose(width);
            self.console.stage_border(Edge::Top, Some(&line));
        }
        if let Some(footer) = &self.footer {
            let line = footer.compose(width);
            self.console.stage_border(Edge::Bottom, Some(&line));
        }
        self.rewrite_all();
    }

    /// Stops the animation and hands the terminal back. Safe to call more than once.
    pub fn close(&mut self) {
        if self.ticker.stop() {
            debug!("animation stopped");
        }
        self.console.done();
    }

    fn task(&self, name: &str) -> Result<&Task, TaskError> {
        self.tasks
            .get(name)
            .ok_or_else(|| TaskError::UnknownTask(name.to_string()))
    }

    fn task_mut(&mut self, name: &str) -> Result<&mut Task, TaskError> {
        self.tasks
            .get_mut(name)
            .ok_or_else(|| TaskError::UnknownTask(name.to_string()))
    }

    fn owner_of(&self, index: usize) -> Option<&str> {
        self.tasks
            .iter()
            .find(|(_, t)| t.index == index)
            .map(|(name, _)| name.as_str())
    }

    /// Lowest slot no task owns.
    fn free_slot(&self) -> usize {
        (0..self.tasks.len())
            .find(|&index| self.owner_of(index).is_none())
            .unwrap_or(self.tasks.len())
    }

    fn start_animation(&mut self) {
        if self.ticker.start() {
            self.step = 0;
            debug!("animation started");
        }
    }

    fn finish(&mut self, name: &str, message: Option<String>, bar_style: Option<Style>) -> Result<(), TaskError> {
        let task = self.task_mut(name)?;
        task.done = true;
        task.percentage = 1.0;
        task.message = message.unwrap_or_else(|| "Finished".green().to_string());
        if bar_style.is_some() {
            task.bar_style = bar_style;
        }
        debug!(task = name, "task done");
        self.write_task(name)?;
        if self.all_done() && self.ticker.stop() {
            debug!("all tasks done, animation stopped");
        }
        Ok(())
    }

    fn task_line(&self, name: &str, task: &Task) -> String {
        let name = apply(task.name_style.as_ref(), &pad_start(name, self.longest_name));
        let bar = |text: &str| apply(task.bar_style.as_ref(), text);
        if task.done {
            return format!("{name}: {} {}", bar(&ProgressBar::full(self.progress_width)), task.message);
        }
        match task.kind {
            TaskKind::Percentage => {
                let (filled, rest) = ProgressBar::new(task.percentage)
                    .width(self.progress_width)
                    .parts();
                format!(
                    "{name}: {}{rest} {:>3.0}% | {}",
                    bar(&filled),
                    task.percentage * 100.0,
                    task.message
                )
            }
            TaskKind::Indefinite => {
                let spinner = self.spinner.render(self.step, self.progress_width);
                format!("{name}: {} {}", bar(&spinner), task.message)
            }
        }
    }

    fn write_task(&mut self, name: &str) -> Result<(), TaskError> {
        let task = self.task(name)?;
        let (index, line) = (task.index, self.task_line(name, task));
        self.console.upsert_progress(index, &line);
        Ok(())
    }

    /// Restages every task line and paints once.
    fn rewrite_all(&mut self) {
        for (name, task) in &self.tasks {
            let line = self.task_line(name, task);
            self.console.stage_progress(task.index, &line);
        }
        self.console.refresh();
    }
}
