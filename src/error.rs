use std::fmt;

/// Misuse of the [`crate::VirtualConsole`] interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    /// `remove_progress_slot` was called while the progress region was empty.
    NoProgressSlots,
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoProgressSlots => write!(f, "no progress slot left to remove"),
        }
    }
}

impl std::error::Error for ConsoleError {}

/// Misuse of the [`crate::MultiProgress`] task registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// No task is registered under this name.
    UnknownTask(String),
    /// The requested slot already belongs to another task.
    SlotTaken { index: usize, owner: String },
    /// The console rejected the operation.
    Console(ConsoleError),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTask(name) => write!(f, "task `{name}` does not exist"),
            Self::SlotTaken { index, owner } => {
                write!(f, "progress slot {index} is already used by task `{owner}`")
            }
            Self::Console(err) => write!(f, "console error: {err}"),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Console(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConsoleError> for TaskError {
    fn from(err: ConsoleError) -> Self {
        Self::Console(err)
    }
}
