//! Command stack: undoable document mutation.

mod command;
mod stack;

pub use command::Command;
pub use stack::{CommandStack, HistoryEntry, DEFAULT_HISTORY_LIMIT};
