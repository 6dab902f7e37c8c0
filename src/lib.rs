//! A small interactive command interpreter.
//!
//! Lines are split on whitespace into an argument vector and dispatched
//! either to a built-in or to an external program. Built-ins that change
//! interpreter state (`cd`, `rm`, `rmexcept`, `issue`) run in-process; the
//! rest run in a forked child. Every line is kept in an append-only history
//! that `issue` can replay.
//!
//! The main entry point is [`Interpreter`]. External programs accept the
//! reserved `--tkill <seconds>` flag, which kills them after that long.

mod builtin;
pub mod command;
pub mod history;
mod interpreter;
pub mod launcher;
pub mod process;
pub mod prompt;
pub mod tokenizer;
pub mod walk;

#[cfg(test)]
mod test_support;

pub use command::{ExecMode, Status};
pub use interpreter::Interpreter;
