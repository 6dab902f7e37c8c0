use crate::interpreter::Interpreter;
use anyhow::Result;
use std::io::Write;

/// What the main loop should do after a command finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Keep reading commands.
    Continue,
    /// Leave the main loop; only `exit` produces this.
    Exit,
}

impl Status {
    /// Encoding used when a status has to cross a fork as a process exit code.
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Continue => 1,
            Status::Exit => 0,
        }
    }

    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            Status::Exit
        } else {
            Status::Continue
        }
    }
}

/// Where a built-in runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// In the interpreter's own process; required for anything whose effects
    /// must outlive the command (working directory, filesystem walk state).
    InProcess,
    /// In a forked child; fine for commands that only produce output.
    Forked,
}

/// Object-safe trait for a built-in that has been created from its arguments.
pub trait ExecutableCommand {
    fn mode(&self) -> ExecMode;

    /// Executes the command.
    ///
    /// `shell` gives access to the history and lets a command dispatch other
    /// command lines (`issue`).
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        shell: &mut Interpreter,
    ) -> Result<Status>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    fn name(&self) -> &'static str;

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
