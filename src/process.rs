//! Fork and wait primitives shared by forked built-ins and external launches.

use crate::command::Status;
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use std::io::Write;

/// How a supervised child finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Exited(i32),
    Signaled(Signal),
}

impl Outcome {
    /// Map a forked built-in's exit back into a loop status.
    ///
    /// Only a clean exit with code 0 terminates; a child killed by a signal
    /// leaves the interpreter running.
    pub fn status(self) -> Status {
        match self {
            Outcome::Exited(code) => Status::from_exit_code(code),
            Outcome::Signaled(_) => Status::Continue,
        }
    }
}

/// Block until `pid` has exited or been killed.
///
/// Stopped and continued notifications are skipped, as are interrupted waits.
pub fn wait_for(pid: Pid) -> Result<Outcome> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(Outcome::Exited(code)),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(Outcome::Signaled(signal)),
            Ok(other) => tracing::debug!(?other, "child still running"),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e).with_context(|| format!("waitpid {pid}")),
        }
    }
}

/// Run `body` in a forked child and wait for it.
///
/// The child exits with the status `body` returns, encoded by
/// [`Status::exit_code`]. Errors from `body` are printed in the child and
/// reported as [`Status::Continue`].
pub fn run_forked<F>(body: F) -> Result<Outcome>
where
    F: FnOnce() -> Result<Status>,
{
    // Anything still buffered would otherwise be written by both processes.
    std::io::stdout().flush().context("flush stdout")?;

    // SAFETY: the interpreter is single threaded, and the child only runs the
    // built-in and then exits without returning into the caller.
    match unsafe { fork() }.context("fork")? {
        ForkResult::Child => {
            let status = body().unwrap_or_else(|e| {
                eprintln!("dssh: {e:#}");
                Status::Continue
            });
            let _ = std::io::stdout().flush();
            std::process::exit(status.exit_code())
        }
        ForkResult::Parent { child } => {
            tracing::debug!(%child, "forked built-in");
            wait_for(child)
        }
    }
}
