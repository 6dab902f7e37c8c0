use crate::command::{CommandFactory, ExecMode, Status};
use crate::history::History;
use crate::launcher::Launch;
use crate::process::{Outcome, run_forked};
use crate::prompt::Prompt;
use crate::tokenizer::{Argv, split_line};
use anyhow::{Context, Result, bail};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the built-ins defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The command interpreter: built-in table, history and the main loop.
///
/// Every line handed to [`Interpreter::execute_line`] is split into an
/// [`Argv`], dispatched and then recorded. Names found in the built-in table
/// run either in this process or in a forked child, depending on the command;
/// anything else is launched as an external program. Forked built-ins write to
/// the process's standard streams whatever writers the caller passes in.
///
/// Example
/// ```no_run
/// use dssh::{Interpreter, Status};
/// let mut sh = Interpreter::default();
/// let status = sh.execute_line("cd /tmp", &mut std::io::stdout(), &mut std::io::stderr());
/// assert_eq!(status, Status::Continue);
/// assert_eq!(sh.history().len(), 1);
/// ```
pub struct Interpreter {
    history: History,
    commands: Vec<Box<dyn CommandFactory>>,
    /// History indices being replayed by nested `issue` commands.
    replaying: Vec<usize>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            history: History::new(),
            commands,
            replaying: Vec::new(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Names of all built-ins, in table order.
    pub fn builtins(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.iter().map(|factory| factory.name())
    }

    /// Tokenize and dispatch `line`, then record it in the history.
    ///
    /// The line joins the history only once it has run, so neither `history`
    /// nor `issue` can see the line that invoked them.
    pub fn execute_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Status {
        let argv = split_line(line);
        let status = self.dispatch(&argv, stdout, stderr);
        self.history.append(line);
        status
    }

    /// Run one argument vector.
    ///
    /// Errors are printed to `stderr` and never stop the loop; only a command
    /// that asks for it (`exit`) yields [`Status::Exit`].
    ///
    /// `stdout` and `stderr` receive the output of in-process built-ins and of
    /// the interpreter itself. Forked built-ins (`help`, `history`, `ls`,
    /// `exit`) run in a child whose memory the caller never sees, so they
    /// always write to the process's standard streams.
    pub fn dispatch(
        &mut self,
        argv: &Argv,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Status {
        let Some(name) = argv.program() else {
            return Status::Continue;
        };
        let args: Vec<&str> = argv.args().iter().map(String::as_str).collect();
        let command = self
            .commands
            .iter()
            .find_map(|factory| factory.try_create(name, &args));

        let result = match command {
            None => self.launch(argv, stderr),
            Some(cmd) => match cmd.mode() {
                ExecMode::InProcess => {
                    tracing::debug!(%name, "running built-in in process");
                    cmd.execute(stdout, stderr, self)
                }
                ExecMode::Forked => {
                    tracing::debug!(%name, "running built-in in a child");
                    run_forked(|| cmd.execute(&mut io::stdout(), &mut io::stderr(), self))
                        .map(Outcome::status)
                }
            },
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(%name, error = %e, "command failed");
            let _ = writeln!(stderr, "dssh: {e:#}");
            Status::Continue
        })
    }

    /// Dispatch history entry `index` again, as if it had just been typed.
    ///
    /// The replayed line is echoed first. Replaying an entry that is already
    /// being replayed further up the chain is refused, since it could never
    /// finish.
    pub fn replay(
        &mut self,
        index: i64,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<Status> {
        let line = self.history.get(index).context("issue")?.to_owned();
        // `get` succeeded, so the index is a valid position.
        let position = index as usize;
        if self.replaying.contains(&position) {
            bail!("issue: entry {index} replays itself");
        }
        writeln!(stdout, "{line}\n")?;

        let argv = split_line(&line);
        self.replaying.push(position);
        let status = self.dispatch(&argv, stdout, stderr);
        self.replaying.pop();
        Ok(status)
    }

    /// External programs never end the loop, whatever their exit code.
    fn launch(&mut self, argv: &Argv, stderr: &mut dyn Write) -> Result<Status> {
        let launch = Launch::parse(argv)?;
        let outcome = launch.run()?;
        if let Some(secs) = launch.watchdog.filter(|_| launch.killed_by_watchdog(outcome)) {
            writeln!(
                stderr,
                "dssh: {}: killed by watchdog after {secs}s",
                launch.program
            )?;
        }
        Ok(Status::Continue)
    }

    /// Read-eval loop on the terminal until `exit` or end of input.
    pub fn repl(&mut self, prompt: &Prompt) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline(&prompt.render()) {
                Ok(line) => {
                    let status = self.execute_line(&line, &mut io::stdout(), &mut io::stderr());
                    if status == Status::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the full built-in table:
    /// `help`, `cd`, `history`, `issue`, `ls`, `rm`, `rmexcept`, `exit`.
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Help>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<ShowHistory>::default()),
            Box::new(Factory::<Issue>::default()),
            Box::new(Factory::<Ls>::default()),
            Box::new(Factory::<Rm>::default()),
            Box::new(Factory::<RmExcept>::default()),
            Box::new(Factory::<Exit>::default()),
        ])
    }
}
