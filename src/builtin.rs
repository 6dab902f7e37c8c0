use crate::command::{CommandFactory, ExecMode, ExecutableCommand, Status};
use crate::interpreter::{Factory, Interpreter};
use crate::walk::PostOrder;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`). Where they run is
/// fixed per command by [`BuiltinCommand::MODE`].
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// In-process or forked execution.
    const MODE: ExecMode;

    /// Canonical name of the command, e.g. "rm" or "cd".
    fn name() -> &'static str;

    fn execute(
        self,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        shell: &mut Interpreter,
    ) -> Result<Status>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn mode(&self) -> ExecMode {
        T::MODE
    }

    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        shell: &mut Interpreter,
    ) -> Result<Status> {
        T::execute(*self, stdout, stderr, shell)
    }
}

/// Stand-in produced when argh rejects the arguments or was asked for `--help`.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn mode(&self) -> ExecMode {
        ExecMode::InProcess
    }

    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        _shell: &mut Interpreter,
    ) -> Result<Status> {
        let output = self.output.trim_end();
        if self.is_error {
            writeln!(stderr, "{output}")?;
        } else {
            writeln!(stdout, "{output}")?;
        }
        Ok(Status::Continue)
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        Some(match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

const HELP: &str = "\
DSSH built-in commands:
  help                      show this reference
  cd <path>                 change the working directory
  history [N]               list all entries, or only the last N
  issue <N>                 run history entry N again
  ls                        list the current directory, dotfiles included
  rm [-r] [-f] [-v] <path>  remove a file, or a whole tree with -r
  rmexcept <name>...        remove every entry here except the names given
  exit                      leave the shell

Any other command is run as an external program. Adding `--tkill <seconds>`
anywhere in its arguments kills it once that many seconds have passed.";

#[derive(FromArgs)]
/// Show the built-in command reference.
pub struct Help {}

impl BuiltinCommand for Help {
    const MODE: ExecMode = ExecMode::Forked;

    fn name() -> &'static str {
        "help"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _shell: &mut Interpreter,
    ) -> Result<Status> {
        writeln!(stdout, "{HELP}")?;
        Ok(Status::Continue)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: String,
}

impl BuiltinCommand for Cd {
    const MODE: ExecMode = ExecMode::InProcess;

    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _shell: &mut Interpreter,
    ) -> Result<Status> {
        env::set_current_dir(&self.target).with_context(|| format!("cd: {}", self.target))?;
        Ok(Status::Continue)
    }
}

#[derive(FromArgs)]
/// List previously entered command lines.
pub struct ShowHistory {
    #[argh(positional)]
    /// only show the last N entries.
    pub last: Option<usize>,
}

impl BuiltinCommand for ShowHistory {
    const MODE: ExecMode = ExecMode::Forked;

    fn name() -> &'static str {
        "history"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &mut Interpreter,
    ) -> Result<Status> {
        for (index, line) in shell.history().list(self.last) {
            writeln!(stdout, "\t{index}\t{line}")?;
        }
        Ok(Status::Continue)
    }
}

#[derive(FromArgs)]
/// Run a history entry again, exactly as it was typed.
pub struct Issue {
    #[argh(positional)]
    /// position of the entry in `history`, counting from one.
    pub index: i64,
}

impl BuiltinCommand for Issue {
    const MODE: ExecMode = ExecMode::InProcess;

    fn name() -> &'static str {
        "issue"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        shell: &mut Interpreter,
    ) -> Result<Status> {
        shell.replay(self.index, stdout, stderr)
    }
}

#[derive(FromArgs)]
/// List every entry of the current directory, dotfiles included.
pub struct Ls {}

impl BuiltinCommand for Ls {
    const MODE: ExecMode = ExecMode::Forked;

    fn name() -> &'static str {
        "ls"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _shell: &mut Interpreter,
    ) -> Result<Status> {
        for name in list_dir(Path::new("."))? {
            writeln!(stdout, "{}", name.to_string_lossy())?;
        }
        Ok(Status::Continue)
    }
}

/// All names in `dir`, including `.` and `..`, in byte order.
fn list_dir(dir: &Path) -> Result<Vec<OsString>> {
    let mut names = vec![OsString::from("."), OsString::from("..")];
    for entry in fs::read_dir(dir).with_context(|| format!("ls: {}", dir.display()))? {
        names.push(entry.context("ls")?.file_name());
    }
    names.sort();
    Ok(names)
}

#[derive(FromArgs)]
/// Remove a file, or a directory and everything below it with -r.
pub struct Rm {
    #[argh(switch, short = 'r')]
    /// remove directories and their contents, deepest entries first.
    pub recursive: bool,

    #[argh(switch, short = 'f')]
    /// accepted for compatibility; rm never prompts, so it changes nothing.
    pub force: bool,

    #[argh(switch, short = 'v')]
    /// print each path after it has been removed.
    pub verbose: bool,

    #[argh(positional)]
    /// file or directory to remove, relative to the current directory unless absolute.
    pub target: String,
}

impl Rm {
    fn remove_tree(&self, root: &Path, stdout: &mut dyn Write) -> Result<()> {
        for entry in PostOrder::new(root) {
            let entry = entry.context("rm")?;
            let removed = if entry.is_dir {
                fs::remove_dir(&entry.path)
            } else {
                fs::remove_file(&entry.path)
            };
            removed.with_context(|| format!("rm: {}", entry.path.display()))?;
            if self.verbose {
                writeln!(stdout, "{}", entry.path.display())?;
            }
        }
        Ok(())
    }
}

impl BuiltinCommand for Rm {
    const MODE: ExecMode = ExecMode::InProcess;

    fn name() -> &'static str {
        "rm"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _shell: &mut Interpreter,
    ) -> Result<Status> {
        let path = resolve(&self.target)?;
        tracing::debug!(path = %path.display(), recursive = self.recursive, "rm");
        if self.recursive {
            self.remove_tree(&path, stdout)?;
        } else {
            fs::remove_file(&path).with_context(|| format!("rm: {}", path.display()))?;
            if self.verbose {
                writeln!(stdout, "{}", path.display())?;
            }
        }
        Ok(Status::Continue)
    }
}

/// Anchor a relative path at the current working directory.
fn resolve(target: &str) -> Result<PathBuf> {
    let cwd = env::current_dir().context("current directory")?;
    Ok(cwd.join(target))
}

#[derive(FromArgs)]
/// Remove every entry of the current directory except the names listed.
/// Directories are never descended into: an unlisted directory is removed
/// only if it is already empty.
pub struct RmExcept {
    #[argh(positional, greedy)]
    /// names to keep.
    pub keep: Vec<String>,
}

impl BuiltinCommand for RmExcept {
    const MODE: ExecMode = ExecMode::InProcess;

    fn name() -> &'static str {
        "rmexcept"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        _shell: &mut Interpreter,
    ) -> Result<Status> {
        let cwd = env::current_dir().context("rmexcept: current directory")?;
        let entries = fs::read_dir(&cwd)
            .with_context(|| format!("rmexcept: {}", cwd.display()))?
            .collect::<std::io::Result<Vec<_>>>()
            .context("rmexcept")?;

        for entry in entries {
            let name = entry.file_name();
            if self.keep.iter().any(|keep| name.as_os_str() == OsStr::new(keep)) {
                continue;
            }
            let path = cwd.join(&name);
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            let removed = if is_dir {
                fs::remove_dir(&path)
            } else {
                fs::remove_file(&path)
            };
            match removed {
                Ok(()) => writeln!(stdout, "{}", path.display())?,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "rmexcept skipped entry");
                    writeln!(stderr, "dssh: rmexcept: {}: {e}", path.display())?;
                }
            }
        }
        Ok(Status::Continue)
    }
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub ignored: Vec<String>,
}

impl BuiltinCommand for Exit {
    const MODE: ExecMode = ExecMode::Forked;

    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _shell: &mut Interpreter,
    ) -> Result<Status> {
        Ok(Status::Exit)
    }
}
