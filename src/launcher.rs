use crate::process::{Outcome, wait_for};
use crate::tokenizer::Argv;
use anyhow::{Context, Result, anyhow, bail};
use nix::sys::signal::Signal;
use nix::unistd::{Pid, alarm};
use std::borrow::Cow;
use std::ffi::OsStr;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Reserved token that asks for a wall-clock limit on an external command.
pub const WATCHDOG_FLAG: &str = "--tkill";

/// Search path used when `PATH` is unset or empty, as `execvp(3)` does.
pub const DEFAULT_PATH: &str = "/bin:/usr/bin";

/// An external program invocation with the watchdog flag already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub program: String,
    pub args: Vec<String>,
    /// Seconds after which the program receives SIGALRM.
    pub watchdog: Option<u32>,
}

impl Launch {
    /// Split `argv` into the program, its arguments and the watchdog request.
    ///
    /// `--tkill <seconds>` may appear anywhere after the program name; every
    /// occurrence is removed along with its value and the last one wins.
    pub fn parse(argv: &Argv) -> Result<Self> {
        let program = argv
            .program()
            .ok_or_else(|| anyhow!("nothing to launch"))?
            .to_owned();
        let mut args = Vec::with_capacity(argv.args().len());
        let mut watchdog = None;
        let mut rest = argv.args().iter();
        while let Some(arg) = rest.next() {
            if arg != WATCHDOG_FLAG {
                args.push(arg.clone());
                continue;
            }
            let value = rest
                .next()
                .ok_or_else(|| anyhow!("{WATCHDOG_FLAG} expects a number of seconds"))?;
            match value.parse::<u32>() {
                Ok(secs) if secs > 0 => watchdog = Some(secs),
                _ => bail!("{WATCHDOG_FLAG}: invalid number of seconds: {value}"),
            }
        }
        Ok(Self {
            program,
            args,
            watchdog,
        })
    }

    /// Spawn the program and block until it exits or is killed.
    ///
    /// A watchdog arms `alarm(2)` in the child between fork and exec. No
    /// handler is installed: exec resets handlers anyway, so SIGALRM keeps its
    /// default action and terminates the program.
    pub fn run(&self) -> Result<Outcome> {
        let search_paths = std::env::var_os("PATH")
            .filter(|paths| !paths.is_empty())
            .unwrap_or_else(|| DEFAULT_PATH.into());
        let executable = find_command_path(&search_paths, Path::new(&self.program))
            .ok_or_else(|| anyhow!("{}: command not found", self.program))?;

        let mut cmd = Command::new(&*executable);
        cmd.arg0(&self.program).args(&self.args);
        if let Some(secs) = self.watchdog {
            // SAFETY: alarm(2) is async-signal-safe and touches no shared state.
            unsafe {
                cmd.pre_exec(move || {
                    alarm::set(secs);
                    Ok(())
                });
            }
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("{}: failed to execute", self.program))?;
        let pid = Pid::from_raw(child.id() as i32);
        tracing::debug!(%pid, program = %self.program, watchdog = ?self.watchdog, "spawned");

        let outcome = wait_for(pid)?;
        tracing::debug!(%pid, ?outcome, "child finished");
        Ok(outcome)
    }

    /// True when `outcome` is the watchdog firing rather than some other signal.
    pub fn killed_by_watchdog(&self, outcome: Outcome) -> bool {
        self.watchdog.is_some() && outcome == Outcome::Signaled(Signal::SIGALRM)
    }
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`) or `./foo`: returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first executable regular file. Empty entries are skipped, so the
///   current directory is never searched implicitly.
/// - Empty path: returns `None`.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() || path.starts_with("./") {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(cmd))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InDir;
    use crate::tokenizer::split_line;
    use std::fs::{self, File};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    #[test]
    fn watchdog_flag_is_stripped_anywhere() {
        let launch = Launch::parse(&split_line("sleep --tkill 3 10")).unwrap();
        assert_eq!(launch.program, "sleep");
        assert_eq!(launch.args, vec!["10"]);
        assert_eq!(launch.watchdog, Some(3));

        let launch = Launch::parse(&split_line("sleep 10 --tkill 1 --tkill 2")).unwrap();
        assert_eq!(launch.args, vec!["10"]);
        assert_eq!(launch.watchdog, Some(2));
    }

    #[test]
    fn no_flag_means_no_watchdog() {
        let launch = Launch::parse(&split_line("echo a b")).unwrap();
        assert_eq!(launch.args, vec!["a", "b"]);
        assert_eq!(launch.watchdog, None);
    }

    #[test]
    fn bad_watchdog_values_are_rejected() {
        assert!(Launch::parse(&split_line("sleep 5 --tkill")).is_err());
        assert!(Launch::parse(&split_line("sleep 5 --tkill soon")).is_err());
        assert!(Launch::parse(&split_line("sleep 5 --tkill 0")).is_err());
        assert!(Launch::parse(&split_line("sleep 5 --tkill -1")).is_err());
        assert!(Launch::parse(&Argv::default()).is_err());
    }

    #[test]
    fn exit_code_is_reported() {
        let outcome = Launch::parse(&split_line("false")).unwrap().run().unwrap();
        assert_eq!(outcome, Outcome::Exited(1));
        let outcome = Launch::parse(&split_line("true")).unwrap().run().unwrap();
        assert_eq!(outcome, Outcome::Exited(0));
    }

    #[test]
    fn watchdog_kills_long_running_program() {
        let launch = Launch::parse(&split_line("sleep 30 --tkill 1")).unwrap();
        let started = Instant::now();
        let outcome = launch.run().unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(launch.killed_by_watchdog(outcome));
    }

    #[test]
    fn unknown_program_is_not_spawned() {
        let err = Launch::parse(&split_line("definitely-not-a-real-command-dssh"))
            .unwrap()
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("command not found"));
    }

    #[test]
    fn absolute_existing_true() {
        let path = Path::new("/bin/sh");
        let found = find_command_path(osstr("/bin"), path).expect("absolute /bin/sh");
        assert_eq!(&*found, path);
    }

    #[test]
    fn absolute_nonexisting() {
        let path = Path::new("/bin/nonexisting");
        assert!(find_command_path(osstr("/bin"), path).is_none());
    }

    #[test]
    fn single_component_found_in_path() {
        let found = find_command_path(osstr("/nowhere:/bin"), Path::new("sh"))
            .expect("Expected to find 'sh' in /bin via PATH search");
        assert_eq!(&*found, Path::new("/bin/sh"));
    }

    #[test]
    fn single_component_not_found_in_path() {
        assert!(find_command_path(osstr("/bin"), Path::new("nonexisting")).is_none());
    }

    #[test]
    fn multi_component_paths_are_checked_directly() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("bin")).unwrap();
        File::create(tmp.path().join("bin/tool")).unwrap();

        let nested = tmp.path().join("bin/tool");
        assert!(find_command_path(osstr("/bin"), &nested).is_some());
        assert!(find_command_path(osstr("/bin"), Path::new("./no-such-tool-here")).is_none());
    }

    fn write_tool(path: &Path, mode: u32) {
        fs::write(path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn empty_path_entries_do_not_mean_current_directory() {
        let tmp = TempDir::new().unwrap();
        write_tool(&tmp.path().join("localtool"), 0o755);
        let _cwd = InDir::new(tmp.path());

        assert!(find_command_path(osstr(""), Path::new("localtool")).is_none());
        assert!(find_command_path(osstr("::"), Path::new("localtool")).is_none());
        assert!(find_command_path(osstr("/nowhere:"), Path::new("localtool")).is_none());
        // Naming it explicitly still works.
        assert!(find_command_path(osstr(""), Path::new("./localtool")).is_some());
    }

    #[test]
    fn non_executable_files_do_not_shadow_later_entries() {
        let tmp = TempDir::new().unwrap();
        let (first, second) = (tmp.path().join("first"), tmp.path().join("second"));
        fs::create_dir(&first).unwrap();
        fs::create_dir(&second).unwrap();
        write_tool(&first.join("tool"), 0o644);
        write_tool(&second.join("tool"), 0o755);

        let search = std::env::join_paths([&first, &second]).unwrap();
        let found = find_command_path(&search, Path::new("tool")).expect("executable tool");
        assert_eq!(&*found, second.join("tool").as_path());

        let search = std::env::join_paths([&first]).unwrap();
        assert!(find_command_path(&search, Path::new("tool")).is_none());
    }

    #[test]
    fn empty_path_is_none() {
        assert!(find_command_path(osstr("/bin"), Path::new("")).is_none());
    }
}
