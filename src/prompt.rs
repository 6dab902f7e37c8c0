//! Prompt and startup banner.

use anyhow::{Context, Result};
use nix::sys::utsname::uname;
use nix::unistd::{User, getuid, gethostname};
use std::env;

const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";
const RESET: &str = "\x1b[0m";

/// Renders `user@host cwd$ ` before every read.
#[derive(Debug, Clone)]
pub struct Prompt {
    color: bool,
}

impl Prompt {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn render(&self) -> String {
        let user = user_name();
        let host = gethostname()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());
        let cwd = env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "?".to_string());

        if self.color {
            format!("{GREEN}{user}@{host} {CYAN}{cwd} {WHITE}${RESET} ")
        } else {
            format!("{user}@{host} {cwd}$ ")
        }
    }
}

fn user_name() -> String {
    match User::from_uid(getuid()) {
        Ok(Some(user)) => user.name,
        _ => env::var("USER").unwrap_or_else(|_| "?".to_string()),
    }
}

/// One line describing the host system, e.g. `Linux 6.1.0 on x86_64`.
pub fn banner() -> Result<String> {
    let uts = uname().context("uname")?;
    Ok(format!(
        "{} {} on {}\nDSSH Shell (type `help` for built-in commands)",
        uts.sysname().to_string_lossy(),
        uts.release().to_string_lossy(),
        uts.machine().to_string_lossy(),
    ))
}
