use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

fn lock_current_dir() -> MutexGuard<'static, ()> {
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Switches the process working directory for the lifetime of the guard.
///
/// The working directory is process-wide, so every test that depends on it
/// holds this guard; the previous directory is restored on drop.
pub(crate) struct InDir {
    previous: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl InDir {
    pub(crate) fn new(dir: &Path) -> Self {
        let lock = lock_current_dir();
        let previous = env::current_dir().expect("current dir");
        env::set_current_dir(dir).expect("enter test dir");
        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for InDir {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.previous);
    }
}
