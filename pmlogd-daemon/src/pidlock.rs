//! PID-file process lock for single-instance enforcement.
//!
//! Acquires a POSIX advisory lock (`lockf`) on the PID file and writes
//! the current process id into it. A second daemon instance fails to
//! acquire the lock and exits. The lock is released and the file
//! unlinked when the [`PidLock`] is dropped.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

/// Default PID file location.
pub const DEFAULT_PID_FILE: &str = "/tmp/run/pmlogd.pid";

/// An acquired single-instance lock.
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
    /// Held open for the lifetime of the lock; closing the descriptor
    /// releases the advisory lock.
    #[allow(dead_code)]
    file: File,
}

impl PidLock {
    /// Acquire the process lock by taking an advisory lock on `path`.
    ///
    /// Creates the parent directory if necessary. Fails with
    /// `WouldBlock`-style errors when another process holds the lock.
    pub fn acquire(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path)?;

        // POSIX advisory file lock as a mutex
        let rc = unsafe { libc::lockf(file.as_raw_fd(), libc::F_TLOCK, 0) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        // replace any stale pid with ours to aid debugging
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Self { path, file })
    }

    /// The PID file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "failed to remove pid file");
        }
    }
}
