use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const LOCK_FILE: &str = ".lock";

/// How long a writer waits for another process before giving up
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const MIN_POLL: Duration = Duration::from_millis(5);
const MAX_POLL: Duration = Duration::from_millis(50);

/// Exclusive advisory lock on `<data_dir>/.lock`, held for one
/// read-modify-write of the task file. Released when dropped.
///
/// The lock file itself is never removed: unlinking it would let a waiter
/// holding the old inode and a newcomer on a fresh one both "own" the lock.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("timed out after {waited:?} waiting for {path}: another tp process is writing")]
    Timeout { path: PathBuf, waited: Duration },
}

impl FileLock {
    /// Take the lock without waiting. `Ok(None)` means another process has it.
    pub fn try_acquire(data_dir: &Path) -> Result<Option<Self>, LockError> {
        let (file, _) = open_lock_file(data_dir)?;
        Ok(flock_nonblocking(&file).then_some(FileLock { _file: file }))
    }

    /// Take the lock, polling with a growing interval for up to `timeout`.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let (file, path) = open_lock_file(data_dir)?;
        let start = Instant::now();
        let mut poll = MIN_POLL;
        while !flock_nonblocking(&file) {
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout { path, waited });
            }
            std::thread::sleep(poll.min(timeout - waited));
            poll = (poll * 2).min(MAX_POLL);
        }
        tracing::trace!(path = %path.display(), waited = ?start.elapsed(), "lock acquired");
        Ok(FileLock { _file: file })
    }

    pub fn acquire_default(data_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(data_dir, DEFAULT_LOCK_TIMEOUT)
    }
}

fn open_lock_file(data_dir: &Path) -> Result<(File, PathBuf), LockError> {
    let path = data_dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .map_err(|source| LockError::Open {
            path: path.clone(),
            source,
        })?;
    Ok((file, path))
}

/// Non-blocking exclusive flock; the lock goes away with the descriptor.
#[cfg(unix)]
fn flock_nonblocking(file: &File) -> bool {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor is owned by `file` and open for the duration of the call
    unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) == 0 }
}

#[cfg(not(unix))]
fn flock_nonblocking(_file: &File) -> bool {
    true
}
