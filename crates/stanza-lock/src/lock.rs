//! Config file locks
//!
//! A [`ConfigLock`] nests two guards: an OS advisory lock on a sidecar
//! `.<file>.lock` file, which serializes separate processes, and a per-path
//! in-process mutex, which serializes threads of this process. Both are
//! released when the guard drops.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use fs2::FileExt;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{LockError, LockResult};

/// Default time budget for acquiring a lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Interval between attempts on a contended OS lock
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Waiting longer than this logs a contention warning
const CONTENTION_WARN_AFTER: Duration = Duration::from_millis(500);

/// Process-wide mutexes, one per lock file. Entries live for the whole
/// process; there is one per distinct config file.
static PROCESS_LOCKS: Lazy<DashMap<PathBuf, &'static Mutex<()>>> = Lazy::new(DashMap::new);

/// Logical config file guarded by a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKind {
    /// Main (legacy single-file) config
    Main,
    /// Next-gen split-schema config
    NextGen,
    /// Config metadata
    Metadata,
}

impl LockKind {
    /// Name used in logs
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::NextGen => "next-gen",
            Self::Metadata => "metadata",
        }
    }
}

/// Sidecar lock file for `target`: `<dir>/.<file name>.lock`
#[must_use]
pub fn lock_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map_or_else(|| "config".into(), |n| n.to_string_lossy().into_owned());
    target.with_file_name(format!(".{name}.lock"))
}

/// Hands out locks for the three config files
#[derive(Debug, Clone)]
pub struct LockManager {
    main: PathBuf,
    next_gen: PathBuf,
    metadata: PathBuf,
    timeout: Duration,
}

impl LockManager {
    /// Create a manager for the given config file paths
    #[must_use]
    pub fn new(main: PathBuf, next_gen: PathBuf, metadata: PathBuf) -> Self {
        Self {
            main,
            next_gen,
            metadata,
            timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Override the acquisition budget
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Acquisition budget
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Config file guarded by `kind`
    #[inline]
    #[must_use]
    pub fn target(&self, kind: LockKind) -> &Path {
        match kind {
            LockKind::Main => &self.main,
            LockKind::NextGen => &self.next_gen,
            LockKind::Metadata => &self.metadata,
        }
    }

    /// Block until the lock for `kind` is held or the budget runs out.
    ///
    /// Callers holding more than one lock take them in the order
    /// `Main` → `NextGen`; `Metadata` is only ever held alone.
    ///
    /// # Errors
    /// Returns [`LockError::Timeout`] if the lock is not obtained in time, or
    /// [`LockError::Io`] if the lock file cannot be created
    pub fn acquire(&self, kind: LockKind) -> LockResult<ConfigLock> {
        let lock = ConfigLock::acquire(self.target(kind), self.timeout)?;
        debug!(kind = kind.as_str(), path = %lock.path().display(), "config lock acquired");
        Ok(lock)
    }
}

/// Exclusive hold on one config file.
///
/// Field order is drop order: the in-process mutex is released before the
/// OS lock, the reverse of acquisition.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ConfigLock {
    _process: MutexGuard<'static, ()>,
    file: FileLock,
}

impl ConfigLock {
    /// Lock `target` with the given budget.
    ///
    /// # Errors
    /// See [`LockManager::acquire`]
    pub fn acquire(target: &Path, timeout: Duration) -> LockResult<Self> {
        let start = Instant::now();
        let file = FileLock::acquire(&lock_path_for(target), start, timeout)?;

        let remaining = timeout.saturating_sub(start.elapsed());
        let mutex = process_mutex(&file.path);
        let process = mutex
            .try_lock_for(remaining)
            .ok_or_else(|| LockError::Timeout {
                path: file.path.clone(),
                waited: start.elapsed(),
            })?;

        Ok(Self {
            _process: process,
            file,
        })
    }

    /// Path of the sidecar lock file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Release explicitly; equivalent to dropping the guard
    #[inline]
    pub fn release(self) {
        drop(self);
    }
}

impl std::fmt::Debug for ConfigLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLock").field("path", &self.file.path).finish()
    }
}

fn process_mutex(lock_path: &Path) -> &'static Mutex<()> {
    let key = lock_path
        .canonicalize()
        .unwrap_or_else(|_| lock_path.to_path_buf());
    *PROCESS_LOCKS
        .entry(key)
        .or_insert_with(|| Box::leak(Box::new(Mutex::new(()))))
}

/// OS advisory lock held through an open lock file
struct FileLock {
    path: PathBuf,
    file: File,
}

impl FileLock {
    fn acquire(path: &Path, start: Instant, timeout: Duration) -> LockResult<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| LockError::io(dir, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| LockError::io(path, e))?;

        let mut warned = false;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    if warned {
                        debug!(
                            path = %path.display(),
                            waited_secs = start.elapsed().as_secs_f64(),
                            "lock acquired after contention"
                        );
                    }
                    return Ok(Self {
                        path: path.to_path_buf(),
                        file,
                    });
                }
                Err(e) if is_contended(&e) => {
                    if !warned && start.elapsed() > CONTENTION_WARN_AFTER {
                        warn!(path = %path.display(), "config lock contended, waiting");
                        warned = true;
                    }
                }
                Err(e) => return Err(LockError::io(path, e)),
            }

            let waited = start.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout {
                    path: path.to_path_buf(),
                    waited,
                });
            }
            thread::sleep(POLL_INTERVAL.min(timeout - waited));
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to release config lock");
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn lock_path_is_hidden_sibling() {
        let path = lock_path_for(Path::new("/home/u/.config/stanza/config.yaml"));
        assert_eq!(path, Path::new("/home/u/.config/stanza/.config.yaml.lock"));
    }

    #[test]
    fn acquire_creates_lock_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("sub/config.yaml");
        let lock = ConfigLock::acquire(&target, Duration::from_secs(1)).unwrap();
        assert!(lock.path().exists());
        lock.release();
        // reacquire after release
        let _again = ConfigLock::acquire(&target, Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn contended_lock_times_out() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config.yaml");
        let _held = ConfigLock::acquire(&target, Duration::from_secs(1)).unwrap();

        let target_clone = target.clone();
        let err = thread::spawn(move || {
            ConfigLock::acquire(&target_clone, Duration::from_millis(150)).unwrap_err()
        })
        .join()
        .unwrap();
        assert!(err.is_timeout());
    }

    #[test]
    fn kinds_lock_independently() {
        let dir = TempDir::new().unwrap();
        let manager = LockManager::new(
            dir.path().join("config.yaml"),
            dir.path().join("config-ng.yaml"),
            dir.path().join("config-metadata.yaml"),
        )
        .with_timeout(Duration::from_millis(200));

        let _main = manager.acquire(LockKind::Main).unwrap();
        let _next_gen = manager.acquire(LockKind::NextGen).unwrap();
        let _metadata = manager.acquire(LockKind::Metadata).unwrap();
    }

    #[test]
    fn writers_are_serialized() {
        let dir = TempDir::new().unwrap();
        let target = Arc::new(dir.path().join("config.yaml"));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let target = Arc::clone(&target);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    let _lock = ConfigLock::acquire(&target, Duration::from_secs(30)).unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
