//! Named exclusive locks, in the manner of the Web Locks API.
//!
//! Agents sharing a [`LockManager`] take the lock named after their
//! account before reporting; the others wait as standbys. A manager built
//! with [`LockManager::in_dir`] also holds an advisory file lock, so agents
//! in different processes on the same profile exclude each other too.
//!
//! Lock files, for a lock named `presence:<id>` in `dir`:
//!
//! - `dir/presence-<id>.lock`: held exclusively by the leader
//! - `dir/presence-<id>.standby`: held shared by every waiting agent

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use fs2::FileExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use gatherly_core::error::{AppError, ErrorKind};
use gatherly_core::result::AppResult;

/// How often a waiter retries a file lock held by another process.
const FILE_LOCK_POLL: Duration = Duration::from_millis(100);

/// Lock name guarding the presence stream of one account.
pub fn presence_lock_name(account_id: Uuid) -> String {
    format!("presence:{account_id}")
}

#[derive(Debug, Default)]
struct NamedLock {
    mutex: Arc<Mutex<()>>,
    waiters: AtomicUsize,
}

#[derive(Debug, Default)]
struct Registry {
    locks: DashMap<String, Arc<NamedLock>>,
    dir: Option<PathBuf>,
}

/// Registry of named locks shared by every agent of a profile.
#[derive(Debug, Clone, Default)]
pub struct LockManager {
    inner: Arc<Registry>,
}

/// Held lock; released on drop.
#[derive(Debug)]
pub struct LeaderGuard {
    name: String,
    _file: Option<File>,
    _guard: OwnedMutexGuard<()>,
}

impl LeaderGuard {
    /// Name of the held lock.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Marks an agent as waiting until dropped.
struct Waiting {
    lock: Arc<NamedLock>,
    _standby: Option<File>,
}

impl Drop for Waiting {
    fn drop(&mut self) {
        self.lock.waiters.fetch_sub(1, Ordering::AcqRel);
    }
}

impl LockManager {
    /// A registry scoped to this process.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose locks also bind other processes using `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            inner: Arc::new(Registry {
                locks: DashMap::new(),
                dir: Some(dir),
            }),
        })
    }

    fn lock_for(&self, name: &str) -> Arc<NamedLock> {
        self.inner
            .locks
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    fn lock_path(&self, name: &str, extension: &str) -> Option<PathBuf> {
        let dir = self.inner.dir.as_ref()?;
        let stem: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        Some(dir.join(format!("{stem}.{extension}")))
    }

    /// Waits until the named lock is free and takes it.
    ///
    /// Waiters in this process are served FIFO. Cancelling the future
    /// withdraws the waiter.
    pub async fn acquire(&self, name: &str) -> AppResult<LeaderGuard> {
        let lock = self.lock_for(name);
        let _waiting = self.register_waiter(name, &lock).await?;
        let guard = Arc::clone(&lock.mutex).lock_owned().await;
        let file = match self.lock_path(name, "lock") {
            Some(path) => Some(wait_exclusive(&path).await?),
            None => None,
        };
        Ok(LeaderGuard {
            name: name.to_string(),
            _file: file,
            _guard: guard,
        })
    }

    /// Takes the named lock only if nobody holds it.
    pub fn try_acquire(&self, name: &str) -> AppResult<Option<LeaderGuard>> {
        let lock = self.lock_for(name);
        let Ok(guard) = Arc::clone(&lock.mutex).try_lock_owned() else {
            return Ok(None);
        };
        let file = match self.lock_path(name, "lock") {
            Some(path) => {
                let file = open_lock_file(&path)?;
                match FileExt::try_lock_exclusive(&file) {
                    Ok(()) => Some(file),
                    Err(e) if is_contended(&e) => return Ok(None),
                    Err(e) => return Err(lock_error(&path, e)),
                }
            }
            None => None,
        };
        Ok(Some(LeaderGuard {
            name: name.to_string(),
            _file: file,
            _guard: guard,
        }))
    }

    /// Whether someone currently holds the named lock.
    pub fn is_held(&self, name: &str) -> bool {
        let local = self
            .inner
            .locks
            .get(name)
            .is_some_and(|lock| lock.mutex.try_lock().is_err());
        local || self.file_in_use(name, "lock")
    }

    /// Whether another agent is waiting to take the named lock.
    pub fn has_waiters(&self, name: &str) -> bool {
        let local = self
            .inner
            .locks
            .get(name)
            .is_some_and(|lock| lock.waiters.load(Ordering::Acquire) > 0);
        local || self.file_in_use(name, "standby")
    }

    async fn register_waiter(&self, name: &str, lock: &Arc<NamedLock>) -> AppResult<Waiting> {
        lock.waiters.fetch_add(1, Ordering::AcqRel);
        let mut waiting = Waiting {
            lock: Arc::clone(lock),
            _standby: None,
        };
        if let Some(path) = self.lock_path(name, "standby") {
            let file = open_lock_file(&path)?;
            // Only contended while a leader briefly checks for waiters.
            loop {
                match FileExt::try_lock_shared(&file) {
                    Ok(()) => break,
                    Err(e) if is_contended(&e) => tokio::time::sleep(FILE_LOCK_POLL).await,
                    Err(e) => return Err(lock_error(&path, e)),
                }
            }
            waiting._standby = Some(file);
        }
        Ok(waiting)
    }

    /// Whether another handle holds a lock on the file.
    fn file_in_use(&self, name: &str, extension: &str) -> bool {
        let Some(path) = self.lock_path(name, extension) else {
            return false;
        };
        let Ok(file) = open_lock_file(&path) else {
            return false;
        };
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                false
            }
            Err(_) => true,
        }
    }
}

fn open_lock_file(path: &Path) -> AppResult<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| lock_error(path, e))
}

async fn wait_exclusive(path: &Path) -> AppResult<File> {
    let file = open_lock_file(path)?;
    loop {
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => return Ok(file),
            Err(e) if is_contended(&e) => tokio::time::sleep(FILE_LOCK_POLL).await,
            Err(e) => return Err(lock_error(path, e)),
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn lock_error(path: &Path, err: io::Error) -> AppError {
    AppError::with_source(
        ErrorKind::Internal,
        format!("Failed to lock {}", path.display()),
        err,
    )
}
