//! Key/value storage shared by every tab of a profile.
//!
//! Writes notify the *other* tabs through [`StorageListener`]s. The
//! writing tab gets no event, and a write that leaves the value
//! unchanged notifies nobody.
//!
//! File-backed storage can be shared between processes. Each write
//! rewrites only its own key, under an exclusive lock on `<profile>.lock`.
//! [`SharedStorage::watch`] reloads the file when another process changes
//! it; those changes reach listeners with origin [`TabId::REMOTE`].

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use fs2::FileExt;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use gatherly_core::error::{AppError, ErrorKind};
use gatherly_core::result::AppResult;

use crate::event::TabId;

const EVENT_BUFFER: usize = 64;

/// A change observed by a sibling tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key.
    pub key: String,
    /// Value before the write.
    pub old_value: Option<String>,
    /// Value after the write; `None` when removed.
    pub new_value: Option<String>,
    /// Tab that wrote it.
    pub origin: TabId,
}

#[derive(Debug)]
struct Inner {
    entries: DashMap<String, String>,
    events: broadcast::Sender<StorageEvent>,
    file: Option<PathBuf>,
    /// Serializes in-memory updates with their file writes and reloads.
    write_lock: Mutex<()>,
}

/// Cheaply cloneable handle to a profile's storage.
#[derive(Debug, Clone)]
pub struct SharedStorage {
    inner: Arc<Inner>,
}

/// Keeps a profile file watched; stops on drop.
pub struct ProfileWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for ProfileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileWatcher").finish_non_exhaustive()
    }
}

impl Drop for ProfileWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl SharedStorage {
    fn with_entries(entries: DashMap<String, String>, file: Option<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: Arc::new(Inner {
                entries,
                events,
                file,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Storage that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::with_entries(DashMap::new(), None)
    }

    /// Storage mirrored to a JSON file, loaded now if it exists.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let stored = read_profile(&path)?;
        debug!(path = %path.display(), keys = stored.len(), "Loaded profile storage");
        let entries: DashMap<String, String> = stored.into_iter().collect();
        Ok(Self::with_entries(entries, Some(path)))
    }

    /// Current value of `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.entries.get(key).map(|v| v.value().clone())
    }

    /// Stores `value` under `key` on behalf of `origin`.
    pub fn set(&self, origin: TabId, key: &str, value: &str) -> AppResult<()> {
        let _guard = self.write_guard()?;
        let old_value = self
            .inner
            .entries
            .insert(key.to_string(), value.to_string());
        if old_value.as_deref() == Some(value) {
            return Ok(());
        }
        self.persist(key, Some(value))?;
        self.notify(StorageEvent {
            key: key.to_string(),
            old_value,
            new_value: Some(value.to_string()),
            origin,
        });
        Ok(())
    }

    /// Removes `key` on behalf of `origin`.
    pub fn remove(&self, origin: TabId, key: &str) -> AppResult<()> {
        let _guard = self.write_guard()?;
        let Some((_, old_value)) = self.inner.entries.remove(key) else {
            return Ok(());
        };
        self.persist(key, None)?;
        self.notify(StorageEvent {
            key: key.to_string(),
            old_value: Some(old_value),
            new_value: None,
            origin,
        });
        Ok(())
    }

    /// Subscribes `tab` to changes made by other tabs.
    pub fn listen(&self, tab: TabId) -> StorageListener {
        StorageListener {
            tab,
            rx: self.inner.events.subscribe(),
        }
    }

    /// Re-reads the profile file and notifies listeners of every key another
    /// process changed. Returns the number of changes.
    pub fn reload(&self) -> AppResult<usize> {
        let Some(path) = &self.inner.file else {
            return Ok(0);
        };
        let _guard = self.write_guard()?;
        let disk = if path.exists() {
            let _shared = lock_profile(path, false)?;
            read_profile(path)?
        } else {
            BTreeMap::new()
        };

        let mut changes = Vec::new();
        for (key, value) in &disk {
            let old_value = self.inner.entries.insert(key.clone(), value.clone());
            if old_value.as_deref() != Some(value.as_str()) {
                changes.push(StorageEvent {
                    key: key.clone(),
                    old_value,
                    new_value: Some(value.clone()),
                    origin: TabId::REMOTE,
                });
            }
        }
        let gone: Vec<String> = self
            .inner
            .entries
            .iter()
            .filter(|e| !disk.contains_key(e.key()))
            .map(|e| e.key().clone())
            .collect();
        for key in gone {
            if let Some((key, old_value)) = self.inner.entries.remove(&key) {
                changes.push(StorageEvent {
                    key,
                    old_value: Some(old_value),
                    new_value: None,
                    origin: TabId::REMOTE,
                });
            }
        }

        let count = changes.len();
        for event in changes {
            self.notify(event);
        }
        Ok(count)
    }

    /// Watches the profile file and reloads it whenever it changes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch(&self) -> AppResult<ProfileWatcher> {
        let path = self
            .inner
            .file
            .clone()
            .ok_or_else(|| AppError::validation("In-memory storage has no file to watch"))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| AppError::validation("Profile path has no file name"))?;
        let dir = profile_dir(&path);
        std::fs::create_dir_all(&dir)?;

        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if event.kind.is_access() => {}
                Ok(event) => {
                    if event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()))
                    {
                        let _ = tx.send(());
                    }
                }
                Err(e) => warn!(error = %e, "Profile watcher error"),
            }
        })
        .map_err(watch_error)?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        let storage = self.clone();
        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                while rx.try_recv().is_ok() {}
                match storage.reload() {
                    Ok(0) => {}
                    Ok(changes) => debug!(changes, "Profile storage reloaded"),
                    Err(e) => warn!(error = %e, "Failed to reload profile storage"),
                }
            }
        });
        debug!(path = %path.display(), "Watching profile storage");

        Ok(ProfileWatcher {
            _watcher: watcher,
            task,
        })
    }

    fn notify(&self, event: StorageEvent) {
        // No listeners is not an error.
        let _ = self.inner.events.send(event);
    }

    fn write_guard(&self) -> AppResult<MutexGuard<'_, ()>> {
        self.inner
            .write_lock
            .lock()
            .map_err(|_| AppError::internal("Profile storage lock poisoned"))
    }

    /// Writes one key through to the file, keeping other processes' keys.
    fn persist(&self, key: &str, value: Option<&str>) -> AppResult<()> {
        let Some(path) = &self.inner.file else {
            return Ok(());
        };
        std::fs::create_dir_all(profile_dir(path))?;
        let _exclusive = lock_profile(path, true)?;

        let mut snapshot = read_profile(path)?;
        match value {
            Some(value) => snapshot.insert(key.to_string(), value.to_string()),
            None => snapshot.remove(key),
        };
        std::fs::write(path, serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }
}

fn profile_dir(path: &Path) -> PathBuf {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("."),
    }
}

fn read_profile(path: &Path) -> AppResult<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

/// Blocks until the profile's lock file is held; released when the file drops.
fn lock_profile(path: &Path, exclusive: bool) -> AppResult<File> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)?;
    let locked = if exclusive {
        FileExt::lock_exclusive(&file)
    } else {
        FileExt::lock_shared(&file)
    };
    locked.map_err(|e| {
        AppError::with_source(
            ErrorKind::Internal,
            format!("Failed to lock {}", lock_path.display()),
            e,
        )
    })?;
    Ok(file)
}

fn watch_error(err: notify::Error) -> AppError {
    AppError::with_source(ErrorKind::Internal, "Failed to watch profile storage", err)
}

/// Receives storage changes made by tabs other than its own.
#[derive(Debug)]
pub struct StorageListener {
    tab: TabId,
    rx: broadcast::Receiver<StorageEvent>,
}

impl StorageListener {
    /// Next change from another tab; `None` once the storage is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.origin == self.tab => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(tab = %self.tab, skipped, "Storage listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// A pending change from another tab, without waiting.
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.origin == self.tab => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
