//! Single-writer JSON document with a rolling one-generation backup.
//!
//! Every committed mutation rewrites the whole file: the current file is first copied to
//! `<file>.bak`, the new content goes to `<file>.tmp` and is renamed into place. A mutation
//! whose write fails is discarded, so the in-memory state always equals the last durable
//! state. Whole-file rewrites keep this simple but cap the practical size of a document
//! at a few thousand users.

use fs_err as fs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Persistence failure. Means the requested change is not durable and was not applied.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result of a mutation closure: whether the document must be written back.
pub enum Outcome<R> {
    Changed(R),
    Unchanged(R),
}

pub struct JsonDocument<T> {
    path: PathBuf,
    state: Mutex<T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    /// Loads the document, starting empty when the file does not exist yet.
    ///
    /// A corrupt primary file falls back to the backup copy when that one parses.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let state = if path.exists() {
            match load(&path) {
                Ok(state) => state,
                Err(primary_err) => {
                    let backup = backup_path(&path);
                    if !backup.exists() {
                        return Err(primary_err);
                    }
                    log::warn!(
                        "Document {} is unreadable ({}), recovering from {}",
                        path.display(),
                        primary_err,
                        backup.display()
                    );
                    let recovered = load(&backup)?;
                    // Replace the corrupt primary now so the next write cannot copy it over the backup
                    write_atomic(&path, &recovered)?;
                    recovered
                }
            }
        } else {
            log::info!("Document {} not found, starting empty", path.display());
            T::default()
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` against the current state under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.lock();
        f(&guard)
    }

    /// Clones the current state.
    pub fn snapshot(&self) -> T {
        self.read(T::clone)
    }

    /// Applies `f` to a working copy and persists it when `f` reports a change.
    ///
    /// The lock is held for the whole read-modify-write-persist sequence.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut T) -> Outcome<R>) -> Result<R, StorageError> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        match f(&mut next) {
            Outcome::Unchanged(result) => Ok(result),
            Outcome::Changed(result) => {
                if let Err(e) = write_with_backup(&self.path, &next) {
                    log::error!(
                        "PERSISTENCE FAILURE for {}: {} (change discarded)",
                        self.path.display(),
                        e
                    );
                    return Err(e);
                }
                *guard = next;
                Ok(result)
            }
        }
    }

    /// Writes the current state to disk unconditionally.
    pub fn flush(&self) -> Result<(), StorageError> {
        let guard = self.lock();
        write_with_backup(&self.path, &*guard)
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let raw = fs::read(path)?;
    serde_json::from_slice(&raw).map_err(|source| StorageError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// `<file>.bak` next to the document.
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, ".bak")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

pub(crate) fn write_with_backup<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let body = serde_json::to_vec_pretty(value).map_err(StorageError::Serialize)?;

    if path.exists() {
        fs::copy(path, backup_path(path))?;
    }

    replace_file(path, &body)
}

/// Rewrites `path` through a temp file without touching the backup.
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let body = serde_json::to_vec_pretty(value).map_err(StorageError::Serialize)?;
    replace_file(path, &body)
}

fn replace_file(path: &Path, body: &[u8]) -> Result<(), StorageError> {
    let tmp = with_suffix(path, ".tmp");
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
