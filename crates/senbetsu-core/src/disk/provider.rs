use std::fs::{File, OpenOptions, TryLockError};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::SenbetsuError;

/// Cooperative cancellation for long disk walks. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The filesystem queries the grouper and import rules depend on.
pub trait DiskProvider: Send + Sync {
    /// Every regular file under `root`, in a stable order. Checks `cancel`
    /// between entries.
    fn get_files(
        &self,
        root: &Path,
        recursive: bool,
        cancel: &CancelFlag,
    ) -> Result<Vec<PathBuf>, SenbetsuError>;

    fn file_size(&self, path: &Path) -> io::Result<u64>;

    fn last_write_utc(&self, path: &Path) -> io::Result<DateTime<Utc>>;

    /// Whether another process holds the file open exclusively.
    fn is_file_locked(&self, path: &Path) -> io::Result<bool>;
}

/// [`DiskProvider`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDisk;

impl DiskProvider for LocalDisk {
    fn get_files(
        &self,
        root: &Path,
        recursive: bool,
        cancel: &CancelFlag,
    ) -> Result<Vec<PathBuf>, SenbetsuError> {
        if !root.is_dir() {
            return Err(SenbetsuError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("folder not found: {}", root.display()),
            )));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(true)
            .sort_by_file_name()
        {
            if cancel.is_cancelled() {
                return Err(SenbetsuError::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }

    fn last_write_utc(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        Ok(std::fs::metadata(path)?.modified()?.into())
    }

    fn is_file_locked(&self, path: &Path) -> io::Result<bool> {
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(e),
            // Sharing violations and permission errors both mean "not ours yet".
            Err(_) => return Ok(true),
        };
        probe_lock(&file)
    }
}

fn probe_lock(file: &File) -> io::Result<bool> {
    match file.try_lock() {
        Ok(()) => {
            file.unlock()?;
            Ok(false)
        }
        Err(TryLockError::WouldBlock) => Ok(true),
        Err(TryLockError::Error(e)) => Err(e),
    }
}
