use std::path::{Path, PathBuf};
use std::sync::Arc;

use phf::phf_set;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::disk::{CancelFlag, DiskProvider, LocalDisk};
use crate::error::SenbetsuError;

/// Extensions (lowercase, without the dot) treated as primary media.
pub static MEDIA_EXTENSIONS: phf::Set<&'static str> = phf_set! {
    "3gp", "asf", "asx", "avc", "avi", "bin", "bivx", "dat", "divx", "dv",
    "dvr-ms", "fli", "flv", "ifo", "img", "iso", "m2ts", "m2v", "m3u", "m4v",
    "mk3d", "mkv", "mov", "mp4", "mpeg", "mpg", "nrg", "nsv", "nuv", "ogm",
    "ogv", "pva", "qt", "rm", "rmvb", "strm", "svq3", "ts", "ty", "viv",
    "vob", "vp3", "webm", "wmv", "wpl", "wtv", "xvid",
};

pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MEDIA_EXTENSIONS.contains(e.to_ascii_lowercase().as_str()))
}

/// A primary media file and the companion files sharing its base name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    pub primary: PathBuf,
    /// Companions in enumeration order.
    pub companions: Vec<PathBuf>,
}

impl FileSet {
    pub fn new(primary: PathBuf) -> Self {
        Self {
            primary,
            companions: Vec::new(),
        }
    }
}

/// Groups the files of a folder into [`FileSet`]s.
pub struct FileSetGrouper {
    disk: Arc<dyn DiskProvider>,
    cancel: CancelFlag,
}

impl Default for FileSetGrouper {
    fn default() -> Self {
        Self::new(Arc::new(LocalDisk))
    }
}

impl FileSetGrouper {
    pub fn new(disk: Arc<dyn DiskProvider>) -> Self {
        Self {
            disk,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Enumerate `root` and return a lazy sequence of file sets, largest
    /// media file first.
    ///
    /// The folder is read when this is called; companion claiming happens as
    /// the sequence is consumed. Call again to re-scan.
    pub fn group_files(&self, root: &Path, recursive: bool) -> Result<FileSets, SenbetsuError> {
        debug!(path = %root.display(), recursive, "Scanning for media files");

        let files = self.disk.get_files(root, recursive, &self.cancel)?;
        let (media, others): (Vec<PathBuf>, Vec<PathBuf>) =
            files.into_iter().partition(|p| is_media_file(p));

        let mut sized: Vec<(PathBuf, u64)> = media
            .into_iter()
            .filter_map(|path| match self.disk.file_size(&path) {
                Ok(size) => Some((path, size)),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Media file vanished during scan");
                    None
                }
            })
            .collect();
        sized.sort_by(|a, b| b.1.cmp(&a.1));

        debug!(path = %root.display(), count = sized.len(), "Media files found");

        Ok(FileSets {
            root: root.to_path_buf(),
            media: sized.into_iter().map(|(path, _)| path).collect::<Vec<_>>().into_iter(),
            unclaimed: others
                .into_iter()
                .map(|p| {
                    let key = p.to_string_lossy().to_lowercase();
                    (p, key)
                })
                .collect(),
            cancel: self.cancel.clone(),
            reported: false,
        })
    }
}

/// Lazy sequence produced by [`FileSetGrouper::group_files`].
///
/// Stops early (without error) once the cancel flag is raised; callers
/// decide what to do with a partial result.
pub struct FileSets {
    root: PathBuf,
    media: std::vec::IntoIter<PathBuf>,
    /// Non-media files not yet claimed, with their lowercased path.
    unclaimed: Vec<(PathBuf, String)>,
    cancel: CancelFlag,
    reported: bool,
}

impl FileSets {
    /// Non-media files nobody has claimed so far.
    pub fn unclaimed_count(&self) -> usize {
        self.unclaimed.len()
    }

    pub fn unclaimed(&self) -> impl Iterator<Item = &Path> {
        self.unclaimed.iter().map(|(p, _)| p.as_path())
    }

    fn report_unclaimed(&mut self) {
        if self.reported {
            return;
        }
        self.reported = true;
        if !self.unclaimed.is_empty() {
            debug!(
                path = %self.root.display(),
                count = self.unclaimed.len(),
                "Files not associated with any media file will be ignored"
            );
        }
    }
}

impl Iterator for FileSets {
    type Item = FileSet;

    fn next(&mut self) -> Option<FileSet> {
        if self.cancel.is_cancelled() {
            debug!(path = %self.root.display(), "File set grouping cancelled");
            return None;
        }

        let Some(primary) = self.media.next() else {
            self.report_unclaimed();
            return None;
        };

        let prefix = claim_prefix(&primary);
        let (claimed, remaining): (Vec<_>, Vec<_>) = std::mem::take(&mut self.unclaimed)
            .into_iter()
            .partition(|(_, key)| key.starts_with(&prefix));
        self.unclaimed = remaining;

        Some(FileSet {
            primary,
            companions: claimed.into_iter().map(|(p, _)| p).collect(),
        })
    }
}

/// `<dir>/<stem>.` lowercased. The trailing dot keeps `show.mkv` from
/// claiming `show2.srt`.
fn claim_prefix(primary: &Path) -> String {
    let stem = primary.file_stem().unwrap_or_default();
    let base = match primary.parent() {
        Some(dir) => dir.join(stem),
        None => PathBuf::from(stem),
    };
    format!("{}.", base.to_string_lossy()).to_lowercase()
}
