//! Filesystem access for the import side: an injectable disk abstraction and
//! the grouping of media files with their companion files.

mod file_set;
mod provider;

pub use file_set::{is_media_file, FileSet, FileSetGrouper, FileSets, MEDIA_EXTENSIONS};
pub use provider::{CancelFlag, DiskProvider, LocalDisk};
