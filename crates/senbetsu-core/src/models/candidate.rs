use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::disk::FileSet;
use crate::models::{ContentItem, Episode, QualityModel};

/// A local file under import consideration.
#[derive(Debug, Clone)]
pub struct LocalCandidate {
    pub file_set: FileSet,
    pub content: Option<Arc<ContentItem>>,
    pub episodes: Vec<Episode>,
    pub quality: QualityModel,
    /// Size of the primary file in bytes.
    pub size: u64,
    /// Playback length reported by media probing, when known.
    pub runtime: Option<Duration>,
    /// The file already lives in the library folder.
    pub is_existing_library_file: bool,
    pub is_special_episode: bool,
}

impl LocalCandidate {
    pub fn new(file_set: FileSet, content: Arc<ContentItem>, episodes: Vec<Episode>) -> Self {
        let is_special_episode = episodes.iter().any(Episode::is_special);
        Self {
            file_set,
            content: Some(content),
            episodes,
            quality: QualityModel::default(),
            size: 0,
            runtime: None,
            is_existing_library_file: false,
            is_special_episode,
        }
    }

    /// A candidate for a file that could not be mapped to any content.
    pub fn unresolved(file_set: FileSet) -> Self {
        Self {
            file_set,
            content: None,
            episodes: Vec::new(),
            quality: QualityModel::default(),
            size: 0,
            runtime: None,
            is_existing_library_file: false,
            is_special_episode: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_set.primary
    }
}

impl std::fmt::Display for LocalCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_set.primary.display())
    }
}
